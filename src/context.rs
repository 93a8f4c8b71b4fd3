use axum::http::HeaderMap;
use uuid::Uuid;

/// Per-request identity, created once at ingress and read-only afterwards.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub tenant_id: String,
    pub route: String,
}

impl RequestContext {
    /// Extract the context from inbound headers.
    ///
    /// `x-request-id` is honored if present (the request-id middleware also
    /// sets one); tenant and route fall back to "anonymous" / "default".
    pub fn from_headers(headers: &HeaderMap) -> Self {
        let request_id = header_str(headers, "x-request-id")
            .map(str::to_string)
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let tenant_id = header_str(headers, "x-tenant-id")
            .unwrap_or("anonymous")
            .to_string();
        let route = header_str(headers, "x-route").unwrap_or("default").to_string();

        Self {
            request_id,
            tenant_id,
            route,
        }
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn test_from_headers_defaults() {
        let headers = HeaderMap::new();
        let ctx = RequestContext::from_headers(&headers);
        assert!(!ctx.request_id.is_empty());
        assert_eq!(ctx.tenant_id, "anonymous");
        assert_eq!(ctx.route, "default");
    }

    #[test]
    fn test_from_headers_explicit() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("rid-42"));
        headers.insert("x-tenant-id", HeaderValue::from_static("acme"));
        headers.insert("x-route", HeaderValue::from_static("premium"));

        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.request_id, "rid-42");
        assert_eq!(ctx.tenant_id, "acme");
        assert_eq!(ctx.route, "premium");
    }

    #[test]
    fn test_empty_header_falls_back() {
        let mut headers = HeaderMap::new();
        headers.insert("x-tenant-id", HeaderValue::from_static(""));
        let ctx = RequestContext::from_headers(&headers);
        assert_eq!(ctx.tenant_id, "anonymous");
    }

    #[test]
    fn test_generated_ids_are_unique() {
        let headers = HeaderMap::new();
        let a = RequestContext::from_headers(&headers);
        let b = RequestContext::from_headers(&headers);
        assert_ne!(a.request_id, b.request_id);
    }
}
