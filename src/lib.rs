//! vakt — policy-enforcing LLM API gateway.
//!
//! Admission (rate limit, budgets, prompt size), a TTL response cache, and
//! ordered provider fallback with a per-attempt audit trail, behind an
//! OpenAI-shaped HTTP surface.

pub mod api;
pub mod audit;
pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod gateway;
pub mod policy;
pub mod providers;

use std::sync::Arc;

use axum::http::HeaderValue;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use crate::config::Config;
use crate::gateway::Gateway;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub gateway: Arc<Gateway>,
}

/// Assemble the full router: API routes plus request-id, trace, CORS, and
/// body-limit middleware.
pub fn build_app(state: AppState) -> Router {
    let cors = if state.config.server.cors_origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .server
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    };

    api::build_api_router()
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(
            state.config.server.request_body_max_bytes,
        ))
        .with_state(state)
}
