//! Anthropic Messages API adapter.
//!
//! System messages are lifted out of the conversation into the `system`
//! field, since the Messages API rejects a system role inside `messages`.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;

use crate::providers::types::{ChatMessage, ProviderResult, Role, Usage};
use crate::providers::{ChatProvider, ProviderError};

const ANTHROPIC_VERSION: &str = "2023-06-01";

pub struct AnthropicProvider {
    name: String,
    model: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    usage: Option<WireUsage>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

#[derive(Deserialize)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u32,
    #[serde(default)]
    output_tokens: u32,
}

impl AnthropicProvider {
    pub fn new(
        name: &str,
        model: &str,
        base_url: &str,
        api_key: &str,
        timeout_secs: u64,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self {
            name: name.to_string(),
            model: model.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            client,
        })
    }

    async fn call(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Result<ProviderResult, ProviderError> {
        let url = format!("{}/messages", self.base_url);

        let system: Vec<&str> = messages
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();
        let conversation: Vec<&ChatMessage> =
            messages.iter().filter(|m| m.role != Role::System).collect();

        let mut payload = json!({
            "model": self.model,
            "messages": conversation,
            "temperature": temperature,
            "max_tokens": max_tokens,
        });
        if !system.is_empty() {
            payload["system"] = json!(system.join("\n"));
        }

        let response = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&payload)
            .send()
            .await
            .map_err(|e| ProviderError::new(&self.name, format!("request failed: {e}")))?;

        let status = response.status();
        if status.as_u16() >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::new(
                &self.name,
                format!("HTTP {}: {}", status.as_u16(), truncate(&body, 400)),
            ));
        }

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::new(&self.name, format!("invalid response body: {e}")))?;

        let content: String = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text.as_str())
            .collect();
        if content.is_empty() {
            return Err(ProviderError::new(&self.name, "response carried no text content"));
        }

        let usage = parsed
            .usage
            .map(|u| Usage {
                prompt_tokens: u.input_tokens,
                completion_tokens: u.output_tokens,
                total_tokens: u.input_tokens + u.output_tokens,
            })
            .unwrap_or_default();

        Ok(ProviderResult { content, usage })
    }
}

fn truncate(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

impl ChatProvider for AnthropicProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn invoke(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderResult, ProviderError>> + Send + '_>> {
        let messages = messages.to_vec();
        Box::pin(async move { self.call(&messages, temperature, max_tokens).await })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn provider(base_url: &str) -> AnthropicProvider {
        AnthropicProvider::new("claude-main", "claude-sonnet", base_url, "sk-ant-test", 5).unwrap()
    }

    #[tokio::test]
    async fn test_system_lifted_and_content_joined() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/messages")
                    .header("x-api-key", "sk-ant-test")
                    .header("anthropic-version", ANTHROPIC_VERSION)
                    .json_body_partial(r#"{"system": "be terse"}"#);
                then.status(200).json_body(serde_json::json!({
                    "content": [
                        {"type": "text", "text": "part one "},
                        {"type": "tool_use", "id": "t1", "name": "ignored", "input": {}},
                        {"type": "text", "text": "part two"}
                    ],
                    "usage": {"input_tokens": 11, "output_tokens": 4}
                }));
            })
            .await;

        let p = provider(&server.base_url());
        let messages = vec![
            ChatMessage::new(Role::System, "be terse"),
            ChatMessage::new(Role::User, "hello"),
        ];
        let result = p.invoke(&messages, 0.2, 100).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.content, "part one part two");
        assert_eq!(result.usage.prompt_tokens, 11);
        assert_eq!(result.usage.completion_tokens, 4);
        assert_eq!(result.usage.total_tokens, 15);
    }

    #[tokio::test]
    async fn test_http_error_is_provider_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/messages");
                then.status(429).body("rate limited upstream");
            })
            .await;

        let p = provider(&server.base_url());
        let messages = vec![ChatMessage::new(Role::User, "hello")];
        let err = p.invoke(&messages, 0.2, 100).await.unwrap_err();
        assert_eq!(err.provider, "claude-main");
        assert!(err.message.contains("HTTP 429"));
    }

    #[tokio::test]
    async fn test_no_text_blocks_is_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/messages");
                then.status(200).json_body(serde_json::json!({
                    "content": [],
                    "usage": {"input_tokens": 1, "output_tokens": 0}
                }));
            })
            .await;

        let p = provider(&server.base_url());
        let messages = vec![ChatMessage::new(Role::User, "hello")];
        let err = p.invoke(&messages, 0.2, 100).await.unwrap_err();
        assert!(err.message.contains("no text content"));
    }
}
