//! Deterministic in-process provider for tests and local development.
//!
//! No I/O, no randomness: identical input always yields the identical
//! response, so cache and fallback behavior can be asserted exactly.

use std::future::Future;
use std::pin::Pin;

use sha2::{Digest, Sha256};

use crate::providers::types::{ChatMessage, ProviderResult, Role, Usage};
use crate::providers::{ChatProvider, ProviderError};

pub struct MockProvider {
    name: String,
    model: String,
}

impl MockProvider {
    pub fn new(name: &str, model: &str) -> Self {
        Self {
            name: name.to_string(),
            model: model.to_string(),
        }
    }

    fn respond(&self, messages: &[ChatMessage]) -> ProviderResult {
        let prompt = messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");
        let seed = stable_seed(&prompt);

        let last_user = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let reply = if last_user.contains("bullet") {
            "- first point\n- second point\n- third point".to_string()
        } else if last_user.len() > 200 {
            "That is a long prompt; here is a brief summary of the request.".to_string()
        } else {
            let mut echo: String = last_user.chars().take(120).collect();
            if echo.is_empty() {
                echo.push_str("ready");
            }
            echo
        };

        let content = format!("[mock] model={} seed={seed} :: {reply}", self.model);
        let prompt_len = prompt.len() as u32;
        let completion_len = content.len() as u32;
        ProviderResult {
            usage: Usage {
                prompt_tokens: (prompt_len / 4).max(1),
                completion_tokens: (completion_len / 4).max(1),
                total_tokens: (prompt_len / 4).max(1) + (completion_len / 4).max(1),
            },
            content,
        }
    }
}

/// First 4 bytes of the prompt's SHA-256, as a u32.
fn stable_seed(prompt: &str) -> u32 {
    let digest = Sha256::digest(prompt.as_bytes());
    u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]])
}

impl ChatProvider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    fn invoke(
        &self,
        messages: &[ChatMessage],
        _temperature: f64,
        _max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderResult, ProviderError>> + Send + '_>> {
        let result = self.respond(messages);
        Box::pin(async move { Ok(result) })
    }
}
