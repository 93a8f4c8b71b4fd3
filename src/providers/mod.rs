//! Provider adapters.
//!
//! Defines the [`ChatProvider`] trait every backend implements, the
//! [`ProviderError`] type, and the registry that builds adapters from the
//! configuration's kind strings.

pub mod anthropic;
pub mod mock;
pub mod openai;
pub mod types;

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::config::ProviderConfig;
use crate::providers::types::{ChatMessage, ProviderResult};

pub use self::anthropic::AnthropicProvider;
pub use self::mock::MockProvider;
pub use self::openai::OpenAiProvider;

// ---------------------------------------------------------------------------
// ProviderError
// ---------------------------------------------------------------------------

/// An upstream failure (HTTP >= 400, transport error, timeout), attributed to
/// the provider that produced it. Eligible for fallback to the next chain
/// entry; never surfaced to the caller while alternatives remain.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    pub provider: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(provider: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// ChatProvider trait
// ---------------------------------------------------------------------------

/// The single capability the orchestrator needs from a backend.
///
/// Async method returns a boxed future so the trait is dyn-compatible (used
/// as `Arc<dyn ChatProvider>`); no `async_trait` macro is needed.
pub trait ChatProvider: Send + Sync {
    /// Configured provider name (the key used in route chains).
    fn name(&self) -> &str;

    /// Upstream model identifier this adapter sends.
    fn model(&self) -> &str;

    /// Perform one chat completion call against the backend.
    fn invoke(
        &self,
        messages: &[ChatMessage],
        temperature: f64,
        max_tokens: u32,
    ) -> Pin<Box<dyn Future<Output = Result<ProviderResult, ProviderError>> + Send + '_>>;
}

// ---------------------------------------------------------------------------
// ProviderRegistry
// ---------------------------------------------------------------------------

/// Configured adapters keyed by provider name. A chain entry that has no
/// registry entry is a configuration error handled by the orchestrator.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.providers.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, provider: Arc<dyn ChatProvider>) {
        let name = provider.name().to_string();
        if self.providers.contains_key(&name) {
            tracing::warn!(provider = %name, "Provider already registered, replacing");
        }
        self.providers.insert(name, provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(name).map(Arc::clone)
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Build every configured adapter. Fails fast on an unknown kind, a missing
/// base URL, or an absent API key env var, so misconfiguration is caught at
/// startup rather than mid-request.
pub fn build_registry(configs: &HashMap<String, ProviderConfig>) -> anyhow::Result<ProviderRegistry> {
    let mut registry = ProviderRegistry::new();

    for (name, cfg) in configs {
        let provider: Arc<dyn ChatProvider> = match cfg.kind.to_lowercase().as_str() {
            "mock" => Arc::new(MockProvider::new(name, &cfg.model)),
            "openai" => Arc::new(OpenAiProvider::new(
                name,
                &cfg.model,
                require_base_url(name, cfg)?,
                &resolve_api_key(name, cfg)?,
                cfg.timeout_secs,
            )?),
            "anthropic" => Arc::new(AnthropicProvider::new(
                name,
                &cfg.model,
                require_base_url(name, cfg)?,
                &resolve_api_key(name, cfg)?,
                cfg.timeout_secs,
            )?),
            other => {
                anyhow::bail!("unknown provider kind '{other}' for provider '{name}'")
            }
        };
        tracing::info!(provider = %name, kind = %cfg.kind, model = %cfg.model, "Provider registered");
        registry.register(provider);
    }

    Ok(registry)
}

fn require_base_url<'a>(name: &str, cfg: &'a ProviderConfig) -> anyhow::Result<&'a str> {
    cfg.base_url
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("provider '{name}' ({}) requires base_url", cfg.kind))
}

fn resolve_api_key(name: &str, cfg: &ProviderConfig) -> anyhow::Result<String> {
    let env_name = cfg
        .api_key_env
        .as_deref()
        .ok_or_else(|| anyhow::anyhow!("provider '{name}' ({}) requires api_key_env", cfg.kind))?;
    std::env::var(env_name)
        .map_err(|_| anyhow::anyhow!("provider '{name}': env var {env_name} is not set"))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
