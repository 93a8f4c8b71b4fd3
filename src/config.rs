use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ---------------------------------------------------------------------------
// Main configuration
// ---------------------------------------------------------------------------

/// Full gateway configuration, loaded from a TOML file.
///
/// `config_version` is not part of the file; it is a fingerprint of the raw
/// config bytes computed at load time and stamped on every audit event, so
/// records can be correlated with the exact configuration that produced them.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub budgets: BudgetsConfig,
    #[serde(default)]
    pub redaction: RedactionConfig,
    #[serde(default)]
    pub policies: PoliciesConfig,
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Provider name -> backend configuration.
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
    /// Route name -> ordered provider chain.
    #[serde(default)]
    pub routes: HashMap<String, RouteConfig>,
    /// Fingerprint of the loaded config bytes; set by [`Config::load`].
    #[serde(skip)]
    pub config_version: String,
}

impl Config {
    /// Load configuration from a TOML file and stamp its version fingerprint.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("failed to read config {}: {e}", path.display()))?;
        let mut config: Config = toml::from_str(std::str::from_utf8(&raw)?)?;
        config.config_version = version_hash(&raw);
        Ok(config)
    }

    /// The address the HTTP server should bind to.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// First 12 hex chars of the SHA-256 over the raw config bytes.
pub fn version_hash(raw: &[u8]) -> String {
    let digest = Sha256::digest(raw);
    let hex = format!("{digest:x}");
    hex[..12].to_string()
}

// ---------------------------------------------------------------------------
// Server / logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    #[serde(default = "default_body_max_bytes")]
    pub request_body_max_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            request_body_max_bytes: default_body_max_bytes(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Rate limiting
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RateLimitConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Tokens added to each bucket per second.
    #[serde(default = "default_refill_per_sec")]
    pub refill_per_sec: f64,
    /// Maximum tokens a bucket can hold (also the initial fill).
    #[serde(default = "default_capacity")]
    pub capacity: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            refill_per_sec: default_refill_per_sec(),
            capacity: default_capacity(),
        }
    }
}

// ---------------------------------------------------------------------------
// Response cache
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_cache_ttl_secs")]
    pub ttl_secs: u64,
    #[serde(default = "default_cache_max_items")]
    pub max_items: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            ttl_secs: default_cache_ttl_secs(),
            max_items: default_cache_max_items(),
        }
    }
}

// ---------------------------------------------------------------------------
// Budgets
// ---------------------------------------------------------------------------

/// A spend/size ceiling. Both fields always travel together: when an override
/// layer is present, it replaces the budget wholesale, never field by field.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize)]
pub struct Budget {
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_max_cost_usd")]
    pub max_cost_usd: f64,
}

impl Default for Budget {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            max_cost_usd: default_max_cost_usd(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct BudgetsConfig {
    #[serde(default)]
    pub default: Budget,
    #[serde(default)]
    pub tenants: HashMap<String, Budget>,
    #[serde(default)]
    pub routes: HashMap<String, Budget>,
}

// ---------------------------------------------------------------------------
// Redaction
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedactionPattern {
    pub name: String,
    pub regex: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RedactionConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Applied in order; rule i+1 sees the output of rule i.
    #[serde(default)]
    pub patterns: Vec<RedactionPattern>,
}

impl Default for RedactionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: Vec::new(),
        }
    }
}

// ---------------------------------------------------------------------------
// Request policies
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PoliciesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_max_prompt_chars")]
    pub max_prompt_chars: usize,
}

impl Default for PoliciesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_prompt_chars: default_max_prompt_chars(),
        }
    }
}

// ---------------------------------------------------------------------------
// Routing / providers
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RoutingConfig {
    /// When non-empty, a chain entry whose configured model is not listed
    /// here is skipped (the skip is folded into the request's last_error).
    #[serde(default)]
    pub allowed_models: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Backend kind: "openai" | "anthropic" | "mock".
    pub kind: String,
    /// Upstream model identifier sent to this backend.
    pub model: String,
    #[serde(default)]
    pub base_url: Option<String>,
    /// Name of the environment variable holding the API key.
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct RouteConfig {
    /// Ordered fallback chain of provider names.
    #[serde(default)]
    pub providers: Vec<String>,
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_max_bytes() -> usize {
    1_048_576
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_refill_per_sec() -> f64 {
    2.0
}

fn default_capacity() -> u32 {
    10
}

fn default_cache_ttl_secs() -> u64 {
    60
}

fn default_cache_max_items() -> usize {
    1024
}

fn default_max_tokens() -> u32 {
    1200
}

fn default_max_cost_usd() -> f64 {
    0.50
}

fn default_max_prompt_chars() -> usize {
    50_000
}

fn default_timeout_secs() -> u64 {
    30
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
