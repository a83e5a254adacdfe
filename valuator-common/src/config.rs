//! Configuration management for the valuator service.
//!
//! The service reads a single configuration file at `~/.valuator/config.json`.
//!
//! # Configuration Priority
//!
//! 1. Environment variables
//! 2. Explicit config file values
//! 3. Default values
//!
//! # Environment Variable Mapping
//!
//! - `VALUATOR_BIND_ADDRESS` → server.host
//! - `VALUATOR_PORT` → server.port
//! - `VALUATOR_LOG_LEVEL` → observability.log_level
//! - `VALUATOR_LOG_FORMAT` → observability.log_format
//! - `AZURE_OPENAI_ENDPOINT` → narrative.endpoint
//! - `AZURE_OPENAI_API_KEY` (or `OPENAI_API_KEY`) → narrative.api_key
//! - `AZURE_OPENAI_DEPLOYMENT_NAME` → narrative.deployment

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Get the configuration directory path.
pub fn config_dir() -> PathBuf {
    directories::UserDirs::new().map_or_else(
        || PathBuf::from(".valuator"),
        |dirs| dirs.home_dir().join(".valuator"),
    )
}

/// Get the configuration file path.
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

// ============================================================================
// Server Configuration
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Bind address.
    /// Default: "127.0.0.1" (local only)
    #[serde(default = "default_host")]
    pub host: String,

    /// Listen port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,

    /// Upper bound on a single request, including the narrative call
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    /// `host:port` string suitable for parsing into a socket address.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

// ============================================================================
// Narrative (LLM) Configuration
// ============================================================================

/// Azure OpenAI narrative generator configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NarrativeConfig {
    /// Whether to call the LLM at all. When disabled every valuation
    /// carries the fallback narrative.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Azure OpenAI resource endpoint, e.g. `https://my-resource.openai.azure.com`
    #[serde(default)]
    pub endpoint: Option<String>,

    /// API key sent in the `api-key` header
    #[serde(default)]
    pub api_key: Option<String>,

    /// Deployment name
    #[serde(default = "default_deployment")]
    pub deployment: String,

    /// Chat completions API version
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Maximum completion tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first failed attempt
    #[serde(default = "default_retries")]
    pub max_retries: u32,

    /// Backoff between retries in milliseconds
    #[serde(default = "default_backoff_ms")]
    pub retry_backoff_ms: u64,
}

impl Default for NarrativeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: None,
            api_key: None,
            deployment: default_deployment(),
            api_version: default_api_version(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout(),
            max_retries: default_retries(),
            retry_backoff_ms: default_backoff_ms(),
        }
    }
}

impl NarrativeConfig {
    /// Whether both endpoint and key are present.
    pub fn has_credentials(&self) -> bool {
        self.endpoint.as_deref().is_some_and(|e| !e.trim().is_empty())
            && self.api_key.as_deref().is_some_and(|k| !k.trim().is_empty())
    }
}

// ============================================================================
// Valuation Assumptions
// ============================================================================

/// Discount-rate assumptions fed into the valuation engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValuationSettings {
    /// Weighted average cost of capital (fraction)
    #[serde(default = "default_wacc")]
    pub wacc: f64,

    /// Perpetual growth rate for the terminal value (fraction)
    #[serde(default = "default_terminal_growth")]
    pub terminal_growth: f64,
}

impl Default for ValuationSettings {
    fn default() -> Self {
        Self {
            wacc: default_wacc(),
            terminal_growth: default_terminal_growth(),
        }
    }
}

// ============================================================================
// Store Configuration
// ============================================================================

/// In-memory record store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Default number of records returned by the recent-valuations listing
    #[serde(default = "default_recent_limit")]
    pub recent_limit: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            recent_limit: default_recent_limit(),
        }
    }
}

// ============================================================================
// Observability
// ============================================================================

/// Observability configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level", alias = "level")]
    pub log_level: String,

    /// Log format (json, pretty)
    #[serde(default = "default_log_format", alias = "format")]
    pub log_format: String,

    /// Additional module targets to set to `warn`.
    #[serde(default)]
    pub excluded_targets: Vec<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_format: default_log_format(),
            excluded_targets: Vec::new(),
        }
    }
}

// ============================================================================
// Root
// ============================================================================

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP server
    #[serde(default)]
    pub server: ServerConfig,

    /// Narrative generator
    #[serde(default)]
    pub narrative: NarrativeConfig,

    /// Valuation assumptions
    #[serde(default)]
    pub valuation: ValuationSettings,

    /// Record store
    #[serde(default)]
    pub store: StoreConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Load configuration from the default path.
    pub fn load() -> Result<Self> {
        let path = config_path();
        if !path.exists() {
            tracing::info!("Config file not found, using defaults");
            return Ok(Self::default());
        }

        Self::load_from(&path)
    }

    /// Load configuration from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config from {}", path.display()))?;

        serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config from {}", path.display()))
    }

    /// Load configuration with environment variable overrides applied.
    pub fn load_with_env() -> Result<Self> {
        let mut config = Self::load()?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary lookup (the environment in production).
    pub fn apply_overrides_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("VALUATOR_BIND_ADDRESS") {
            self.server.host = host;
        }
        if let Some(port) = lookup("VALUATOR_PORT") {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid VALUATOR_PORT"),
            }
        }

        if let Some(level) = lookup("VALUATOR_LOG_LEVEL") {
            self.observability.log_level = level;
        }
        if let Some(format) = lookup("VALUATOR_LOG_FORMAT") {
            self.observability.log_format = format;
        }

        if let Some(endpoint) = lookup("AZURE_OPENAI_ENDPOINT") {
            self.narrative.endpoint = Some(endpoint);
        }
        if let Some(key) = lookup("AZURE_OPENAI_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.narrative.api_key = Some(key);
        }
        if let Some(deployment) = lookup("AZURE_OPENAI_DEPLOYMENT_NAME") {
            self.narrative.deployment = deployment;
        }
    }

    /// Save configuration to the default path.
    pub fn save(&self) -> Result<()> {
        let dir = config_dir();
        if !dir.exists() {
            fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create config directory {}", dir.display()))?;
        }

        self.save_to(&config_path())
    }

    /// Save configuration to a specific path.
    pub fn save_to(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        fs::write(path, content)
            .with_context(|| format!("Failed to write config to {}", path.display()))
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    5000
}
fn default_body_limit() -> usize {
    64 * 1024
}
fn default_request_timeout() -> u64 {
    90
}
fn default_true() -> bool {
    true
}
fn default_deployment() -> String {
    "gpt-4o-mini".into()
}
fn default_api_version() -> String {
    "2024-02-15-preview".into()
}
fn default_max_tokens() -> u32 {
    1500
}
fn default_temperature() -> f64 {
    0.3
}
fn default_timeout() -> u64 {
    30
}
fn default_retries() -> u32 {
    1
}
fn default_backoff_ms() -> u64 {
    500
}
fn default_wacc() -> f64 {
    0.10
}
fn default_terminal_growth() -> f64 {
    0.03
}
fn default_recent_limit() -> usize {
    10
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "pretty".into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.server.port, 5000);
        assert_eq!(config.server.bind_address(), "127.0.0.1:5000");
        assert_eq!(config.server.request_timeout_secs, 90);
        assert_eq!(config.narrative.deployment, "gpt-4o-mini");
        assert_eq!(config.narrative.max_tokens, 1500);
        assert!((config.narrative.temperature - 0.3).abs() < f64::EPSILON);
        assert!((config.valuation.wacc - 0.10).abs() < f64::EPSILON);
        assert!((config.valuation.terminal_growth - 0.03).abs() < f64::EPSILON);
        assert_eq!(config.store.recent_limit, 10);
        assert!(!config.narrative.has_credentials());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"server": {"port": 8080}, "observability": {"level": "debug"}}"#)
                .unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.observability.log_level, "debug");
        assert_eq!(config.observability.log_format, "pretty");
    }

    #[test]
    fn test_load_from_and_save_to() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        let mut config = Config::default();
        config.narrative.endpoint = Some("https://example.openai.azure.com".into());
        config.valuation.wacc = 0.12;
        config.save_to(&path).unwrap();

        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(
            loaded.narrative.endpoint.as_deref(),
            Some("https://example.openai.azure.com")
        );
        assert!((loaded.valuation.wacc - 0.12).abs() < f64::EPSILON);
    }

    #[test]
    fn test_load_from_invalid_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse config"));
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("VALUATOR_PORT", "9100"),
            ("VALUATOR_BIND_ADDRESS", "0.0.0.0"),
            ("AZURE_OPENAI_ENDPOINT", "https://res.openai.azure.com"),
            ("OPENAI_API_KEY", "legacy-key"),
            ("AZURE_OPENAI_DEPLOYMENT_NAME", "gpt-4o"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides_from(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9100);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.narrative.api_key.as_deref(), Some("legacy-key"));
        assert_eq!(config.narrative.deployment, "gpt-4o");
        assert!(config.narrative.has_credentials());
    }

    #[test]
    fn test_azure_key_wins_over_legacy_key() {
        let mut config = Config::default();
        config.apply_overrides_from(|k| match k {
            "AZURE_OPENAI_API_KEY" => Some("azure-key".into()),
            "OPENAI_API_KEY" => Some("legacy-key".into()),
            _ => None,
        });
        assert_eq!(config.narrative.api_key.as_deref(), Some("azure-key"));
    }

    #[test]
    fn test_invalid_port_override_is_ignored() {
        let mut config = Config::default();
        config.apply_overrides_from(|k| (k == "VALUATOR_PORT").then(|| "not-a-port".to_string()));
        assert_eq!(config.server.port, 5000);
    }
}
