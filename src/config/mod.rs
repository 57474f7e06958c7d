pub mod validation;

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::reasoning::{MarkerPair, MarkerSet};
use crate::session::{DEFAULT_MAX_THREADS, DEFAULT_TITLE_MAX_CHARS};

use self::validation::validate_config;

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Proxy server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_timeout")]
    pub timeout: u64,
    #[serde(default)]
    pub base_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub runtime_worker_threads: Option<usize>,
}

fn default_port() -> u16 {
    8000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_timeout() -> u64 {
    180
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            timeout: default_timeout(),
            base_path: String::new(),
            runtime_worker_threads: None,
        }
    }
}

/// Upstream OpenRouter account used by the proxy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenRouterConfig {
    #[serde(default = "default_openrouter_base_url")]
    pub base_url: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_http_referer")]
    pub http_referer: String,
    #[serde(default = "default_title")]
    pub title: String,
}

fn default_openrouter_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}
fn default_http_referer() -> String {
    "http://localhost:3000".to_string()
}
fn default_title() -> String {
    "M4RC1L Chat".to_string()
}

impl Default for OpenRouterConfig {
    fn default() -> Self {
        Self {
            base_url: default_openrouter_base_url(),
            api_key: String::new(),
            http_referer: default_http_referer(),
            title: default_title(),
        }
    }
}

/// A selectable chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    #[serde(default)]
    pub label: String,
}

impl ModelEntry {
    fn new(id: &str, label: &str) -> Self {
        Self {
            id: id.to_string(),
            label: label.to_string(),
        }
    }
}

/// Model allowlist shared by the proxy and the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsConfig {
    #[serde(default = "default_allowed_models")]
    pub allowed: Vec<ModelEntry>,
    #[serde(default = "default_model")]
    pub default: String,
    /// Model whose visible output goes through the typing throttle.
    #[serde(default = "default_thinking_model")]
    pub thinking: String,
}

fn default_allowed_models() -> Vec<ModelEntry> {
    vec![
        ModelEntry::new(
            "moonshotai/kimi-vl-a3b-thinking:free",
            "Kimi K2 ( thinking )",
        ),
        ModelEntry::new("moonshotai/kimi-k2:free", "Kimi K2"),
        ModelEntry::new("mistralai/mistral-7b-instruct:free", "M4RC1L flash"),
    ]
}
fn default_model() -> String {
    "mistralai/mistral-7b-instruct:free".to_string()
}
fn default_thinking_model() -> String {
    "moonshotai/kimi-vl-a3b-thinking:free".to_string()
}

impl Default for ModelsConfig {
    fn default() -> Self {
        Self {
            allowed: default_allowed_models(),
            default: default_model(),
            thinking: default_thinking_model(),
        }
    }
}

/// Settings for the streaming chat client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Chat endpoint the client streams from.
    #[serde(default = "default_client_endpoint")]
    pub endpoint: String,
    /// Bearer key sent with client requests, if the endpoint needs one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default = "default_typing_interval_ms")]
    pub typing_interval_ms: u64,
    #[serde(default = "default_max_threads")]
    pub max_threads: usize,
    #[serde(default = "default_title_max_chars")]
    pub title_max_chars: usize,
    #[serde(default = "default_wiki_prompt")]
    pub wiki_prompt: String,
}

fn default_client_endpoint() -> String {
    "http://127.0.0.1:8000/api/chat".to_string()
}
fn default_typing_interval_ms() -> u64 {
    8
}
fn default_max_threads() -> usize {
    DEFAULT_MAX_THREADS
}
fn default_title_max_chars() -> usize {
    DEFAULT_TITLE_MAX_CHARS
}
fn default_wiki_prompt() -> String {
    "When helpful, ground answers in factual knowledge and provide brief citations or pointers."
        .to_string()
}

impl ClientConfig {
    #[must_use]
    pub fn typing_interval(&self) -> Duration {
        Duration::from_millis(self.typing_interval_ms)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            endpoint: default_client_endpoint(),
            api_key: None,
            typing_interval_ms: default_typing_interval_ms(),
            max_threads: default_max_threads(),
            title_max_chars: default_title_max_chars(),
            wiki_prompt: default_wiki_prompt(),
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub openrouter: OpenRouterConfig,
    #[serde(default)]
    pub models: ModelsConfig,
    #[serde(default)]
    pub client: ClientConfig,
    /// Reasoning marker variants; empty means the built-in set.
    #[serde(default)]
    pub markers: Vec<MarkerPair>,
    #[serde(default)]
    pub features: FeaturesConfig,
}

impl AppConfig {
    #[must_use]
    pub fn marker_set(&self) -> MarkerSet {
        MarkerSet::new(self.markers.clone())
    }

    /// Overlay the OpenRouter environment variables on top of file values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        if let Some(key) = non_empty("OPENROUTER_API_KEY") {
            self.openrouter.api_key = key;
        }
        if let Some(referer) = non_empty("OPENROUTER_HTTP_REFERRER") {
            self.openrouter.http_referer = referer;
        }
        if let Some(title) = non_empty("OPENROUTER_TITLE") {
            self.openrouter.title = title;
        }
    }
}

/// Load configuration from a YAML file, apply environment overrides and validate.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails, [`ConfigError::Yaml`]
/// when parsing fails, or [`ConfigError::Validation`] when semantic validation fails.
pub fn load_config(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    let mut config: AppConfig = serde_yaml::from_str(&contents)?;
    config.apply_env_overrides();
    validate_config(&config)?;
    Ok(config)
}

/// Like [`load_config`], but a missing file yields the built-in defaults.
///
/// # Errors
///
/// Same as [`load_config`] for files that exist.
pub fn load_config_or_default(path: impl AsRef<Path>) -> Result<AppConfig, ConfigError> {
    let path = path.as_ref();
    if path.exists() {
        return load_config(path);
    }
    tracing::debug!(path = %path.display(), "config file not found, using defaults");
    let mut config = AppConfig::default();
    config.apply_env_overrides();
    validate_config(&config)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_example_config() {
        let config = load_config("config.example.yaml");
        assert!(
            config.is_ok(),
            "Failed to load example config: {:?}",
            config.err()
        );
        let config = config.unwrap();
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.models.allowed.len(), 3);
        assert_eq!(config.client.typing_interval_ms, 8);
        assert_eq!(config.marker_set().pairs().len(), 3);
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config: AppConfig = serde_yaml::from_str("{}").unwrap();
        assert_eq!(config.openrouter.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.models.default, "mistralai/mistral-7b-instruct:free");
        assert_eq!(config.client.max_threads, 5);
        assert_eq!(config.marker_set(), MarkerSet::default());
    }

    #[test]
    fn test_custom_markers_replace_defaults() {
        let yaml = "markers:\n  - open: \"[[\"\n    close: \"]]\"\n";
        let config: AppConfig = serde_yaml::from_str(yaml).unwrap();
        let markers = config.marker_set();
        assert_eq!(markers.pairs(), &[MarkerPair::new("[[", "]]")]);
    }

    #[test]
    fn test_env_overrides_replace_non_empty_values() {
        let mut config = AppConfig::default();
        config.apply_overrides(|key| match key {
            "OPENROUTER_API_KEY" => Some("sk-env".to_string()),
            "OPENROUTER_TITLE" => Some("   ".to_string()),
            _ => None,
        });
        assert_eq!(config.openrouter.api_key, "sk-env");
        assert_eq!(config.openrouter.title, "M4RC1L Chat");
    }
}
