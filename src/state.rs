use std::time::Duration;

use crate::config::AppConfig;
use crate::error::ChatError;
use crate::models::ModelCatalog;

/// Shared application state accessible to all handlers.
pub struct AppState {
    pub config: AppConfig,
    pub http: reqwest::Client,
    pub catalog: ModelCatalog,
}

impl AppState {
    /// # Errors
    ///
    /// Returns [`ChatError::Config`] when the upstream HTTP client cannot be built.
    pub fn new(config: AppConfig) -> Result<Self, ChatError> {
        let http = build_upstream_client(config.server.timeout)?;
        let catalog = ModelCatalog::new(&config.models);
        Ok(Self {
            config,
            http,
            catalog,
        })
    }

    /// Upstream URL for `path`, relative to the configured base URL.
    #[must_use]
    pub fn upstream_url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.config.openrouter.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// The upstream key, if one is configured.
    #[must_use]
    pub fn api_key(&self) -> Option<&str> {
        Some(self.config.openrouter.api_key.as_str()).filter(|key| !key.trim().is_empty())
    }
}

fn build_upstream_client(timeout_secs: u64) -> Result<reqwest::Client, ChatError> {
    reqwest::Client::builder()
        .pool_idle_timeout(Duration::from_secs(90))
        .tcp_nodelay(true)
        .connect_timeout(Duration::from_secs(5))
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|err| ChatError::Config(format!("Failed to build upstream HTTP client: {err}")))
}
