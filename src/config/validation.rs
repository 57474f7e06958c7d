use super::{AppConfig, ConfigError};

/// Validate the full application config, returning an error if any rule is violated.
///
/// # Errors
///
/// Returns [`ConfigError::Validation`] when any configuration invariant is violated.
pub fn validate_config(config: &AppConfig) -> Result<(), ConfigError> {
    validate_server_config(config)?;
    validate_openrouter(config)?;
    validate_models(config)?;
    validate_client(config)?;
    validate_markers(config)?;
    validate_log_level(config)?;
    Ok(())
}

fn validation_err(msg: impl Into<String>) -> ConfigError {
    ConfigError::Validation(msg.into())
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn validate_server_config(config: &AppConfig) -> Result<(), ConfigError> {
    let server = &config.server;
    if server.timeout == 0 {
        return Err(validation_err("server.timeout must be greater than 0"));
    }
    if let Some(worker_threads) = server.runtime_worker_threads {
        if worker_threads == 0 {
            return Err(validation_err(
                "server.runtime_worker_threads must be greater than 0 when set",
            ));
        }
    }
    Ok(())
}

fn validate_openrouter(config: &AppConfig) -> Result<(), ConfigError> {
    if !is_http_url(&config.openrouter.base_url) {
        return Err(validation_err(
            "openrouter.base_url must start with http:// or https://",
        ));
    }
    Ok(())
}

fn validate_models(config: &AppConfig) -> Result<(), ConfigError> {
    let models = &config.models;
    if models.allowed.is_empty() {
        return Err(validation_err("models.allowed cannot be empty"));
    }
    if models.allowed.iter().any(|entry| entry.id.trim().is_empty()) {
        return Err(validation_err("models.allowed contains an empty model id"));
    }
    if !models.allowed.iter().any(|entry| entry.id == models.default) {
        return Err(validation_err(format!(
            "models.default '{}' must be one of models.allowed",
            models.default
        )));
    }
    Ok(())
}

fn validate_client(config: &AppConfig) -> Result<(), ConfigError> {
    let client = &config.client;
    if !is_http_url(&client.endpoint) {
        return Err(validation_err(
            "client.endpoint must start with http:// or https://",
        ));
    }
    if client.typing_interval_ms == 0 {
        return Err(validation_err(
            "client.typing_interval_ms must be greater than 0",
        ));
    }
    if client.max_threads == 0 {
        return Err(validation_err("client.max_threads must be greater than 0"));
    }
    if client.title_max_chars == 0 {
        return Err(validation_err(
            "client.title_max_chars must be greater than 0",
        ));
    }
    Ok(())
}

fn validate_markers(config: &AppConfig) -> Result<(), ConfigError> {
    for (index, pair) in config.markers.iter().enumerate() {
        if pair.open.is_empty() || pair.close.is_empty() {
            return Err(validation_err(format!(
                "markers[{index}]: open and close tokens cannot be empty"
            )));
        }
    }
    Ok(())
}

const VALID_LOG_LEVELS: &[&str] = &[
    "DEBUG", "INFO", "WARNING", "WARN", "ERROR", "CRITICAL", "TRACE", "DISABLED",
];

fn validate_log_level(config: &AppConfig) -> Result<(), ConfigError> {
    let level = config.features.log_level.to_uppercase();
    if !VALID_LOG_LEVELS.contains(&level.as_str()) {
        return Err(validation_err(format!(
            "features.log_level '{}' is invalid. Must be one of: {}",
            config.features.log_level,
            VALID_LOG_LEVELS.join(", ")
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reasoning::MarkerPair;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_default_model_must_be_allowed() {
        let mut config = AppConfig::default();
        config.models.default = "someone/else".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(err.to_string().contains("models.default"));
    }

    #[test]
    fn test_rejects_bad_urls() {
        let mut config = AppConfig::default();
        config.openrouter.base_url = "openrouter.ai".to_string();
        assert!(validate_config(&config).is_err());

        let mut config = AppConfig::default();
        config.client.endpoint = "localhost:8000".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_empty_marker_tokens() {
        let mut config = AppConfig::default();
        config.markers = vec![MarkerPair::new("<r>", "")];
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_rejects_unknown_log_level() {
        let mut config = AppConfig::default();
        config.features.log_level = "LOUD".to_string();
        assert!(validate_config(&config).is_err());

        config.features.log_level = "warning".to_string();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_zero_typing_interval_rejected() {
        let mut config = AppConfig::default();
        config.client.typing_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }
}
