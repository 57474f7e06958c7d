use tracing_subscriber::EnvFilter;

/// Initialize the tracing subscriber with the configured log level.
///
/// Maps config log levels to tracing levels:
/// - "DISABLED" -> no subscriber installed
/// - "WARNING" -> WARN
/// - "CRITICAL" -> ERROR
/// - Others map directly (DEBUG, INFO, ERROR)
///
/// Logs go to stderr so the terminal client can keep stdout for the
/// conversation.
pub fn init_tracing(log_level: &str) {
    let Some(filter) = level_filter(log_level) else {
        return;
    };

    // a second init (tests, embedding) keeps the first subscriber
    if let Err(err) = install(filter) {
        eprintln!("Failed to install tracing subscriber: {err}");
    }
}

fn install(filter: EnvFilter) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .try_init()
}

fn level_filter(log_level: &str) -> Option<EnvFilter> {
    let level = log_level.to_uppercase();
    if level == "DISABLED" {
        return None;
    }
    let tracing_level = match level.as_str() {
        "WARNING" => "WARN",
        "CRITICAL" => "ERROR",
        other => other,
    };
    Some(EnvFilter::try_new(tracing_level).unwrap_or_else(|_| EnvFilter::new("INFO")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_mapping() {
        assert!(level_filter("disabled").is_none());
        assert_eq!(level_filter("WARNING").unwrap().to_string(), "warn");
        assert_eq!(level_filter("critical").unwrap().to_string(), "error");
        assert_eq!(level_filter("DEBUG").unwrap().to_string(), "debug");
    }

    #[test]
    fn test_second_init_keeps_first_subscriber() {
        let _ = install(EnvFilter::new("info"));
        assert!(install(EnvFilter::new("debug")).is_err());

        init_tracing("INFO");
        init_tracing("DEBUG");
        init_tracing("DISABLED");
        tracing::info!("still logging after repeated init");
    }
}
