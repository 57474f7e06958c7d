use axum::response::IntoResponse;
use serde_json::json;

/// Error type shared by the proxy handlers and the streaming client.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    #[error("Config error: {0}")]
    Config(String),
    #[error("{0}")]
    InvalidRequest(String),
    #[error("Selected model is unavailable right now")]
    ModelUnavailable { upstream: serde_json::Value },
    #[error("Upstream error ({status}): {message}")]
    Upstream { status: u16, message: String },
    #[error("Transport error: {0}")]
    Transport(String),
    #[error("{0}")]
    Internal(String),
}

/// Broad error category for status code selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    InvalidRequest,
    ModelUnavailable,
    BadGateway,
    ServerError,
}

impl ChatError {
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            ChatError::InvalidRequest(_) => ErrorCategory::InvalidRequest,
            ChatError::ModelUnavailable { .. } => ErrorCategory::ModelUnavailable,
            ChatError::Upstream { .. } | ChatError::Transport(_) => ErrorCategory::BadGateway,
            ChatError::Config(_) | ChatError::Internal(_) => ErrorCategory::ServerError,
        }
    }

    /// Classify a failed upstream response. A 404 or 424, or an error message
    /// naming a missing model, means the selected model cannot be served.
    #[must_use]
    pub fn from_upstream(status: u16, body: &[u8]) -> Self {
        let message = sanitize_upstream_error(body);
        if status == 404 || status == 424 || message.to_lowercase().contains("model not found") {
            let upstream = serde_json::from_slice(body).unwrap_or_else(|_| {
                serde_json::Value::String(String::from_utf8_lossy(body).into_owned())
            });
            return ChatError::ModelUnavailable { upstream };
        }
        let message = if message.is_empty() {
            "Upstream error".to_string()
        } else {
            message
        };
        ChatError::Upstream { status, message }
    }

    /// Text shown to the user in the conversation.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            ChatError::Upstream { message, .. } if !message.is_empty() => message.clone(),
            other => other.to_string(),
        }
    }
}

#[must_use]
pub fn http_status_for_category(cat: ErrorCategory) -> http::StatusCode {
    match cat {
        ErrorCategory::InvalidRequest => http::StatusCode::BAD_REQUEST,
        ErrorCategory::ModelUnavailable => http::StatusCode::FAILED_DEPENDENCY,
        ErrorCategory::BadGateway => http::StatusCode::BAD_GATEWAY,
        ErrorCategory::ServerError => http::StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Format an error as the proxy's JSON error body, returning (`status_code`, body).
#[must_use]
pub fn format_error(err: &ChatError) -> (http::StatusCode, serde_json::Value) {
    let status = http_status_for_category(err.category());
    let body = match err {
        ChatError::ModelUnavailable { upstream } => json!({
            "error": err.to_string(),
            "code": "MODEL_NOT_FOUND",
            "upstream": upstream,
        }),
        _ => json!({ "error": err.to_string() }),
    };
    (status, body)
}

impl IntoResponse for ChatError {
    fn into_response(self) -> axum::response::Response {
        let (status, body) = format_error(&self);
        (status, axum::Json(body)).into_response()
    }
}

/// Reduce an upstream error body to something safe to show.
///
/// Takes `error.message` (or a string `error`) from JSON bodies, otherwise the
/// raw text capped at 500 characters.
#[must_use]
pub fn sanitize_upstream_error(body: &[u8]) -> String {
    const MAX_LEN: usize = 500;

    if let Ok(json) = serde_json::from_slice::<serde_json::Value>(body) {
        let error = json.get("error");
        if let Some(msg) = error
            .and_then(|e| e.get("message"))
            .and_then(|m| m.as_str())
            .or_else(|| error.and_then(|e| e.as_str()))
        {
            return msg.chars().take(MAX_LEN).collect();
        }
    }
    String::from_utf8_lossy(body).chars().take(MAX_LEN).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_upstream_404_is_model_unavailable() {
        let err = ChatError::from_upstream(404, br#"{"error":{"message":"nope"}}"#);
        assert!(matches!(err, ChatError::ModelUnavailable { .. }));
        let (status, body) = format_error(&err);
        assert_eq!(status, http::StatusCode::FAILED_DEPENDENCY);
        assert_eq!(body["code"], "MODEL_NOT_FOUND");
        assert_eq!(body["upstream"]["error"]["message"], "nope");
    }

    #[test]
    fn test_model_not_found_message_is_model_unavailable() {
        let err = ChatError::from_upstream(400, br#"{"error":{"message":"Model Not Found: x"}}"#);
        assert_eq!(err.category(), ErrorCategory::ModelUnavailable);
    }

    #[test]
    fn test_other_upstream_failures_are_bad_gateway() {
        let err = ChatError::from_upstream(500, b"boom");
        let (status, body) = format_error(&err);
        assert_eq!(status, http::StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "Upstream error (500): boom");

        let err = ChatError::from_upstream(503, b"");
        assert_eq!(err.to_string(), "Upstream error (503): Upstream error");
    }

    #[test]
    fn test_proxy_error_bodies() {
        let err = ChatError::from_upstream(
            424,
            br#"{"error":"Selected model is unavailable right now","code":"MODEL_NOT_FOUND"}"#,
        );
        assert_eq!(err.category(), ErrorCategory::ModelUnavailable);

        let err = ChatError::from_upstream(502, br#"{"error":"Upstream error (500): boom"}"#);
        assert_eq!(err.user_message(), "Upstream error (500): boom");
    }

    #[test]
    fn test_sanitize_truncates_plain_text() {
        let long = "e".repeat(800);
        assert_eq!(sanitize_upstream_error(long.as_bytes()).len(), 500);
    }
}
