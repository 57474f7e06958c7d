pub mod chat;
pub mod health;
pub mod models;

use crate::error::ChatError;
use crate::state::AppState;

const MISSING_KEY_MESSAGE: &str = "Server misconfiguration: OPENROUTER_API_KEY missing";

/// Start an upstream request for `path` carrying the account headers.
fn upstream_request(
    state: &AppState,
    method: http::Method,
    path: &str,
) -> Result<reqwest::RequestBuilder, ChatError> {
    let Some(api_key) = state.api_key() else {
        tracing::error!("OPENROUTER_API_KEY is not configured");
        return Err(ChatError::Internal(MISSING_KEY_MESSAGE.to_string()));
    };
    let openrouter = &state.config.openrouter;
    Ok(state
        .http
        .request(method, state.upstream_url(path))
        .bearer_auth(api_key)
        .header("HTTP-Referer", openrouter.http_referer.as_str())
        .header("X-Title", openrouter.title.as_str()))
}

fn transport_error(err: &reqwest::Error) -> ChatError {
    ChatError::Transport(format!("Failed to reach upstream: {err}"))
}
