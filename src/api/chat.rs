use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::header::{CACHE_CONTROL, CONNECTION, CONTENT_TYPE};
use http::{HeaderName, HeaderValue, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{transport_error, upstream_request};
use crate::error::ChatError;
use crate::state::AppState;

const X_ACCEL_BUFFERING: HeaderName = HeaderName::from_static("x-accel-buffering");

/// Body accepted by `POST /api/chat`.
#[derive(Debug, Deserialize)]
pub struct ChatProxyRequest {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub messages: Option<Value>,
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Serialize)]
struct UpstreamChatBody<'a> {
    model: &'a str,
    messages: &'a [Value],
    stream: bool,
}

/// Forward a chat completion to the upstream, streaming the SSE body back
/// untouched when `stream` is set.
pub async fn handler(State(state): State<Arc<AppState>>, body: bytes::Bytes) -> Response {
    match forward(&state, &body).await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(error = %err, "chat request failed");
            err.into_response()
        }
    }
}

async fn forward(state: &AppState, body: &[u8]) -> Result<Response, ChatError> {
    let request: ChatProxyRequest = serde_json::from_slice(body)
        .map_err(|err| ChatError::InvalidRequest(format!("Invalid JSON body: {err}")))?;
    let messages = match request.messages.as_ref().and_then(Value::as_array) {
        Some(messages) if !messages.is_empty() => messages,
        _ => return Err(ChatError::InvalidRequest("Messages are required".to_string())),
    };

    let builder = upstream_request(state, http::Method::POST, "chat/completions")?;
    let model = state.catalog.resolve(request.model.as_deref());
    let stream = request.stream.unwrap_or(false);
    tracing::info!(model, stream, messages = messages.len(), "forwarding chat request");

    let response = builder
        .json(&UpstreamChatBody {
            model,
            messages,
            stream,
        })
        .send()
        .await
        .map_err(|err| transport_error(&err))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.bytes().await.unwrap_or_default();
        return Err(ChatError::from_upstream(status.as_u16(), &body));
    }

    if stream {
        Ok(sse_passthrough(response))
    } else {
        json_passthrough(response).await
    }
}

fn sse_passthrough(response: reqwest::Response) -> Response {
    let mut passthrough = Response::new(Body::from_stream(response.bytes_stream()));
    let headers = passthrough.headers_mut();
    headers.insert(
        CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream; charset=utf-8"),
    );
    headers.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache, no-transform"));
    headers.insert(CONNECTION, HeaderValue::from_static("keep-alive"));
    headers.insert(X_ACCEL_BUFFERING, HeaderValue::from_static("no"));
    passthrough
}

async fn json_passthrough(response: reqwest::Response) -> Result<Response, ChatError> {
    let body = response
        .bytes()
        .await
        .map_err(|err| ChatError::Transport(format!("Failed to read response body: {err}")))?;
    Ok((
        StatusCode::OK,
        [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
        Body::from(body),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;

    async fn call(state: AppState, body: &str) -> (StatusCode, Value) {
        let response = handler(State(Arc::new(state)), bytes::Bytes::from(body.to_string())).await;
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    fn state_with_key(key: &str) -> AppState {
        let mut config = AppConfig::default();
        config.openrouter.api_key = key.to_string();
        AppState::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_empty_messages_rejected() {
        for body in [r#"{"messages":[]}"#, "{}", r#"{"messages":"hi"}"#] {
            let (status, json) = call(state_with_key("k"), body).await;
            assert_eq!(status, StatusCode::BAD_REQUEST);
            assert_eq!(json["error"], "Messages are required");
        }
    }

    #[tokio::test]
    async fn test_missing_key_is_server_error() {
        let (status, json) = call(
            state_with_key(""),
            r#"{"messages":[{"role":"user","content":"hi"}]}"#,
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            json["error"],
            "Server misconfiguration: OPENROUTER_API_KEY missing"
        );
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let (status, _) = call(state_with_key("k"), "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}
