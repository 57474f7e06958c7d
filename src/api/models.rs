use std::sync::Arc;

use axum::body::Body;
use axum::extract::State;
use axum::response::{IntoResponse, Response};
use http::header::CONTENT_TYPE;
use http::{HeaderValue, StatusCode};

use super::{transport_error, upstream_request};
use crate::error::{sanitize_upstream_error, ChatError};
use crate::state::AppState;

/// Relay the upstream model listing.
pub async fn handler(State(state): State<Arc<AppState>>) -> Response {
    match fetch_models(&state).await {
        Ok(body) => (
            StatusCode::OK,
            [(CONTENT_TYPE, HeaderValue::from_static("application/json"))],
            Body::from(body),
        )
            .into_response(),
        Err(err) => {
            tracing::warn!(error = %err, "model listing failed");
            err.into_response()
        }
    }
}

async fn fetch_models(state: &AppState) -> Result<bytes::Bytes, ChatError> {
    let response = upstream_request(state, http::Method::GET, "models")?
        .send()
        .await
        .map_err(|err| transport_error(&err))?;
    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|err| ChatError::Transport(format!("Failed to read response body: {err}")))?;
    if !status.is_success() {
        // any failure here is a gateway error; no model was selected
        return Err(ChatError::Upstream {
            status: status.as_u16(),
            message: sanitize_upstream_error(&body),
        });
    }
    Ok(body)
}
