use std::time::{SystemTime, UNIX_EPOCH};

use axum::response::{IntoResponse, Json, Response};
use http::header::{
    ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS, ACCESS_CONTROL_ALLOW_ORIGIN, ALLOW,
};
use http::{HeaderValue, Method};
use serde_json::{json, Value};

const ALLOWED_METHODS: &str = "GET, POST, OPTIONS";

/// Liveness check. `POST` echoes its JSON body back, or `{}` when the body is
/// not JSON.
#[must_use]
pub fn handler(method: &Method, body: &[u8]) -> Json<Value> {
    if method == Method::POST {
        let echoed: Value = serde_json::from_slice(body).unwrap_or_else(|_| json!({}));
        return Json(json!({
            "message": "Test POST working",
            "timestamp": unix_now_secs(),
            "method": "POST",
            "body": echoed,
        }));
    }
    Json(json!({
        "message": "Test API working",
        "timestamp": unix_now_secs(),
        "method": "GET",
    }))
}

#[must_use]
pub fn options_handler() -> Response {
    (
        [
            (ALLOW, HeaderValue::from_static(ALLOWED_METHODS)),
            (ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*")),
            (ACCESS_CONTROL_ALLOW_METHODS, HeaderValue::from_static(ALLOWED_METHODS)),
            (ACCESS_CONTROL_ALLOW_HEADERS, HeaderValue::from_static("Content-Type")),
        ],
        Json(json!({ "message": "Test OPTIONS working" })),
    )
        .into_response()
}

fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_reports_method() {
        let Json(body) = handler(&Method::GET, b"");
        assert_eq!(body["method"], "GET");
        assert!(body["timestamp"].as_u64().unwrap() > 0);
        assert!(body.get("body").is_none());
    }

    #[test]
    fn test_post_echoes_body() {
        let Json(body) = handler(&Method::POST, br#"{"ping":1}"#);
        assert_eq!(body["method"], "POST");
        assert_eq!(body["body"]["ping"], 1);

        let Json(body) = handler(&Method::POST, b"not json");
        assert_eq!(body["body"], json!({}));
    }
}
