pub mod delta;
pub mod sse;

pub use delta::{parse_payload, DeltaText, MalformedPayload, StreamPayload, DONE_SENTINEL};
pub use sse::{SseLineDecoder, Utf8Decoder};

/// Build an SSE frame carrying `data`, terminated by a blank line.
#[must_use]
pub fn encode_data_frame(data: &str) -> String {
    let mut frame = String::with_capacity(data.len() + 8);
    frame.push_str("data: ");
    frame.push_str(data);
    frame.push_str("\n\n");
    frame
}

/// Build an OpenAI-style content delta frame.
#[must_use]
pub fn encode_content_delta(content: &str) -> String {
    let payload = serde_json::json!({
        "choices": [{ "index": 0, "delta": { "content": content } }]
    });
    encode_data_frame(&payload.to_string())
}

/// Build an OpenAI-style delta frame carrying a tagged reasoning field.
#[must_use]
pub fn encode_reasoning_delta(reasoning: &str) -> String {
    let payload = serde_json::json!({
        "choices": [{ "index": 0, "delta": { "reasoning": reasoning } }]
    });
    encode_data_frame(&payload.to_string())
}
