//! Provider delta payloads carried in SSE `data:` lines.

use serde::Deserialize;

pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Deserialize)]
struct ChatCompletionChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
    #[serde(default)]
    message: Option<ChunkMessage>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Text carried by one delta: inline content (may contain reasoning markers)
/// and a provider-tagged reasoning field (already separated upstream).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeltaText {
    pub content: String,
    pub reasoning: String,
}

impl DeltaText {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.is_empty() && self.reasoning.is_empty()
    }
}

/// One decoded `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamPayload {
    Done,
    Delta(DeltaText),
}

/// A `data:` payload that was neither the sentinel nor valid chunk JSON.
#[derive(Debug, thiserror::Error)]
#[error("malformed delta payload: {0}")]
pub struct MalformedPayload(#[from] serde_json::Error);

/// Decode a `data:` payload.
///
/// Reads `choices[0]`: `delta.reasoning_content` (else `delta.reasoning`) as
/// tagged reasoning, `delta.content` (else `message.content`) as content.
///
/// # Errors
///
/// Returns [`MalformedPayload`] when the payload is not JSON of the expected
/// shape. Callers skip such lines.
pub fn parse_payload(data: &str) -> Result<StreamPayload, MalformedPayload> {
    if data == DONE_SENTINEL {
        return Ok(StreamPayload::Done);
    }
    let chunk: ChatCompletionChunk = serde_json::from_str(data)?;
    let Some(first) = chunk.choices.into_iter().next() else {
        return Ok(StreamPayload::Delta(DeltaText::default()));
    };

    let (delta_content, reasoning) = match first.delta {
        Some(delta) => (
            delta.content,
            delta
                .reasoning_content
                .filter(|text| !text.is_empty())
                .or(delta.reasoning),
        ),
        None => (None, None),
    };
    let content = delta_content
        .or_else(|| first.message.and_then(|message| message.content))
        .unwrap_or_default();

    Ok(StreamPayload::Delta(DeltaText {
        content,
        reasoning: reasoning.unwrap_or_default(),
    }))
}
