//! Display helpers for stored messages.

use std::sync::LazyLock;

use regex_lite::Regex;

use crate::reasoning::{extract_reasoning, strip_markers, MarkerSet};
use crate::session::{Message, Role};

static IMAGE_URL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(https?://[^\s)]+\.(?:png|jpe?g|gif|webp))").unwrap_or_else(|err| {
        unreachable!("image url pattern is valid: {err}")
    })
});

static DATA_URI_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(data:image/(?:png|jpeg|webp);base64,[A-Za-z0-9+/=]+)").unwrap_or_else(
        |err| unreachable!("data uri pattern is valid: {err}"),
    )
});

/// A message prepared for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub role: Role,
    /// Content with every reasoning region removed.
    pub visible: String,
    /// Stored reasoning, or reasoning recovered from inline markers.
    pub reasoning: Option<String>,
    pub images: Vec<String>,
}

#[must_use]
pub fn render_message(message: &Message, markers: &MarkerSet) -> RenderedMessage {
    let visible = strip_markers(&message.content, markers);
    if message.role == Role::User {
        return RenderedMessage {
            role: message.role,
            visible,
            reasoning: None,
            images: Vec::new(),
        };
    }

    let stored = message.think();
    let reasoning = if stored.trim().is_empty() {
        extract_reasoning(&message.content, markers)
    } else {
        stored.to_string()
    };
    RenderedMessage {
        role: message.role,
        visible,
        reasoning: (!reasoning.trim().is_empty()).then_some(reasoning),
        images: extract_image_urls(&message.content),
    }
}

/// Image links and inline base64 images in `text`, de-duplicated in
/// first-seen order.
#[must_use]
pub fn extract_image_urls(text: &str) -> Vec<String> {
    let mut urls: Vec<String> = Vec::new();
    let found = IMAGE_URL_RE
        .find_iter(text)
        .chain(DATA_URI_RE.find_iter(text))
        .map(|m| m.as_str());
    for url in found {
        if !urls.iter().any(|seen| seen == url) {
            urls.push(url.to_string());
        }
    }
    urls
}
