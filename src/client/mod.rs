//! Streaming chat client: transport, per-turn decoding and store updates.

mod abort;
mod http;
mod turn;

pub use abort::{abort_pair, AbortHandle, AbortSignal};
pub use http::HttpChatTransport;
pub use turn::{ChatClient, ClientSettings, TurnOutcome, TurnPhase, MODEL_UNAVAILABLE_BANNER};

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::session::{Message, Role};

/// Raw response body chunks, in arrival order.
pub type ByteStream = BoxStream<'static, Result<Bytes, ChatError>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    System,
    User,
    Assistant,
    Tool,
}

impl From<Role> for WireRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => WireRole::User,
            Role::Assistant => WireRole::Assistant,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

impl WireMessage {
    #[must_use]
    pub fn new(role: WireRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

impl From<&Message> for WireMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role.into(), message.content.clone())
    }
}

/// Body of a chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<WireMessage>,
    #[serde(default)]
    pub stream: bool,
}

/// Opens a streaming chat completion.
///
/// A non-2xx response must be reported as an error from `open`, not as a
/// stream.
pub trait ChatTransport: Send + Sync {
    fn open<'a>(&'a self, request: &'a ChatRequest) -> BoxFuture<'a, Result<ByteStream, ChatError>>;
}

impl<T: ChatTransport + ?Sized> ChatTransport for &T {
    fn open<'a>(&'a self, request: &'a ChatRequest) -> BoxFuture<'a, Result<ByteStream, ChatError>> {
        (**self).open(request)
    }
}

impl<T: ChatTransport + ?Sized> ChatTransport for std::sync::Arc<T> {
    fn open<'a>(&'a self, request: &'a ChatRequest) -> BoxFuture<'a, Result<ByteStream, ChatError>> {
        (**self).open(request)
    }
}
