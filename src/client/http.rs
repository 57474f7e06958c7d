use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::StreamExt;

use super::{ByteStream, ChatRequest, ChatTransport};
use crate::error::ChatError;

/// Streams chat completions over HTTP from an OpenAI-compatible endpoint,
/// normally the proxy's `/api/chat`.
pub struct HttpChatTransport {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
}

impl HttpChatTransport {
    /// # Errors
    ///
    /// Returns [`ChatError::Transport`] when the HTTP client cannot be built.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Result<Self, ChatError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .tcp_nodelay(true)
            .build()
            .map_err(|err| ChatError::Transport(format!("Failed to build HTTP client: {err}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    #[must_use]
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn open_stream(&self, request: &ChatRequest) -> Result<ByteStream, ChatError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header(http::header::ACCEPT, "text/event-stream")
            .json(request);
        if let Some(key) = self.api_key.as_deref().filter(|key| !key.is_empty()) {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|err| ChatError::Transport(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), endpoint = %self.endpoint, "chat request rejected");
            return Err(ChatError::from_upstream(status.as_u16(), &body));
        }

        Ok(response
            .bytes_stream()
            .map(|chunk| chunk.map_err(|err| ChatError::Transport(err.to_string())))
            .boxed())
    }
}

impl ChatTransport for HttpChatTransport {
    fn open<'a>(&'a self, request: &'a ChatRequest) -> BoxFuture<'a, Result<ByteStream, ChatError>> {
        Box::pin(self.open_stream(request))
    }
}
