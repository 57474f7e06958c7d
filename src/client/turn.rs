use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use futures_util::StreamExt;
use parking_lot::Mutex;

use super::{AbortSignal, ChatRequest, ChatTransport, WireMessage, WireRole};
use crate::config::AppConfig;
use crate::error::ChatError;
use crate::models::ModelCatalog;
use crate::reasoning::{MarkerSet, Segmenter};
use crate::session::{Message, SharedStore, StoreMutation, ThreadId};
use crate::stream::{parse_payload, DeltaText, SseLineDecoder, StreamPayload};
use crate::typing::{TypingThrottle, DEFAULT_TYPING_INTERVAL};

pub const MODEL_UNAVAILABLE_BANNER: &str = "Selected model is unavailable right now. Pick another.";

/// Client-side knobs that shape every turn.
#[derive(Debug, Clone)]
pub struct ClientSettings {
    pub markers: MarkerSet,
    pub catalog: ModelCatalog,
    pub typing_interval: Duration,
    pub wiki_prompt: String,
}

impl ClientSettings {
    #[must_use]
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            markers: config.marker_set(),
            catalog: ModelCatalog::new(&config.models),
            typing_interval: config.client.typing_interval(),
            wiki_prompt: config.client.wiki_prompt.clone(),
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        let config = AppConfig::default();
        Self {
            typing_interval: DEFAULT_TYPING_INTERVAL,
            ..Self::from_config(&config)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnPhase {
    Idle,
    Streaming,
    Done,
    Error,
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnOutcome {
    pub thread: ThreadId,
    pub phase: TurnPhase,
    /// The turn was stopped by its abort signal. Still a clean `Done`.
    pub aborted: bool,
    /// Notice to show above the conversation, if any.
    pub banner: Option<String>,
}

impl TurnOutcome {
    fn new(thread: ThreadId, phase: TurnPhase) -> Self {
        Self {
            thread,
            phase,
            aborted: false,
            banner: None,
        }
    }
}

enum TurnEnd {
    Completed,
    Aborted,
    Failed(ChatError),
}

/// Drives chat turns: sends the request, decodes the stream and writes the
/// assistant reply into the session store.
pub struct ChatClient<T> {
    transport: T,
    store: SharedStore,
    settings: ClientSettings,
    phase: Mutex<TurnPhase>,
    /// Throttle of the turn still typing, cancelled when the next turn starts.
    typing: Mutex<Option<Arc<TypingThrottle>>>,
}

impl<T: ChatTransport> ChatClient<T> {
    #[must_use]
    pub fn new(transport: T, store: SharedStore, settings: ClientSettings) -> Self {
        Self {
            transport,
            store,
            settings,
            phase: Mutex::new(TurnPhase::Idle),
            typing: Mutex::new(None),
        }
    }

    /// Phase of the most recent turn.
    #[must_use]
    pub fn phase(&self) -> TurnPhase {
        *self.phase.lock()
    }

    #[must_use]
    pub fn store(&self) -> &SharedStore {
        &self.store
    }

    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Send `text` on the currently active thread.
    pub async fn send(&self, model: &str, text: &str, wiki: bool, abort: AbortSignal) -> TurnOutcome {
        let thread = self.store.active_id();
        self.send_to(thread, model, text, wiki, abort).await
    }

    /// Send `text` on `thread`. Output keeps flowing into that thread even if
    /// another thread becomes active meanwhile.
    pub async fn send_to(
        &self,
        thread: ThreadId,
        model: &str,
        text: &str,
        wiki: bool,
        mut abort: AbortSignal,
    ) -> TurnOutcome {
        let Some(history) = self.store.messages(thread) else {
            tracing::warn!(%thread, "send on unknown thread");
            return TurnOutcome::new(thread, TurnPhase::Idle);
        };
        // the old throttle targets "last assistant message", which is about
        // to become the new placeholder
        let previous = self.typing.lock().take();
        if let Some(previous) = previous {
            tracing::debug!(%thread, "cancelling typing of the previous turn");
            previous.cancel();
        }
        self.store.update(|store| store.begin_turn(thread, text));
        let request = self.build_request(model, &history, text, wiki);

        let throttle = self.settings.catalog.uses_typing(model).then(|| {
            let store = self.store.clone();
            let throttle = Arc::new(TypingThrottle::spawn(
                self.settings.typing_interval,
                move |ch| {
                    store.apply(StoreMutation::AppendContent {
                        thread,
                        text: ch.to_string(),
                    });
                },
            ));
            *self.typing.lock() = Some(Arc::clone(&throttle));
            throttle
        });
        let mut sink = TurnSink {
            thread,
            store: self.store.clone(),
            segmenter: Segmenter::new(self.settings.markers.clone()),
            throttle,
        };

        *self.phase.lock() = TurnPhase::Streaming;
        tracing::info!(%thread, model, "turn streaming");
        let end = tokio::select! {
            biased;
            () = abort.aborted() => TurnEnd::Aborted,
            result = self.stream_into(&request, &mut sink) => match result {
                Ok(()) => TurnEnd::Completed,
                Err(err) => TurnEnd::Failed(err),
            },
        };
        let end = match end {
            TurnEnd::Completed => sink.settle(&mut abort).await,
            other => other,
        };
        if let Some(throttle) = &sink.throttle {
            let mut typing = self.typing.lock();
            if typing.as_ref().is_some_and(|current| Arc::ptr_eq(current, throttle)) {
                *typing = None;
            }
        }
        let outcome = sink.finish(end);
        *self.phase.lock() = outcome.phase;
        outcome
    }

    fn build_request(&self, model: &str, history: &[Message], text: &str, wiki: bool) -> ChatRequest {
        let mut messages = Vec::with_capacity(history.len() + 2);
        if wiki {
            messages.push(WireMessage::new(
                WireRole::System,
                self.settings.wiki_prompt.clone(),
            ));
        }
        messages.extend(
            history
                .iter()
                .filter(|message| !message.content.is_empty())
                .map(WireMessage::from),
        );
        messages.push(WireMessage::new(WireRole::User, text));
        ChatRequest {
            model: model.to_string(),
            messages,
            stream: true,
        }
    }

    async fn stream_into(&self, request: &ChatRequest, sink: &mut TurnSink) -> Result<(), ChatError> {
        let mut body = self.transport.open(request).await?;
        let mut lines = SseLineDecoder::new();
        let mut payloads = Vec::new();

        while let Some(chunk) = body.next().await {
            lines.feed_into(&chunk?, &mut payloads);
            for data in payloads.drain(..) {
                if sink.on_payload(&data).is_break() {
                    return Ok(());
                }
            }
        }
        if let Some(data) = lines.finish() {
            let _ = sink.on_payload(&data);
        }
        Ok(())
    }
}

/// Per-turn state: the segmenter and, for the thinking model, the throttle.
struct TurnSink {
    thread: ThreadId,
    store: SharedStore,
    segmenter: Segmenter,
    throttle: Option<Arc<TypingThrottle>>,
}

impl TurnSink {
    fn on_payload(&mut self, data: &str) -> ControlFlow<()> {
        match parse_payload(data) {
            Ok(StreamPayload::Done) => ControlFlow::Break(()),
            Ok(StreamPayload::Delta(delta)) => {
                self.on_delta(delta);
                ControlFlow::Continue(())
            }
            Err(err) => {
                tracing::debug!(thread = %self.thread, error = %err, "skipping malformed delta");
                ControlFlow::Continue(())
            }
        }
    }

    fn on_delta(&mut self, delta: DeltaText) {
        // tagged reasoning is already separated upstream; no marker scan
        if !delta.reasoning.is_empty() {
            self.store.apply(StoreMutation::AppendReasoning {
                thread: self.thread,
                text: delta.reasoning,
            });
        }
        if delta.content.is_empty() {
            return;
        }

        let store = &self.store;
        let thread = self.thread;
        let visible = self.segmenter.segment(&delta.content, |reasoning| {
            store.apply(StoreMutation::AppendReasoning {
                thread,
                text: reasoning.to_string(),
            });
        });
        if visible.is_empty() {
            return;
        }
        match &self.throttle {
            Some(throttle) => throttle.enqueue(&visible),
            None => {
                self.store.apply(StoreMutation::AppendContent {
                    thread,
                    text: visible,
                });
            }
        }
    }

    /// Let the throttle finish typing, unless the turn is aborted meanwhile.
    async fn settle(&self, abort: &mut AbortSignal) -> TurnEnd {
        let Some(throttle) = &self.throttle else {
            return TurnEnd::Completed;
        };
        tokio::select! {
            biased;
            () = abort.aborted() => TurnEnd::Aborted,
            () = throttle.drain() => TurnEnd::Completed,
        }
    }

    fn finish(self, end: TurnEnd) -> TurnOutcome {
        if let Some(throttle) = &self.throttle {
            throttle.cancel();
        }
        self.segmenter.finish();

        let mut outcome = TurnOutcome::new(self.thread, TurnPhase::Done);
        match end {
            TurnEnd::Completed => {
                tracing::info!(thread = %self.thread, "turn complete");
            }
            TurnEnd::Aborted => {
                tracing::info!(thread = %self.thread, "turn aborted");
                outcome.aborted = true;
            }
            TurnEnd::Failed(err) => {
                tracing::warn!(thread = %self.thread, error = %err, "turn failed");
                if matches!(err, ChatError::ModelUnavailable { .. }) {
                    outcome.banner = Some(MODEL_UNAVAILABLE_BANNER.to_string());
                }
                self.store.apply(StoreMutation::PushAssistant {
                    thread: self.thread,
                    text: format!("Error: {}", err.user_message()),
                });
                outcome.phase = TurnPhase::Error;
            }
        }
        outcome
    }
}
