//! In-memory conversation threads. Nothing here outlives the process.

mod shared;

pub use shared::{MutationObserver, SharedStore};

use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_THREAD_TITLE: &str = "New chat";
pub const DEFAULT_MAX_THREADS: usize = 5;
pub const DEFAULT_TITLE_MAX_CHARS: usize = 40;

/// Stable thread identity, independent of the thread's position in the list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ThreadId(u64);

impl ThreadId {
    #[must_use]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "s-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub think: Option<String>,
}

impl Message {
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            think: None,
        }
    }

    /// Empty assistant message that streamed output is appended into.
    #[must_use]
    pub fn assistant_placeholder() -> Self {
        Self {
            role: Role::Assistant,
            content: String::new(),
            think: Some(String::new()),
        }
    }

    #[must_use]
    pub fn assistant_text(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            think: None,
        }
    }

    /// Accumulated reasoning, empty when none was stored.
    #[must_use]
    pub fn think(&self) -> &str {
        self.think.as_deref().unwrap_or("")
    }
}

#[derive(Debug, Clone)]
pub struct Thread {
    pub id: ThreadId,
    pub title: String,
    pub messages: Vec<Message>,
}

impl Thread {
    fn new(id: ThreadId) -> Self {
        Self {
            id,
            title: DEFAULT_THREAD_TITLE.to_string(),
            messages: Vec::new(),
        }
    }

    fn last_assistant_mut(&mut self) -> Option<&mut Message> {
        self.messages
            .last_mut()
            .filter(|message| message.role == Role::Assistant)
    }
}

/// A single change to the store, addressed by thread identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreMutation {
    /// Append visible text to the thread's trailing assistant message.
    AppendContent { thread: ThreadId, text: String },
    /// Append reasoning text to the thread's trailing assistant message.
    AppendReasoning { thread: ThreadId, text: String },
    /// Add a standalone assistant message (used for error text).
    PushAssistant { thread: ThreadId, text: String },
}

impl StoreMutation {
    #[must_use]
    pub fn thread(&self) -> ThreadId {
        match self {
            StoreMutation::AppendContent { thread, .. }
            | StoreMutation::AppendReasoning { thread, .. }
            | StoreMutation::PushAssistant { thread, .. } => *thread,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    threads: Vec<Thread>,
    active: usize,
    next_id: u64,
    max_threads: usize,
    title_max_chars: usize,
}

impl SessionStore {
    /// Create a store holding one empty thread.
    #[must_use]
    pub fn new(max_threads: usize) -> Self {
        let mut store = Self {
            threads: Vec::new(),
            active: 0,
            next_id: 1,
            max_threads: max_threads.max(1),
            title_max_chars: DEFAULT_TITLE_MAX_CHARS,
        };
        store.reset();
        store
    }

    #[must_use]
    pub fn with_title_max_chars(mut self, title_max_chars: usize) -> Self {
        self.title_max_chars = title_max_chars.max(1);
        self
    }

    fn allocate_id(&mut self) -> ThreadId {
        let id = ThreadId(self.next_id);
        self.next_id += 1;
        id
    }

    fn reset(&mut self) {
        let id = self.allocate_id();
        self.threads = vec![Thread::new(id)];
        self.active = 0;
    }

    #[must_use]
    pub fn threads(&self) -> &[Thread] {
        &self.threads
    }

    #[must_use]
    pub fn thread(&self, id: ThreadId) -> Option<&Thread> {
        self.threads.iter().find(|thread| thread.id == id)
    }

    /// Messages of a thread in send order.
    #[must_use]
    pub fn history(&self, id: ThreadId) -> Option<&[Message]> {
        self.thread(id).map(|thread| thread.messages.as_slice())
    }

    fn thread_mut(&mut self, id: ThreadId) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|thread| thread.id == id)
    }

    #[must_use]
    pub fn active_index(&self) -> usize {
        self.active
    }

    #[must_use]
    pub fn active_thread(&self) -> &Thread {
        &self.threads[self.active]
    }

    #[must_use]
    pub fn active_id(&self) -> ThreadId {
        self.active_thread().id
    }

    /// Start a new thread and make it active. The oldest thread is dropped
    /// when the store is full.
    pub fn new_thread(&mut self) -> ThreadId {
        let id = self.allocate_id();
        if self.threads.len() >= self.max_threads {
            let dropped = self.threads.remove(0);
            tracing::debug!(thread = %dropped.id, "thread limit reached, dropping oldest");
        }
        self.threads.push(Thread::new(id));
        self.active = self.threads.len() - 1;
        id
    }

    /// Delete a thread. Deleting the only thread leaves one fresh thread.
    pub fn delete_thread(&mut self, id: ThreadId) -> bool {
        let Some(index) = self.threads.iter().position(|thread| thread.id == id) else {
            return false;
        };
        self.threads.remove(index);
        if self.threads.is_empty() {
            self.reset();
        } else {
            self.active = self.active.min(self.threads.len() - 1);
        }
        true
    }

    /// Drop every thread and start over with one empty thread.
    pub fn clear_all(&mut self) {
        self.reset();
    }

    pub fn select(&mut self, id: ThreadId) -> bool {
        match self.threads.iter().position(|thread| thread.id == id) {
            Some(index) => {
                self.active = index;
                true
            }
            None => false,
        }
    }

    pub fn select_index(&mut self, index: usize) -> bool {
        if index < self.threads.len() {
            self.active = index;
            true
        } else {
            false
        }
    }

    /// Record a user turn: the user message followed by an empty assistant
    /// message that the stream writes into. The first send titles the thread.
    pub fn begin_turn(&mut self, id: ThreadId, text: &str) -> bool {
        let title_max_chars = self.title_max_chars;
        let Some(thread) = self.thread_mut(id) else {
            return false;
        };
        if thread.title == DEFAULT_THREAD_TITLE && !text.is_empty() {
            thread.title = truncate_title(text, title_max_chars);
        }
        thread.messages.push(Message::user(text));
        thread.messages.push(Message::assistant_placeholder());
        true
    }

    /// Apply a mutation. Returns `false` when it had no target.
    pub fn apply(&mut self, mutation: &StoreMutation) -> bool {
        let Some(thread) = self.thread_mut(mutation.thread()) else {
            return false;
        };
        match mutation {
            StoreMutation::AppendContent { text, .. } => match thread.last_assistant_mut() {
                Some(message) => {
                    message.content.push_str(text);
                    true
                }
                None => false,
            },
            StoreMutation::AppendReasoning { text, .. } => match thread.last_assistant_mut() {
                Some(message) => {
                    message.think.get_or_insert_with(String::new).push_str(text);
                    true
                }
                None => false,
            },
            StoreMutation::PushAssistant { text, .. } => {
                thread.messages.push(Message::assistant_text(text.clone()));
                true
            }
        }
    }

    /// Short preview of a thread: its last user message, truncated.
    #[must_use]
    pub fn preview(&self, id: ThreadId, max_chars: usize) -> String {
        self.thread(id)
            .and_then(|thread| {
                thread
                    .messages
                    .iter()
                    .rev()
                    .find(|message| message.role == Role::User)
            })
            .map(|message| message.content.chars().take(max_chars).collect::<String>())
            .filter(|preview| !preview.is_empty())
            .unwrap_or_else(|| "No messages".to_string())
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_THREADS)
    }
}

fn truncate_title(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        let mut title: String = text.chars().take(max_chars).collect();
        title.push('…');
        title
    } else {
        text.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_store_has_one_empty_thread() {
        let store = SessionStore::default();
        assert_eq!(store.threads().len(), 1);
        assert_eq!(store.active_thread().title, DEFAULT_THREAD_TITLE);
        assert_eq!(store.active_id().to_string(), "s-1");
    }

    #[test]
    fn test_begin_turn_titles_thread_once() {
        let mut store = SessionStore::default();
        let id = store.active_id();
        assert!(store.begin_turn(id, "Hello"));
        assert_eq!(store.thread(id).unwrap().title, "Hello");
        store.begin_turn(id, "Second question");
        assert_eq!(store.thread(id).unwrap().title, "Hello");
        assert_eq!(store.thread(id).unwrap().messages.len(), 4);
    }

    #[test]
    fn test_long_title_is_truncated_with_ellipsis() {
        let mut store = SessionStore::default();
        let id = store.active_id();
        let text = "x".repeat(50);
        store.begin_turn(id, &text);
        let title = &store.thread(id).unwrap().title;
        assert_eq!(title.chars().count(), 41);
        assert!(title.ends_with('…'));
    }

    #[test]
    fn test_append_targets_trailing_assistant_only() {
        let mut store = SessionStore::default();
        let id = store.active_id();
        assert!(!store.apply(&StoreMutation::AppendContent {
            thread: id,
            text: "orphan".into(),
        }));

        store.begin_turn(id, "q");
        assert!(store.apply(&StoreMutation::AppendContent {
            thread: id,
            text: "an".into(),
        }));
        assert!(store.apply(&StoreMutation::AppendContent {
            thread: id,
            text: "swer".into(),
        }));
        assert!(store.apply(&StoreMutation::AppendReasoning {
            thread: id,
            text: "hmm".into(),
        }));
        let last = store.thread(id).unwrap().messages.last().unwrap();
        assert_eq!(last.content, "answer");
        assert_eq!(last.think(), "hmm");
    }

    #[test]
    fn test_thread_cap_drops_oldest() {
        let mut store = SessionStore::new(3);
        let first = store.active_id();
        store.new_thread();
        store.new_thread();
        assert_eq!(store.threads().len(), 3);
        let newest = store.new_thread();
        assert_eq!(store.threads().len(), 3);
        assert!(store.thread(first).is_none());
        assert_eq!(store.active_id(), newest);
    }

    #[test]
    fn test_delete_clamps_active_and_resets_when_empty() {
        let mut store = SessionStore::default();
        let a = store.active_id();
        let b = store.new_thread();
        assert!(store.delete_thread(b));
        assert_eq!(store.active_id(), a);

        assert!(store.delete_thread(a));
        assert_eq!(store.threads().len(), 1);
        assert_ne!(store.active_id(), a);
        assert!(!store.delete_thread(a));
    }

    #[test]
    fn test_mutation_for_deleted_thread_is_ignored() {
        let mut store = SessionStore::default();
        let a = store.active_id();
        store.begin_turn(a, "q");
        store.new_thread();
        store.delete_thread(a);
        assert!(!store.apply(&StoreMutation::AppendContent {
            thread: a,
            text: "late".into(),
        }));
    }

    #[test]
    fn test_preview() {
        let mut store = SessionStore::default();
        let id = store.active_id();
        assert_eq!(store.preview(id, 10), "No messages");
        store.begin_turn(id, "What is the speed of light?");
        assert_eq!(store.preview(id, 7), "What is");
    }
}
