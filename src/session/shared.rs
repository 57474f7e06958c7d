use std::sync::Arc;

use parking_lot::Mutex;

use super::{Message, SessionStore, StoreMutation, ThreadId};

/// Callback invoked after every applied mutation, e.g. to re-render.
pub type MutationObserver = Arc<dyn Fn(&StoreMutation) + Send + Sync>;

/// Cloneable handle to a [`SessionStore`].
///
/// Each mutation is one locked read-modify-write, so deltas from a stream land
/// in arrival order without lost updates.
#[derive(Clone)]
pub struct SharedStore {
    inner: Arc<Mutex<SessionStore>>,
    observer: Option<MutationObserver>,
}

impl SharedStore {
    #[must_use]
    pub fn new(store: SessionStore) -> Self {
        Self {
            inner: Arc::new(Mutex::new(store)),
            observer: None,
        }
    }

    #[must_use]
    pub fn with_observer(mut self, observer: MutationObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    /// Apply a mutation and notify the observer if it landed.
    pub fn apply(&self, mutation: StoreMutation) -> bool {
        let applied = self.inner.lock().apply(&mutation);
        if applied {
            if let Some(observer) = &self.observer {
                observer(&mutation);
            }
        } else {
            tracing::debug!(thread = %mutation.thread(), "mutation dropped: no target message");
        }
        applied
    }

    pub fn read<R>(&self, f: impl FnOnce(&SessionStore) -> R) -> R {
        f(&self.inner.lock())
    }

    pub fn update<R>(&self, f: impl FnOnce(&mut SessionStore) -> R) -> R {
        f(&mut self.inner.lock())
    }

    #[must_use]
    pub fn active_id(&self) -> ThreadId {
        self.read(SessionStore::active_id)
    }

    /// Snapshot of a thread's messages.
    #[must_use]
    pub fn messages(&self, id: ThreadId) -> Option<Vec<Message>> {
        self.read(|store| store.history(id).map(<[Message]>::to_vec))
    }

    /// The trailing message of a thread, if any.
    #[must_use]
    pub fn last_message(&self, id: ThreadId) -> Option<Message> {
        self.read(|store| {
            store
                .thread(id)
                .and_then(|thread| thread.messages.last().cloned())
        })
    }
}

impl Default for SharedStore {
    fn default() -> Self {
        Self::new(SessionStore::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observer_sees_applied_mutations_only() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen_by_observer = Arc::clone(&seen);
        let store = SharedStore::default().with_observer(Arc::new(move |mutation| {
            seen_by_observer.lock().push(mutation.clone());
        }));
        let id = store.active_id();

        assert!(!store.apply(StoreMutation::AppendContent {
            thread: id,
            text: "dropped".into(),
        }));
        store.update(|s| s.begin_turn(id, "hi"));
        assert!(store.apply(StoreMutation::AppendContent {
            thread: id,
            text: "kept".into(),
        }));

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(store.last_message(id).unwrap().content, "kept");
    }
}
