//! Character-at-a-time re-emission of visible text for the thinking model.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

pub const DEFAULT_TYPING_INTERVAL: Duration = Duration::from_millis(8);

/// Pending characters waiting to be typed out.
#[derive(Debug, Default)]
pub struct TypingQueue {
    pending: VecDeque<char>,
}

impl TypingQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&mut self, text: &str) {
        self.pending.extend(text.chars());
    }

    /// Take the next character for one tick.
    pub fn tick(&mut self) -> Option<char> {
        self.pending.pop_front()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }
}

struct Shared {
    queue: Mutex<TypingQueue>,
    /// Characters taken off the queue but not yet handed to the sink.
    in_flight: AtomicUsize,
    cancelled: AtomicBool,
    wake: Notify,
    idle: Notify,
}

impl Shared {
    fn is_idle(&self) -> bool {
        // pops bump `in_flight` under the queue lock, so reading both while
        // holding it sees every character either queued or in flight
        let queue = self.queue.lock();
        queue.is_empty() && self.in_flight.load(Ordering::Acquire) == 0
    }
}

/// Background ticker draining a [`TypingQueue`] into a sink, one character per
/// interval.
///
/// The ticker holds no timer while the queue is empty and resumes on the next
/// [`enqueue`](Self::enqueue). Dropping the throttle cancels the task.
pub struct TypingThrottle {
    shared: Arc<Shared>,
    task: JoinHandle<()>,
}

impl TypingThrottle {
    /// Spawn the ticker on the current tokio runtime.
    pub fn spawn<F>(period: Duration, sink: F) -> Self
    where
        F: FnMut(char) + Send + 'static,
    {
        let shared = Arc::new(Shared {
            queue: Mutex::new(TypingQueue::new()),
            in_flight: AtomicUsize::new(0),
            cancelled: AtomicBool::new(false),
            wake: Notify::new(),
            idle: Notify::new(),
        });
        let task = tokio::spawn(run_ticker(Arc::clone(&shared), period, sink));
        Self { shared, task }
    }

    /// Queue `text` for typing. Ignored once the throttle is cancelled.
    pub fn enqueue(&self, text: &str) {
        if text.is_empty() {
            return;
        }
        {
            let mut queue = self.shared.queue.lock();
            if self.is_cancelled() {
                return;
            }
            queue.enqueue(text);
        }
        self.shared.wake.notify_one();
    }

    #[must_use]
    pub fn pending(&self) -> usize {
        self.shared.queue.lock().len()
    }

    /// Wait until every queued character has reached the sink.
    pub async fn drain(&self) {
        loop {
            let idle = self.shared.idle.notified();
            tokio::pin!(idle);
            idle.as_mut().enable();
            if self.is_cancelled() || self.shared.is_idle() || self.task.is_finished() {
                return;
            }
            idle.await;
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// Stop ticking and drop whatever is still queued. Pending
    /// [`drain`](Self::drain) calls return.
    pub fn cancel(&self) {
        self.task.abort();
        {
            let mut queue = self.shared.queue.lock();
            self.shared.cancelled.store(true, Ordering::Release);
            queue.clear();
        }
        self.shared.idle.notify_waiters();
    }
}

impl Drop for TypingThrottle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn run_ticker<F>(shared: Arc<Shared>, period: Duration, mut sink: F)
where
    F: FnMut(char),
{
    loop {
        loop {
            let wake = shared.wake.notified();
            let empty = shared.queue.lock().is_empty();
            if !empty {
                break;
            }
            wake.await;
        }

        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let next = {
                let mut queue = shared.queue.lock();
                let next = queue.tick();
                if next.is_some() {
                    shared.in_flight.fetch_add(1, Ordering::AcqRel);
                }
                next
            };
            let Some(ch) = next else {
                break;
            };
            sink(ch);
            shared.in_flight.fetch_sub(1, Ordering::AcqRel);
            if shared.is_idle() {
                shared.idle.notify_waiters();
            }
        }
        tracing::trace!("typing queue empty, ticker suspended");
    }
}
