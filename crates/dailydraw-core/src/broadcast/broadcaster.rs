//! In-process publish/subscribe hub.
//!
//! A `Broadcaster` is an explicitly constructed value; clone it to share it
//! between the coordinator, the entry loader and whatever UI observes it.
//! Every clone refers to the same history and subscriber set.
//!
//! ## Publish order
//!
//! ```text
//! enrich (id, created_at, read=false) -> prepend + truncate history
//!   -> deliver to each subscriber (failures isolated)
//!   -> forward to OS sink (failures logged)
//! ```
//!
//! Subscribers are invoked without the internal lock held, so a subscriber
//! may call back into the broadcaster (e.g. `mark_read`).

use std::collections::{HashSet, VecDeque};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use chrono::Utc;

use super::notification::{Notification, NotificationDraft};
use super::sink::{NotificationSink, Toast, TracingSink};

/// Default number of notifications kept in history.
pub const HISTORY_CAPACITY: usize = 50;

pub type SubscriberError = Box<dyn std::error::Error + Send + Sync>;

/// Observer of published notifications.
pub trait Subscriber: Send + Sync {
    fn on_notification(&self, notification: &Notification) -> Result<(), SubscriberError>;
}

impl<F> Subscriber for F
where
    F: Fn(&Notification) -> Result<(), SubscriberError> + Send + Sync,
{
    fn on_notification(&self, notification: &Notification) -> Result<(), SubscriberError> {
        self(notification)
    }
}

struct Registration {
    id: u64,
    subscriber: Arc<dyn Subscriber>,
}

struct State {
    history: VecDeque<Notification>,
    subscribers: Vec<Registration>,
    next_subscriber_id: u64,
}

struct Inner {
    state: Mutex<State>,
    sink: Box<dyn NotificationSink>,
    icon: Option<String>,
    capacity: usize,
    sequence: AtomicU64,
}

impl Inner {
    fn lock(&self) -> MutexGuard<'_, State> {
        // A poisoned lock only means a panic elsewhere; history is still coherent.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Handle returned by [`Broadcaster::subscribe`]. Calling
/// [`Subscription::unsubscribe`] removes exactly the registration it was
/// created for. Dropping the handle without calling it leaves the
/// subscriber registered.
#[must_use = "keep the handle to be able to unsubscribe"]
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    /// Remove the subscriber. Returns `false` if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(inner) = self.inner.upgrade() else {
            return false;
        };
        let mut state = inner.lock();
        let before = state.subscribers.len();
        state.subscribers.retain(|r| r.id != self.id);
        state.subscribers.len() != before
    }

    pub fn id(&self) -> u64 {
        self.id
    }
}

#[derive(Clone)]
pub struct Broadcaster {
    inner: Arc<Inner>,
}

impl Default for Broadcaster {
    fn default() -> Self {
        Self::new(Box::new(TracingSink))
    }
}

impl Broadcaster {
    pub fn new(sink: Box<dyn NotificationSink>) -> Self {
        Self::with_capacity(sink, HISTORY_CAPACITY)
    }

    pub fn with_capacity(sink: Box<dyn NotificationSink>, capacity: usize) -> Self {
        Self::with_icon(sink, capacity, None)
    }

    /// Same as [`Broadcaster::with_capacity`] but attaches an icon to every toast.
    pub fn with_icon(sink: Box<dyn NotificationSink>, capacity: usize, icon: Option<String>) -> Self {
        Self {
            inner: Arc::new(Inner {
                state: Mutex::new(State {
                    history: VecDeque::with_capacity(capacity),
                    subscribers: Vec::new(),
                    next_subscriber_id: 1,
                }),
                sink,
                icon,
                capacity: capacity.max(1),
                sequence: AtomicU64::new(0),
            }),
        }
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>) -> Subscription {
        let mut state = self.inner.lock();
        let id = state.next_subscriber_id;
        state.next_subscriber_id += 1;
        state.subscribers.push(Registration { id, subscriber });
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.inner.lock().subscribers.len()
    }

    // ── Publishing ───────────────────────────────────────────────────

    /// Publish a notification. Never fails; returns the enriched value.
    pub fn publish(&self, draft: NotificationDraft) -> Notification {
        let created_at = Utc::now();
        let seq = self.inner.sequence.fetch_add(1, Ordering::Relaxed) + 1;
        let notification = Notification {
            id: format!("{:013}-{:020}", created_at.timestamp_millis(), seq),
            kind: draft.kind,
            title: draft.title,
            message: draft.message,
            urgent: draft.urgent,
            created_at,
            read: false,
            payload: draft.payload,
        };

        let subscribers: Vec<Arc<dyn Subscriber>> = {
            let mut state = self.inner.lock();
            state.history.push_front(notification.clone());
            state.history.truncate(self.inner.capacity);
            state
                .subscribers
                .iter()
                .map(|r| Arc::clone(&r.subscriber))
                .collect()
        };

        self.deliver(&subscribers, &notification);
        self.forward_to_sink(&notification);
        notification
    }

    fn deliver(&self, subscribers: &[Arc<dyn Subscriber>], notification: &Notification) {
        // The same observer registered twice still sees each notification once.
        let mut seen: HashSet<*const ()> = HashSet::with_capacity(subscribers.len());
        for subscriber in subscribers {
            if !seen.insert(Arc::as_ptr(subscriber) as *const ()) {
                continue;
            }
            let outcome = catch_unwind(AssertUnwindSafe(|| subscriber.on_notification(notification)));
            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    tracing::warn!(id = %notification.id, "subscriber failed: {e}");
                }
                Err(_) => {
                    tracing::warn!(id = %notification.id, "subscriber panicked");
                }
            }
        }
    }

    fn forward_to_sink(&self, notification: &Notification) {
        let toast = Toast::from_notification(notification, self.inner.icon.as_deref());
        let outcome = catch_unwind(AssertUnwindSafe(|| self.inner.sink.show(&toast)));
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(e)) => tracing::warn!(tag = %toast.tag, "OS notification failed: {e}"),
            Err(_) => tracing::warn!(tag = %toast.tag, "OS notification sink panicked"),
        }
    }

    // ── History ──────────────────────────────────────────────────────

    /// Snapshot of the history, most recent first.
    pub fn history(&self) -> Vec<Notification> {
        self.inner.lock().history.iter().cloned().collect()
    }

    pub fn unread_count(&self) -> usize {
        self.inner.lock().history.iter().filter(|n| !n.read).count()
    }

    /// Returns `false` if no notification with that id is in history.
    pub fn mark_read(&self, id: &str) -> bool {
        let mut state = self.inner.lock();
        match state.history.iter_mut().find(|n| n.id == id) {
            Some(n) => {
                n.read = true;
                true
            }
            None => false,
        }
    }

    pub fn mark_all_read(&self) {
        let mut state = self.inner.lock();
        for n in state.history.iter_mut() {
            n.read = true;
        }
    }

    pub fn clear(&self) {
        self.inner.lock().history.clear();
    }

    /// Replace history with previously persisted items. Items are re-sorted
    /// most recent first and truncated to capacity.
    pub fn restore(&self, mut items: Vec<Notification>) {
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| b.id.cmp(&a.id)));
        items.truncate(self.inner.capacity);
        let mut state = self.inner.lock();
        state.history = items.into();
    }

    pub fn capacity(&self) -> usize {
        self.inner.capacity
    }
}
