//! Shared fakes for coordinator integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use dailydraw_core::broadcast::{NoopSink, SubscriberError};
use dailydraw_core::draw::ManualClock;
use dailydraw_core::{
    BackendError, Broadcaster, CoordinatorSettings, DeadlineStore, DrawCoordinator, Entry, EntryLoader,
    EntrySource, EntryStatus, LoaderSettings, Notification, NotificationKind, StorageError, Subscriber,
    WinnerSelector,
};
use tokio_util::sync::CancellationToken;

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 1, 20, 0, 0).unwrap()
}

pub fn entry(id: &str) -> Entry {
    Entry {
        id: id.to_string(),
        image_ref: format!("uploads/{id}.jpg"),
        description: format!("Sunset #{id}"),
        owner_ref: format!("user-{id}"),
        uploaded_at: t0() - Duration::hours(2),
        status: EntryStatus::Pending,
    }
}

/// In-memory deadline store that stays inspectable after being boxed.
#[derive(Clone, Default)]
pub struct SharedStore {
    deadline: Arc<Mutex<Option<DateTime<Utc>>>>,
    writes: Arc<AtomicUsize>,
}

impl SharedStore {
    pub fn with_deadline(deadline: DateTime<Utc>) -> Self {
        let store = Self::default();
        *store.deadline.lock().unwrap() = Some(deadline);
        store
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        *self.deadline.lock().unwrap()
    }

    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }
}

impl DeadlineStore for SharedStore {
    fn load_deadline(&self) -> Result<Option<DateTime<Utc>>, StorageError> {
        Ok(self.deadline())
    }

    fn save_deadline(&self, deadline: DateTime<Utc>) -> Result<(), StorageError> {
        *self.deadline.lock().unwrap() = Some(deadline);
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Always returns the same entries.
pub struct FixedSource(pub Vec<Entry>);

#[async_trait]
impl EntrySource for FixedSource {
    async fn fetch_entries(&self) -> Result<Vec<Entry>, BackendError> {
        Ok(self.0.clone())
    }
}

/// Replays canned fetch results, then keeps answering with `then`
/// (or failing, when `then` is `None`). Counts fetches.
pub struct ScriptedSource {
    replies: Mutex<VecDeque<Result<Vec<Entry>, BackendError>>>,
    then: Option<Vec<Entry>>,
    calls: AtomicUsize,
}

impl ScriptedSource {
    pub fn new(replies: Vec<Result<Vec<Entry>, BackendError>>, then: Option<Vec<Entry>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            then,
            calls: AtomicUsize::new(0),
        })
    }

    /// A backend that never answers successfully.
    pub fn failing() -> Arc<Self> {
        Self::new(vec![], None)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EntrySource for ScriptedSource {
    async fn fetch_entries(&self) -> Result<Vec<Entry>, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(reply) = self.replies.lock().unwrap().pop_front() {
            return reply;
        }
        match &self.then {
            Some(entries) => Ok(entries.clone()),
            None => Err(BackendError::Status {
                status: 503,
                body: "entries unavailable".into(),
            }),
        }
    }
}

pub fn unavailable() -> BackendError {
    BackendError::Transport("connection refused".into())
}

/// Replays canned draw results and counts invocations.
pub struct ScriptedSelector {
    replies: Mutex<VecDeque<Result<Entry, BackendError>>>,
    calls: AtomicUsize,
}

impl ScriptedSelector {
    pub fn new(replies: Vec<Result<Entry, BackendError>>) -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(replies.into()),
            calls: AtomicUsize::new(0),
        })
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WinnerSelector for ScriptedSelector {
    async fn trigger_draw(&self) -> Result<Entry, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::Rejected("no scripted reply".into())))
    }
}

/// Never answers; used to observe teardown during a draw.
pub struct HangingSelector;

#[async_trait]
impl WinnerSelector for HangingSelector {
    async fn trigger_draw(&self) -> Result<Entry, BackendError> {
        std::future::pending().await
    }
}

/// Records every delivered notification in order.
#[derive(Default)]
pub struct Recorder {
    seen: Mutex<Vec<Notification>>,
}

impl Recorder {
    pub fn kinds(&self) -> Vec<NotificationKind> {
        self.seen.lock().unwrap().iter().map(|n| n.kind).collect()
    }

    pub fn all(&self) -> Vec<Notification> {
        self.seen.lock().unwrap().clone()
    }
}

impl Subscriber for Recorder {
    fn on_notification(&self, notification: &Notification) -> Result<(), SubscriberError> {
        self.seen.lock().unwrap().push(notification.clone());
        Ok(())
    }
}

pub struct Harness {
    pub clock: ManualClock,
    pub store: SharedStore,
    pub broadcaster: Broadcaster,
    pub recorder: Arc<Recorder>,
    pub cancel: CancellationToken,
    pub coordinator: DrawCoordinator,
}

impl Harness {
    pub fn build(
        settings: CoordinatorSettings,
        store: SharedStore,
        entries: Vec<Entry>,
        selector: Arc<dyn WinnerSelector>,
    ) -> Self {
        Self::with_source(settings, store, Arc::new(FixedSource(entries)), selector)
    }

    pub fn with_source(
        settings: CoordinatorSettings,
        store: SharedStore,
        source: Arc<dyn EntrySource>,
        selector: Arc<dyn WinnerSelector>,
    ) -> Self {
        let clock = ManualClock::new(t0());
        let broadcaster = Broadcaster::new(Box::new(NoopSink));
        let recorder = Arc::new(Recorder::default());
        let _subscription = broadcaster.subscribe(recorder.clone());
        let loader = EntryLoader::new(source, LoaderSettings::default(), broadcaster.clone());
        let cancel = CancellationToken::new();
        let coordinator = DrawCoordinator::new(
            settings,
            Arc::new(clock.clone()),
            Box::new(store.clone()),
            loader,
            selector,
            broadcaster.clone(),
            cancel.clone(),
        )
        .expect("coordinator");
        Self {
            clock,
            store,
            broadcaster,
            recorder,
            cancel,
            coordinator,
        }
    }

    /// Advance the clock one second and tick.
    pub async fn step(&mut self) -> dailydraw_core::TickOutcome {
        self.clock.advance(Duration::seconds(1));
        self.coordinator.tick().await.expect("tick")
    }
}

pub fn no_cooldown() -> CoordinatorSettings {
    CoordinatorSettings {
        cycle_length: Duration::hours(24),
        cooldown: Duration::zero(),
    }
}
