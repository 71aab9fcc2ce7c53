//! # dailydraw Core Library
//!
//! Coordinates a recurring daily photo draw: a countdown anchored to an
//! absolute deadline, exactly-once milestone notifications before it, a
//! single remote "pick a winner" call when it elapses, and a fresh cycle
//! afterwards. The `dailydraw-cli` binary is a thin host over this crate.
//!
//! ## Architecture
//!
//! - **Draw Coordinator**: wall-clock state machine; the host calls `tick()`
//!   once per second (or lets `run()` do it)
//! - **Milestone Policy**: pure, edge-triggered countdown thresholds
//! - **Broadcaster**: injectable publish/subscribe hub with bounded history
//! - **Entry Loader**: fetch-with-backoff for the current entries
//! - **Storage**: SQLite kv for the deadline and history, TOML configuration
//!
//! ## Key Components
//!
//! - [`DrawCoordinator`]: core state machine
//! - [`Broadcaster`]: notification fan-out
//! - [`EntryLoader`]: entry snapshot with retry
//! - [`Database`]: durable deadline and history
//! - [`Config`]: application configuration

pub mod backend;
pub mod broadcast;
pub mod draw;
pub mod entries;
pub mod error;
pub mod milestone;
pub mod storage;

pub use backend::{BackendSettings, EntrySource, HttpBackend, WinnerSelector};
pub use broadcast::{Broadcaster, Notification, NotificationDraft, NotificationKind, Subscriber, Subscription};
pub use draw::{
    Clock, CoordinatorSettings, CycleStatus, DrawCoordinator, DrawOutcome, RetryTrigger, SystemClock, TickOutcome,
};
pub use entries::{Entry, EntryLoader, EntryStatus, LoaderSettings};
pub use error::{BackendError, ConfigError, CoreError, StorageError};
pub use milestone::Milestone;
pub use storage::{Config, Database, DeadlineStore, HistoryStore};
