//! Remote collaborators of the draw coordinator.
//!
//! The backend stores entries and performs the randomized winner selection;
//! this crate only sees it through the two traits below. `HttpBackend`
//! implements both over reqwest.

mod http;

pub use http::{BackendSettings, HttpBackend};

use async_trait::async_trait;

use crate::entries::Entry;
use crate::error::BackendError;

/// Source of the entries eligible for the current cycle.
#[async_trait]
pub trait EntrySource: Send + Sync {
    async fn fetch_entries(&self) -> Result<Vec<Entry>, BackendError>;
}

/// Performs the draw. Called at most once per cycle and never retried.
#[async_trait]
pub trait WinnerSelector: Send + Sync {
    /// Returns the winning entry.
    async fn trigger_draw(&self) -> Result<Entry, BackendError>;
}
