//! Fetch-with-retry for the current entry snapshot.
//!
//! A failed fetch is retried after `backoff_base * attempt`. When
//! `max_attempts` is exhausted the loader returns an empty snapshot, records
//! a sticky error and publishes exactly one Error notification. While the
//! error is held no further fetches are made; [`EntryLoader::retry`] resets
//! the attempt counter and clears it.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;

use super::model::Entry;
use crate::backend::EntrySource;
use crate::broadcast::{Broadcaster, NotificationDraft, NotificationKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoaderSettings {
    pub max_attempts: u32,
    pub backoff_base: Duration,
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            backoff_base: Duration::from_millis(1000),
        }
    }
}

/// Sticky failure recorded after retries are exhausted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LoadFailure {
    pub message: String,
    pub attempts: u32,
}

pub struct EntryLoader {
    source: Arc<dyn EntrySource>,
    settings: LoaderSettings,
    broadcaster: Broadcaster,
    cancel: CancellationToken,
    attempts: u32,
    failure: Option<LoadFailure>,
}

impl EntryLoader {
    pub fn new(source: Arc<dyn EntrySource>, settings: LoaderSettings, broadcaster: Broadcaster) -> Self {
        Self {
            source,
            settings,
            broadcaster,
            cancel: CancellationToken::new(),
            attempts: 0,
            failure: None,
        }
    }

    /// Abandon in-flight fetches and backoff sleeps when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn failure(&self) -> Option<&LoadFailure> {
        self.failure.as_ref()
    }

    /// Attempts made by the most recent load.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Fetch the current entries, retrying with linear-multiplied backoff.
    ///
    /// Returns an empty list while a sticky failure is held or after the
    /// token is cancelled.
    pub async fn load(&mut self) -> Vec<Entry> {
        if let Some(failure) = &self.failure {
            tracing::debug!(attempts = failure.attempts, "entry loader holding error; skipping fetch");
            return Vec::new();
        }

        let max_attempts = self.settings.max_attempts.max(1);
        self.attempts = 0;
        loop {
            self.attempts += 1;
            let fetched = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Vec::new(),
                r = self.source.fetch_entries() => r,
            };
            match fetched {
                Ok(entries) => {
                    tracing::debug!(count = entries.len(), attempt = self.attempts, "entries loaded");
                    return entries;
                }
                Err(e) if self.attempts >= max_attempts => {
                    tracing::error!(attempts = self.attempts, "entry load failed, giving up: {e}");
                    self.fail(e.to_string());
                    return Vec::new();
                }
                Err(e) => {
                    let delay = self.settings.backoff_base * self.attempts;
                    tracing::warn!(
                        attempt = self.attempts,
                        delay_ms = delay.as_millis() as u64,
                        "entry load failed, retrying: {e}"
                    );
                    tokio::select! {
                        biased;
                        _ = self.cancel.cancelled() => return Vec::new(),
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// Manual retry: clear the sticky failure and load again.
    pub async fn retry(&mut self) -> Vec<Entry> {
        self.attempts = 0;
        self.failure = None;
        self.load().await
    }

    fn fail(&mut self, message: String) {
        let failure = LoadFailure {
            message,
            attempts: self.attempts,
        };
        self.broadcaster.publish(
            NotificationDraft::new(
                NotificationKind::Error,
                "Could not load photos",
                format!(
                    "Loading entries failed after {} attempts: {}",
                    failure.attempts, failure.message
                ),
            )
            .with_payload(serde_json::json!({ "source": "entries", "attempts": failure.attempts })),
        );
        self.failure = Some(failure);
    }
}
