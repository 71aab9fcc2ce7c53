//! Draw coordinator.
//!
//! A wall-clock state machine anchored to an absolute deadline. The host
//! drives it by calling `tick()` once per second, or hands control to
//! `run()` which does exactly that until the cancellation token fires.
//! While `run()` is active, a [`RetryTrigger`] lets the host request a manual
//! entry reload after the loader has given up.
//!
//! ## State Transitions
//!
//! ```text
//! Counting --(remaining <= 0)--> Drawing --> Cooldown --(cooldown elapsed)--> Counting
//!                                   |
//!                                   +--(no entries)--> Counting
//! ```
//!
//! ## Usage
//!
//! ```ignore
//! let mut coordinator = DrawCoordinator::new(settings, clock, store, loader, selector, broadcaster, cancel)?;
//! coordinator.run(Duration::from_secs(1)).await?;
//! ```

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use tokio::sync::Notify;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use super::clock::Clock;
use super::cycle::{format_remaining, CycleStatus, DrawCycle, Establishment};
use crate::backend::WinnerSelector;
use crate::broadcast::{Broadcaster, NotificationDraft, NotificationKind};
use crate::entries::{apply_winner, Entry, EntryLoader, EntryStatus, LoadFailure};
use crate::error::{CoreError, StorageError};
use crate::milestone::{self, Milestone};
use crate::storage::DeadlineStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoordinatorSettings {
    /// Length of a freshly started cycle.
    pub cycle_length: Duration,
    /// How long a resolved draw stays on display before the next cycle.
    pub cooldown: Duration,
}

impl Default for CoordinatorSettings {
    fn default() -> Self {
        Self {
            cycle_length: Duration::hours(24),
            cooldown: Duration::seconds(5),
        }
    }
}

/// Result of resolving a `Drawing` transition.
#[derive(Debug, Clone, PartialEq)]
pub enum DrawOutcome {
    Winner(Entry),
    /// Nothing to draw from; the collaborator was not called.
    NoEntries,
    Failed(String),
}

/// What a single tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Counting { remaining_secs: i64 },
    Milestone { milestone: Milestone, remaining_secs: i64 },
    Drawn(DrawOutcome),
    CoolingDown { until: DateTime<Utc> },
    CycleStarted { deadline: DateTime<Utc> },
    /// A draw is already in flight.
    Busy,
    /// The cancellation token fired; nothing was mutated.
    Stopped,
}

/// Serializable view of the coordinator for hosts and the CLI.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CycleSnapshot {
    pub status: CycleStatus,
    pub deadline: DateTime<Utc>,
    pub remaining_secs: i64,
    pub remaining: String,
    pub fired_milestones: Vec<Milestone>,
    pub entry_count: usize,
    pub winner: Option<Entry>,
    pub load_failure: Option<LoadFailure>,
    pub at: DateTime<Utc>,
}

/// Requests a manual entry reload from a running coordinator.
///
/// Requests made while `run()` is busy are remembered, so one arrives after
/// the current tick completes. Several requests before then collapse into one.
#[derive(Debug, Clone)]
pub struct RetryTrigger(Arc<Notify>);

impl RetryTrigger {
    pub fn request(&self) {
        self.0.notify_one();
    }
}

pub struct DrawCoordinator {
    settings: CoordinatorSettings,
    clock: Arc<dyn Clock>,
    store: Box<dyn DeadlineStore>,
    loader: EntryLoader,
    selector: Arc<dyn WinnerSelector>,
    broadcaster: Broadcaster,
    cancel: CancellationToken,
    cycle: DrawCycle,
    entries: Vec<Entry>,
    /// Most recent winner; stays on display until the next draw replaces it.
    winner: Option<Entry>,
    retry: Arc<Notify>,
}

impl DrawCoordinator {
    /// Establish the active cycle from the persisted deadline.
    ///
    /// A missing or elapsed deadline starts a fresh cycle, which is persisted
    /// before this returns. An elapsed deadline is never drawn retroactively.
    ///
    /// The loader is rebound to a child of `cancel`.
    ///
    /// # Errors
    /// Returns an error if the fresh deadline cannot be persisted.
    pub fn new(
        settings: CoordinatorSettings,
        clock: Arc<dyn Clock>,
        store: Box<dyn DeadlineStore>,
        loader: EntryLoader,
        selector: Arc<dyn WinnerSelector>,
        broadcaster: Broadcaster,
        cancel: CancellationToken,
    ) -> Result<Self, CoreError> {
        let now = clock.now();
        let stored = match store.load_deadline() {
            Ok(d) => d,
            Err(StorageError::Corrupted { key, message }) => {
                tracing::warn!(%key, "ignoring unreadable deadline: {message}");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let (cycle, establishment) = match stored {
            Some(deadline) if deadline > now => (DrawCycle::with_deadline(deadline), Establishment::Resumed),
            Some(previous) => (
                DrawCycle::starting_at(now, settings.cycle_length),
                Establishment::Missed { previous },
            ),
            None => (DrawCycle::starting_at(now, settings.cycle_length), Establishment::Fresh),
        };

        if establishment != Establishment::Resumed {
            store.save_deadline(cycle.deadline)?;
        }

        let coordinator = Self {
            settings,
            clock,
            store,
            loader: loader.with_cancellation(cancel.child_token()),
            selector,
            broadcaster,
            cancel,
            cycle,
            entries: Vec::new(),
            winner: None,
            retry: Arc::new(Notify::new()),
        };

        match establishment {
            Establishment::Resumed => tracing::info!(
                deadline = %coordinator.cycle.deadline,
                remaining = %format_remaining(coordinator.cycle.remaining_secs(now)),
                "resumed draw cycle"
            ),
            Establishment::Fresh => {
                tracing::info!(deadline = %coordinator.cycle.deadline, "started first draw cycle")
            }
            Establishment::Missed { previous } => {
                tracing::warn!(%previous, deadline = %coordinator.cycle.deadline, "stored deadline already elapsed; starting fresh cycle");
                coordinator.broadcaster.publish(
                    NotificationDraft::new(
                        NotificationKind::System,
                        "New draw cycle",
                        format!(
                            "The previous draw window closed while offline. Next draw in {}.",
                            format_remaining(coordinator.cycle.remaining_secs(now))
                        ),
                    )
                    .with_payload(serde_json::json!({
                        "previousDeadline": previous,
                        "deadline": coordinator.cycle.deadline,
                    })),
                );
            }
        }

        Ok(coordinator)
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn status(&self) -> CycleStatus {
        self.cycle.status
    }

    pub fn deadline(&self) -> DateTime<Utc> {
        self.cycle.deadline
    }

    pub fn cycle(&self) -> &DrawCycle {
        &self.cycle
    }

    pub fn remaining_secs(&self) -> i64 {
        self.cycle.remaining_secs(self.clock.now())
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn winner(&self) -> Option<&Entry> {
        self.winner.as_ref()
    }

    pub fn loader(&self) -> &EntryLoader {
        &self.loader
    }

    pub fn broadcaster(&self) -> &Broadcaster {
        &self.broadcaster
    }

    /// Handle for requesting [`DrawCoordinator::retry_entries`] from outside `run()`.
    pub fn retry_trigger(&self) -> RetryTrigger {
        RetryTrigger(Arc::clone(&self.retry))
    }

    pub fn snapshot(&self) -> CycleSnapshot {
        let now = self.clock.now();
        let remaining_secs = self.cycle.remaining_secs(now);
        CycleSnapshot {
            status: self.cycle.status,
            deadline: self.cycle.deadline,
            remaining_secs,
            remaining: format_remaining(remaining_secs),
            fired_milestones: self.cycle.fired.iter().copied().collect(),
            entry_count: self.entries.len(),
            winner: self.winner.clone(),
            load_failure: self.loader.failure().cloned(),
            at: now,
        }
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Reload the entry snapshot. Returns the number of entries held.
    pub async fn refresh_entries(&mut self) -> usize {
        let entries = self.loader.load().await;
        self.adopt_entries(entries)
    }

    /// Manual retry after the loader gave up. Clears its held error.
    pub async fn retry_entries(&mut self) -> usize {
        tracing::info!("manual entry reload requested");
        let entries = self.loader.retry().await;
        self.adopt_entries(entries)
    }

    /// Advance the state machine to the current wall-clock instant.
    pub async fn tick(&mut self) -> Result<TickOutcome, CoreError> {
        if self.cancel.is_cancelled() {
            return Ok(TickOutcome::Stopped);
        }
        let now = self.clock.now();

        match self.cycle.status {
            CycleStatus::Drawing => Ok(TickOutcome::Busy),
            CycleStatus::Cooldown => match self.cycle.cooldown_until {
                Some(until) if now < until => Ok(TickOutcome::CoolingDown { until }),
                _ => self.start_new_cycle().await,
            },
            CycleStatus::Counting => {
                let remaining = self.cycle.remaining_secs(now);
                if remaining <= 0 {
                    return self.draw().await;
                }
                let (fired, next) = milestone::evaluate(remaining, &self.cycle.fired);
                self.cycle.fired = next;
                match fired {
                    Some(m) => {
                        self.announce_milestone(m, remaining);
                        Ok(TickOutcome::Milestone {
                            milestone: m,
                            remaining_secs: remaining,
                        })
                    }
                    None => {
                        tracing::trace!(remaining, "tick");
                        Ok(TickOutcome::Counting {
                            remaining_secs: remaining,
                        })
                    }
                }
            }
        }
    }

    /// Tick every `interval` until the cancellation token fires.
    ///
    /// Missed ticks are skipped, not replayed; remaining time is always
    /// re-derived from the deadline.
    pub async fn run(&mut self, interval: StdDuration) -> Result<(), CoreError> {
        self.refresh_entries().await;

        let retry = Arc::clone(&self.retry);
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => break,
                _ = retry.notified() => {
                    let count = self.retry_entries().await;
                    tracing::info!(count, "entries reloaded");
                    continue;
                }
                _ = ticker.tick() => {}
            }
            match self.tick().await {
                Ok(TickOutcome::Stopped) => break,
                Ok(outcome) => tracing::trace!(?outcome, "tick complete"),
                Err(e) => tracing::error!("tick failed: {e}"),
            }
        }
        tracing::info!("draw coordinator stopped");
        Ok(())
    }

    // ── Internal ─────────────────────────────────────────────────────

    /// Replace the snapshot unless cancelled, keeping the remembered winner flagged.
    fn adopt_entries(&mut self, mut entries: Vec<Entry>) -> usize {
        if self.cancel.is_cancelled() {
            return self.entries.len();
        }
        if let Some(winner) = &self.winner {
            for entry in entries.iter_mut().filter(|e| e.id == winner.id) {
                entry.status = EntryStatus::Winner;
            }
        }
        self.entries = entries;
        self.entries.len()
    }

    fn announce_milestone(&self, m: Milestone, remaining_secs: i64) {
        let minutes = (remaining_secs + 59) / 60;
        tracing::info!(milestone = ?m, remaining_secs, "countdown milestone");
        self.broadcaster.publish(
            NotificationDraft::new(
                NotificationKind::Countdown,
                format!("Draw in {}", m.label()),
                format!(
                    "The daily draw happens in {}. {} photo(s) in the running.",
                    m.label(),
                    self.entries.len()
                ),
            )
            .urgent(m.is_urgent())
            .with_payload(serde_json::json!({
                "milestone": m,
                "remainingSecs": remaining_secs,
                "remainingMinutes": minutes,
            })),
        );
    }

    async fn draw(&mut self) -> Result<TickOutcome, CoreError> {
        self.cycle.status = CycleStatus::Drawing;

        // Decide on what the backend holds now, not on the snapshot from cycle start.
        self.refresh_entries().await;
        if self.cancel.is_cancelled() {
            return Ok(TickOutcome::Stopped);
        }
        if self.entries.is_empty() {
            tracing::info!("deadline reached with no entries; skipping draw");
            self.start_new_cycle().await?;
            return Ok(TickOutcome::Drawn(DrawOutcome::NoEntries));
        }

        tracing::info!(entries = self.entries.len(), "deadline reached; drawing winner");
        self.broadcaster.publish(
            NotificationDraft::new(
                NotificationKind::DrawStarted,
                "The draw has started",
                format!("Picking a winner from {} photo(s)...", self.entries.len()),
            )
            .urgent(true)
            .with_payload(serde_json::json!({ "entryCount": self.entries.len() })),
        );

        let result = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Ok(TickOutcome::Stopped),
            r = self.selector.trigger_draw() => r,
        };
        if self.cancel.is_cancelled() {
            return Ok(TickOutcome::Stopped);
        }

        let outcome = match result {
            Ok(winner) => {
                tracing::info!(entry = %winner.id, "winner selected");
                apply_winner(&mut self.entries, &winner);
                self.broadcaster.publish(
                    NotificationDraft::new(
                        NotificationKind::Winner,
                        "We have a winner!",
                        if winner.description.is_empty() {
                            format!("Photo {} won today's draw.", winner.id)
                        } else {
                            format!("\"{}\" won today's draw.", winner.description)
                        },
                    )
                    .urgent(true)
                    .with_payload(serde_json::json!({
                        "entryId": winner.id,
                        "imageRef": winner.image_ref,
                        "ownerRef": winner.owner_ref,
                        "description": winner.description,
                    })),
                );
                let mut winner = winner;
                winner.status = EntryStatus::Winner;
                self.winner = Some(winner.clone());
                DrawOutcome::Winner(winner)
            }
            Err(e) => {
                tracing::error!("winner selection failed: {e}");
                self.broadcaster.publish(
                    NotificationDraft::new(
                        NotificationKind::Error,
                        "Draw failed",
                        format!("Winner selection failed: {e}. A new cycle will start shortly."),
                    )
                    .urgent(true)
                    .with_payload(serde_json::json!({ "source": "draw" })),
                );
                DrawOutcome::Failed(e.to_string())
            }
        };

        self.enter_cooldown().await?;
        Ok(TickOutcome::Drawn(outcome))
    }

    async fn enter_cooldown(&mut self) -> Result<(), CoreError> {
        if self.settings.cooldown <= Duration::zero() {
            self.start_new_cycle().await?;
            return Ok(());
        }
        let until = self.clock.now() + self.settings.cooldown;
        self.cycle.status = CycleStatus::Cooldown;
        self.cycle.cooldown_until = Some(until);
        tracing::debug!(%until, "cooldown");
        Ok(())
    }

    async fn start_new_cycle(&mut self) -> Result<TickOutcome, CoreError> {
        let now = self.clock.now();
        self.cycle = DrawCycle::starting_at(now, self.settings.cycle_length);
        tracing::info!(deadline = %self.cycle.deadline, "new draw cycle");
        self.store.save_deadline(self.cycle.deadline)?;
        self.refresh_entries().await;
        Ok(TickOutcome::CycleStarted {
            deadline: self.cycle.deadline,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EntrySource;
    use crate::broadcast::NoopSink;
    use crate::draw::ManualClock;
    use crate::entries::LoaderSettings;
    use crate::error::BackendError;
    use crate::storage::Database;
    use async_trait::async_trait;
    use chrono::TimeZone;

    struct Fixed(Vec<Entry>);

    #[async_trait]
    impl EntrySource for Fixed {
        async fn fetch_entries(&self) -> Result<Vec<Entry>, BackendError> {
            Ok(self.0.clone())
        }
    }

    struct Unreachable;

    #[async_trait]
    impl WinnerSelector for Unreachable {
        async fn trigger_draw(&self) -> Result<Entry, BackendError> {
            Err(BackendError::Transport("unused".into()))
        }
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 5, 1, 9, 0, 0).unwrap()
    }

    fn build(clock: &ManualClock, db: Database) -> DrawCoordinator {
        let broadcaster = Broadcaster::new(Box::new(NoopSink));
        let loader = EntryLoader::new(Arc::new(Fixed(vec![])), LoaderSettings::default(), broadcaster.clone());
        DrawCoordinator::new(
            CoordinatorSettings::default(),
            Arc::new(clock.clone()),
            Box::new(db),
            loader,
            Arc::new(Unreachable),
            broadcaster,
            CancellationToken::new(),
        )
        .unwrap()
    }

    #[test]
    fn fresh_start_persists_deadline() {
        let clock = ManualClock::new(start());
        let coordinator = build(&clock, Database::open_memory().unwrap());
        assert_eq!(coordinator.deadline(), start() + Duration::hours(24));
        assert_eq!(coordinator.status(), CycleStatus::Counting);
        assert!(coordinator.broadcaster().history().is_empty());
    }

    #[test]
    fn future_deadline_is_resumed() {
        let clock = ManualClock::new(start());
        let db = Database::open_memory().unwrap();
        let deadline = start() + Duration::minutes(90);
        db.save_deadline(deadline).unwrap();
        let coordinator = build(&clock, db);
        assert_eq!(coordinator.deadline(), deadline);
        assert_eq!(coordinator.remaining_secs(), 90 * 60);
    }

    #[test]
    fn elapsed_deadline_starts_fresh_cycle_with_notice() {
        let clock = ManualClock::new(start());
        let db = Database::open_memory().unwrap();
        db.save_deadline(start() - Duration::hours(3)).unwrap();
        let coordinator = build(&clock, db);
        assert_eq!(coordinator.deadline(), start() + Duration::hours(24));
        let history = coordinator.broadcaster().history();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].kind, NotificationKind::System);
    }

    #[tokio::test]
    async fn counting_tick_reports_remaining() {
        let clock = ManualClock::new(start());
        let mut coordinator = build(&clock, Database::open_memory().unwrap());
        clock.advance(Duration::seconds(1));
        assert_eq!(
            coordinator.tick().await.unwrap(),
            TickOutcome::Counting { remaining_secs: 86_399 }
        );
    }

    #[tokio::test]
    async fn cancelled_tick_is_a_noop() {
        let clock = ManualClock::new(start());
        let mut coordinator = build(&clock, Database::open_memory().unwrap());
        coordinator.cancel.cancel();
        clock.advance(Duration::hours(25));
        assert_eq!(coordinator.tick().await.unwrap(), TickOutcome::Stopped);
        assert_eq!(coordinator.status(), CycleStatus::Counting);
    }

    #[tokio::test]
    async fn tick_during_draw_is_busy() {
        let clock = ManualClock::new(start());
        let mut coordinator = build(&clock, Database::open_memory().unwrap());
        coordinator.cycle.status = CycleStatus::Drawing;
        clock.advance(Duration::hours(25));
        assert_eq!(coordinator.tick().await.unwrap(), TickOutcome::Busy);
        assert_eq!(coordinator.deadline(), start() + Duration::hours(24));
    }

    #[test]
    fn snapshot_serializes() {
        let clock = ManualClock::new(start());
        let coordinator = build(&clock, Database::open_memory().unwrap());
        let json = serde_json::to_value(coordinator.snapshot()).unwrap();
        assert_eq!(json["status"], "counting");
        assert_eq!(json["remaining"], "24:00:00");
        assert_eq!(json["entryCount"], 0);
    }
}
