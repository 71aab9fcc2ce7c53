//! The authoritative temporal state of one draw cycle.
//!
//! The durable representation is the absolute `deadline`; everything else
//! (remaining seconds, fired milestones) is derived or in-memory only.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::milestone::FiredSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CycleStatus {
    Counting,
    Drawing,
    Cooldown,
}

/// How the active cycle came to be at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Establishment {
    /// Stored deadline was still in the future.
    Resumed,
    /// No deadline was stored.
    Fresh,
    /// Stored deadline had already elapsed; it is not drawn retroactively.
    Missed { previous: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq)]
pub struct DrawCycle {
    pub deadline: DateTime<Utc>,
    pub fired: FiredSet,
    pub status: CycleStatus,
    /// Set while in `Cooldown`.
    pub cooldown_until: Option<DateTime<Utc>>,
}

impl DrawCycle {
    pub fn with_deadline(deadline: DateTime<Utc>) -> Self {
        Self {
            deadline,
            fired: FiredSet::new(),
            status: CycleStatus::Counting,
            cooldown_until: None,
        }
    }

    pub fn starting_at(now: DateTime<Utc>, cycle_length: Duration) -> Self {
        Self::with_deadline(now + cycle_length)
    }

    /// Whole seconds until the deadline, rounded up so that `0` means the
    /// deadline has been reached. Negative once it has passed by a full second.
    pub fn remaining_secs(&self, now: DateTime<Utc>) -> i64 {
        ceil_secs((self.deadline - now).num_milliseconds())
    }
}

fn ceil_secs(ms: i64) -> i64 {
    -((-ms).div_euclid(1000))
}

/// `HH:MM:SS`, clamped at zero.
pub fn format_remaining(secs: i64) -> String {
    let secs = secs.max(0);
    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}
