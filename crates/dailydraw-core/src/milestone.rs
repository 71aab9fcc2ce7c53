//! Countdown milestone policy.
//!
//! Pure and edge-triggered: a milestone fires only on the tick where the
//! remaining whole seconds equal its threshold exactly, and only if it has
//! not fired yet in the current cycle. A tick that jumps over a threshold
//! (process suspended, clock moved) never fires it retroactively.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Milestone {
    OneHour,
    TenMinutes,
    OneMinute,
}

/// Milestones already dispatched in the current cycle.
pub type FiredSet = BTreeSet<Milestone>;

impl Milestone {
    /// Ordered from furthest to closest to the deadline.
    pub const ALL: [Milestone; 3] = [Milestone::OneHour, Milestone::TenMinutes, Milestone::OneMinute];

    pub fn threshold_secs(self) -> i64 {
        match self {
            Milestone::OneHour => 3600,
            Milestone::TenMinutes => 600,
            Milestone::OneMinute => 60,
        }
    }

    /// The two thresholds closest to the deadline are urgent.
    pub fn is_urgent(self) -> bool {
        matches!(self, Milestone::TenMinutes | Milestone::OneMinute)
    }

    pub fn label(self) -> &'static str {
        match self {
            Milestone::OneHour => "1 hour",
            Milestone::TenMinutes => "10 minutes",
            Milestone::OneMinute => "1 minute",
        }
    }
}

/// Decide whether `remaining_secs` triggers a milestone.
///
/// Returns the fired milestone (if any) and the updated fired set.
pub fn evaluate(remaining_secs: i64, fired: &FiredSet) -> (Option<Milestone>, FiredSet) {
    let mut next = fired.clone();
    let hit = Milestone::ALL
        .into_iter()
        .find(|m| m.threshold_secs() == remaining_secs && !fired.contains(m));
    if let Some(m) = hit {
        next.insert(m);
    }
    (hit, next)
}
