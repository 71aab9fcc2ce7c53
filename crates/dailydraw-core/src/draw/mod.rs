mod clock;
mod coordinator;
mod cycle;

pub use clock::{Clock, ManualClock, SystemClock};
pub use coordinator::{CoordinatorSettings, CycleSnapshot, DrawCoordinator, DrawOutcome, RetryTrigger, TickOutcome};
pub use cycle::{format_remaining, CycleStatus, DrawCycle, Establishment};
