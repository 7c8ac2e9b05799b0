//! Wall-clock helpers shared by schedulers.

use std::time::{Duration, SystemTime};

/// Delay from `now` until `due`, saturating at zero for past instants.
#[must_use]
pub fn until(now: SystemTime, due: SystemTime) -> Duration {
    due.duration_since(now).unwrap_or(Duration::ZERO)
}
