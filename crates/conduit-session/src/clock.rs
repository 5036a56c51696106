//! Monotonic recency timestamps.

use std::time::{SystemTime, UNIX_EPOCH};

use crate::queue::Priority;

/// Wall-clock nanoseconds, forced strictly increasing.
///
/// Two accesses in the same nanosecond (or a clock stepping backwards) still
/// get distinct, ordered priorities.
#[derive(Debug, Default, Clone)]
pub struct MonotonicClock {
    last: Priority,
}

impl MonotonicClock {
    /// Create a clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Next timestamp, always greater than the previous one.
    pub fn now(&mut self) -> Priority {
        let wall = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|elapsed| u64::try_from(elapsed.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or_default();
        self.last = wall.max(self.last.saturating_add(1));
        self.last
    }
}
