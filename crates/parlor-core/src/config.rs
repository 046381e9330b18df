//! Explicit configuration for the ledger and aggregator.

use chrono::{Duration, FixedOffset};

/// Configuration passed into the ledger and aggregator constructors.
///
/// Held as an explicit value rather than read from ambient process state so
/// both components stay testable in isolation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CoreConfig {
    /// Reference time zone for day-boundary attribution in daily stats.
    ///
    /// A fixed UTC offset: a session is attributed entirely to the calendar
    /// date of its start time in this zone, even when it crosses midnight.
    pub reference_tz: FixedOffset,

    /// How far in the future a session start time may lie before it is
    /// rejected as invalid.
    pub future_skew: Duration,

    /// Busy timeout applied to the underlying store. Operations that still
    /// cannot acquire the store after this long fail as unavailable.
    pub store_timeout: std::time::Duration,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            reference_tz: FixedOffset::east_opt(0).unwrap(),
            future_skew: Duration::minutes(5),
            store_timeout: std::time::Duration::from_secs(5),
        }
    }
}
