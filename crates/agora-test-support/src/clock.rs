//! Deterministic `Clock` implementation for tests.

use agora_core::clock::Clock;
use chrono::{DateTime, TimeZone, Utc};

/// A clock that always returns a fixed point in time.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}

/// The clock most tests use: 2026-01-15 10:00:00 UTC.
#[must_use]
pub fn fixed_clock() -> FixedClock {
    FixedClock(
        Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0)
            .single()
            .unwrap_or_default(),
    )
}
