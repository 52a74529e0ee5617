//! Time source for the control loop. Injected so tests can run cycles
//! back-to-back with a fixed wall clock.

use std::time::Duration;
use time::OffsetDateTime;

pub trait Clock {
    /// Wall-clock time used to stamp error-log entries.
    fn now(&self) -> OffsetDateTime;

    async fn sleep(&self, duration: Duration);
}

/// Local wall clock and tokio timers.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        // The local offset cannot always be determined (e.g. once other
        // threads exist); fall back to UTC rather than fail.
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}
