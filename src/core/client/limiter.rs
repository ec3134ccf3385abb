//! Issue-time spacing shared by every clone of an `ApiCache`.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use crate::core::clock::Clock;

#[derive(Debug)]
pub(crate) struct RateLimiter {
    interval: Duration,
    last_issue: Mutex<Option<Instant>>,
}

impl RateLimiter {
    pub(crate) const fn new(interval: Duration) -> Self {
        Self {
            interval,
            last_issue: Mutex::new(None),
        }
    }

    pub(crate) const fn interval(&self) -> Duration {
        self.interval
    }

    /// Reserves the next issue slot and waits for it.
    ///
    /// The slot is recorded before sleeping, so concurrent callers queue up behind each
    /// other instead of all waking at the same instant. Returns the reserved slot.
    pub(crate) async fn acquire(&self, clock: &dyn Clock) -> Instant {
        let (slot, wait) = {
            let mut last = self
                .last_issue
                .lock()
                .unwrap_or_else(PoisonError::into_inner);
            let now = clock.now();
            // an interval too large to add to an instant disables spacing
            let slot = match (*last).and_then(|prev| prev.checked_add(self.interval)) {
                Some(next) => now.max(next),
                None => now,
            };
            *last = Some(slot);
            (slot, slot.saturating_duration_since(now))
        };

        if !wait.is_zero() {
            #[cfg(feature = "tracing")]
            tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limit: waiting for issue slot");
            clock.sleep(wait).await;
        }
        slot
    }
}
