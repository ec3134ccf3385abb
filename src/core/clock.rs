//! Time source used for TTL checks, rate-limit spacing and backoff sleeps.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::fmt::Debug;
use std::time::{Duration, Instant};

/// A source of "now" plus a way to suspend for a duration.
///
/// [`ApiCache`](crate::ApiCache) never touches the wall clock directly, so tests can
/// swap in a clock that advances virtual time instead of sleeping.
#[async_trait]
pub trait Clock: Debug + Send + Sync + 'static {
    /// The current instant.
    fn now(&self) -> Instant;

    /// Suspend the calling task for `dur`.
    async fn sleep(&self, dur: Duration);

    /// Calendar time, for comparing against timestamps carried in payloads.
    fn wall_now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// The default clock, backed by `tokio::time`.
///
/// Because it reads tokio's clock, it also follows `tokio::time::pause()` in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct TokioClock;

#[async_trait]
impl Clock for TokioClock {
    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }

    async fn sleep(&self, dur: Duration) {
        tokio::time::sleep(dur).await;
    }
}
