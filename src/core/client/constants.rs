//! Centralized defaults for the cache/limiter and its HTTP client.

use std::time::Duration;

/// Identifies this library to upstream APIs; Reddit rejects requests without a descriptive UA.
pub(crate) const USER_AGENT: &str = concat!("apicache-rs/", env!("CARGO_PKG_VERSION"));

/// Minimum spacing between two issued requests.
pub(crate) const DEFAULT_RATE_LIMIT_INTERVAL: Duration = Duration::from_millis(1000);

/// Retries after the initial attempt.
pub(crate) const DEFAULT_MAX_RETRIES: u32 = 3;

/// How long a cached payload is served without refetching.
pub(crate) const DEFAULT_CACHE_TTL: Duration = Duration::from_millis(300_000);

/// Delay before the first retry; doubles per attempt.
pub(crate) const DEFAULT_BACKOFF_BASE: Duration = Duration::from_millis(1000);
