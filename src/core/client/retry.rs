use std::time::Duration;

use super::constants::{DEFAULT_BACKOFF_BASE, DEFAULT_MAX_RETRIES};

/// Specifies the backoff strategy for retrying failed requests.
#[derive(Clone, Debug, PartialEq)]
pub enum Backoff {
    /// Uses a fixed delay between retries.
    Fixed(Duration),
    /// Uses an exponential delay between retries.
    /// The delay is calculated as `base * (factor ^ attempt)`, with `attempt` starting at 0.
    Exponential {
        /// The delay before the first retry.
        base: Duration,
        /// The multiplicative factor for each subsequent retry.
        factor: f64,
        /// Optional ceiling on a single delay.
        max: Option<Duration>,
    },
}

impl Backoff {
    /// The delay to wait after failed attempt number `attempt` (0-indexed).
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        match self {
            Self::Fixed(d) => *d,
            Self::Exponential { base, factor, max } => {
                let exp = i32::try_from(attempt).unwrap_or(i32::MAX);
                let secs = base.as_secs_f64() * factor.powi(exp);
                let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
                max.map_or(delay, |cap| delay.min(cap))
            }
        }
    }
}

impl Default for Backoff {
    /// `2^attempt * 1000` ms, uncapped.
    fn default() -> Self {
        Self::Exponential {
            base: DEFAULT_BACKOFF_BASE,
            factor: 2.0,
            max: None,
        }
    }
}

/// Which failures are worth another attempt.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum RetryOn {
    /// Every non-2xx status and every transport failure. (Default)
    #[default]
    AnyFailure,
    /// Only the listed statuses; transport failures are always retried.
    Statuses(Vec<u16>),
}

impl RetryOn {
    /// The usual transient set: timeouts, throttling and gateway errors.
    #[must_use]
    pub fn transient() -> Self {
        Self::Statuses(vec![408, 429, 500, 502, 503, 504])
    }

    pub(crate) fn retries_status(&self, status: u16) -> bool {
        match self {
            Self::AnyFailure => true,
            Self::Statuses(list) => list.contains(&status),
        }
    }
}

/// Configuration for the automatic retry mechanism.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryConfig {
    /// Enables or disables the retry mechanism. When disabled, exactly one attempt is made.
    pub enabled: bool,
    /// The maximum number of retries to attempt. The total number of attempts will be `max_retries + 1`.
    pub max_retries: u32,
    /// The backoff strategy to use between retries.
    pub backoff: Backoff,
    /// Which failures trigger a retry.
    pub retry_on: RetryOn,
}

impl RetryConfig {
    pub(crate) const fn budget(&self) -> u32 {
        if self.enabled { self.max_retries } else { 0 }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_retries: DEFAULT_MAX_RETRIES,
            backoff: Backoff::default(),
            retry_on: RetryOn::default(),
        }
    }
}

/// Defines the behavior of the in-memory cache for an API call.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum CacheMode {
    /// Read from the cache if a non-expired entry is present; otherwise, fetch from the network
    /// and write the response to the cache. (Default)
    #[default]
    Use,
    /// Always fetch from the network, bypassing any cached entry, and write the new response to the cache.
    Refresh,
    /// Always fetch from the network and do not read from or write to the cache.
    Bypass,
}

impl CacheMode {
    pub(crate) const fn reads(self) -> bool {
        matches!(self, Self::Use)
    }

    pub(crate) const fn writes(self) -> bool {
        !matches!(self, Self::Bypass)
    }
}
