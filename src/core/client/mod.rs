//! Public cache surface + builder.
//! Internals are split into `store` (payloads), `limiter` (issue spacing), `retry`
//! (policy types) and `constants` (defaults).

mod call;
mod constants;
mod limiter;
mod retry;
mod store;

pub use call::CachedRequest;
pub use retry::{Backoff, CacheMode, RetryConfig, RetryOn};

use constants::{DEFAULT_CACHE_TTL, DEFAULT_RATE_LIMIT_INTERVAL, USER_AGENT};
use limiter::RateLimiter;
use store::CacheStore;

use chrono::{DateTime, Utc};
use reqwest::Client;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::{Duration, Instant};
use url::Url;

use crate::core::clock::{Clock, TokioClock};
use crate::core::error::{ApiError, Failure};
use crate::core::net;
use crate::core::request::{CacheKey, RequestOptions};

/// Construction-time knobs in their serialized form. Every field is optional; missing
/// fields keep the defaults (1000 ms spacing, 3 retries, 300000 ms TTL).
///
/// ```
/// let cfg: apicache_rs::ApiCacheConfig =
///     serde_json::from_str(r#"{"rateLimitIntervalMs": 100, "maxRetries": 2}"#).unwrap();
/// assert_eq!(cfg.cache_ttl_ms, None);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ApiCacheConfig {
    pub rate_limit_interval_ms: Option<u64>,
    pub max_retries: Option<u32>,
    pub cache_ttl_ms: Option<u64>,
}

#[derive(Debug)]
struct Inner {
    http: Client,
    store: CacheStore,
    limiter: RateLimiter,
    retry: RetryConfig,
    clock: Arc<dyn Clock>,
}

/// A rate-limited, retrying, TTL-caching front for outbound JSON requests.
///
/// Clones share the same cache map, rate limiter and clock, so one instance can be
/// handed to every caller that should be throttled together.
#[derive(Debug, Clone)]
pub struct ApiCache {
    inner: Arc<Inner>,
}

impl ApiCache {
    /// Create a new builder.
    pub fn builder() -> ApiCacheBuilder {
        ApiCacheBuilder::default()
    }

    /// An instance with all defaults.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be built.
    pub fn new() -> Result<Self, ApiError> {
        Self::builder().build()
    }

    /// An instance configured from a deserialized [`ApiCacheConfig`].
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be built.
    pub fn with_config(config: ApiCacheConfig) -> Result<Self, ApiError> {
        Self::builder().config(config).build()
    }

    /// Starts a per-call request against `target`, with options, cache mode and
    /// retry policy configurable before sending.
    pub fn request(&self, target: impl Into<String>) -> CachedRequest {
        CachedRequest::new(self, target)
    }

    /// Returns the JSON body for `(target, options)`, from cache when fresh, otherwise
    /// from a rate-limited, retried network call whose result is then cached.
    ///
    /// # Errors
    ///
    /// - `ApiError::Url` if `target` is not a valid URL.
    /// - `ApiError::InvalidHeader` if a header in `options` is not valid HTTP.
    /// - `ApiError::RequestFailed` once the retry budget is exhausted.
    /// - `ApiError::Json` if the successful body is not JSON.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self, options), err))]
    pub async fn get_cached_response(
        &self,
        target: &str,
        options: &RequestOptions,
    ) -> Result<Value, ApiError> {
        self.execute(target, options, CacheMode::Use, None, None).await
    }

    /// Like [`get_cached_response`](Self::get_cached_response), decoding into `T`.
    ///
    /// The raw JSON is what gets cached, so different `T`s can share one entry.
    ///
    /// # Errors
    ///
    /// Same as `get_cached_response`, plus `ApiError::Json` if the payload does not fit `T`.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        target: &str,
        options: &RequestOptions,
    ) -> Result<T, ApiError> {
        let payload = self.get_cached_response(target, options).await?;
        Ok(serde_json::from_value(payload)?)
    }

    /// The key `get_cached_response(target, options)` would use.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Url` if `target` is not a valid URL.
    pub fn cache_key(&self, target: &str, options: &RequestOptions) -> Result<CacheKey, ApiError> {
        let url = Url::parse(target)?;
        CacheKey::derive(&url, options)
    }

    /// Drops every cached entry.
    pub fn clear_cache(&self) {
        self.inner.store.clear();
    }

    /// Drops the entry for `key`, if any. The next call for that request goes to the network.
    pub fn invalidate_cache(&self, key: &CacheKey) {
        let _removed = self.inner.store.remove(key);
        #[cfg(feature = "tracing")]
        tracing::debug!(removed = _removed, key = %key, "cache entry invalidated");
    }

    /// Number of stored entries, including stale ones not yet replaced.
    pub fn cached_entries(&self) -> usize {
        self.inner.store.len()
    }

    pub fn is_cache_empty(&self) -> bool {
        self.cached_entries() == 0
    }

    pub fn cache_ttl(&self) -> Duration {
        self.inner.store.default_ttl()
    }

    pub fn rate_limit_interval(&self) -> Duration {
        self.inner.limiter.interval()
    }

    pub fn retry_config(&self) -> &RetryConfig {
        &self.inner.retry
    }

    /* -------- internal plumbing shared with `CachedRequest` -------- */

    pub(crate) fn now(&self) -> Instant {
        self.inner.clock.now()
    }

    pub(crate) fn wall_now(&self) -> DateTime<Utc> {
        self.inner.clock.wall_now()
    }

    pub(crate) async fn execute(
        &self,
        target: &str,
        options: &RequestOptions,
        mode: CacheMode,
        ttl: Option<Duration>,
        retry_override: Option<&RetryConfig>,
    ) -> Result<Value, ApiError> {
        let url = Url::parse(target)?;
        let key = CacheKey::derive(&url, options)?;

        if mode.reads()
            && let Some(hit) = self.inner.store.get(&key, self.inner.clock.now())
        {
            #[cfg(feature = "tracing")]
            tracing::debug!(url = %url, "cache hit");
            return Ok(hit);
        }

        let headers = net::header_map(&options.headers)?;
        let retry = retry_override.unwrap_or(&self.inner.retry);
        let resp = self.send_with_retry(&url, options, &headers, retry).await?;
        let body = net::get_text(resp).await?;
        let payload: Value = serde_json::from_str(&body)?;

        if mode.writes() {
            self.inner
                .store
                .put(key, payload.clone(), self.inner.clock.now(), ttl);
        }
        Ok(payload)
    }

    /// Issues attempts until one returns 2xx, a failure is not retryable, or the
    /// budget runs out. Every attempt, retries included, waits for a rate-limit slot.
    async fn send_with_retry(
        &self,
        url: &Url,
        options: &RequestOptions,
        headers: &HeaderMap,
        retry: &RetryConfig,
    ) -> Result<reqwest::Response, ApiError> {
        let budget = retry.budget();
        let mut attempt: u32 = 0;

        loop {
            self.inner.limiter.acquire(self.inner.clock.as_ref()).await;

            let failure = match net::build(&self.inner.http, url, options, headers)
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => return Ok(resp),
                Ok(resp) => Failure::Status(resp.status().as_u16()),
                Err(e) if e.is_builder() => return Err(ApiError::Http(e)),
                Err(e) => Failure::Transport(e),
            };

            let retryable = match &failure {
                Failure::Status(code) => retry.retry_on.retries_status(*code),
                Failure::Transport(_) => true,
            };

            if !retryable || attempt >= budget {
                #[cfg(feature = "tracing")]
                tracing::warn!(url = %url, attempts = attempt + 1, last = %failure, "giving up");
                return Err(ApiError::RequestFailed {
                    url: url.to_string(),
                    attempts: attempt + 1,
                    last: failure,
                });
            }

            let delay = retry.backoff.delay(attempt);
            #[cfg(feature = "tracing")]
            tracing::debug!(
                url = %url,
                attempt,
                delay_ms = delay.as_millis() as u64,
                last = %failure,
                "retrying after failure"
            );
            self.inner.clock.sleep(delay).await;
            attempt += 1;
        }
    }
}

/* ----------------------- Builder ----------------------- */

#[derive(Debug, Default)]
pub struct ApiCacheBuilder {
    user_agent: Option<String>,
    rate_limit_interval: Option<Duration>,
    cache_ttl: Option<Duration>,
    retry: RetryConfig,
    clock: Option<Arc<dyn Clock>>,
    custom_client: Option<Client>,
    timeout: Option<Duration>,
    connect_timeout: Option<Duration>,
}

impl ApiCacheBuilder {
    /// Override the User-Agent sent with every request.
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Minimum spacing between two issued requests. Default: 1s. Zero disables throttling.
    #[must_use]
    pub const fn rate_limit_interval(mut self, dur: Duration) -> Self {
        self.rate_limit_interval = Some(dur);
        self
    }

    /// Retries after the initial attempt. Default: 3.
    #[must_use]
    pub const fn max_retries(mut self, n: u32) -> Self {
        self.retry.max_retries = n;
        self
    }

    /// How long a payload is served from memory. Default: 5 minutes.
    #[must_use]
    pub const fn cache_ttl(mut self, dur: Duration) -> Self {
        self.cache_ttl = Some(dur);
        self
    }

    /// Replace the whole retry policy (budget, backoff and which failures retry).
    #[must_use]
    pub fn retry_config(mut self, cfg: RetryConfig) -> Self {
        self.retry = cfg;
        self
    }

    /// Apply the fields present in a deserialized config.
    #[must_use]
    pub fn config(mut self, cfg: ApiCacheConfig) -> Self {
        if let Some(ms) = cfg.rate_limit_interval_ms {
            self.rate_limit_interval = Some(Duration::from_millis(ms));
        }
        if let Some(n) = cfg.max_retries {
            self.retry.max_retries = n;
        }
        if let Some(ms) = cfg.cache_ttl_ms {
            self.cache_ttl = Some(Duration::from_millis(ms));
        }
        self
    }

    /// Use a different time source. Default: [`TokioClock`].
    #[must_use]
    pub fn clock(mut self, clock: impl Clock) -> Self {
        self.clock = Some(Arc::new(clock));
        self
    }

    /// Use a pre-configured `reqwest::Client` (proxy, TLS, pools).
    /// `user_agent`, `timeout` and `connect_timeout` are then ignored.
    #[must_use]
    pub fn custom_client(mut self, client: Client) -> Self {
        self.custom_client = Some(client);
        self
    }

    /// Set a per-attempt request timeout. Default: none.
    #[must_use]
    pub const fn timeout(mut self, dur: Duration) -> Self {
        self.timeout = Some(dur);
        self
    }

    /// Set a connect timeout. Default: none.
    #[must_use]
    pub const fn connect_timeout(mut self, dur: Duration) -> Self {
        self.connect_timeout = Some(dur);
        self
    }

    /// Build the cache.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the underlying HTTP client cannot be built.
    pub fn build(self) -> Result<ApiCache, ApiError> {
        let http = match self.custom_client {
            Some(client) => client,
            None => {
                let mut httpb = Client::builder()
                    .user_agent(self.user_agent.as_deref().unwrap_or(USER_AGENT));
                if let Some(t) = self.timeout {
                    httpb = httpb.timeout(t);
                }
                if let Some(ct) = self.connect_timeout {
                    httpb = httpb.connect_timeout(ct);
                }
                httpb.build()?
            }
        };

        let clock: Arc<dyn Clock> = match self.clock {
            Some(c) => c,
            None => Arc::new(TokioClock),
        };

        Ok(ApiCache {
            inner: Arc::new(Inner {
                http,
                store: CacheStore::new(self.cache_ttl.unwrap_or(DEFAULT_CACHE_TTL)),
                limiter: RateLimiter::new(
                    self.rate_limit_interval
                        .unwrap_or(DEFAULT_RATE_LIMIT_INTERVAL),
                ),
                retry: self.retry,
                clock,
            }),
        })
    }
}
