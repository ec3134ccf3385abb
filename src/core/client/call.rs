use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

use super::{ApiCache, CacheMode, RetryConfig};
use crate::core::request::{CacheKey, HttpMethod, RequestOptions};
use crate::core::ApiError;

/// A builder for one logical request through an [`ApiCache`].
///
/// ```no_run
/// # async fn run(cache: apicache_rs::ApiCache) -> Result<(), apicache_rs::ApiError> {
/// use apicache_rs::CacheMode;
///
/// let about = cache
///     .request("https://oauth.reddit.com/r/rust/about.json")
///     .bearer_auth("token")
///     .cache_mode(CacheMode::Refresh)
///     .send()
///     .await?;
/// # let _ = about;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct CachedRequest {
    cache: ApiCache,
    target: String,
    options: RequestOptions,
    cache_mode: CacheMode,
    ttl: Option<Duration>,
    retry_override: Option<RetryConfig>,
}

impl CachedRequest {
    pub(super) fn new(cache: &ApiCache, target: impl Into<String>) -> Self {
        Self {
            cache: cache.clone(),
            target: target.into(),
            options: RequestOptions::default(),
            cache_mode: CacheMode::Use,
            ttl: None,
            retry_override: None,
        }
    }

    /// Replaces all request options at once.
    #[must_use]
    pub fn options(mut self, options: RequestOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub fn method(mut self, method: HttpMethod) -> Self {
        self.options = self.options.method(method);
        self
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.options = self.options.header(name, value);
        self
    }

    #[must_use]
    pub fn bearer_auth(mut self, token: impl fmt::Display) -> Self {
        self.options = self.options.bearer_auth(token);
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.options = self.options.body(body);
        self
    }

    /// Sets a JSON body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Json` if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(mut self, value: &T) -> Result<Self, ApiError> {
        self.options = self.options.json(value)?;
        Ok(self)
    }

    /// Sets the cache mode for this call.
    #[must_use]
    pub const fn cache_mode(mut self, mode: CacheMode) -> Self {
        self.cache_mode = mode;
        self
    }

    /// Overrides the cache's default TTL for the entry this call writes.
    #[must_use]
    pub const fn ttl(mut self, ttl: Duration) -> Self {
        self.ttl = Some(ttl);
        self
    }

    /// Overrides the cache's retry policy for this call.
    #[must_use]
    pub fn retry_policy(mut self, cfg: Option<RetryConfig>) -> Self {
        self.retry_override = cfg;
        self
    }

    /// The key this call reads and writes.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Url` if the target is not a valid URL.
    pub fn key(&self) -> Result<CacheKey, ApiError> {
        self.cache.cache_key(&self.target, &self.options)
    }

    /// Executes the call and returns the JSON payload.
    ///
    /// # Errors
    ///
    /// See [`ApiCache::get_cached_response`].
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err, fields(target = %self.target, mode = ?self.cache_mode)))]
    pub async fn send(self) -> Result<Value, ApiError> {
        self.cache
            .execute(
                &self.target,
                &self.options,
                self.cache_mode,
                self.ttl,
                self.retry_override.as_ref(),
            )
            .await
    }

    /// Executes the call and decodes the payload into `T`.
    ///
    /// # Errors
    ///
    /// See [`ApiCache::get_cached_response`]; also `ApiError::Json` if the payload does not fit `T`.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        let payload = self.send().await?;
        Ok(serde_json::from_value(payload)?)
    }
}
