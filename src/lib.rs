//! apicache-rs: a rate-limited, retrying, TTL-caching front for outbound JSON APIs.
//!
//! [`ApiCache`] spaces outbound requests, retries failures with exponential backoff, and
//! serves identical requests from memory while the cached payload is fresh. The
//! [`reddit`] module is a typed client built on top of it.
//!
//! ```no_run
//! # async fn run() -> Result<(), apicache_rs::ApiError> {
//! use apicache_rs::{ApiCache, RequestOptions};
//! use std::time::Duration;
//!
//! let cache = ApiCache::builder()
//!     .rate_limit_interval(Duration::from_millis(100))
//!     .max_retries(2)
//!     .cache_ttl(Duration::from_secs(1))
//!     .build()?;
//!
//! let first = cache.get_cached_response("https://example.com/a", &RequestOptions::get()).await?;
//! // served from memory
//! let second = cache.get_cached_response("https://example.com/a", &RequestOptions::get()).await?;
//! assert_eq!(first, second);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod reddit;

pub use crate::core::client::{Backoff, CacheMode, RetryConfig, RetryOn};
pub use crate::core::{
    ApiCache, ApiCacheBuilder, ApiCacheConfig, ApiError, CacheKey, CachedRequest, Clock,
    Failure, HttpMethod, RequestOptions, TokioClock,
};
pub use reddit::{RedditClient, RedditClientBuilder, RedditCredentials};
