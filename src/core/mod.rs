//! Core components of the `apicache-rs` crate.
//!
//! This module contains the foundational building blocks of the library, including:
//! - The [`ApiCache`] front and its builder.
//! - The primary [`ApiError`] type.
//! - Request identity ([`RequestOptions`], [`CacheKey`]).
//! - The injectable [`Clock`].

/// The cache/limiter (`ApiCache`), builder, and retry configuration.
pub mod client;
/// Time source abstraction.
pub mod clock;
/// The primary error type (`ApiError`) for the crate.
pub mod error;
/// Request options and cache-key derivation.
pub mod request;

pub(crate) mod net;

// convenient re-exports so most code can just `use crate::core::ApiCache`
pub use client::{ApiCache, ApiCacheBuilder, ApiCacheConfig, CachedRequest};
pub use clock::{Clock, TokioClock};
pub use error::{ApiError, Failure};
pub use request::{CacheKey, HttpMethod, RequestOptions};
