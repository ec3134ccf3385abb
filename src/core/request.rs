//! Request identity: what gets sent, and the cache key derived from it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

use crate::core::ApiError;

/// HTTP method of a logical request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl HttpMethod {
    /// The canonical upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Put => "PUT",
            Self::Patch => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    pub(crate) const fn to_reqwest(self) -> reqwest::Method {
        match self {
            Self::Get => reqwest::Method::GET,
            Self::Post => reqwest::Method::POST,
            Self::Put => reqwest::Method::PUT,
            Self::Patch => reqwest::Method::PATCH,
            Self::Delete => reqwest::Method::DELETE,
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything besides the target that distinguishes one logical request from another.
///
/// Headers are kept in a sorted map, so two option sets with the same headers inserted
/// in a different order are equal and produce the same [`CacheKey`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default)]
    pub method: HttpMethod,
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
}

impl RequestOptions {
    /// A plain `GET` with no headers.
    #[must_use]
    pub fn get() -> Self {
        Self::default()
    }

    /// A `POST` with no headers or body yet.
    #[must_use]
    pub fn post() -> Self {
        Self::default().method(HttpMethod::Post)
    }

    #[must_use]
    pub const fn method(mut self, method: HttpMethod) -> Self {
        self.method = method;
        self
    }

    /// Adds (or replaces) a header.
    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    /// Sets `Authorization: Bearer <token>`.
    #[must_use]
    pub fn bearer_auth(self, token: impl fmt::Display) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// Sets a raw body.
    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }

    /// Serializes `value` as the body and sets `Content-Type: application/json`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Json` if `value` cannot be serialized.
    pub fn json<T: Serialize + ?Sized>(self, value: &T) -> Result<Self, ApiError> {
        let body = serde_json::to_string(value)?;
        Ok(self.header("Content-Type", "application/json").body(body))
    }
}

/// The derived identity of a logical request.
///
/// Obtain one from [`ApiCache::cache_key`](crate::ApiCache::cache_key) to invalidate a
/// single entry.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

#[derive(Serialize)]
struct KeyMaterial<'a> {
    target: &'a str,
    #[serde(flatten)]
    options: &'a RequestOptions,
}

impl CacheKey {
    /// Derives the key for `(target, options)`. Exact match only: any difference in
    /// target, method, a header, or the body yields a different key.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Json` if the options cannot be serialized, which does not
    /// happen for string headers and bodies.
    pub fn derive(target: &Url, options: &RequestOptions) -> Result<Self, ApiError> {
        let material = KeyMaterial {
            target: target.as_str(),
            options,
        };
        Ok(Self(serde_json::to_string(&material)?))
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
