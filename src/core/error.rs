use thiserror::Error;

/// The last failure observed by the retry loop before it gave up.
#[derive(Debug, Error)]
pub enum Failure {
    /// A response was received but its status was not 2xx.
    #[error("status {0}")]
    Status(u16),

    /// No response was received (connect error, reset, timeout).
    #[error("transport error: {0}")]
    Transport(#[source] reqwest::Error),
}

/// The primary error type for all fallible operations in this crate.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request could not be completed within the retry budget.
    ///
    /// `attempts` counts every network attempt, so it is `max_retries + 1` when the
    /// budget was exhausted, and less when a non-retryable status stopped the loop early.
    #[error("request to {url} failed after {} retries: {last}", .attempts.saturating_sub(1))]
    RequestFailed {
        /// The target that was requested.
        url: String,
        /// Number of network attempts made.
        attempts: u32,
        /// The last status or transport error seen.
        last: Failure,
    },

    /// An error building the HTTP client or reading a response body.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A provided URL could not be parsed.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    /// A successful response body was not valid JSON, or did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    /// A header name or value in the request options was not valid HTTP.
    #[error("invalid header: {0}")]
    InvalidHeader(String),

    /// Credentials were missing or the token endpoint returned something unusable.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The data received from the API was in an unexpected format or was missing a required field.
    #[error("Data format unexpected or missing field: {0}")]
    Data(String),

    /// The requested resource does not exist upstream.
    #[error("not found: {0}")]
    NotFound(String),

    /// A caller-supplied argument was rejected before any request was made.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl ApiError {
    /// The HTTP status of the last failed attempt, if the failure carried one.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::RequestFailed {
                last: Failure::Status(code),
                ..
            } => Some(*code),
            _ => None,
        }
    }

    /// Number of network attempts made before a [`ApiError::RequestFailed`].
    #[must_use]
    pub const fn attempts(&self) -> Option<u32> {
        match self {
            Self::RequestFailed { attempts, .. } => Some(*attempts),
            _ => None,
        }
    }
}
