//! A typed Reddit client whose every call goes through an [`ApiCache`].
//!
//! Listing and info lookups are cached and throttled like any other request; the
//! OAuth token request bypasses the cache but still respects the rate limit.

mod api;
mod auth;
mod model;
mod wire;

pub use model::{
    Post, PostListing, PostSort, PostingRequirements, SubredditInfo, SubredditRule,
    SubredditRules, SubredditSummary, TimeFilter,
};

use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Mutex, RwLock};
use url::Url;

use crate::core::{ApiCache, ApiError, client::RetryConfig};

/// Default OAuth API base.
const DEFAULT_BASE_API: &str = "https://oauth.reddit.com/";

/// Client-credentials token endpoint.
const DEFAULT_TOKEN_URL: &str = "https://www.reddit.com/api/v1/access_token";

/// Reddit asks every client to identify itself.
const DEFAULT_USER_AGENT: &str = concat!("apicache-rs/", env!("CARGO_PKG_VERSION"), " (reddit)");

/// App credentials for the client-credentials grant.
#[derive(Clone, PartialEq, Eq)]
pub struct RedditCredentials {
    pub client_id: String,
    pub client_secret: String,
}

impl RedditCredentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
        }
    }

    /// Reads `REDDIT_CLIENT_ID` and `REDDIT_CLIENT_SECRET`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Auth` naming the first variable that is missing or empty.
    pub fn from_env() -> Result<Self, ApiError> {
        let read = |name: &str| {
            std::env::var(name)
                .ok()
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ApiError::Auth(format!("{name} is not set")))
        };
        Ok(Self::new(
            read("REDDIT_CLIENT_ID")?,
            read("REDDIT_CLIENT_SECRET")?,
        ))
    }
}

impl std::fmt::Debug for RedditCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedditCredentials")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: Instant,
}

#[derive(Debug, Clone)]
pub struct RedditClient {
    cache: ApiCache,
    base_api: Url,
    token_url: Url,
    user_agent: String,
    credentials: RedditCredentials,
    retry_override: Option<RetryConfig>,

    token: Arc<RwLock<Option<AccessToken>>>,
    token_fetch_lock: Arc<Mutex<()>>,
}

impl RedditClient {
    /// Create a new builder.
    pub fn builder() -> RedditClientBuilder {
        RedditClientBuilder::default()
    }

    /// The cache every call goes through.
    pub fn cache(&self) -> &ApiCache {
        &self.cache
    }

    /// Subreddit metadata plus the number of posts made in the last 24 hours.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for an empty or malformed name, or any error from
    /// the `about` request. A failure counting recent posts is reported as zero.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn subreddit_info(&self, name: &str) -> Result<SubredditInfo, ApiError> {
        api::fetch_subreddit_info(self, name).await
    }

    /// Subreddit rules and the requirements for posting.
    ///
    /// # Errors
    ///
    /// Returns an error if either the rules or the `about` request fails.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn rules(&self, name: &str) -> Result<SubredditRules, ApiError> {
        api::fetch_rules(self, name).await
    }

    /// Starts a listing request for a subreddit.
    pub fn posts(&self, name: impl Into<String>) -> PostsBuilder {
        PostsBuilder::new(self, name)
    }

    /// A single post by its id (with or without the `t3_` prefix).
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if Reddit knows no such post.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn post(&self, id: &str) -> Result<Post, ApiError> {
        api::fetch_post(self, id).await
    }

    /// Subreddits matching `query`, each with its recent post count.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::InvalidInput` for an empty query, or any error from the search request.
    #[cfg_attr(feature = "tracing", tracing::instrument(skip(self), err))]
    pub async fn search_subreddits(
        &self,
        query: &str,
        limit: u32,
    ) -> Result<Vec<SubredditSummary>, ApiError> {
        api::search_subreddits(self, query, limit).await
    }
}

/// A builder for fetching one page of a subreddit's posts.
pub struct PostsBuilder {
    client: RedditClient,
    subreddit: String,
    sort: PostSort,
    limit: u32,
    time: TimeFilter,
    after: Option<String>,
}

impl PostsBuilder {
    fn new(client: &RedditClient, subreddit: impl Into<String>) -> Self {
        Self {
            client: client.clone(),
            subreddit: subreddit.into(),
            sort: PostSort::default(),
            limit: 30,
            time: TimeFilter::default(),
            after: None,
        }
    }

    #[must_use]
    pub const fn sort(mut self, sort: PostSort) -> Self {
        self.sort = sort;
        self
    }

    /// Page size. Default: 30.
    #[must_use]
    pub const fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub const fn time(mut self, time: TimeFilter) -> Self {
        self.time = time;
        self
    }

    /// Cursor from a previous page's `after`.
    #[must_use]
    pub fn after(mut self, after: Option<String>) -> Self {
        self.after = after;
        self
    }

    /// Executes the request.
    ///
    /// # Errors
    ///
    /// Returns an error if the subreddit name is invalid, the request fails, or the
    /// response cannot be parsed.
    pub async fn fetch(self) -> Result<PostListing, ApiError> {
        api::fetch_posts(
            &self.client,
            &self.subreddit,
            self.sort,
            self.limit,
            self.time,
            self.after.as_deref(),
        )
        .await
    }
}

/* ----------------------- Builder ----------------------- */

#[derive(Debug, Default)]
pub struct RedditClientBuilder {
    cache: Option<ApiCache>,
    base_api: Option<Url>,
    token_url: Option<Url>,
    user_agent: Option<String>,
    credentials: Option<RedditCredentials>,
    retry_override: Option<RetryConfig>,
}

impl RedditClientBuilder {
    /// Share an existing cache (and its rate limit) with other callers.
    /// Default: a fresh [`ApiCache`] with default settings.
    #[must_use]
    pub fn cache(mut self, cache: ApiCache) -> Self {
        self.cache = Some(cache);
        self
    }

    #[must_use]
    pub fn credentials(mut self, client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        self.credentials = Some(RedditCredentials::new(client_id, client_secret));
        self
    }

    #[must_use]
    pub fn with_credentials(mut self, credentials: RedditCredentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Override the OAuth API base (e.g., `https://oauth.reddit.com/`).
    #[must_use]
    pub fn base_api(mut self, url: Url) -> Self {
        self.base_api = Some(url);
        self
    }

    /// Override the token endpoint.
    #[must_use]
    pub fn token_url(mut self, url: Url) -> Self {
        self.token_url = Some(url);
        self
    }

    /// The `User-Agent` header sent with every Reddit request.
    #[must_use]
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Overrides the cache's retry policy for Reddit calls only.
    #[must_use]
    pub fn retry_policy(mut self, cfg: Option<RetryConfig>) -> Self {
        self.retry_override = cfg;
        self
    }

    /// Build the client. Credentials fall back to the environment.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Auth` when no credentials are available, `ApiError::Url` for a
    /// bad default URL, or `ApiError::Http` if a default cache cannot be built.
    pub fn build(self) -> Result<RedditClient, ApiError> {
        let credentials = match self.credentials {
            Some(c) => c,
            None => RedditCredentials::from_env()?,
        };
        let cache = match self.cache {
            Some(c) => c,
            None => ApiCache::new()?,
        };
        let base_api = match self.base_api {
            Some(u) => u,
            None => Url::parse(DEFAULT_BASE_API)?,
        };
        let token_url = match self.token_url {
            Some(u) => u,
            None => Url::parse(DEFAULT_TOKEN_URL)?,
        };

        Ok(RedditClient {
            cache,
            base_api,
            token_url,
            user_agent: self
                .user_agent
                .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string()),
            credentials,
            retry_override: self.retry_override,
            token: Arc::new(RwLock::new(None)),
            token_fetch_lock: Arc::new(Mutex::new(())),
        })
    }
}
