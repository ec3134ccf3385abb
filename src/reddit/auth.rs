//! Client-credentials token acquisition for the OAuth API.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::time::Duration;

use super::{AccessToken, wire};
use crate::core::{ApiError, HttpMethod, client::CacheMode};

/// Tokens are refreshed this long before Reddit says they expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Used when the token response omits `expires_in`.
const FALLBACK_LIFETIME: Duration = Duration::from_secs(3600);

impl super::RedditClient {
    pub(crate) async fn access_token(&self) -> Result<String, ApiError> {
        // Fast path: a still-valid token under a read lock.
        if let Some(token) = self.valid_token().await {
            return Ok(token);
        }

        // Slow path: only one task talks to the token endpoint.
        let _guard = self.token_fetch_lock.lock().await;

        // Another task may have refreshed while this one waited.
        if let Some(token) = self.valid_token().await {
            return Ok(token);
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *self.token.write().await = Some(fresh);
        Ok(value)
    }

    pub(crate) async fn clear_token(&self) {
        let mut state = self.token.write().await;
        *state = None;
    }

    async fn valid_token(&self) -> Option<String> {
        let state = self.token.read().await;
        state
            .as_ref()
            .filter(|t| self.cache.now() < t.expires_at)
            .map(|t| t.value.clone())
    }

    async fn fetch_token(&self) -> Result<AccessToken, ApiError> {
        let basic = STANDARD.encode(format!(
            "{}:{}",
            self.credentials.client_id, self.credentials.client_secret
        ));

        let resp: wire::TokenResponse = self
            .cache
            .request(self.token_url.as_str())
            .method(HttpMethod::Post)
            .header("Authorization", format!("Basic {basic}"))
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("User-Agent", self.user_agent.as_str())
            .body("grant_type=client_credentials")
            .cache_mode(CacheMode::Bypass)
            .retry_policy(self.retry_override.clone())
            .fetch()
            .await?;

        if let Some(err) = resp.error {
            return Err(ApiError::Auth(format!("token endpoint returned error: {err}")));
        }
        let value = resp
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| ApiError::Auth("token response has no access_token".into()))?;

        let lifetime = resp
            .expires_in
            .map_or(FALLBACK_LIFETIME, Duration::from_secs)
            .saturating_sub(EXPIRY_MARGIN);

        let now = self.cache.now();
        let expires_at = now
            .checked_add(lifetime)
            .or_else(|| now.checked_add(FALLBACK_LIFETIME.saturating_sub(EXPIRY_MARGIN)))
            .unwrap_or(now);

        Ok(AccessToken { value, expires_at })
    }
}
