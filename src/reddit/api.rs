use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::de::DeserializeOwned;
use url::Url;

use super::{
    RedditClient,
    model::{
        Post, PostListing, PostSort, PostingRequirements, SubredditInfo, SubredditRule,
        SubredditRules, SubredditSummary, TimeFilter,
    },
    wire::{Listing, PostData, PostStamp, RulesEnvelope, SubredditData, Thing},
};
use crate::core::{
    ApiError,
    client::{RetryConfig, RetryOn},
};

/// How far back a post still counts as recent.
const RECENT_WINDOW_SECS: i64 = 24 * 60 * 60;

/// Page size used when counting recent posts.
const RECENT_SAMPLE: &str = "100";

/// Accepts `rust`, `r/rust` or `/r/rust/`; rejects anything that is not a plausible
/// subreddit name so it can be spliced into a path.
pub(super) fn normalize_subreddit(name: &str) -> Result<&str, ApiError> {
    let trimmed = name.trim().trim_matches('/');
    let bare = trimmed.strip_prefix("r/").unwrap_or(trimmed);
    if bare.is_empty() {
        return Err(ApiError::InvalidInput("subreddit name is required".into()));
    }
    if !bare.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(ApiError::InvalidInput(format!(
            "invalid subreddit name: {name}"
        )));
    }
    Ok(bare)
}

/// Accepts a bare id or a `t3_` fullname.
pub(super) fn normalize_post_id(id: &str) -> Result<&str, ApiError> {
    let trimmed = id.trim();
    let bare = trimmed.strip_prefix("t3_").unwrap_or(trimmed);
    if bare.is_empty() {
        return Err(ApiError::InvalidInput("post id is required".into()));
    }
    if !bare.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(ApiError::InvalidInput(format!("invalid post id: {id}")));
    }
    Ok(bare)
}

fn from_epoch(secs: f64) -> Option<DateTime<Utc>> {
    #[allow(clippy::cast_possible_truncation)]
    DateTime::from_timestamp(secs.trunc() as i64, 0)
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.is_empty())
}

fn subreddit_url(client: &RedditClient, name: &str, suffix: &str) -> Result<Url, ApiError> {
    Ok(client.base_api.join(&format!("r/{name}/{suffix}"))?)
}

/// Authenticated GET through the cache. A 401 means the token went stale: drop it,
/// fetch a new one, and try once more.
async fn get_authed<T: DeserializeOwned>(client: &RedditClient, url: &Url) -> Result<T, ApiError> {
    let token = client.access_token().await?;
    match send_authed(client, url, &token).await {
        Err(e) if e.status() == Some(401) => {
            #[cfg(feature = "tracing")]
            tracing::debug!(url = %url, "401 from reddit; refreshing token");
            client.clear_token().await;
            let token = client.access_token().await?;
            send_authed(client, url, &token).await
        }
        other => other,
    }
}

/// The client's retry policy, narrowed so that 401 and other client errors come back
/// after one attempt instead of sitting through the backoff schedule.
fn authed_retry_policy(client: &RedditClient) -> RetryConfig {
    let mut cfg = client
        .retry_override
        .clone()
        .unwrap_or_else(|| client.cache.retry_config().clone());
    cfg.retry_on = match cfg.retry_on {
        RetryOn::AnyFailure => RetryOn::transient(),
        RetryOn::Statuses(mut list) => {
            list.retain(|&status| status != 401);
            RetryOn::Statuses(list)
        }
    };
    cfg
}

async fn send_authed<T: DeserializeOwned>(
    client: &RedditClient,
    url: &Url,
    token: &str,
) -> Result<T, ApiError> {
    client
        .cache
        .request(url.as_str())
        .bearer_auth(token)
        .header("User-Agent", client.user_agent.as_str())
        .retry_policy(Some(authed_retry_policy(client)))
        .fetch()
        .await
}

async fn fetch_about(client: &RedditClient, name: &str) -> Result<SubredditData, ApiError> {
    let url = subreddit_url(client, name, "about.json")?;
    let about: Thing<SubredditData> = get_authed(client, &url).await?;
    Ok(about.data)
}

/// Posts among the newest 100 created within the last 24 hours. Failures count as zero,
/// since the figure is decorative.
async fn count_recent_posts(client: &RedditClient, name: &str) -> usize {
    let counted = async {
        let mut url = subreddit_url(client, name, "new.json")?;
        url.query_pairs_mut().append_pair("limit", RECENT_SAMPLE);
        let listing: Thing<Listing<PostStamp>> = get_authed(client, &url).await?;

        #[allow(clippy::cast_precision_loss)]
        let cutoff = (client.cache.wall_now().timestamp() - RECENT_WINDOW_SECS) as f64;
        Ok::<usize, ApiError>(
            listing
                .data
                .children
                .iter()
                .filter(|p| p.data.created_utc > cutoff)
                .count(),
        )
    };

    match counted.await {
        Ok(n) => n,
        Err(_e) => {
            #[cfg(feature = "tracing")]
            tracing::warn!(subreddit = name, error = %_e, "could not count recent posts");
            0
        }
    }
}

pub(super) async fn fetch_subreddit_info(
    client: &RedditClient,
    name: &str,
) -> Result<SubredditInfo, ApiError> {
    let name = normalize_subreddit(name)?;
    let about = fetch_about(client, name).await?;
    let recent_posts = count_recent_posts(client, name).await;

    let description = non_empty(about.public_description)
        .or(about.description)
        .unwrap_or_default();

    Ok(SubredditInfo {
        name: about.display_name,
        title: about.title.unwrap_or_default(),
        description,
        subscribers: about.subscribers.unwrap_or(0),
        url: about.url.unwrap_or_default(),
        over18: about.over18.unwrap_or(false),
        created: about.created_utc.and_then(from_epoch),
        icon_img: non_empty(about.icon_img),
        community_icon: non_empty(about.community_icon),
        recent_posts,
    })
}

pub(super) async fn fetch_rules(
    client: &RedditClient,
    name: &str,
) -> Result<SubredditRules, ApiError> {
    let name = normalize_subreddit(name)?;
    let url = subreddit_url(client, name, "about/rules.json")?;
    let envelope: RulesEnvelope = get_authed(client, &url).await?;
    let about = fetch_about(client, name).await?;

    let rules = envelope
        .rules
        .into_iter()
        .map(|r| SubredditRule {
            short_name: r.short_name,
            description: r.description,
            kind: r.kind,
        })
        .collect();

    let subreddit_type = about.subreddit_type.as_deref();
    let requirements = PostingRequirements {
        min_karma: about.min_karma.unwrap_or(0),
        min_account_age: about.min_account_age.unwrap_or(0),
        is_restricted: subreddit_type == Some("restricted"),
        is_private: subreddit_type == Some("private"),
    };

    Ok(SubredditRules {
        rules,
        requirements,
    })
}

fn to_post(p: PostData) -> Post {
    Post {
        permalink: format!("https://reddit.com{}", p.permalink),
        created: from_epoch(p.created_utc),
        id: p.id,
        title: p.title,
        author: p.author,
        subreddit: p.subreddit,
        score: p.score,
        url: p.url,
        num_comments: p.num_comments,
        is_self_post: p.is_self,
        selftext: p.selftext,
        upvote_ratio: p.upvote_ratio,
    }
}

pub(super) async fn fetch_posts(
    client: &RedditClient,
    name: &str,
    sort: PostSort,
    limit: u32,
    time: TimeFilter,
    after: Option<&str>,
) -> Result<PostListing, ApiError> {
    let name = normalize_subreddit(name)?;
    let mut url = subreddit_url(client, name, &format!("{}.json", sort.as_str()))?;
    {
        let mut qp = url.query_pairs_mut();
        qp.append_pair("limit", &limit.to_string());
        qp.append_pair("t", time.as_str());
        if let Some(cursor) = after.filter(|a| !a.is_empty()) {
            qp.append_pair("after", cursor);
        }
    }

    let listing: Thing<Listing<PostData>> = get_authed(client, &url).await?;
    Ok(PostListing {
        posts: listing
            .data
            .children
            .into_iter()
            .map(|c| to_post(c.data))
            .collect(),
        after: listing.data.after,
    })
}

pub(super) async fn fetch_post(client: &RedditClient, id: &str) -> Result<Post, ApiError> {
    let id = normalize_post_id(id)?;
    let mut url = client.base_api.join("api/info")?;
    url.query_pairs_mut().append_pair("id", &format!("t3_{id}"));

    let listing: Thing<Listing<PostData>> = match get_authed(client, &url).await {
        Err(e) if e.status() == Some(404) => return Err(ApiError::NotFound(format!("post {id}"))),
        other => other?,
    };

    listing
        .data
        .children
        .into_iter()
        .next()
        .map(|c| to_post(c.data))
        .ok_or_else(|| ApiError::NotFound(format!("post {id}")))
}

pub(super) async fn search_subreddits(
    client: &RedditClient,
    query: &str,
    limit: u32,
) -> Result<Vec<SubredditSummary>, ApiError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(ApiError::InvalidInput("search query is required".into()));
    }

    let mut url = client.base_api.join("subreddits/search.json")?;
    url.query_pairs_mut()
        .append_pair("q", query)
        .append_pair("limit", &limit.to_string());

    let listing: Thing<Listing<SubredditData>> = get_authed(client, &url).await?;
    let found: Vec<SubredditData> = listing.data.children.into_iter().map(|c| c.data).collect();

    // The shared rate limiter spaces these out; running them together only overlaps the waits.
    let counts = join_all(
        found
            .iter()
            .map(|s| count_recent_posts(client, &s.display_name)),
    )
    .await;

    Ok(found
        .into_iter()
        .zip(counts)
        .map(|(s, recent_posts)| SubredditSummary {
            name: s.display_name,
            title: s.title.unwrap_or_default(),
            description: s.public_description.unwrap_or_default(),
            subscribers: s.subscribers.unwrap_or(0),
            url: s.url.unwrap_or_default(),
            over18: s.over18.unwrap_or(false),
            created: s.created_utc.and_then(from_epoch),
            recent_posts,
        })
        .collect())
}
