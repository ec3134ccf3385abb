use serde::Deserialize;

#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: Option<String>,
    pub(crate) expires_in: Option<u64>,
    pub(crate) error: Option<String>,
}

/// Reddit wraps every object as `{"kind": "...", "data": {...}}`.
#[derive(Deserialize)]
pub(crate) struct Thing<T> {
    pub(crate) data: T,
}

#[derive(Deserialize)]
pub(crate) struct Listing<T> {
    #[serde(default = "Vec::new")]
    pub(crate) children: Vec<Thing<T>>,
    pub(crate) after: Option<String>,
}

#[derive(Deserialize)]
pub(crate) struct SubredditData {
    pub(crate) display_name: String,
    pub(crate) title: Option<String>,
    pub(crate) public_description: Option<String>,
    pub(crate) description: Option<String>,
    pub(crate) subscribers: Option<u64>,
    pub(crate) url: Option<String>,
    pub(crate) over18: Option<bool>,
    pub(crate) created_utc: Option<f64>,
    pub(crate) icon_img: Option<String>,
    pub(crate) community_icon: Option<String>,
    pub(crate) subreddit_type: Option<String>,
    // absent from most payloads
    pub(crate) min_karma: Option<u64>,
    pub(crate) min_account_age: Option<u64>,
}

#[derive(Deserialize)]
pub(crate) struct PostData {
    pub(crate) id: String,
    #[serde(default)]
    pub(crate) title: String,
    #[serde(default)]
    pub(crate) author: String,
    #[serde(default)]
    pub(crate) subreddit: String,
    #[serde(default)]
    pub(crate) score: i64,
    pub(crate) url: Option<String>,
    #[serde(default)]
    pub(crate) permalink: String,
    #[serde(default)]
    pub(crate) created_utc: f64,
    #[serde(default)]
    pub(crate) num_comments: u64,
    #[serde(default)]
    pub(crate) is_self: bool,
    #[serde(default)]
    pub(crate) selftext: String,
    pub(crate) upvote_ratio: Option<f64>,
}

/// Only `created_utc` matters when counting recent posts.
#[derive(Deserialize)]
pub(crate) struct PostStamp {
    #[serde(default)]
    pub(crate) created_utc: f64,
}

#[derive(Deserialize)]
pub(crate) struct RulesEnvelope {
    #[serde(default)]
    pub(crate) rules: Vec<RuleData>,
}

#[derive(Deserialize)]
pub(crate) struct RuleData {
    pub(crate) short_name: String,
    #[serde(default)]
    pub(crate) description: String,
    #[serde(default)]
    pub(crate) kind: String,
}
