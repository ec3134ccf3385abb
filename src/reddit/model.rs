use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Public facts about a subreddit, plus how busy it has been in the last 24 hours.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubredditInfo {
    pub name: String,
    pub title: String,
    pub description: String,
    pub subscribers: u64,
    pub url: String,
    pub over18: bool,
    pub created: Option<DateTime<Utc>>,
    pub icon_img: Option<String>,
    pub community_icon: Option<String>,
    /// Posts created in the last 24 hours, out of the newest 100.
    pub recent_posts: usize,
}

/// A subreddit as returned by search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubredditSummary {
    pub name: String,
    pub title: String,
    pub description: String,
    pub subscribers: u64,
    pub url: String,
    pub over18: bool,
    pub created: Option<DateTime<Utc>>,
    pub recent_posts: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubredditRule {
    pub short_name: String,
    pub description: String,
    /// `link`, `comment` or `all`.
    pub kind: String,
}

/// What an account needs before it may post.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostingRequirements {
    pub min_karma: u64,
    pub min_account_age: u64,
    pub is_restricted: bool,
    pub is_private: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubredditRules {
    pub rules: Vec<SubredditRule>,
    pub requirements: PostingRequirements,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    pub title: String,
    pub author: String,
    pub subreddit: String,
    pub score: i64,
    pub url: Option<String>,
    /// Absolute link to the comments page.
    pub permalink: String,
    pub created: Option<DateTime<Utc>>,
    pub num_comments: u64,
    pub is_self_post: bool,
    pub selftext: String,
    pub upvote_ratio: Option<f64>,
}

/// One page of posts plus the cursor for the next one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostListing {
    pub posts: Vec<Post>,
    pub after: Option<String>,
}

/// Listing order for subreddit posts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PostSort {
    #[default]
    Hot,
    New,
    Top,
    Rising,
    Controversial,
}

impl PostSort {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Hot => "hot",
            Self::New => "new",
            Self::Top => "top",
            Self::Rising => "rising",
            Self::Controversial => "controversial",
        }
    }
}

impl fmt::Display for PostSort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time window for `top` and `controversial` listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeFilter {
    Hour,
    #[default]
    Day,
    Week,
    Month,
    Year,
    All,
}

impl TimeFilter {
    pub(crate) const fn as_str(self) -> &'static str {
        match self {
            Self::Hour => "hour",
            Self::Day => "day",
            Self::Week => "week",
            Self::Month => "month",
            Self::Year => "year",
            Self::All => "all",
        }
    }
}

impl fmt::Display for TimeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
