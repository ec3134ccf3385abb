use apicache_rs::ApiError;
use apicache_rs::reddit::{PostSort, TimeFilter};
use httpmock::Method::GET;
use serde_json::json;
use std::time::Duration;

use crate::common::{
    ManualClock, WALL_ORIGIN_SECS, fixture, mock_token, reddit_client, setup_server,
};

fn listing_created_ago(offsets_secs: &[i64]) -> serde_json::Value {
    let children: Vec<_> = offsets_secs
        .iter()
        .enumerate()
        .map(|(i, ago)| json!({"kind": "t3", "data": {"id": format!("p{i}"), "created_utc": (WALL_ORIGIN_SECS - ago) as f64}}))
        .collect();
    json!({"kind": "Listing", "data": {"after": null, "children": children}})
}

#[tokio::test]
async fn subreddit_info_maps_about_and_counts_recent_posts() {
    let server = setup_server();
    let token = mock_token(&server, "tok-1");
    let about = server.mock(|when, then| {
        when.method(GET)
            .path("/r/rust/about.json")
            .header("authorization", "Bearer tok-1")
            .header("user-agent", "apicache-rs-tests/0.1");
        then.status(200)
            .header("content-type", "application/json")
            .body(fixture("reddit_about_rust"));
    });
    let recent = listing_created_ago(&[60, 3_600, 20 * 3_600, 3 * 86_400]);
    let new = server.mock(|when, then| {
        when.method(GET)
            .path("/r/rust/new.json")
            .query_param("limit", "100");
        then.status(200).json_body(recent);
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);
    let info = client.subreddit_info("r/rust").await.unwrap();

    token.assert();
    about.assert();
    new.assert();

    assert_eq!(info.name, "rust");
    assert_eq!(info.title, "The Rust Programming Language");
    // empty public description falls back to the long one
    assert!(info.description.starts_with("A place for all things"));
    assert_eq!(info.subscribers, 312_456);
    assert_eq!(info.url, "/r/rust/");
    assert!(!info.over18);
    assert_eq!(info.icon_img, None);
    assert!(info.community_icon.is_some());
    assert_eq!(
        info.created.map(|d| d.to_rfc3339()),
        Some("2010-11-30T19:30:16+00:00".to_string())
    );
    assert_eq!(info.recent_posts, 3);
}

#[tokio::test]
async fn recent_window_follows_the_injected_clock() {
    let server = setup_server();
    mock_token(&server, "tok-1");
    server.mock(|when, then| {
        when.method(GET).path("/r/rust/about.json");
        then.status(200).body(fixture("reddit_about_rust"));
    });
    let new = server.mock(|when, then| {
        when.method(GET).path("/r/rust/new.json");
        then.status(200)
            .json_body(listing_created_ago(&[60, 3_600, 20 * 3_600]));
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);
    assert_eq!(client.subreddit_info("rust").await.unwrap().recent_posts, 3);

    // 23h later only the post made a minute before the origin is inside the window
    clock.advance(Duration::from_secs(23 * 3_600));
    assert_eq!(client.subreddit_info("rust").await.unwrap().recent_posts, 1);
    new.assert_calls(2);
}

#[tokio::test]
async fn reddit_calls_still_retry_transient_statuses() {
    let server = setup_server();
    mock_token(&server, "tok-1");
    let hot = server.mock(|when, then| {
        when.method(GET).path("/r/rust/hot.json");
        then.status(503);
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 2);
    let err = client.posts("rust").fetch().await.unwrap_err();

    assert_eq!(err.status(), Some(503));
    hot.assert_calls(3);
    assert_eq!(
        clock.sleeps(),
        vec![Duration::from_secs(1), Duration::from_secs(2)]
    );
}

#[tokio::test]
async fn missing_post_is_not_retried() {
    let server = setup_server();
    mock_token(&server, "tok-1");
    let info = server.mock(|when, then| {
        when.method(GET).path("/api/info");
        then.status(404);
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 3);
    let err = client.post("abc123").await.unwrap_err();

    assert!(matches!(err, ApiError::NotFound(_)), "{err:?}");
    info.assert_calls(1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn recent_post_count_degrades_to_zero() {
    let server = setup_server();
    mock_token(&server, "tok-1");
    server.mock(|when, then| {
        when.method(GET).path("/r/rust/about.json");
        then.status(200).body(fixture("reddit_about_rust"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/r/rust/new.json");
        then.status(503);
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);
    let info = client.subreddit_info("rust").await.unwrap();
    assert_eq!(info.recent_posts, 0);
}

#[tokio::test]
async fn repeated_lookups_reuse_token_and_cached_payloads() {
    let server = setup_server();
    let token = mock_token(&server, "tok-1");
    let about = server.mock(|when, then| {
        when.method(GET).path("/r/rust/about.json");
        then.status(200).body(fixture("reddit_about_rust"));
    });
    let new = server.mock(|when, then| {
        when.method(GET).path("/r/rust/new.json");
        then.status(200).json_body(listing_created_ago(&[10]));
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);
    let first = client.subreddit_info("rust").await.unwrap();
    let second = client.subreddit_info("rust").await.unwrap();

    assert_eq!(first, second);
    token.assert_calls(1);
    about.assert_calls(1);
    new.assert_calls(1);
}

#[tokio::test]
async fn rules_include_posting_requirements() {
    let server = setup_server();
    mock_token(&server, "tok-1");
    let rules = server.mock(|when, then| {
        when.method(GET).path("/r/rust/about/rules.json");
        then.status(200).body(fixture("reddit_rules_rust"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/r/rust/about.json");
        then.status(200).body(fixture("reddit_about_rust"));
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);
    let out = client.rules("rust").await.unwrap();

    rules.assert();
    assert_eq!(out.rules.len(), 2);
    assert_eq!(out.rules[0].short_name, "Be civil");
    assert_eq!(out.rules[1].kind, "link");
    assert_eq!(out.requirements.min_karma, 10);
    assert_eq!(out.requirements.min_account_age, 7);
    assert!(out.requirements.is_restricted);
    assert!(!out.requirements.is_private);
}

#[tokio::test]
async fn posts_builder_configures_request() {
    let server = setup_server();
    mock_token(&server, "tok-1");
    let top = server.mock(|when, then| {
        when.method(GET)
            .path("/r/rust/top.json")
            .query_param("limit", "2")
            .query_param("t", "week")
            .query_param("after", "t3_prev");
        then.status(200).body(fixture("reddit_hot_rust"));
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);
    let page = client
        .posts("rust")
        .sort(PostSort::Top)
        .limit(2)
        .time(TimeFilter::Week)
        .after(Some("t3_prev".into()))
        .fetch()
        .await
        .unwrap();

    top.assert();
    assert_eq!(page.after.as_deref(), Some("t3_1abcde"));
    assert_eq!(page.posts.len(), 2);

    let link = &page.posts[0];
    assert_eq!(link.id, "1aaaaa");
    assert_eq!(
        link.permalink,
        "https://reddit.com/r/rust/comments/1aaaaa/this_week_in_rust/"
    );
    assert!(!link.is_self_post);
    assert_eq!(link.upvote_ratio, Some(0.97));

    let question = &page.posts[1];
    assert!(question.is_self_post);
    assert_eq!(question.num_comments, 18);
    assert_eq!(question.upvote_ratio, None);
}

#[tokio::test]
async fn posts_default_to_hot_day_thirty() {
    let server = setup_server();
    mock_token(&server, "tok-1");
    let hot = server.mock(|when, then| {
        when.method(GET)
            .path("/r/rust/hot.json")
            .query_param("limit", "30")
            .query_param("t", "day");
        then.status(200).body(fixture("reddit_hot_rust"));
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);
    client.posts("rust").fetch().await.unwrap();
    hot.assert();
}

#[tokio::test]
async fn single_post_lookup_by_fullname() {
    let server = setup_server();
    mock_token(&server, "tok-1");
    let info = server.mock(|when, then| {
        when.method(GET)
            .path("/api/info")
            .query_param("id", "t3_1abcde");
        then.status(200).body(fixture("reddit_hot_rust"));
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);
    let post = client.post("t3_1abcde").await.unwrap();

    info.assert();
    // first child of the listing
    assert_eq!(post.id, "1aaaaa");
    assert_eq!(post.author, "rustbot");
    assert_eq!(post.subreddit, "rust");
}

#[tokio::test]
async fn empty_info_listing_is_not_found() {
    let server = setup_server();
    mock_token(&server, "tok-1");
    server.mock(|when, then| {
        when.method(GET).path("/api/info");
        then.status(200)
            .json_body(json!({"kind": "Listing", "data": {"after": null, "children": []}}));
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);
    let err = client.post("zzz999").await.unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)), "{err:?}");
}

#[tokio::test]
async fn search_returns_summaries_with_recent_counts() {
    let server = setup_server();
    mock_token(&server, "tok-1");
    let search = server.mock(|when, then| {
        when.method(GET)
            .path("/subreddits/search.json")
            .query_param("q", "rust lang")
            .query_param("limit", "5");
        then.status(200).body(fixture("reddit_search_rust"));
    });
    server.mock(|when, then| {
        when.method(GET).path("/r/rust/new.json");
        then.status(200).json_body(listing_created_ago(&[5, 50]));
    });
    server.mock(|when, then| {
        when.method(GET).path("/r/learnrust/new.json");
        then.status(200).json_body(listing_created_ago(&[2 * 86_400]));
    });

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);
    let found = client.search_subreddits("rust lang", 5).await.unwrap();

    search.assert();
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].name, "rust");
    assert_eq!(found[0].recent_posts, 2);
    assert_eq!(found[1].name, "learnrust");
    assert_eq!(found[1].description, "Questions welcome.");
    assert_eq!(found[1].recent_posts, 0);
}

#[tokio::test]
async fn invalid_input_is_rejected_before_any_request() {
    let server = setup_server();
    let token = mock_token(&server, "tok-1");

    let clock = ManualClock::new();
    let client = reddit_client(&server, &clock, 0);

    assert!(matches!(
        client.subreddit_info("  ").await,
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        client.rules("../admin").await,
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        client.post("").await,
        Err(ApiError::InvalidInput(_))
    ));
    assert!(matches!(
        client.search_subreddits("", 10).await,
        Err(ApiError::InvalidInput(_))
    ));
    token.assert_calls(0);
}
