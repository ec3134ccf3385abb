use apicache_rs::{ApiError, RequestOptions, RetryConfig, RetryOn};
use serde_json::json;
use std::time::Duration;

use crate::common::{ManualClock, ScriptedServer, cache, cache_builder};

#[tokio::test]
async fn one_failure_then_success_returns_the_payload() {
    let server = ScriptedServer::start(vec![(503, "{}"), (200, r#"{"ok":true}"#)]).await;

    let clock = ManualClock::new();
    let cache = cache(&clock, 0, 1, 60_000);
    let url = server.url("/recover");

    let payload = cache
        .get_cached_response(&url, &RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(payload, json!({"ok": true}));
    assert_eq!(server.hits(), 2);
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(1)]);

    // the recovered payload is cached like any other
    cache
        .get_cached_response(&url, &RequestOptions::get())
        .await
        .unwrap();
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn selective_policy_stops_on_a_non_retryable_status() {
    let server = ScriptedServer::start(vec![(400, r#"{"error":"bad"}"#)]).await;

    let clock = ManualClock::new();
    let cache = cache_builder(&clock, 0, 0, 60_000)
        .retry_config(RetryConfig {
            retry_on: RetryOn::transient(),
            ..RetryConfig::default()
        })
        .build()
        .unwrap();

    let err = cache
        .get_cached_response(&server.url("/bad"), &RequestOptions::get())
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::RequestFailed { attempts: 1, .. }), "{err:?}");
    assert_eq!(err.status(), Some(400));
    assert_eq!(server.hits(), 1);
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn selective_policy_still_retries_throttling() {
    let server = ScriptedServer::start(vec![(429, "{}"), (429, "{}"), (200, r#"{"n":3}"#)]).await;

    let clock = ManualClock::new();
    let cache = cache_builder(&clock, 0, 0, 60_000)
        .retry_config(RetryConfig {
            retry_on: RetryOn::transient(),
            ..RetryConfig::default()
        })
        .build()
        .unwrap();

    let payload = cache
        .get_cached_response(&server.url("/throttled"), &RequestOptions::get())
        .await
        .unwrap();

    assert_eq!(payload, json!({"n": 3}));
    assert_eq!(server.hits(), 3);
}
