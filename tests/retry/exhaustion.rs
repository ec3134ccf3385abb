use apicache_rs::{ApiError, Failure, RequestOptions, RetryConfig};
use httpmock::Method::GET;

use crate::common::{ManualClock, cache, cache_builder, refused_url, setup_server};

#[tokio::test]
async fn persistent_5xx_makes_exactly_k_plus_one_attempts() {
    let server = setup_server();
    let fail_mock = server.mock(|when, then| {
        when.method(GET).path("/flaky");
        then.status(503).body("Service Unavailable");
    });

    let max_retries = 3;
    let clock = ManualClock::new();
    let cache = cache(&clock, 0, max_retries, 60_000);

    let result = cache
        .get_cached_response(&server.url("/flaky"), &RequestOptions::get())
        .await;

    // 1 initial + 3 retries
    fail_mock.assert_calls((1 + max_retries) as usize);

    match result {
        Err(ApiError::RequestFailed {
            attempts,
            last: Failure::Status(status),
            ..
        }) => {
            assert_eq!(status, 503);
            assert_eq!(attempts, max_retries + 1);
        }
        other => panic!("Expected RequestFailed after all retries failed, got {other:?}"),
    }
}

#[tokio::test]
async fn client_errors_are_retried_by_default() {
    let server = setup_server();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/bad");
        then.status(400).body(r#"{"error":"bad request"}"#);
    });

    let clock = ManualClock::new();
    let cache = cache(&clock, 0, 2, 60_000);

    let err = cache
        .get_cached_response(&server.url("/bad"), &RequestOptions::get())
        .await
        .unwrap_err();
    mock.assert_calls(3);
    assert_eq!(err.status(), Some(400));
    assert!(
        err.to_string().contains("failed after 2 retries: status 400"),
        "{err}"
    );
}

#[tokio::test]
async fn zero_retries_means_one_attempt() {
    let server = setup_server();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/once");
        then.status(502);
    });

    let clock = ManualClock::new();
    let cache = cache(&clock, 0, 0, 60_000);

    let err = cache
        .get_cached_response(&server.url("/once"), &RequestOptions::get())
        .await
        .unwrap_err();
    mock.assert_calls(1);
    assert_eq!(err.attempts(), Some(1));
    assert!(clock.sleeps().is_empty());
}

#[tokio::test]
async fn disabled_retry_ignores_the_budget() {
    let server = setup_server();
    let mock = server.mock(|when, then| {
        when.method(GET).path("/off");
        then.status(500);
    });

    let clock = ManualClock::new();
    let cache = cache_builder(&clock, 0, 0, 60_000)
        .retry_config(RetryConfig {
            enabled: false,
            max_retries: 5,
            ..RetryConfig::default()
        })
        .build()
        .unwrap();

    let _ = cache
        .get_cached_response(&server.url("/off"), &RequestOptions::get())
        .await;
    mock.assert_calls(1);
}

#[tokio::test]
async fn connection_failures_are_retried_then_surface_as_transport() {
    let clock = ManualClock::new();
    let cache = cache(&clock, 0, 2, 60_000);

    let err = cache
        .get_cached_response(&refused_url(), &RequestOptions::get())
        .await
        .unwrap_err();

    match err {
        ApiError::RequestFailed {
            attempts,
            last: Failure::Transport(_),
            ..
        } => assert_eq!(attempts, 3),
        other => panic!("expected a transport failure, got {other:?}"),
    }
    assert_eq!(clock.sleeps().len(), 2);
}
