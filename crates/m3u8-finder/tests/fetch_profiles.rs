//! Browser-profile fallback of the HTTP fetch primitive.

use m3u8_finder::acquisition::http_client::{HttpFetcher, TextFetcher};
use m3u8_finder::error::FetchError;
use m3u8_finder::profile::{CHROME_DESKTOP, DEFAULT_PROFILES, FIREFOX_DESKTOP};
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

/// Matches the whole `User-Agent` value; `matchers::header` would split it
/// on the commas inside "(KHTML, like Gecko)".
fn user_agent_is(expected: &'static str) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
    move |req: &Request| {
        req.headers
            .get("user-agent")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v == expected)
    }
}

#[tokio::test]
async fn test_406_moves_on_to_next_profile() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(user_agent_is(CHROME_DESKTOP.user_agent))
        .respond_with(ResponseTemplate::new(406))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/page"))
        .and(user_agent_is(FIREFOX_DESKTOP.user_agent))
        .respond_with(ResponseTemplate::new(200).set_body_string("welcome"))
        .expect(1)
        .mount(&server)
        .await;

    let page = HttpFetcher::new()
        .fetch(&format!("{}/page", server.uri()), Duration::from_secs(5))
        .await
        .unwrap();

    assert_eq!(page.profile, "firefox-desktop");
    assert_eq!(page.body, "welcome");
}

#[tokio::test]
async fn test_every_profile_tried_before_giving_up() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(406))
        .expect(DEFAULT_PROFILES.len() as u64)
        .mount(&server)
        .await;

    let err = HttpFetcher::new()
        .fetch(&format!("{}/page", server.uri()), Duration::from_secs(5))
        .await
        .unwrap_err();

    assert!(err.is_rejection());
    match err {
        FetchError::Rejected { profile, .. } => {
            assert_eq!(profile, DEFAULT_PROFILES[DEFAULT_PROFILES.len() - 1].name)
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_slow_server_times_out() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("late")
                .set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = HttpFetcher::with_profiles(vec![CHROME_DESKTOP])
        .fetch(&format!("{}/slow", server.uri()), Duration::from_millis(200))
        .await
        .unwrap_err();

    assert!(matches!(err, FetchError::Transport { .. }));
}
