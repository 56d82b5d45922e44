//! Async HTTP fetch primitive wrapping reqwest.
//!
//! Not a browser, just GET requests. Each fetch walks the browser profile
//! table in priority order: a 406 is a soft rejection of that profile, any
//! other non-success status or transport error also moves on to the next
//! profile. Only when every profile has failed does the fetch fail, with the
//! last error seen.

use crate::attempt;
use crate::error::{FetchError, FetchResult};
use crate::profile::{self, BrowserProfile, DEFAULT_PROFILES};
use async_trait::async_trait;
use reqwest::header;
use std::time::Duration;
use url::Url;

/// Maximum redirect hops followed per request.
const MAX_REDIRECTS: usize = 10;

/// A fetched text document.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// Original requested URL.
    pub url: String,
    /// Final URL after redirects.
    pub final_url: String,
    /// HTTP status code.
    pub status: u16,
    /// Name of the profile that was accepted.
    pub profile: &'static str,
    /// Response body as text.
    pub body: String,
}

/// The text-fetch capability used by the crawler and the selector.
#[async_trait]
pub trait TextFetcher: Send + Sync {
    /// GET `url` and return its body and resolved URL.
    async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult<FetchedPage>;

    /// Like [`fetch`](Self::fetch), but keep at most `max_bytes` of the
    /// body. Implementations should stop reading once the cap is reached.
    async fn fetch_prefix(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> FetchResult<FetchedPage> {
        let mut page = self.fetch(url, timeout).await?;
        truncate_at_char_boundary(&mut page.body, max_bytes);
        Ok(page)
    }
}

/// reqwest-backed fetcher with browser-profile fallback.
#[derive(Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    profiles: Vec<BrowserProfile>,
}

impl HttpFetcher {
    /// Create a fetcher using the built-in profile table.
    pub fn new() -> Self {
        Self::with_profiles(DEFAULT_PROFILES.to_vec())
    }

    /// Create a fetcher that tries `profiles` in the given order.
    pub fn with_profiles(profiles: Vec<BrowserProfile>) -> Self {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .unwrap_or_default();

        Self { client, profiles }
    }

    async fn get_with_profile(
        &self,
        url: &Url,
        profile: &BrowserProfile,
        timeout: Duration,
        max_bytes: Option<usize>,
    ) -> FetchResult<FetchedPage> {
        let mut builder = self
            .client
            .get(url.clone())
            .timeout(timeout)
            .header(header::USER_AGENT, profile.user_agent)
            .header(header::ACCEPT, profile.accept)
            .header(header::ACCEPT_LANGUAGE, profile.accept_language);

        if let Some(referer) = profile::referer_for(url) {
            builder = builder.header(header::REFERER, referer);
        }

        let transport = |source| FetchError::Transport {
            url: url.to_string(),
            profile: profile.name,
            source,
        };

        let resp = builder.send().await.map_err(transport)?;
        let status = resp.status();

        if status == reqwest::StatusCode::NOT_ACCEPTABLE {
            return Err(FetchError::Rejected {
                url: url.to_string(),
                profile: profile.name,
            });
        }
        if !status.is_success() {
            return Err(FetchError::Status {
                url: url.to_string(),
                status: status.as_u16(),
                profile: profile.name,
            });
        }

        let final_url = resp.url().to_string();
        let body = match max_bytes {
            None => resp.text().await.map_err(transport)?,
            Some(limit) => read_prefix(resp, limit).await.map_err(transport)?,
        };

        Ok(FetchedPage {
            url: url.to_string(),
            final_url,
            status: status.as_u16(),
            profile: profile.name,
            body,
        })
    }

    async fn fetch_with_limit(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: Option<usize>,
    ) -> FetchResult<FetchedPage> {
        let parsed = Url::parse(url).map_err(|e| FetchError::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        let attempts = attempt::first_success(self.profiles.iter(), |profile| {
            self.get_with_profile(&parsed, profile, timeout, max_bytes)
        })
        .await;

        for (profile, err) in &attempts.failures {
            if err.is_rejection() {
                tracing::debug!("{url}: profile {} rejected with 406", profile.name);
            } else {
                tracing::debug!("{url}: profile {} failed: {err}", profile.name);
            }
        }

        attempts
            .into_result()
            .map_err(|last| last.unwrap_or(FetchError::NoProfiles))
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TextFetcher for HttpFetcher {
    async fn fetch(&self, url: &str, timeout: Duration) -> FetchResult<FetchedPage> {
        self.fetch_with_limit(url, timeout, None).await
    }

    async fn fetch_prefix(
        &self,
        url: &str,
        timeout: Duration,
        max_bytes: usize,
    ) -> FetchResult<FetchedPage> {
        self.fetch_with_limit(url, timeout, Some(max_bytes)).await
    }
}

/// Read the body chunk by chunk, stopping once `limit` bytes are buffered.
/// Invalid UTF-8 (including a character cut at the limit) is replaced.
async fn read_prefix(mut resp: reqwest::Response, limit: usize) -> reqwest::Result<String> {
    let mut buf: Vec<u8> = Vec::new();
    while buf.len() < limit {
        match resp.chunk().await? {
            Some(chunk) => buf.extend_from_slice(&chunk),
            None => break,
        }
    }
    buf.truncate(limit);
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn truncate_at_char_boundary(body: &mut String, max_bytes: usize) {
    if body.len() <= max_bytes {
        return;
    }
    let mut cut = max_bytes;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    body.truncate(cut);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::{CHROME_DESKTOP, FIREFOX_DESKTOP};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, Request, ResponseTemplate};

    const SECS: Duration = Duration::from_secs(5);

    /// Matches a header by its whole value. User agents and language lists
    /// contain commas, which `matchers::header` splits on.
    fn exact_header(
        name: &'static str,
        value: impl Into<String>,
    ) -> impl Fn(&Request) -> bool + Send + Sync + 'static {
        let value = value.into();
        move |req: &Request| {
            req.headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .is_some_and(|v| v == value)
        }
    }

    #[tokio::test]
    async fn test_sends_profile_headers_and_referer() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/watch"))
            .and(exact_header("user-agent", CHROME_DESKTOP.user_agent))
            .and(exact_header("accept-language", CHROME_DESKTOP.accept_language))
            .and(exact_header("referer", format!("{}/", server.uri())))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::new();
        let page = fetcher
            .fetch(&format!("{}/watch", server.uri()), SECS)
            .await
            .unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.profile, "chrome-desktop");
        assert_eq!(page.body, "<html></html>");
    }

    #[tokio::test]
    async fn test_follows_redirects_and_reports_final_url() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/old"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/new"),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/new"))
            .respond_with(ResponseTemplate::new(200).set_body_string("moved"))
            .mount(&server)
            .await;

        let page = HttpFetcher::new()
            .fetch(&format!("{}/old", server.uri()), SECS)
            .await
            .unwrap();

        assert_eq!(page.final_url, format!("{}/new", server.uri()));
        assert_eq!(page.body, "moved");
    }

    #[tokio::test]
    async fn test_all_profiles_fail_returns_last_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(exact_header("user-agent", CHROME_DESKTOP.user_agent))
            .respond_with(ResponseTemplate::new(406))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(exact_header("user-agent", FIREFOX_DESKTOP.user_agent))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let fetcher = HttpFetcher::with_profiles(vec![CHROME_DESKTOP, FIREFOX_DESKTOP]);
        let err = fetcher
            .fetch(&format!("{}/page", server.uri()), SECS)
            .await
            .unwrap_err();

        match err {
            FetchError::Status {
                status, profile, ..
            } => {
                assert_eq!(status, 403);
                assert_eq!(profile, "firefox-desktop");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_invalid_url() {
        let err = HttpFetcher::new().fetch("not a url", SECS).await.unwrap_err();
        assert!(matches!(err, FetchError::InvalidUrl { .. }));
    }

    #[tokio::test]
    async fn test_no_profiles() {
        let err = HttpFetcher::with_profiles(Vec::new())
            .fetch("https://example.com/", SECS)
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NoProfiles));
    }

    #[tokio::test]
    async fn test_fetch_prefix_stops_at_cap() {
        let server = MockServer::start().await;
        let body = format!("#EXTM3U\n{}", "#EXTINF:4,\nseg.ts\n".repeat(50_000));
        Mock::given(method("GET"))
            .and(path("/huge.m3u8"))
            .respond_with(ResponseTemplate::new(200).set_body_string(body))
            .mount(&server)
            .await;

        let page = HttpFetcher::new()
            .fetch_prefix(&format!("{}/huge.m3u8", server.uri()), SECS, 4096)
            .await
            .unwrap();

        assert_eq!(page.body.len(), 4096);
        assert!(page.body.starts_with("#EXTM3U\n#EXTINF:4,"));
    }

    #[test]
    fn test_truncate_keeps_char_boundary() {
        let mut body = "aé".to_string();
        truncate_at_char_boundary(&mut body, 2);
        assert_eq!(body, "a");

        let mut short = "abc".to_string();
        truncate_at_char_boundary(&mut short, 10);
        assert_eq!(short, "abc");
    }
}
