//! Browser header profiles.
//!
//! Some CDNs refuse requests whose `Accept` / `User-Agent` pair does not
//! look like a real client, so every fetch walks this table in order until
//! one profile is accepted.

use url::Url;

/// A named, immutable bundle of request headers mimicking a real client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserProfile {
    pub name: &'static str,
    pub user_agent: &'static str,
    pub accept: &'static str,
    pub accept_language: &'static str,
}

pub const CHROME_DESKTOP: BrowserProfile = BrowserProfile {
    name: "chrome-desktop",
    user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) \
                 AppleWebKit/537.36 (KHTML, like Gecko) \
                 Chrome/124.0.0.0 Safari/537.36",
    accept: "text/html,application/xhtml+xml,application/xml;q=0.9,\
             image/avif,image/webp,*/*;q=0.8",
    accept_language: "en-US,en;q=0.9",
};

pub const FIREFOX_DESKTOP: BrowserProfile = BrowserProfile {
    name: "firefox-desktop",
    user_agent: "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
    accept: "*/*",
    accept_language: "en-US,en;q=0.5",
};

pub const SAFARI_IOS: BrowserProfile = BrowserProfile {
    name: "safari-ios",
    user_agent: "Mozilla/5.0 (iPhone; CPU iPhone OS 17_4 like Mac OS X) \
                 AppleWebKit/605.1.15 (KHTML, like Gecko) \
                 Version/17.4 Mobile/15E148 Safari/604.1",
    accept: "application/vnd.apple.mpegurl,application/x-mpegURL,*/*;q=0.8",
    accept_language: "en-US,en;q=0.9",
};

/// Profiles in the order the fetcher tries them.
pub static DEFAULT_PROFILES: &[BrowserProfile] = &[CHROME_DESKTOP, FIREFOX_DESKTOP, SAFARI_IOS];

impl BrowserProfile {
    /// The profile the live observer drives Chromium with.
    pub fn chrome_desktop() -> &'static BrowserProfile {
        &DEFAULT_PROFILES[0]
    }
}

/// Referer for a request: the origin (scheme + host + port) of the URL.
pub fn referer_for(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}://{host}:{port}/", url.scheme()),
        None => format!("{}://{host}/", url.scheme()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profiles_have_distinct_names() {
        let mut names: Vec<_> = DEFAULT_PROFILES.iter().map(|p| p.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), DEFAULT_PROFILES.len());
        assert_eq!(BrowserProfile::chrome_desktop().name, "chrome-desktop");
    }

    #[test]
    fn test_referer_is_origin() {
        let url = Url::parse("https://cdn.example.com/a/b/master.m3u8?x=1").unwrap();
        assert_eq!(referer_for(&url).as_deref(), Some("https://cdn.example.com/"));

        let url = Url::parse("http://127.0.0.1:8080/page").unwrap();
        assert_eq!(referer_for(&url).as_deref(), Some("http://127.0.0.1:8080/"));
    }

    #[test]
    fn test_referer_requires_host() {
        let url = Url::parse("data:text/plain,hello").unwrap();
        assert!(referer_for(&url).is_none());
    }
}
