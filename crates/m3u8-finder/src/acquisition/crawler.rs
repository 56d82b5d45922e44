//! Static crawler: breadth-first discovery through embedded frames.
//!
//! Fetches the page, extracts manifest candidates and frame URLs, then
//! visits frames level by level up to a configured depth. Only the root
//! fetch is fatal; a frame that fails to load is skipped. Fetches are
//! issued one at a time, so a run costs at most
//! `1 + max_depth * max_frames_per_level` page fetches plus the probes.

use crate::acquisition::extract::{extract_candidates, extract_frames};
use crate::acquisition::http_client::TextFetcher;
use crate::candidate::{CandidateSet, CandidateSource};
use crate::config::FinderConfig;
use crate::discovery::{DiscoveryResult, Strategy};
use crate::error::{DiscoveryError, FetchError};
use crate::selector::Selector;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info};

/// Crawl bounds and timeouts.
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlOptions {
    /// Frame levels below the root page. 0 scans the root only.
    pub max_depth: usize,
    /// Frame URLs queued per level.
    pub max_frames_per_level: usize,
    pub fetch_timeout: Duration,
    pub verify_timeout: Duration,
}

impl Default for CrawlOptions {
    fn default() -> Self {
        Self::from(&FinderConfig::default())
    }
}

impl From<&FinderConfig> for CrawlOptions {
    fn from(config: &FinderConfig) -> Self {
        Self {
            max_depth: config.max_depth,
            max_frames_per_level: config.max_frames_per_level,
            fetch_timeout: config.fetch_timeout,
            verify_timeout: config.verify_timeout,
        }
    }
}

/// Frame URLs waiting to be visited at one depth level.
///
/// Holds at most `capacity` URLs, in insertion order, skipping anything
/// already visited or already queued.
#[derive(Debug)]
pub struct Frontier {
    urls: Vec<String>,
    capacity: usize,
}

impl Frontier {
    pub fn new(capacity: usize) -> Self {
        Self {
            urls: Vec::new(),
            capacity,
        }
    }

    /// Queue `url`. Returns `false` if it was skipped.
    pub fn push(&mut self, url: String, visited: &HashSet<String>) -> bool {
        if self.is_full() || visited.contains(&url) || self.urls.contains(&url) {
            return false;
        }
        self.urls.push(url);
        true
    }

    pub fn is_full(&self) -> bool {
        self.urls.len() >= self.capacity
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    fn into_urls(self) -> Vec<String> {
        self.urls
    }
}

/// Static HTML crawler over a [`TextFetcher`].
pub struct Crawler<'a> {
    fetcher: &'a dyn TextFetcher,
    options: CrawlOptions,
}

impl<'a> Crawler<'a> {
    pub fn new(fetcher: &'a dyn TextFetcher, options: CrawlOptions) -> Self {
        Self { fetcher, options }
    }

    /// Crawl `page_url` and select the best manifest.
    ///
    /// A root fetch failure is reported in the result's `error`, with no
    /// candidates.
    pub async fn crawl(&self, page_url: &str) -> DiscoveryResult {
        info!(
            "crawling {page_url} (depth {}, {} frames per level)",
            self.options.max_depth, self.options.max_frames_per_level
        );

        let candidates = match self.collect_candidates(page_url).await {
            Ok(candidates) => candidates,
            Err(e) => {
                info!("root page fetch failed: {e}");
                return DiscoveryResult::failed(
                    page_url,
                    Strategy::Static,
                    DiscoveryError::from(e),
                );
            }
        };

        let selection = Selector::new(self.fetcher, self.options.verify_timeout)
            .select_best(&candidates)
            .await;

        info!(
            "crawl of {page_url} finished with {} candidates",
            candidates.len()
        );
        DiscoveryResult::selected(page_url, Strategy::Static, selection, &candidates)
    }

    /// Gather every candidate reachable from `page_url` within the bounds,
    /// in breadth-first discovery order.
    pub async fn collect_candidates(&self, page_url: &str) -> Result<CandidateSet, FetchError> {
        let root = self
            .fetcher
            .fetch(page_url, self.options.fetch_timeout)
            .await?;

        let mut candidates = extract_candidates(&root.body, &root.final_url);
        let mut visited: HashSet<String> = HashSet::new();
        visited.insert(page_url.to_string());
        visited.insert(root.final_url.clone());

        let mut frontier = Frontier::new(self.options.max_frames_per_level);
        for frame in extract_frames(&root.body, &root.final_url) {
            frontier.push(frame, &visited);
        }

        for depth in 1..=self.options.max_depth {
            if frontier.is_empty() {
                break;
            }
            debug!("depth {depth}: {} frames queued", frontier.len());

            // Mark the whole level visited up front: a sibling queued here
            // must not take a slot in the next level.
            let level = frontier.into_urls();
            visited.extend(level.iter().cloned());

            let mut next = Frontier::new(self.options.max_frames_per_level);
            for frame_url in level {
                let page = match self
                    .fetcher
                    .fetch(&frame_url, self.options.fetch_timeout)
                    .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        debug!("skipping frame {frame_url}: {e}");
                        continue;
                    }
                };

                candidates.extend_as(
                    extract_candidates(&page.body, &page.final_url),
                    CandidateSource::Frame,
                );
                for nested in extract_frames(&page.body, &page.final_url) {
                    next.push(nested, &visited);
                }
            }
            frontier = next;
        }

        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frontier_caps_and_dedupes() {
        let mut visited = HashSet::new();
        visited.insert("https://x/seen".to_string());

        let mut frontier = Frontier::new(2);
        assert!(!frontier.push("https://x/seen".to_string(), &visited));
        assert!(frontier.push("https://x/a".to_string(), &visited));
        assert!(!frontier.push("https://x/a".to_string(), &visited));
        assert!(frontier.push("https://x/b".to_string(), &visited));
        assert!(frontier.is_full());
        assert!(!frontier.push("https://x/c".to_string(), &visited));
        assert_eq!(frontier.into_urls(), vec!["https://x/a", "https://x/b"]);
    }

    #[test]
    fn test_zero_capacity_frontier() {
        let mut frontier = Frontier::new(0);
        assert!(!frontier.push("https://x/a".to_string(), &HashSet::new()));
        assert!(frontier.is_empty());
    }

    #[test]
    fn test_options_from_config() {
        let config = FinderConfig {
            max_depth: 0,
            max_frames_per_level: 9,
            ..FinderConfig::default()
        };
        let options = CrawlOptions::from(&config);
        assert_eq!(options.max_depth, 0);
        assert_eq!(options.max_frames_per_level, 9);
        assert_eq!(options.verify_timeout, config.verify_timeout);
    }
}
