//! `m3u8-finder crawl <url>`: scan page and frame markup without a browser.

use crate::acquisition::crawler::{CrawlOptions, Crawler};
use crate::acquisition::http_client::HttpFetcher;
use crate::cli::output::{self, OutputOptions, RunStatus};
use crate::config::FinderConfig;
use anyhow::Result;
use std::time::Duration;

/// Run the crawl command.
pub async fn run(
    url: &str,
    depth: Option<usize>,
    max_frames: Option<usize>,
    timeout_ms: Option<u64>,
    mut config: FinderConfig,
    out: &OutputOptions,
) -> Result<RunStatus> {
    if let Some(depth) = depth {
        config.max_depth = depth;
    }
    if let Some(frames) = max_frames {
        config.max_frames_per_level = frames;
    }
    if let Some(ms) = timeout_ms {
        config.fetch_timeout = Duration::from_millis(ms);
    }

    if !out.quiet && !out.json {
        eprintln!("Crawling {url} (depth {})...", config.max_depth);
    }

    let fetcher = HttpFetcher::new();
    let result = Crawler::new(&fetcher, CrawlOptions::from(&config))
        .crawl(url)
        .await;

    output::report(&result, out)
}
