//! `m3u8-finder sniff <url>`: watch a headless browser's traffic.

use crate::acquisition::http_client::HttpFetcher;
use crate::cli::output::{self, OutputOptions, RunStatus};
use crate::config::FinderConfig;
use crate::discovery::{DiscoveryResult, Strategy};
use crate::error::DiscoveryError;
use crate::live::{LiveObserver, ObserveOptions};
use crate::renderer::chromium::ChromiumEngine;
use anyhow::Result;

/// Run the sniff command.
pub async fn run(
    url: &str,
    listen_secs: Option<u64>,
    verify: bool,
    mut config: FinderConfig,
    out: &OutputOptions,
) -> Result<RunStatus> {
    if let Some(secs) = listen_secs {
        config = config.with_listen_secs(secs)?;
    }
    config.verify_live |= verify;

    if !out.quiet && !out.json {
        eprintln!(
            "Sniffing {url} for {}s...",
            config.listen_window.as_secs()
        );
    }

    let engine = ChromiumEngine::new(config.chromium_path.clone());
    let fetcher = HttpFetcher::new();
    let observer =
        LiveObserver::new(&engine, ObserveOptions::from(&config)).with_verifier(&fetcher);

    let result = match observer.observe(url).await {
        Ok(result) => result,
        Err(e) => DiscoveryResult::failed(url, Strategy::Live, DiscoveryError::from(e)),
    };

    output::report(&result, out)
}
