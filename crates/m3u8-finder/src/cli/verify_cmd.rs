//! `m3u8-finder verify <url>`: check one manifest URL.

use crate::acquisition::http_client::HttpFetcher;
use crate::cli::output::{self, OutputOptions, RunStatus};
use crate::config::FinderConfig;
use crate::error::DiscoveryError;
use crate::selector::{ManifestKind, Selector};
use anyhow::Result;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct VerifyReport<'a> {
    url: &'a str,
    kind: Option<ManifestKind>,
    error: Option<String>,
}

fn describe(kind: ManifestKind) -> &'static str {
    match kind {
        ManifestKind::Master => "master playlist (has #EXT-X-STREAM-INF)",
        ManifestKind::Media => "media playlist (no variant streams)",
        ManifestKind::NotPlaylist => "not an HLS playlist",
    }
}

/// Run the verify command.
pub async fn run(url: &str, config: FinderConfig, out: &OutputOptions) -> Result<RunStatus> {
    let fetcher = HttpFetcher::new();
    let report = match Selector::new(&fetcher, config.verify_timeout)
        .verify_manifest(url)
        .await
    {
        Ok(kind) => VerifyReport {
            url,
            kind: Some(kind),
            error: None,
        },
        Err(e) => VerifyReport {
            url,
            kind: None,
            error: Some(DiscoveryError::from(e).to_string()),
        },
    };

    if out.json {
        output::print_json(&report);
    } else {
        match (&report.kind, &report.error) {
            (Some(kind), _) if out.quiet => println!("{kind:?}"),
            (Some(kind), _) => println!("{url}: {}", describe(*kind)),
            (None, Some(e)) => eprintln!("  Error: {e}"),
            (None, None) => {}
        }
    }

    Ok(if report.error.is_none() {
        RunStatus::Ok
    } else {
        RunStatus::Failed
    })
}
