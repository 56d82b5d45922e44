//! Best-candidate selection and master-playlist verification.
//!
//! Candidates are probed "master"-named first, then the rest, each group in
//! discovery order. A probe fetches the URL and looks for the
//! `#EXT-X-STREAM-INF` tag that only multi-variant playlists carry. The
//! first candidate that verifies wins; if none does, the first candidate in
//! discovery order is returned flagged as unverified.

use crate::acquisition::http_client::TextFetcher;
use crate::attempt;
use crate::candidate::{is_master_named, CandidateSet};
use crate::error::FetchError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Tag present in master (multi-variant) playlists only.
pub const MASTER_MARKER: &str = "#EXT-X-STREAM-INF";

/// Tag every HLS playlist starts with.
pub const PLAYLIST_MARKER: &str = "#EXTM3U";

/// Characters of a probed body searched for [`MASTER_MARKER`].
pub const VERIFY_SCAN_CHARS: usize = 200_000;

/// Bytes read from a probed body; enough for [`VERIFY_SCAN_CHARS`] of any
/// UTF-8 text.
pub const VERIFY_SCAN_BYTES: usize = VERIFY_SCAN_CHARS * 4;

/// How the chosen URL was confirmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verification {
    /// The fetched content carried the master playlist tag.
    Verified,
    /// No candidate verified; the first discovered one was picked.
    Unverified,
    /// Picked by name and arrival order without probing.
    Heuristic,
    /// There was nothing to pick from.
    NoCandidates,
}

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub best: Option<String>,
    pub verification: Verification,
}

impl Selection {
    fn empty() -> Self {
        Self {
            best: None,
            verification: Verification::NoCandidates,
        }
    }
}

/// What a probed URL turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ManifestKind {
    Master,
    Media,
    NotPlaylist,
}

#[derive(Debug, thiserror::Error)]
enum ProbeFailure {
    #[error("not a master playlist ({0:?})")]
    NotMaster(ManifestKind),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Classify a playlist body by its tag signature.
pub fn classify(body: &str) -> ManifestKind {
    let head = match body.char_indices().nth(VERIFY_SCAN_CHARS) {
        Some((cut, _)) => &body[..cut],
        None => body,
    };
    if head.contains(MASTER_MARKER) {
        ManifestKind::Master
    } else if head.contains(PLAYLIST_MARKER) {
        ManifestKind::Media
    } else {
        ManifestKind::NotPlaylist
    }
}

/// Order in which candidates are probed: "master"-named first, then the
/// remainder, both in discovery order.
pub fn probe_order(candidates: &CandidateSet) -> Vec<&str> {
    let (masters, rest): (Vec<&str>, Vec<&str>) = candidates
        .iter()
        .map(|c| c.url.as_str())
        .partition(|url| is_master_named(url));
    masters.into_iter().chain(rest).collect()
}

/// Naming-only pick: the first "master"-named candidate, else the first
/// candidate.
pub fn heuristic_pick(candidates: &CandidateSet) -> Selection {
    match probe_order(candidates).first() {
        Some(url) => Selection {
            best: Some(url.to_string()),
            verification: Verification::Heuristic,
        },
        None => Selection::empty(),
    }
}

/// Picks the best manifest out of a candidate set by probing.
pub struct Selector<'a> {
    fetcher: &'a dyn TextFetcher,
    timeout: Duration,
}

impl<'a> Selector<'a> {
    pub fn new(fetcher: &'a dyn TextFetcher, timeout: Duration) -> Self {
        Self { fetcher, timeout }
    }

    /// Fetch `url` and classify its content.
    pub async fn verify_manifest(&self, url: &str) -> Result<ManifestKind, FetchError> {
        let page = self
            .fetcher
            .fetch_prefix(url, self.timeout, VERIFY_SCAN_BYTES)
            .await?;
        Ok(classify(&page.body))
    }

    async fn probe(&self, url: &str) -> Result<(), ProbeFailure> {
        match self.verify_manifest(url).await? {
            ManifestKind::Master => Ok(()),
            other => Err(ProbeFailure::NotMaster(other)),
        }
    }

    /// Choose the best candidate.
    pub async fn select_best(&self, candidates: &CandidateSet) -> Selection {
        if candidates.is_empty() {
            return Selection::empty();
        }

        let order = probe_order(candidates);
        let attempts = attempt::first_success(order, |url| self.probe(url)).await;

        for (url, failure) in &attempts.failures {
            tracing::debug!("probe {url}: {failure}");
        }

        if let Some((url, ())) = attempts.success {
            tracing::info!("verified master playlist {url}");
            return Selection {
                best: Some(url.to_string()),
                verification: Verification::Verified,
            };
        }

        let fallback = candidates.first().map(|c| c.url.clone());
        tracing::warn!(
            "none of {} candidates verified as a master playlist, falling back to {}",
            candidates.len(),
            fallback.as_deref().unwrap_or("-")
        );
        Selection {
            best: fallback,
            verification: Verification::Unverified,
        }
    }
}
