//! Candidate manifest URLs and the ordered set they accumulate in.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// File extension every candidate must contain.
pub const MANIFEST_EXTENSION: &str = ".m3u8";

/// Where a candidate was discovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateSource {
    /// Seen as a request or response URL by the browser.
    Network,
    /// Extracted from the root page's markup.
    Markup,
    /// Extracted from an embedded frame's markup.
    Frame,
}

/// A URL suspected, but not confirmed, to reference a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub url: String,
    pub source: CandidateSource,
}

/// Whether `url` contains the manifest extension (case-insensitive).
pub fn looks_like_manifest(url: &str) -> bool {
    url.to_ascii_lowercase().contains(MANIFEST_EXTENSION)
}

/// Whether `url` is named like a master playlist.
pub fn is_master_named(url: &str) -> bool {
    url.to_ascii_lowercase().contains("master")
}

/// Insertion-ordered set of candidates, unique by exact URL string.
///
/// The first insertion of a URL wins; later duplicates are dropped even if
/// they come from a different source.
#[derive(Debug, Clone, Default)]
pub struct CandidateSet {
    items: Vec<Candidate>,
    seen: HashSet<String>,
}

impl CandidateSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a candidate. Returns `true` if the URL was not yet present.
    pub fn insert(&mut self, url: impl Into<String>, source: CandidateSource) -> bool {
        let url = url.into();
        if self.seen.contains(&url) {
            return false;
        }
        self.seen.insert(url.clone());
        self.items.push(Candidate { url, source });
        true
    }

    /// Merge another set, overriding the source of newly added entries.
    pub fn extend_as(&mut self, other: CandidateSet, source: CandidateSource) {
        for candidate in other.items {
            self.insert(candidate.url, source);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn first(&self) -> Option<&Candidate> {
        self.items.first()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candidate> {
        self.items.iter()
    }

    /// Candidate URLs in discovery order.
    pub fn urls(&self) -> Vec<String> {
        self.items.iter().map(|c| c.url.clone()).collect()
    }
}
