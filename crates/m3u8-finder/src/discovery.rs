//! The result surface of a discovery run.

use crate::candidate::CandidateSet;
use crate::selector::{Selection, Verification};
use serde::{Deserialize, Serialize};

/// Which acquisition strategy produced a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Network observation inside a headless browser.
    Live,
    /// Recursive crawl of page and frame markup.
    Static,
}

/// Outcome of one discovery run. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveryResult {
    pub page_url: String,
    pub strategy: Strategy,
    /// The chosen manifest, if any candidate was found.
    pub best: Option<String>,
    pub verification: Verification,
    /// Every candidate, in discovery order.
    pub candidates: Vec<String>,
    /// Hard error that ended the run early.
    pub error: Option<String>,
}

impl DiscoveryResult {
    /// A run that selected from `candidates`.
    pub fn selected(
        page_url: &str,
        strategy: Strategy,
        selection: Selection,
        candidates: &CandidateSet,
    ) -> Self {
        Self {
            page_url: page_url.to_string(),
            strategy,
            best: selection.best,
            verification: selection.verification,
            candidates: candidates.urls(),
            error: None,
        }
    }

    /// A run that failed before any candidate could be gathered.
    pub fn failed(page_url: &str, strategy: Strategy, error: impl ToString) -> Self {
        Self {
            page_url: page_url.to_string(),
            strategy,
            best: None,
            verification: Verification::NoCandidates,
            candidates: Vec::new(),
            error: Some(error.to_string()),
        }
    }

    /// True when the run completed but found nothing.
    pub fn is_empty(&self) -> bool {
        self.error.is_none() && self.candidates.is_empty()
    }

    /// Explanation shown when a run found no candidates.
    pub fn empty_message(&self) -> &'static str {
        match self.strategy {
            Strategy::Live => {
                "No .m3u8 requests observed. The site may block headless browsers or use DRM."
            }
            Strategy::Static => {
                "No .m3u8 URLs found in page markup. The player may build its URL in \
                 JavaScript; try `sniff` instead."
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidate::CandidateSource;

    #[test]
    fn test_failed_result() {
        let result = DiscoveryResult::failed("https://x/", Strategy::Static, "HTTP 500");
        assert_eq!(result.error.as_deref(), Some("HTTP 500"));
        assert!(!result.is_empty());
        assert!(result.best.is_none());
    }

    #[test]
    fn test_json_shape() {
        let mut set = CandidateSet::new();
        set.insert("https://cdn/master.m3u8", CandidateSource::Network);
        let result = DiscoveryResult::selected(
            "https://x/",
            Strategy::Live,
            Selection {
                best: Some("https://cdn/master.m3u8".to_string()),
                verification: Verification::Heuristic,
            },
            &set,
        );

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["strategy"], "live");
        assert_eq!(json["verification"], "heuristic");
        assert_eq!(json["best"], "https://cdn/master.m3u8");
        assert_eq!(json["candidates"][0], "https://cdn/master.m3u8");
        assert!(json["error"].is_null());
    }

    #[test]
    fn test_empty_message_by_strategy() {
        let live = DiscoveryResult::selected(
            "https://x/",
            Strategy::Live,
            Selection {
                best: None,
                verification: Verification::NoCandidates,
            },
            &CandidateSet::new(),
        );
        assert!(live.is_empty());
        assert!(live.empty_message().contains("headless"));
    }
}
