//! Error types for fetching, rendering, and discovery runs.

/// Failure of the HTTP fetch primitive.
///
/// When every browser profile fails, the fetcher returns the error of the
/// last profile it tried.
#[derive(thiserror::Error, Debug)]
pub enum FetchError {
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("{url} rejected profile {profile} (HTTP 406)")]
    Rejected { url: String, profile: &'static str },

    #[error("HTTP {status} from {url} (profile {profile})")]
    Status {
        url: String,
        status: u16,
        profile: &'static str,
    },

    #[error("Request to {url} failed (profile {profile}): {source}")]
    Transport {
        url: String,
        profile: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("No browser profiles configured")]
    NoProfiles,
}

impl FetchError {
    /// Whether this is a 406 soft rejection of a single profile.
    pub fn is_rejection(&self) -> bool {
        matches!(self, FetchError::Rejected { .. })
    }
}

/// Failure of the page-render engine during live observation.
#[derive(thiserror::Error, Debug)]
pub enum RenderError {
    #[error("Browser launch failed: {0}")]
    Launch(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out after {0}ms")]
    Timeout(u64),

    #[error("Interaction failed: {0}")]
    Interaction(String),

    #[error("Browser protocol error: {0}")]
    Protocol(String),
}

/// Errors that abort a whole discovery run.
#[derive(thiserror::Error, Debug)]
pub enum DiscoveryError {
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    #[error("Render session error: {0}")]
    RenderSession(#[from] RenderError),

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Convenience result type.
pub type FetchResult<T> = Result<T, FetchError>;
