//! Runtime configuration.
//!
//! Resolution order for every setting: CLI flag, then `M3U8_FINDER_*`
//! environment variable, then the built-in default.

use crate::error::DiscoveryError;
use std::path::PathBuf;
use std::time::Duration;

/// Shortest and longest live listen window accepted from the command line.
pub const LISTEN_RANGE_SECS: std::ops::RangeInclusive<u64> = 5..=30;

/// Tunables shared by the crawler, the selector and the live observer.
#[derive(Debug, Clone, PartialEq)]
pub struct FinderConfig {
    /// Timeout for page and frame fetches.
    pub fetch_timeout: Duration,
    /// Timeout for manifest verification probes.
    pub verify_timeout: Duration,
    /// Frame nesting levels the static crawler descends.
    pub max_depth: usize,
    /// Frame URLs visited per crawl level.
    pub max_frames_per_level: usize,
    /// How long the live observer listens after triggering playback.
    pub listen_window: Duration,
    /// Timeout for each play interaction.
    pub click_timeout: Duration,
    /// Timeout for the initial navigation.
    pub navigation_timeout: Duration,
    /// Verify live candidates by fetching them.
    pub verify_live: bool,
    /// Explicit Chromium binary.
    pub chromium_path: Option<PathBuf>,
}

impl Default for FinderConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(15),
            verify_timeout: Duration::from_secs(8),
            max_depth: 1,
            max_frames_per_level: 5,
            listen_window: Duration::from_secs(12),
            click_timeout: Duration::from_secs(2),
            navigation_timeout: Duration::from_secs(30),
            verify_live: false,
            chromium_path: None,
        }
    }
}

impl FinderConfig {
    /// Defaults overridden by the process environment.
    pub fn from_env() -> Result<Self, DiscoveryError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, DiscoveryError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(ms) = parse_var::<u64>(&lookup, "M3U8_FINDER_FETCH_TIMEOUT_MS")? {
            config.fetch_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "M3U8_FINDER_VERIFY_TIMEOUT_MS")? {
            config.verify_timeout = Duration::from_millis(ms);
        }
        if let Some(depth) = parse_var(&lookup, "M3U8_FINDER_MAX_DEPTH")? {
            config.max_depth = depth;
        }
        if let Some(frames) = parse_var(&lookup, "M3U8_FINDER_MAX_FRAMES")? {
            config.max_frames_per_level = frames;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "M3U8_FINDER_LISTEN_SECS")? {
            config.listen_window = Duration::from_secs(secs);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "M3U8_FINDER_CLICK_TIMEOUT_MS")? {
            config.click_timeout = Duration::from_millis(ms);
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "M3U8_FINDER_NAV_TIMEOUT_MS")? {
            config.navigation_timeout = Duration::from_millis(ms);
        }
        if let Some(path) = lookup("M3U8_FINDER_CHROMIUM_PATH").filter(|p| !p.is_empty()) {
            config.chromium_path = Some(PathBuf::from(path));
        }

        Ok(config)
    }

    /// Set the listen window, rejecting values outside [`LISTEN_RANGE_SECS`].
    pub fn with_listen_secs(mut self, secs: u64) -> Result<Self, DiscoveryError> {
        if !LISTEN_RANGE_SECS.contains(&secs) {
            return Err(DiscoveryError::Config(format!(
                "listen window must be between {} and {} seconds, got {secs}",
                LISTEN_RANGE_SECS.start(),
                LISTEN_RANGE_SECS.end()
            )));
        }
        self.listen_window = Duration::from_secs(secs);
        Ok(self)
    }
}

fn parse_var<T>(
    lookup: &dyn Fn(&str) -> Option<String>,
    key: &str,
) -> Result<Option<T>, DiscoveryError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) if raw.trim().is_empty() => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| DiscoveryError::Config(format!("{key}={raw:?}: {e}"))),
    }
}
