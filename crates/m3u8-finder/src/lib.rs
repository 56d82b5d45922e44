// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! m3u8-finder: locate the master HLS manifest behind a video page.
//!
//! Two acquisition strategies share one selector:
//!
//! - **Live** ([`live`]): load the page in headless Chromium, trigger
//!   playback, and collect every `.m3u8` URL the page requests.
//! - **Static** ([`acquisition::crawler`]): fetch the page markup with
//!   browser-like headers and descend into embedded frames.
//!
//! [`selector`] then picks the best candidate, preferring URLs whose content
//! carries the master-playlist tag.

pub mod acquisition;
pub mod attempt;
pub mod candidate;
pub mod cli;
pub mod config;
pub mod discovery;
pub mod error;
pub mod live;
pub mod profile;
pub mod renderer;
pub mod selector;

pub use candidate::{CandidateSet, CandidateSource};
pub use config::FinderConfig;
pub use discovery::{DiscoveryResult, Strategy};
pub use error::{DiscoveryError, FetchError, RenderError};
