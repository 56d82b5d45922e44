//! Renderer abstraction for live network observation.
//!
//! Defines the `RenderEngine` and `RenderSession` traits that abstract over
//! the browser engine (currently Chromium via chromiumoxide). A session
//! reports every request and response URL into a channel sink, so the
//! observer never shares mutable state with the engine's event loop.

pub mod chromium;

use crate::error::RenderError;
use crate::profile::BrowserProfile;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::mpsc;

/// Result of navigating to a URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavigationResult {
    /// The URL after any redirects.
    pub final_url: String,
    /// Time until the wait condition was met, in milliseconds.
    pub load_time_ms: u64,
}

/// Point in the page lifecycle `navigate` waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WaitUntil {
    /// The initial document has been parsed.
    DomContentLoaded,
    /// The document and its subresources have loaded.
    Load,
}

impl WaitUntil {
    /// Whether a `document.readyState` value satisfies this condition.
    pub fn is_reached(self, ready_state: &str) -> bool {
        match self {
            WaitUntil::DomContentLoaded => matches!(ready_state, "interactive" | "complete"),
            WaitUntil::Load => ready_state == "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NetworkEventKind {
    Request,
    Response,
}

/// A request or response seen by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkEvent {
    pub kind: NetworkEventKind,
    pub url: String,
}

/// Where a session delivers network events.
pub type NetworkSink = mpsc::UnboundedSender<NetworkEvent>;

/// Something to click that may start playback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    /// The first element matching a CSS selector.
    Selector(&'static str),
    /// The first button whose text contains this label (case-insensitive).
    ButtonText(&'static str),
}

impl std::fmt::Display for Interaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Interaction::Selector(css) => write!(f, "{css}"),
            Interaction::ButtonText(label) => write!(f, "button:has-text('{label}')"),
        }
    }
}

/// Common "start playback" targets, in the order they are tried.
pub const PLAY_INTERACTIONS: &[Interaction] = &[
    Interaction::Selector("video"),
    Interaction::ButtonText("Play"),
    Interaction::Selector("[autoplay]"),
    Interaction::Selector("[data-play]"),
    Interaction::Selector(".vjs-big-play-button"),
    Interaction::Selector(".plyr__control--overlaid"),
    Interaction::Selector(".jw-icon-display"),
];

/// An embedded frame attached to the page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameHandle {
    /// Position among the page's frames.
    pub index: usize,
    /// The frame's source URL, when it has one.
    pub url: Option<String>,
}

/// A browser engine that can open isolated sessions.
#[async_trait]
pub trait RenderEngine: Send + Sync {
    /// Open a fresh session presenting `profile`'s headers.
    async fn open_session(
        &self,
        profile: &BrowserProfile,
    ) -> Result<Box<dyn RenderSession>, RenderError>;
}

/// A single isolated browser session driving one page.
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Forward every request and response URL into `sink` until closed.
    async fn subscribe_network(&mut self, sink: NetworkSink) -> Result<(), RenderError>;

    /// Navigate and wait for `wait_until`, bounded by `timeout`.
    async fn navigate(
        &mut self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<NavigationResult, RenderError>;

    /// Click `interaction` on the main page.
    async fn click(&self, interaction: &Interaction, timeout: Duration) -> Result<(), RenderError>;

    /// Frames currently attached to the page.
    async fn frames(&self) -> Result<Vec<FrameHandle>, RenderError>;

    /// Load `frame`'s source URL in a page of its own that reports into the
    /// subscribed sink. Traffic of an out-of-process frame reaches the sink
    /// this way, and later clicks in `frame` act on that page.
    async fn open_frame(&mut self, frame: &FrameHandle, timeout: Duration)
        -> Result<(), RenderError>;

    /// Click `interaction` inside `frame`. Engines may refuse frames they
    /// cannot reach (e.g. cross-origin and not opened).
    async fn click_in_frame(
        &self,
        frame: &FrameHandle,
        interaction: &Interaction,
        timeout: Duration,
    ) -> Result<(), RenderError>;

    /// Idle while the page keeps running.
    async fn wait(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    /// Tear the session down.
    async fn close(self: Box<Self>) -> Result<(), RenderError>;
}
