//! Live observer: sniff manifest URLs from a real browser's traffic.
//!
//! Opens a fresh render session, subscribes to every request and response,
//! loads the page, pokes the usual play buttons (main page first, then each
//! attached frame), and listens for a fixed window. Cross-origin frames are
//! first opened in a page of their own so their requests are seen too. This is the only
//! strategy that sees manifest URLs a player assembles in JavaScript.

use crate::acquisition::http_client::TextFetcher;
use crate::attempt;
use crate::candidate::{looks_like_manifest, CandidateSet, CandidateSource};
use crate::config::FinderConfig;
use crate::discovery::{DiscoveryResult, Strategy};
use crate::error::RenderError;
use crate::profile::BrowserProfile;
use crate::renderer::{
    FrameHandle, Interaction, NetworkEvent, RenderEngine, RenderSession, WaitUntil,
    PLAY_INTERACTIONS,
};
use crate::selector::{self, Selector};
use std::time::Duration;
use tokio::sync::mpsc;
use url::Url;
use tracing::{debug, info, warn};

/// Timeouts and listen window for one observation.
#[derive(Debug, Clone, PartialEq)]
pub struct ObserveOptions {
    /// Hard ceiling on listening after playback was triggered.
    pub listen_window: Duration,
    pub navigation_timeout: Duration,
    /// Per-interaction bound.
    pub click_timeout: Duration,
    /// Probe candidates instead of picking by name.
    pub verify: bool,
    pub verify_timeout: Duration,
}

impl Default for ObserveOptions {
    fn default() -> Self {
        Self::from(&FinderConfig::default())
    }
}

impl From<&FinderConfig> for ObserveOptions {
    fn from(config: &FinderConfig) -> Self {
        Self {
            listen_window: config.listen_window,
            navigation_timeout: config.navigation_timeout,
            click_timeout: config.click_timeout,
            verify: config.verify_live,
            verify_timeout: config.verify_timeout,
        }
    }
}

/// How many play interactions were attempted and how many took.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct InteractionSummary {
    pub attempted: usize,
    pub succeeded: usize,
    /// Cross-origin frames loaded in a page of their own.
    pub frames_opened: usize,
}

/// Drives a [`RenderEngine`] to observe manifest requests.
pub struct LiveObserver<'a> {
    engine: &'a dyn RenderEngine,
    verifier: Option<&'a dyn TextFetcher>,
    options: ObserveOptions,
}

impl<'a> LiveObserver<'a> {
    pub fn new(engine: &'a dyn RenderEngine, options: ObserveOptions) -> Self {
        Self {
            engine,
            verifier: None,
            options,
        }
    }

    /// Use `fetcher` to verify candidates when `options.verify` is set.
    pub fn with_verifier(mut self, fetcher: &'a dyn TextFetcher) -> Self {
        self.verifier = Some(fetcher);
        self
    }

    /// Observe `page_url` and pick the best manifest seen.
    ///
    /// Any session failure before the listen window ends is fatal for the
    /// run. The session is always closed.
    pub async fn observe(&self, page_url: &str) -> Result<DiscoveryResult, RenderError> {
        info!(
            "observing {page_url} for {}s",
            self.options.listen_window.as_secs()
        );

        let mut session = self
            .engine
            .open_session(BrowserProfile::chrome_desktop())
            .await?;

        let (sink, mut events) = mpsc::unbounded_channel();
        let outcome = self.drive(session.as_mut(), page_url, sink).await;

        if let Err(e) = session.close().await {
            warn!("closing render session: {e}");
        }
        outcome?;

        let candidates = drain_manifest_urls(&mut events);
        info!("observed {} manifest URLs on {page_url}", candidates.len());

        let selection = match (self.options.verify, self.verifier) {
            (true, Some(fetcher)) => {
                Selector::new(fetcher, self.options.verify_timeout)
                    .select_best(&candidates)
                    .await
            }
            _ => selector::heuristic_pick(&candidates),
        };

        Ok(DiscoveryResult::selected(
            page_url,
            Strategy::Live,
            selection,
            &candidates,
        ))
    }

    async fn drive(
        &self,
        session: &mut dyn RenderSession,
        page_url: &str,
        sink: mpsc::UnboundedSender<NetworkEvent>,
    ) -> Result<(), RenderError> {
        session.subscribe_network(sink).await?;

        let nav = session
            .navigate(
                page_url,
                WaitUntil::DomContentLoaded,
                self.options.navigation_timeout,
            )
            .await?;
        debug!("loaded {} in {}ms", nav.final_url, nav.load_time_ms);

        let summary = self.trigger_playback(session, &nav.final_url).await;
        debug!(
            "{}/{} play interactions succeeded, {} frames opened",
            summary.succeeded, summary.attempted, summary.frames_opened
        );

        session.wait(self.options.listen_window).await;
        Ok(())
    }

    /// Try every play interaction on the main page, then on every frame.
    /// Frames from another origin than `page_url` are opened on their own
    /// before clicking. Failures are logged and skipped.
    pub async fn trigger_playback(
        &self,
        session: &mut dyn RenderSession,
        page_url: &str,
    ) -> InteractionSummary {
        let timeout = self.options.click_timeout;
        let mut summary = InteractionSummary::default();

        let view: &dyn RenderSession = &*session;
        let outcomes = attempt::attempt_all(PLAY_INTERACTIONS.iter(), |interaction| {
            view.click(interaction, timeout)
        })
        .await;
        tally(&mut summary, "main", &outcomes);

        let frames = match session.frames().await {
            Ok(frames) => frames,
            Err(e) => {
                debug!("could not list frames: {e}");
                return summary;
            }
        };

        for frame in &frames {
            let label = format!("frame {}", frame.index);
            if is_cross_origin(frame, page_url) {
                match session
                    .open_frame(frame, self.options.navigation_timeout)
                    .await
                {
                    Ok(()) => summary.frames_opened += 1,
                    Err(e) => debug!("{label}: opening on its own: {e}"),
                }
            }

            let view: &dyn RenderSession = &*session;
            let outcomes = attempt::attempt_all(PLAY_INTERACTIONS.iter(), |interaction| {
                view.click_in_frame(frame, interaction, timeout)
            })
            .await;
            tally(&mut summary, &label, &outcomes);
        }

        summary
    }
}

/// True when `frame` loads an http(s) document from another origin than
/// `page_url`.
fn is_cross_origin(frame: &FrameHandle, page_url: &str) -> bool {
    let Some(src) = frame.url.as_deref().and_then(|u| Url::parse(u).ok()) else {
        return false;
    };
    if !matches!(src.scheme(), "http" | "https") {
        return false;
    }
    match Url::parse(page_url) {
        Ok(page) => page.origin() != src.origin(),
        Err(_) => true,
    }
}

fn tally(
    summary: &mut InteractionSummary,
    target: &str,
    outcomes: &[(&Interaction, Result<(), RenderError>)],
) {
    for (interaction, outcome) in outcomes {
        summary.attempted += 1;
        match outcome {
            Ok(()) => {
                summary.succeeded += 1;
                debug!("{target}: clicked {interaction}");
            }
            Err(e) => debug!("{target}: {interaction}: {e}"),
        }
    }
}

/// Drain buffered events into a candidate set, in arrival order, keeping
/// only manifest-shaped URLs.
pub fn drain_manifest_urls(events: &mut mpsc::UnboundedReceiver<NetworkEvent>) -> CandidateSet {
    let mut candidates = CandidateSet::new();
    while let Ok(event) = events.try_recv() {
        if looks_like_manifest(&event.url) {
            candidates.insert(event.url, CandidateSource::Network);
        }
    }
    candidates
}
