//! Chromium-based render engine using chromiumoxide.
//!
//! Every session launches its own headless Chromium process, so nothing
//! (cookies, cache, service workers) leaks between discovery runs.

use super::{
    FrameHandle, Interaction, NavigationResult, NetworkEvent, NetworkEventKind, NetworkSink,
    RenderEngine, RenderSession, WaitUntil,
};
use crate::error::RenderError;
use crate::profile::BrowserProfile;
use anyhow::{Context, Result};
use async_trait::async_trait;
use chromiumoxide::browser::{Browser, BrowserConfig};
use chromiumoxide::cdp::browser_protocol::network::{
    EnableParams, EventRequestWillBeSent, EventResponseReceived, SetUserAgentOverrideParams,
};
use chromiumoxide::cdp::browser_protocol::page::NavigateParams;
use chromiumoxide::error::CdpError;
use chromiumoxide::page::Page;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;

/// Interval between `document.readyState` polls while navigating.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Find the Chromium binary path.
pub fn find_chromium(explicit: Option<&Path>) -> Option<PathBuf> {
    // 1. Explicit path from the CLI or config
    if let Some(path) = explicit {
        if path.exists() {
            return Some(path.to_path_buf());
        }
    }

    // 2. M3U8_FINDER_CHROMIUM_PATH env
    if let Ok(p) = std::env::var("M3U8_FINDER_CHROMIUM_PATH") {
        let path = PathBuf::from(&p);
        if path.exists() {
            return Some(path);
        }
    }

    // 3. System PATH
    for name in ["google-chrome", "google-chrome-stable", "chromium", "chromium-browser"] {
        if let Ok(path) = which::which(name) {
            return Some(path);
        }
    }

    // 4. Common per-OS locations
    let mut common = Vec::new();
    if cfg!(target_os = "macos") {
        common.push(PathBuf::from(
            "/Applications/Google Chrome.app/Contents/MacOS/Google Chrome",
        ));
        common.push(PathBuf::from(
            "/Applications/Chromium.app/Contents/MacOS/Chromium",
        ));
    }
    if let Some(home) = dirs::home_dir() {
        common.push(home.join(".cache/chromium/chrome-linux64/chrome"));
    }
    common.into_iter().find(|p| p.exists())
}

/// Launches one headless Chromium per session.
#[derive(Debug, Clone, Default)]
pub struct ChromiumEngine {
    executable: Option<PathBuf>,
}

impl ChromiumEngine {
    /// Create an engine; `executable` overrides binary discovery.
    pub fn new(executable: Option<PathBuf>) -> Self {
        Self { executable }
    }

    async fn launch(&self, profile: &BrowserProfile) -> Result<ChromiumSession> {
        let chrome_path = find_chromium(self.executable.as_deref()).context(
            "Chromium not found. Install Chrome/Chromium or set M3U8_FINDER_CHROMIUM_PATH.",
        )?;
        tracing::debug!("launching {}", chrome_path.display());

        let config = BrowserConfig::builder()
            .chrome_executable(chrome_path)
            .arg("--headless=new")
            .arg("--disable-gpu")
            .arg("--no-sandbox")
            .arg("--disable-dev-shm-usage")
            .arg("--disable-features=IsolateOrigins,site-per-process")
            .arg("--disable-extensions")
            .arg("--autoplay-policy=no-user-gesture-required")
            .build()
            .map_err(|e| anyhow::anyhow!("failed to build browser config: {e}"))?;

        let (browser, mut handler) = Browser::launch(config)
            .await
            .context("failed to launch Chromium")?;

        // Spawn the handler task
        let handler_task = tokio::spawn(async move {
            while let Some(event) = handler.next().await {
                let _ = event;
            }
        });

        let page = match browser.new_page("about:blank").await {
            Ok(page) => page,
            Err(e) => {
                handler_task.abort();
                return Err(anyhow::anyhow!("failed to create new page: {e}"));
            }
        };

        if let Err(e) = apply_profile(&page, profile).await {
            let _ = page.close().await;
            let mut browser = browser;
            let _ = browser.close().await;
            handler_task.abort();
            return Err(e);
        }

        let session = ChromiumSession {
            browser,
            page,
            profile: *profile,
            handler_task,
            listener_tasks: Vec::new(),
            sink: None,
            frame_pages: Vec::new(),
        };
        Ok(session)
    }
}

#[async_trait]
impl RenderEngine for ChromiumEngine {
    async fn open_session(
        &self,
        profile: &BrowserProfile,
    ) -> Result<Box<dyn RenderSession>, RenderError> {
        let session = self
            .launch(profile)
            .await
            .map_err(|e| RenderError::Launch(format!("{e:#}")))?;
        Ok(Box::new(session))
    }
}

/// A Chromium process with its main page, plus one page per frame that was
/// opened on its own.
pub struct ChromiumSession {
    browser: Browser,
    page: Page,
    profile: BrowserProfile,
    handler_task: JoinHandle<()>,
    listener_tasks: Vec<JoinHandle<()>>,
    sink: Option<NetworkSink>,
    frame_pages: Vec<(usize, Page)>,
}

impl ChromiumSession {
    fn frame_page(&self, index: usize) -> Option<&Page> {
        self.frame_pages
            .iter()
            .find(|(i, _)| *i == index)
            .map(|(_, page)| page)
    }
}

fn protocol_error(e: CdpError) -> RenderError {
    RenderError::Protocol(e.to_string())
}

async fn apply_profile(page: &Page, profile: &BrowserProfile) -> Result<()> {
    let user_agent = SetUserAgentOverrideParams::builder()
        .user_agent(profile.user_agent)
        .accept_language(profile.accept_language)
        .build()
        .map_err(|e| anyhow::anyhow!("invalid user agent override: {e}"))?;
    page.execute(user_agent)
        .await
        .context("failed to set user agent")?;
    Ok(())
}

/// Enable the Network domain on `page` and spawn one task per event stream
/// that forwards URLs into `sink`.
async fn forward_network(
    page: &Page,
    sink: NetworkSink,
) -> Result<Vec<JoinHandle<()>>, RenderError> {
    page.execute(EnableParams::default())
        .await
        .map_err(protocol_error)?;

    let mut requests = page
        .event_listener::<EventRequestWillBeSent>()
        .await
        .map_err(protocol_error)?;
    let mut responses = page
        .event_listener::<EventResponseReceived>()
        .await
        .map_err(protocol_error)?;

    let request_sink = sink.clone();
    let request_task = tokio::spawn(async move {
        while let Some(event) = requests.next().await {
            let event = NetworkEvent {
                kind: NetworkEventKind::Request,
                url: event.request.url.clone(),
            };
            if request_sink.send(event).is_err() {
                break;
            }
        }
    });
    let response_task = tokio::spawn(async move {
        while let Some(event) = responses.next().await {
            let event = NetworkEvent {
                kind: NetworkEventKind::Response,
                url: event.response.url.clone(),
            };
            if sink.send(event).is_err() {
                break;
            }
        }
    });

    Ok(vec![request_task, response_task])
}

async fn ready_state(page: &Page) -> Option<String> {
    page.evaluate("document.readyState")
        .await
        .ok()?
        .into_value::<String>()
        .ok()
}

async fn navigate_page(
    page: &Page,
    url: &str,
    wait_until: WaitUntil,
    timeout: Duration,
) -> Result<NavigationResult, RenderError> {
    let start = Instant::now();

    let navigation = async {
        let response = page
            .execute(NavigateParams::new(url))
            .await
            .map_err(|e| RenderError::Navigation(format!("{url}: {e}")))?;
        if let Some(error_text) = response.result.error_text.as_ref() {
            return Err(RenderError::Navigation(format!("{url}: {error_text}")));
        }

        // The execution context is replaced mid-navigation, so failed
        // evaluations just mean "not ready yet".
        loop {
            if let Some(state) = ready_state(page).await {
                if wait_until.is_reached(&state) {
                    return Ok(());
                }
            }
            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    };

    tokio::time::timeout(timeout, navigation)
        .await
        .map_err(|_| RenderError::Timeout(timeout.as_millis() as u64))??;

    let final_url = page
        .url()
        .await
        .unwrap_or_default()
        .unwrap_or_else(|| url.to_string());

    Ok(NavigationResult {
        final_url,
        load_time_ms: start.elapsed().as_millis() as u64,
    })
}

async fn evaluate_click(page: &Page, script: String, timeout: Duration) -> Result<(), RenderError> {
    let result = tokio::time::timeout(timeout, page.evaluate(script))
        .await
        .map_err(|_| RenderError::Timeout(timeout.as_millis() as u64))?
        .map_err(|e| RenderError::Interaction(e.to_string()))?;

    let value: serde_json::Value = result
        .into_value()
        .map_err(|e| RenderError::Interaction(format!("unexpected script result: {e:?}")))?;

    let success = value
        .as_object()
        .and_then(|o| o.get("success"))
        .and_then(|v| v.as_bool())
        .unwrap_or(false);
    if success {
        Ok(())
    } else {
        let reason = value
            .get("reason")
            .and_then(|v| v.as_str())
            .unwrap_or("no match");
        Err(RenderError::Interaction(reason.to_string()))
    }
}

/// Click `interaction` in `page`'s top document.
async fn click_on_page(
    page: &Page,
    interaction: &Interaction,
    timeout: Duration,
) -> Result<(), RenderError> {
    match interaction {
        Interaction::Selector(css) => {
            let click = async {
                let element = page.find_element(*css).await?;
                element.click().await?;
                Ok::<_, CdpError>(())
            };
            tokio::time::timeout(timeout, click)
                .await
                .map_err(|_| RenderError::Timeout(timeout.as_millis() as u64))?
                .map_err(|e| RenderError::Interaction(format!("{css}: {e}")))
        }
        Interaction::ButtonText(_) => {
            evaluate_click(page, build_click_script(interaction, None), timeout).await
        }
    }
}

#[async_trait]
impl RenderSession for ChromiumSession {
    async fn subscribe_network(&mut self, sink: NetworkSink) -> Result<(), RenderError> {
        let tasks = forward_network(&self.page, sink.clone()).await?;
        self.listener_tasks.extend(tasks);
        self.sink = Some(sink);
        Ok(())
    }

    async fn navigate(
        &mut self,
        url: &str,
        wait_until: WaitUntil,
        timeout: Duration,
    ) -> Result<NavigationResult, RenderError> {
        navigate_page(&self.page, url, wait_until, timeout).await
    }

    async fn click(&self, interaction: &Interaction, timeout: Duration) -> Result<(), RenderError> {
        click_on_page(&self.page, interaction, timeout).await
    }

    async fn frames(&self) -> Result<Vec<FrameHandle>, RenderError> {
        let sources: Vec<String> = self
            .page
            .evaluate("Array.from(document.querySelectorAll('iframe')).map(f => f.src || '')")
            .await
            .map_err(protocol_error)?
            .into_value()
            .map_err(|e| RenderError::Protocol(format!("unexpected frame list: {e:?}")))?;

        Ok(sources
            .into_iter()
            .enumerate()
            .map(|(index, src)| FrameHandle {
                index,
                url: (!src.is_empty()).then_some(src),
            })
            .collect())
    }

    async fn open_frame(
        &mut self,
        frame: &FrameHandle,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        let url = frame
            .url
            .as_deref()
            .ok_or_else(|| RenderError::Interaction("frame has no source URL".into()))?;
        let sink = self
            .sink
            .clone()
            .ok_or_else(|| RenderError::Protocol("network events not subscribed".into()))?;

        let page = self
            .browser
            .new_page("about:blank")
            .await
            .map_err(protocol_error)?;
        apply_profile(&page, &self.profile)
            .await
            .map_err(|e| RenderError::Protocol(format!("{e:#}")))?;
        let tasks = forward_network(&page, sink).await?;
        self.listener_tasks.extend(tasks);

        // Registered before loading so its traffic is kept even if the load
        // times out.
        self.frame_pages.push((frame.index, page.clone()));
        navigate_page(&page, url, WaitUntil::Load, timeout)
            .await
            .map(|_| ())
    }

    async fn click_in_frame(
        &self,
        frame: &FrameHandle,
        interaction: &Interaction,
        timeout: Duration,
    ) -> Result<(), RenderError> {
        match self.frame_page(frame.index) {
            Some(page) => click_on_page(page, interaction, timeout).await,
            None => {
                evaluate_click(
                    &self.page,
                    build_click_script(interaction, Some(frame.index)),
                    timeout,
                )
                .await
            }
        }
    }

    async fn close(self: Box<Self>) -> Result<(), RenderError> {
        let mut this = *self;
        for task in &this.listener_tasks {
            task.abort();
        }
        for (_, page) in this.frame_pages.drain(..) {
            let _ = page.close().await;
        }
        let _ = this.page.close().await;
        let closed = this.browser.close().await;
        let _ = this.browser.wait().await;
        this.handler_task.abort();
        closed
            .map(|_| ())
            .map_err(|e| RenderError::Protocol(format!("browser close failed: {e}")))
    }
}

/// Build a script that clicks `interaction` in the main document, or in the
/// `frame`-th iframe's document when that frame is same-origin.
///
/// Selectors and labels are escaped for a JS string literal before
/// injection. Media elements are also asked to `play()`.
fn build_click_script(interaction: &Interaction, frame: Option<usize>) -> String {
    let document = match frame {
        None => "document".to_string(),
        Some(index) => format!(
            "(() => {{ const f = document.querySelectorAll('iframe')[{index}]; \
             try {{ return f && f.contentDocument; }} catch (e) {{ return null; }} }})()"
        ),
    };

    let find = match interaction {
        Interaction::Selector(css) => {
            format!("doc.querySelector('{}')", js_literal(css))
        }
        Interaction::ButtonText(label) => format!(
            "[...doc.querySelectorAll('button, [role=\"button\"]')]\
             .find(b => (b.textContent || '').toLowerCase().includes('{}'))",
            js_literal(&label.to_lowercase())
        ),
    };

    format!(
        r#"(() => {{
            const doc = {document};
            if (!doc) return {{ success: false, reason: "frame not accessible" }};
            const el = {find};
            if (!el) return {{ success: false, reason: "no match" }};
            el.click();
            if (typeof el.play === 'function') {{
                try {{ const p = el.play(); if (p && p.catch) p.catch(() => {{}}); }} catch (e) {{}}
            }}
            return {{ success: true }};
        }})()"#
    )
}

/// Escape `s` for a single-quoted JS literal. Angle brackets become hex
/// escapes so a label can never close the surrounding script.
fn js_literal(s: &str) -> String {
    s.chars().fold(String::with_capacity(s.len()), |mut out, ch| {
        let escaped = match ch {
            '\0' => "",
            '\\' => r"\\",
            '\'' => r"\'",
            '\n' => r"\n",
            '\r' => r"\r",
            '<' => r"\x3c",
            '>' => r"\x3e",
            _ => {
                out.push(ch);
                return out;
            }
        };
        out.push_str(escaped);
        out
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::CHROME_DESKTOP;
    use tokio::sync::mpsc;

    #[test]
    fn test_js_literal_escapes_quote_and_tags() {
        assert_eq!(js_literal("[data-play]"), "[data-play]");
        assert_eq!(js_literal("a[title='x']"), r"a[title=\'x\']");
        assert_eq!(js_literal("</script>"), r"\x3c/script\x3e");
        assert_eq!(js_literal("line\nbreak"), r"line\nbreak");
        assert_eq!(js_literal("ab\0c"), "abc");
    }

    #[test]
    fn test_click_script_main_document() {
        let script = build_click_script(&Interaction::Selector(".vjs-big-play-button"), None);
        assert!(script.contains("const doc = document;"));
        assert!(script.contains("doc.querySelector('.vjs-big-play-button')"));
    }

    #[test]
    fn test_click_script_in_frame_by_text() {
        let script = build_click_script(&Interaction::ButtonText("Play"), Some(2));
        assert!(script.contains("querySelectorAll('iframe')[2]"));
        assert!(script.contains("contentDocument"));
        assert!(script.contains("includes('play')"));
    }

    #[test]
    fn test_find_chromium_explicit_missing_path_is_skipped() {
        let missing = Path::new("/definitely/not/here/chrome");
        assert_ne!(find_chromium(Some(missing)).as_deref(), Some(missing));
    }

    #[tokio::test]
    #[ignore] // Requires Chromium to be installed
    async fn test_chromium_session_sees_network_and_clicks() {
        let engine = ChromiumEngine::default();
        let mut session = engine
            .open_session(&CHROME_DESKTOP)
            .await
            .expect("failed to open session");

        let (tx, mut rx) = mpsc::unbounded_channel();
        session.subscribe_network(tx).await.expect("subscribe failed");

        let nav = session
            .navigate(
                "data:text/html,<button onclick=\"this.textContent='ok'\">Play</button>",
                WaitUntil::DomContentLoaded,
                Duration::from_secs(10),
            )
            .await
            .expect("navigation failed");
        assert!(nav.load_time_ms < 10_000);

        session
            .click(&Interaction::ButtonText("Play"), Duration::from_secs(2))
            .await
            .expect("click failed");
        assert!(session
            .click(&Interaction::Selector("#missing"), Duration::from_secs(1))
            .await
            .is_err());
        assert!(session.frames().await.expect("frames failed").is_empty());

        session.close().await.expect("close failed");

        let mut saw_request = false;
        while let Ok(event) = rx.try_recv() {
            saw_request |= event.kind == NetworkEventKind::Request;
        }
        assert!(saw_request);
    }
}
