//! Manifest and frame URL extraction from raw HTML.
//!
//! Regex-based and deliberately approximate: no DOM is built. Manifest URLs
//! come from two passes (absolute URLs anywhere in the text, then `src`-style
//! attributes resolved against the page URL). Frame URLs come from the same
//! attribute scan, kept only when an `<iframe` opening appears shortly
//! before the attribute.

use crate::candidate::{looks_like_manifest, CandidateSet, CandidateSource};
use regex::Regex;
use std::collections::HashSet;
use std::sync::OnceLock;

/// Bytes before an attribute searched for an `<iframe` opening.
pub const FRAME_CONTEXT_WINDOW: usize = 200;

/// Absolute manifest URLs, including JSON-escaped `https:\/\/` forms.
fn absolute_manifest_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)https?:(?:\\?/){2}[^\s"'<>()]+?\.m3u8(?:\?[^\s"'<>()]*)?"#)
            .expect("valid regex")
    })
}

/// `src` / `data-src` attribute values.
fn src_attr_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"(?i)\b(?:data-)?src\s*=\s*["']([^"']+)["']"#).expect("valid regex")
    })
}

/// Extract manifest candidates from `html`, resolving relative URLs
/// against `base_url`.
pub fn extract_candidates(html: &str, base_url: &str) -> CandidateSet {
    let mut found = CandidateSet::new();

    for m in absolute_manifest_re().find_iter(html) {
        found.insert(unescape_slashes(m.as_str()), CandidateSource::Markup);
    }

    for cap in src_attr_re().captures_iter(html) {
        let Some(raw) = cap.get(1) else { continue };
        let Some(resolved) = resolve_url(raw.as_str(), base_url) else {
            continue;
        };
        if looks_like_manifest(&resolved) {
            found.insert(resolved, CandidateSource::Markup);
        }
    }

    found
}

/// Extract embedded-frame URLs from `html`, in document order, without
/// duplicates.
///
/// An attribute counts as a frame source when the last tag opening within
/// the [`FRAME_CONTEXT_WINDOW`] bytes before it is `<iframe`. This
/// misses frames with very long attribute lists and can match stray text;
/// that is accepted in exchange for not parsing the document.
pub fn extract_frames(html: &str, base_url: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut frames = Vec::new();

    for cap in src_attr_re().captures_iter(html) {
        let (Some(whole), Some(raw)) = (cap.get(0), cap.get(1)) else {
            continue;
        };
        if !preceded_by_iframe(html, whole.start()) {
            continue;
        }
        let Some(resolved) = resolve_url(raw.as_str(), base_url) else {
            continue;
        };
        if !is_http(&resolved) {
            continue;
        }
        if seen.insert(resolved.clone()) {
            frames.push(resolved);
        }
    }

    frames
}

fn preceded_by_iframe(html: &str, attr_start: usize) -> bool {
    let mut window_start = attr_start.saturating_sub(FRAME_CONTEXT_WINDOW);
    while !html.is_char_boundary(window_start) {
        window_start -= 1;
    }
    // Only the last tag opening in the window counts, so a `src` on an
    // unrelated tag right after an iframe is not taken as a frame.
    let window = &html[window_start..attr_start];
    match window.rfind('<') {
        Some(tag_start) => window[tag_start..]
            .to_ascii_lowercase()
            .starts_with("<iframe"),
        None => false,
    }
}

/// Resolve an attribute value against the page URL.
///
/// Handles absolute URLs (returned as-is), protocol-relative URLs, and
/// relative paths. Returns `None` when neither the value nor the base
/// can be interpreted.
pub fn resolve_url(src: &str, base_url: &str) -> Option<String> {
    let src = unescape_slashes(src.trim());
    if src.is_empty() {
        return None;
    }

    // Already absolute
    if src.starts_with("http://") || src.starts_with("https://") {
        return Some(src);
    }

    let base = url::Url::parse(base_url).ok()?;
    base.join(&src).ok().map(|u| u.to_string())
}

fn is_http(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

fn unescape_slashes(s: &str) -> String {
    s.replace("\\/", "/")
}
