//! Environment readiness check.

use crate::cli::output::{self, OutputOptions, RunStatus};
use crate::config::FinderConfig;
use crate::renderer::chromium::find_chromium;
use anyhow::Result;
use serde_json::json;

/// Report whether live sniffing can run here.
pub async fn run(config: &FinderConfig, out: &OutputOptions) -> Result<RunStatus> {
    let chromium = find_chromium(config.chromium_path.as_deref());

    if out.json {
        output::print_json(&json!({
            "os": std::env::consts::OS,
            "arch": std::env::consts::ARCH,
            "chromium": chromium.as_ref().map(|p| p.display().to_string()),
            "ready": chromium.is_some(),
        }));
        return Ok(RunStatus::Ok);
    }

    println!("m3u8-finder doctor");
    println!("==================");
    println!();
    println!("OS:   {}", std::env::consts::OS);
    println!("Arch: {}", std::env::consts::ARCH);
    println!();

    match &chromium {
        Some(path) => println!("[OK] Chromium found: {}", path.display()),
        None => println!(
            "[!!] Chromium NOT found. Install Google Chrome or Chromium, or set M3U8_FINDER_CHROMIUM_PATH."
        ),
    }
    println!("[OK] Static crawl needs no browser");

    println!();
    if chromium.is_some() {
        println!("Status: READY");
    } else {
        println!("Status: CRAWL ONLY");
        println!("  `sniff` is unavailable until Chromium is installed.");
    }

    Ok(RunStatus::Ok)
}
