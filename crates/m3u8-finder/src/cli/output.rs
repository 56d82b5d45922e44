//! Result rendering for the terminal, JSON consumers and `--output` files.

use crate::discovery::{DiscoveryResult, Strategy};
use crate::selector::Verification;
use anyhow::{Context, Result};
use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Global output flags.
#[derive(Debug, Clone, Default)]
pub struct OutputOptions {
    /// Print machine-readable JSON instead of text.
    pub json: bool,
    /// Print only the best URL.
    pub quiet: bool,
    /// Also write the best URL to this file.
    pub output_file: Option<PathBuf>,
}

/// Whether a command met its goal. Drives the process exit code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Ok,
    Failed,
}

/// Print any serializable value as pretty JSON on stdout.
pub fn print_json<T: Serialize>(value: &T) {
    match serde_json::to_string_pretty(value) {
        Ok(s) => println!("{s}"),
        Err(e) => eprintln!("  Error: could not serialize output: {e}"),
    }
}

/// Heading shown above the chosen URL.
pub fn best_heading(result: &DiscoveryResult) -> &'static str {
    match (result.verification, result.strategy) {
        (Verification::Verified, _) => "Best (verified master)",
        (Verification::Heuristic, Strategy::Live) => "Best (picked from requests)",
        (Verification::Heuristic, Strategy::Static) => "Best (picked by name)",
        (Verification::Unverified, _) => "Best (unverified, first found)",
        (Verification::NoCandidates, _) => "Best",
    }
}

/// Human-readable rendering of a result.
pub fn render_result(result: &DiscoveryResult) -> String {
    let mut out = String::new();

    if let Some(error) = &result.error {
        let _ = writeln!(out, "  Error: {error}");
        return out;
    }

    let best = match &result.best {
        Some(best) => best,
        None => {
            let _ = writeln!(out, "{}", result.empty_message());
            return out;
        }
    };

    let _ = writeln!(out, "{}:", best_heading(result));
    let _ = writeln!(out, "  {best}");
    let _ = writeln!(out);
    let _ = writeln!(out, "All .m3u8 URLs seen ({}):", result.candidates.len());
    for (i, url) in result.candidates.iter().enumerate() {
        let _ = writeln!(out, "  {:>2}. {url}", i + 1);
    }
    out
}

/// Write the best URL to `path`. Returns `false` (and writes nothing) when
/// there is no best URL.
pub fn write_best(result: &DiscoveryResult, path: &Path) -> Result<bool> {
    let Some(best) = &result.best else {
        return Ok(false);
    };
    std::fs::write(path, format!("{best}\n"))
        .with_context(|| format!("failed to write {}", path.display()))?;
    Ok(true)
}

/// Print `result` according to `options` and write the `--output` file.
pub fn report(result: &DiscoveryResult, options: &OutputOptions) -> Result<RunStatus> {
    if options.json {
        print_json(result);
    } else if options.quiet {
        if let Some(best) = &result.best {
            println!("{best}");
        } else if let Some(error) = &result.error {
            eprintln!("  Error: {error}");
        }
    } else {
        print!("{}", render_result(result));
    }

    if let Some(path) = &options.output_file {
        if write_best(result, path)? && !options.quiet && !options.json {
            println!();
            println!("Saved best URL to {}", path.display());
        }
    }

    Ok(if result.error.is_some() {
        RunStatus::Failed
    } else {
        RunStatus::Ok
    })
}
