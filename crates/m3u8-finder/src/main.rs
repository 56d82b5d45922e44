// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

use anyhow::Result;
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

use m3u8_finder::cli;
use m3u8_finder::cli::output::{OutputOptions, RunStatus};
use m3u8_finder::config::FinderConfig;

#[derive(Parser)]
#[command(
    name = "m3u8-finder",
    about = "Find the master HLS manifest behind a video page",
    version,
    after_help = "Run 'm3u8-finder <command> --help' for details on each command."
)]
struct Cli {
    /// Output results as JSON (machine-readable)
    #[arg(long, global = true)]
    json: bool,

    /// Print only the best URL
    #[arg(long, short, global = true)]
    quiet: bool,

    /// Also write the best URL to this file
    #[arg(long, short, global = true)]
    output: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error). RUST_LOG takes precedence.
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load the page in headless Chromium and watch its network traffic
    Sniff {
        /// Page URL
        url: String,
        /// Seconds to listen after triggering playback (5-30)
        #[arg(long)]
        listen: Option<u64>,
        /// Fetch candidates to confirm the master playlist
        #[arg(long)]
        verify: bool,
    },
    /// Fetch the page markup and crawl embedded frames, no browser needed
    Crawl {
        /// Page URL
        url: String,
        /// Frame levels to descend below the page
        #[arg(long)]
        depth: Option<usize>,
        /// Frames visited per level
        #[arg(long)]
        max_frames: Option<usize>,
        /// Per-fetch timeout in milliseconds
        #[arg(long)]
        timeout: Option<u64>,
    },
    /// Fetch one manifest URL and report whether it is a master playlist
    Verify {
        /// Manifest URL
        url: String,
    },
    /// Check environment and diagnose issues
    Doctor,
    /// Generate shell completion scripts
    Completions {
        /// Shell type (bash, zsh, fish, powershell, elvish)
        shell: Shell,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&cli.log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let out = OutputOptions {
        json: cli.json,
        quiet: cli.quiet,
        output_file: cli.output.clone(),
    };

    let result = dispatch(cli.command, &out).await;

    // Consistent exit codes: 0=success, 1=error
    match result {
        Ok(RunStatus::Ok) => Ok(()),
        Ok(RunStatus::Failed) => std::process::exit(1),
        Err(e) => {
            if out.json {
                cli::output::print_json(&serde_json::json!({
                    "error": true,
                    "message": format!("{e:#}"),
                }));
            } else {
                eprintln!("  Error: {e:#}");
            }
            std::process::exit(1);
        }
    }
}

async fn dispatch(command: Commands, out: &OutputOptions) -> Result<RunStatus> {
    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        clap_complete::generate(*shell, &mut cmd, "m3u8-finder", &mut std::io::stdout());
        return Ok(RunStatus::Ok);
    }

    let config = FinderConfig::from_env()?;

    match command {
        Commands::Sniff {
            url,
            listen,
            verify,
        } => cli::sniff_cmd::run(&url, listen, verify, config, out).await,
        Commands::Crawl {
            url,
            depth,
            max_frames,
            timeout,
        } => cli::crawl_cmd::run(&url, depth, max_frames, timeout, config, out).await,
        Commands::Verify { url } => cli::verify_cmd::run(&url, config, out).await,
        Commands::Doctor => cli::doctor::run(&config, out).await,
        Commands::Completions { .. } => Ok(RunStatus::Ok),
    }
}
