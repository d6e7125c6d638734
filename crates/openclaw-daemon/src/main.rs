//! `openclawd` — standalone daemon binary hosting the subagent
//! orchestration core.
//!
//! Thin entry point: load configuration, initialize logging, construct the
//! long-lived subsystems (event bus, durable subagent registry, transcript
//! writer, interaction manager), then block until a shutdown signal arrives.
//! Chat-channel adapters and the gateway RPC transport are external
//! collaborators wired in at deployment time, not by this binary.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;

use openclaw_events::EventBus;
use openclaw_runtime::{InteractionManager, Limits, SubagentManager, TranscriptWriter};

/// `openclawd` — subagent orchestration core daemon.
#[derive(Parser)]
#[command(name = "openclawd")]
#[command(author, version, about = "openclaw subagent orchestration core daemon")]
struct Args {
    /// Path to a user config JSON file. Defaults to `~/.openclaw/config.json`.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the durable subagent registry file. Defaults to
    /// `~/.openclaw/subagents.json`.
    #[arg(long)]
    registry_path: Option<PathBuf>,

    /// Directory session transcripts are written under. Defaults to
    /// `~/.openclaw/transcripts`.
    #[arg(long)]
    transcript_dir: Option<PathBuf>,

    /// Enable verbose (debug) logging.
    #[arg(short, long)]
    verbose: bool,
}

fn openclaw_home() -> Result<PathBuf> {
    let dirs = directories::BaseDirs::new().context("could not determine home directory")?;
    Ok(dirs.home_dir().join(".openclaw"))
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let level = if args.verbose { "debug" } else { "info" };
    let log_config = openclaw_telemetry::LogConfig::new(level).with_format(openclaw_telemetry::LogFormat::Compact);
    if let Err(e) = openclaw_telemetry::setup_logging(&log_config) {
        eprintln!("Failed to initialize logging: {e}");
    }

    let config = openclaw_config::load(args.config.as_deref()).context("failed to load configuration")?;
    let home = openclaw_home()?;

    let registry_path = args.registry_path.unwrap_or_else(|| home.join("subagents.json"));
    let transcript_dir = args.transcript_dir.unwrap_or_else(|| home.join("transcripts"));

    let events = EventBus::new();
    let limits = Limits::from(config.limits);
    let subagents =
        SubagentManager::load(registry_path.clone(), limits, events.clone()).context("failed to load subagent registry")?;
    let _transcripts = TranscriptWriter::new(transcript_dir.clone(), events.clone());
    let _interactions = InteractionManager::default();

    let stats = subagents.stats();
    println!(
        "{}",
        format!(
            "openclawd starting (backends: {}, running: {}, completed: {}, reserved: {})",
            config.backends.len(),
            stats.running,
            stats.completed,
            stats.reserved
        )
        .cyan()
        .bold()
    );
    tracing::info!(
        registry_path = %registry_path.display(),
        transcript_dir = %transcript_dir.display(),
        running = stats.running,
        completed = stats.completed,
        "openclawd started"
    );

    tokio::signal::ctrl_c().await.context("failed to install Ctrl-C handler")?;

    println!("\n{}", "Shutting down openclawd...".yellow());
    tracing::info!("shutdown signal received");

    // The durable registry is rewritten atomically on every mutation
    // already (openclaw_storage::JsonFileStore::save), so there is nothing
    // left to flush here.
    println!("{}", "openclawd stopped".green().bold());
    Ok(())
}
