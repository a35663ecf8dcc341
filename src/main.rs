//! vidfetch - interactive video/playlist downloader
//!
//! Thin entry point: parses arguments, wires the yt-dlp source, placement
//! manager and orchestrator together, installs the signal-driven cleanup
//! watcher, and runs one interactive session.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::warn;
use vidfetch::extractor::YtDlpSource;
use vidfetch::orchestrator::Orchestrator;
use vidfetch::placement::FilePlacement;
use vidfetch::session::Session;
use vidfetch::utils::AppSettings;

#[derive(Parser)]
#[command(version, about)]
struct Args {
    /// Video or playlist URL (prompted for when omitted)
    url: Option<String>,

    /// Output directory for completed downloads
    #[arg(long)]
    output: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    tracing_subscriber::fmt::init();

    let mut settings = AppSettings::default();
    if let Some(output) = args.output {
        settings = settings.with_output_dir(output);
    }

    let source = Arc::new(YtDlpSource::new()?);
    let placement = FilePlacement::new(settings.scratch_dir.clone(), settings.final_dir.clone());

    // The watcher owns its own cleanup handle; either termination signal
    // sweeps the scratch directory before the process exits.
    spawn_signal_watcher(placement.clone());

    let orchestrator = Orchestrator::new(source.clone(), placement.clone(), settings);
    let session = Session::new(source, orchestrator, placement.clone(), args.url);

    let result = session.run().await;
    if result.is_err() {
        // A failed prompt read skips the session's own sweep
        if let Err(e) = placement.cleanup_scratch().await {
            warn!("Scratch cleanup failed: {:#}", e);
        }
    }
    result
}

/// Run scratch cleanup on SIGINT or SIGTERM, then exit
fn spawn_signal_watcher(placement: FilePlacement) {
    tokio::spawn(async move {
        wait_for_termination().await;
        warn!("Termination signal received, cleaning scratch directory");
        if let Err(e) = placement.cleanup_scratch().await {
            warn!("Scratch cleanup failed: {:#}", e);
        }
        std::process::exit(130);
    });
}

#[cfg(unix)]
async fn wait_for_termination() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(stream) => stream,
        Err(e) => {
            warn!("Failed to install SIGTERM handler: {}", e);
            let _ = tokio::signal::ctrl_c().await;
            return;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_termination() {
    let _ = tokio::signal::ctrl_c().await;
}
