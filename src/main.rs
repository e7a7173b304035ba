//! Seamcut command-line entry point
//!
//! ```bash
//! seamcut cut input.mkv --segment 10-20 --segment 00:01:00-00:01:30:Intro
//! seamcut concat part1.mkv part2.mkv -o joined.mkv
//! ```

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{error, info, warn};

use seamcut::adapters::{FfmpegTool, FfprobeAdapter};
use seamcut::cli::{commands, Cli};
use seamcut::config_initialization::resolve_config;
use seamcut::engine::ExportSession;
use seamcut::utils::logging::init_logging;
use seamcut::SeamcutError;

/// Main entry point for the Seamcut CLI application
#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse();
    let config = resolve_config(&cli)?;

    // Initialize logging
    init_logging(&config.logging.level, config.logging.json)?;
    info!("Starting Seamcut");

    let session = Arc::new(
        ExportSession::new(
            Arc::new(FfmpegTool::new(config.tools.ffmpeg.clone())),
            Arc::new(FfprobeAdapter::new(config.tools.ffprobe.clone())),
        )
        .with_keyframe_window(config.keyframes.window)
        .with_cache_capacity(config.keyframes.cache_capacity),
    );

    // Ctrl-C aborts every running job of the session
    let signal_session = session.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("Interrupted, aborting running jobs");
                signal_session.abort_all();
            }
            Err(e) => error!("Failed to listen for Ctrl-C: {}", e),
        }
    });

    // Execute the requested command
    match commands::execute(&session, &config, cli.command).await {
        Ok(()) => {
            info!("Seamcut completed successfully");
            Ok(())
        }
        Err(e)
            if e
                .downcast_ref::<SeamcutError>()
                .map_or(false, SeamcutError::is_cancellation) =>
        {
            info!("Operation cancelled");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
