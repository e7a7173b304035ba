//! CLI module for Seamcut
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub mod args;
pub mod commands;

pub use args::{ConcatArgs, CutArgs, DetectArgs, KeyframesArgs};

/// Seamcut lossless segment cutter
///
/// Cuts, merges and inspects media files with the ffmpeg command-line tools,
/// copying streams wherever possible and re-encoding only the frames a
/// keyframe-exact cut cannot avoid.
#[derive(Parser, Debug)]
#[command(name = "seamcut")]
#[command(about = "Seamcut - Lossless segment cutting with smart cut")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Emit logs as JSON
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// ffmpeg executable
    #[arg(long, global = true)]
    pub ffmpeg: Option<String>,

    /// ffprobe executable
    #[arg(long, global = true)]
    pub ffprobe: Option<String>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Cut segments of a file into separate outputs
    Cut(CutArgs),
    /// Merge files into one output
    Concat(ConcatArgs),
    /// List keyframes around a time
    Keyframes(KeyframesArgs),
    /// Detect black, silent or scene intervals
    Detect(DetectArgs),
}
