//! CLI module for transmux
//!
//! This module handles command-line argument parsing and command execution.

use clap::{Parser, Subcommand};

use crate::utils::logging::LogFormat;

pub mod args;
pub mod commands;

/// Transmux video transcoder
///
/// Re-encodes the first video stream of a container to a fixed encode
/// profile and passes the first audio stream through untouched.
#[derive(Parser, Debug)]
#[command(name = "transmux")]
#[command(about = "Transmux - re-encode video to a fixed profile, pass audio through")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (RUST_LOG takes precedence)
    #[arg(long, default_value = "info", global = true)]
    pub log_level: String,

    /// Log output format
    #[arg(long, value_enum, default_value = "compact", global = true)]
    pub log_format: LogFormat,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Transcode a media file
    Transcode(args::TranscodeArgs),
    /// Show the stream table and what a transcode would do with it
    Inspect(args::InspectArgs),
    /// Print program and media library versions
    Version,
}
