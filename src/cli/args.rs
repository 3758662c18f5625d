//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

use crate::app::ProfileOverrides;

/// Arguments for the transcode command
#[derive(Args, Debug)]
pub struct TranscodeArgs {
    /// Input media file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file path; the extension selects the container (default: <input>_transcoded.<ext>)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Profile configuration file (default: ./transmux.toml if present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Target width in pixels
    #[arg(long)]
    pub width: Option<u32>,

    /// Target height in pixels
    #[arg(long)]
    pub height: Option<u32>,

    /// Target bitrate in bits per second
    #[arg(long)]
    pub bitrate: Option<u64>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Key frame interval in frames
    #[arg(long)]
    pub gop: Option<u32>,

    /// Encoder name (e.g. libx264)
    #[arg(long)]
    pub encoder: Option<String>,

    /// Encoder preset
    #[arg(long)]
    pub preset: Option<String>,

    /// Drop audio instead of passing it through
    #[arg(long)]
    pub no_audio: bool,

    /// Replace an existing output file
    #[arg(long)]
    pub overwrite: bool,

    /// Hide the progress line
    #[arg(long)]
    pub no_progress: bool,

    /// Report progress and results as JSON
    #[arg(long)]
    pub json: bool,
}

impl TranscodeArgs {
    pub fn overrides(&self) -> ProfileOverrides {
        ProfileOverrides {
            width: self.width,
            height: self.height,
            bit_rate: self.bitrate,
            frame_rate: self.fps,
            gop_size: self.gop,
            encoder: self.encoder.clone(),
            preset: self.preset.clone(),
        }
    }
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input media file path
    #[arg(short, long)]
    pub input: PathBuf,

    /// Classify as if audio passthrough were disabled
    #[arg(long)]
    pub no_audio: bool,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}
