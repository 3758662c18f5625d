//! Transmux video transcoder
//!
//! Re-encodes the first video stream of a media file to a fixed encode
//! profile and copies the first audio stream through without decoding it.
//!
//! # Usage
//!
//! ```bash
//! transmux transcode --input in.mkv --output out.mp4 --width 1280 --height 720
//! transmux inspect --input in.mkv --json
//! ```

use anyhow::{anyhow, Result};
use clap::Parser;
use tracing::debug;

use transmux_cli::app::DefaultAppContainer;
use transmux_cli::cli::{commands, Cli, Commands};
use transmux_cli::ports::LogLevel;
use transmux_cli::utils::logging::LoggingConfig;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig {
        level: LogLevel::parse(&cli.log_level).map_err(|e| anyhow!("{}", e))?,
        format: cli.log_format,
        ..LoggingConfig::default()
    };
    logging
        .init()
        .map_err(|e| anyhow!("Failed to initialize logging: {}", e))?;

    debug!("Starting transmux {}", env!("CARGO_PKG_VERSION"));

    let container = DefaultAppContainer::new();
    match cli.command {
        Commands::Transcode(args) => commands::transcode(args, &container).await,
        Commands::Inspect(args) => commands::inspect(args, &container).await,
        Commands::Version => commands::version(),
    }
}
