//! Tracing subscriber setup for the command-line front-end

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use crate::ports::LogLevel;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line human-readable output
    Pretty,
    /// Single-line text output
    Compact,
    /// One JSON object per event
    Json,
}

/// Logging configuration options
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Used when `RUST_LOG` is not set
    pub level: LogLevel,
    pub format: LogFormat,
    pub colored: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Compact,
            colored: true,
        }
    }
}

impl LoggingConfig {
    /// Filter directives; an explicit `RUST_LOG` takes precedence
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }

    /// Install the global subscriber, writing to stderr so stdout stays machine-readable
    pub fn init(&self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let builder = tracing_subscriber::fmt()
            .with_env_filter(self.env_filter())
            .with_writer(std::io::stderr)
            .with_target(false);

        match self.format {
            LogFormat::Pretty => builder.pretty().with_ansi(self.colored).try_init(),
            LogFormat::Compact => builder.compact().with_ansi(self.colored).try_init(),
            LogFormat::Json => builder.json().with_ansi(false).try_init(),
        }
    }
}
