// Tracing log adapter - Structured logging using tracing crate

use tracing::{debug, error, info, trace, warn};

use crate::ports::*;

/// Forwards pipeline events to the installed `tracing` subscriber
pub struct TracingLogAdapter {
    min_level: LogLevel,
}

impl TracingLogAdapter {
    pub fn new() -> Self {
        Self {
            min_level: LogLevel::Trace,
        }
    }

    /// Drop events below `level` before they reach tracing
    pub fn with_min_level(mut self, level: LogLevel) -> Self {
        self.min_level = level;
        self
    }

    /// Check if log level should be logged
    fn should_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    fn render_fields(event: &LogEvent) -> String {
        event
            .context
            .iter()
            .map(|(key, value)| format!("{}={}", key, value))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl Default for TracingLogAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl LogPort for TracingLogAdapter {
    fn log_event(&self, event: &LogEvent) {
        if !self.should_log(event.level) {
            return;
        }

        let fields = Self::render_fields(event);
        match event.level {
            LogLevel::Error => error!(target: "transmux", fields = %fields, "{}", event.message),
            LogLevel::Warn => warn!(target: "transmux", fields = %fields, "{}", event.message),
            LogLevel::Info => info!(target: "transmux", fields = %fields, "{}", event.message),
            LogLevel::Debug => debug!(target: "transmux", fields = %fields, "{}", event.message),
            LogLevel::Trace => trace!(target: "transmux", fields = %fields, "{}", event.message),
        }
    }
}
