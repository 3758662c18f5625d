//! Progress reporting and cooperative cancellation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use crate::domain::model::{MediaInfo, Stats};
use crate::error::TranscodeError;

/// Progress callback trait for UI integration
pub trait ProgressCallback: Send + Sync {
    /// Called once the input is open and its streams are classified
    fn on_start(&self, _input: &MediaInfo) {}

    /// Called periodically while packets flow
    fn on_progress(&self, progress: &ProgressInfo);

    /// Called after the trailer was written
    fn on_complete(&self, _stats: &Stats) {}

    /// Called when the run aborts
    fn on_error(&self, _error: &TranscodeError) {}

    /// Called when the run stops because `should_cancel` said so
    fn on_cancel(&self) {}

    /// Polled between input packets
    fn should_cancel(&self) -> bool {
        false
    }
}

/// Snapshot handed to `on_progress`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressInfo {
    pub phase: ProgressPhase,
    /// Input position of the last video packet read, in seconds
    pub position_seconds: f64,
    pub duration_seconds: Option<f64>,
    pub elapsed: Duration,
    pub stats: Stats,
}

impl ProgressInfo {
    /// Completion estimate (0.0 - 100.0) when the input duration is known
    pub fn percent(&self) -> Option<f64> {
        match self.duration_seconds {
            Some(duration) if duration > 0.0 => {
                Some((self.position_seconds / duration * 100.0).clamp(0.0, 100.0))
            }
            _ => None,
        }
    }
}

/// Pipeline phases
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProgressPhase {
    /// Main packet loop
    Transcoding,
    /// Decoder and encoder flush
    Flushing,
    /// Trailer write
    Finalizing,
}

/// Fan-out progress tracker with a shared cancel flag and update throttling
#[derive(Clone)]
pub struct ProgressTracker {
    cancelled: Arc<AtomicBool>,
    callbacks: Arc<Mutex<Vec<Arc<dyn ProgressCallback>>>>,
    /// Time and phase of the last delivered report
    last_update: Arc<Mutex<Option<(Instant, ProgressPhase)>>>,
    update_interval: Duration,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            cancelled: Arc::new(AtomicBool::new(false)),
            callbacks: Arc::new(Mutex::new(Vec::new())),
            last_update: Arc::new(Mutex::new(None)),
            update_interval: Duration::from_millis(250),
        }
    }

    /// Set update interval
    pub fn with_update_interval(mut self, interval: Duration) -> Self {
        self.update_interval = interval;
        self
    }

    /// Add a progress callback
    pub fn add_callback(&self, callback: Arc<dyn ProgressCallback>) {
        if let Ok(mut callbacks) = self.callbacks.lock() {
            callbacks.push(callback);
        }
    }

    /// Request cancellation; honoured before the next input packet
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn notify_callbacks<F>(&self, f: F)
    where
        F: Fn(&dyn ProgressCallback),
    {
        if let Ok(callbacks) = self.callbacks.lock() {
            for callback in callbacks.iter() {
                f(callback.as_ref());
            }
        }
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressCallback for ProgressTracker {
    fn on_start(&self, input: &MediaInfo) {
        self.notify_callbacks(|cb| cb.on_start(input));
    }

    /// Throttled within a phase; the first report of every phase is always delivered
    fn on_progress(&self, progress: &ProgressInfo) {
        let due = match self.last_update.lock() {
            Ok(mut last) => {
                let now = Instant::now();
                let due = match *last {
                    Some((at, phase)) if phase == progress.phase => {
                        now.duration_since(at) >= self.update_interval
                    }
                    _ => true,
                };
                if due {
                    *last = Some((now, progress.phase));
                }
                due
            }
            Err(_) => false,
        };

        if due {
            self.notify_callbacks(|cb| cb.on_progress(progress));
        }
    }

    fn on_complete(&self, stats: &Stats) {
        self.notify_callbacks(|cb| cb.on_complete(stats));
    }

    fn on_error(&self, error: &TranscodeError) {
        self.notify_callbacks(|cb| cb.on_error(error));
    }

    fn on_cancel(&self) {
        self.notify_callbacks(|cb| cb.on_cancel());
    }

    fn should_cancel(&self) -> bool {
        if self.is_cancelled() {
            return true;
        }

        if let Ok(callbacks) = self.callbacks.lock() {
            return callbacks.iter().any(|cb| cb.should_cancel());
        }
        false
    }
}

/// Console progress line on stderr for CLI usage
pub struct ConsoleProgressCallback;

impl ProgressCallback for ConsoleProgressCallback {
    fn on_progress(&self, progress: &ProgressInfo) {
        match progress.percent() {
            Some(percent) => {
                let bar_length = 20;
                let filled = (percent / 100.0 * bar_length as f64) as usize;
                let bar = "#".repeat(filled) + &"-".repeat(bar_length - filled);
                eprint!(
                    "\r[{}] {:>5.1}%  {} frames",
                    bar, percent, progress.stats.frame_count
                );
            }
            None => eprint!(
                "\r{:.1}s  {} frames",
                progress.position_seconds, progress.stats.frame_count
            ),
        }
    }

    fn on_complete(&self, _stats: &Stats) {
        eprintln!();
    }

    fn on_error(&self, _error: &TranscodeError) {
        eprintln!();
    }

    fn on_cancel(&self) {
        eprintln!("\nCancelled");
    }
}

/// Newline-delimited JSON progress events on stderr
pub struct JsonProgressCallback;

impl ProgressCallback for JsonProgressCallback {
    fn on_start(&self, input: &MediaInfo) {
        let event = serde_json::json!({
            "event": "start",
            "input": input.path,
            "streams": input.total_streams(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        eprintln!("{}", event);
    }

    fn on_progress(&self, progress: &ProgressInfo) {
        let event = serde_json::json!({
            "event": "progress",
            "phase": progress.phase,
            "percent": progress.percent(),
            "position_seconds": progress.position_seconds,
            "stats": progress.stats,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        eprintln!("{}", event);
    }

    fn on_complete(&self, stats: &Stats) {
        let event = serde_json::json!({
            "event": "complete",
            "stats": stats,
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        eprintln!("{}", event);
    }

    fn on_error(&self, error: &TranscodeError) {
        let event = serde_json::json!({
            "event": "error",
            "kind": error.kind(),
            "error": error.to_string(),
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        eprintln!("{}", event);
    }

    fn on_cancel(&self) {
        let event = serde_json::json!({
            "event": "cancel",
            "timestamp": chrono::Utc::now().to_rfc3339()
        });
        eprintln!("{}", event);
    }
}
