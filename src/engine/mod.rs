//! Core transcoding engine module

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::model::{Profile, Stats};
use crate::error::TranscodeResult;
use crate::ports::{MediaBackend, NullLog};

pub mod decode;
pub mod encode;
pub mod passthrough;
pub mod progress;
pub mod resources;
pub mod transcoder;
pub mod transform;

#[cfg(test)]
pub(crate) mod testing;

pub use decode::{DecodeStage, StageState};
pub use encode::EncodeStage;
pub use passthrough::AudioPassthrough;
pub use progress::{ProgressCallback, ProgressInfo, ProgressPhase, ProgressTracker};
pub use transcoder::Transcoder;
pub use transform::TransformStage;

/// Engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Forward the first audio stream; when off every audio stream is ignored
    pub audio_enabled: bool,
    /// Ask the decoder to emit frames without look-ahead buffering
    pub low_delay: bool,
    /// Input packets between two progress reports (0 disables them)
    pub progress_interval: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            audio_enabled: true,
            low_delay: true,
            progress_interval: 64,
        }
    }
}

/// Transcode with default engine settings and no logging
pub fn transcode<B: MediaBackend>(
    backend: &B,
    input: &Path,
    output: &Path,
    profile: &Profile,
) -> TranscodeResult<Stats> {
    Transcoder::new(backend, &NullLog).run(input, output, profile)
}
