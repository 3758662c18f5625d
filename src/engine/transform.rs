//! Frame transform stage: any decoded shape into the profile's shape

use crate::domain::model::{Profile, VideoParams};
use crate::error::{TranscodeError, TranscodeResult};
use crate::ports::{FrameScaler, MediaBackend, VideoFrame};

/// Scaler plus the reusable target frame it writes into
pub struct TransformStage<S: FrameScaler> {
    // Field order is drop order: the frame buffer goes before the scaler.
    target: S::Frame,
    scaler: S,
    converted: u64,
}

impl<S: FrameScaler> TransformStage<S> {
    /// Create the conversion context and allocate the target frame once
    pub fn open<B>(backend: &B, source: &VideoParams, profile: &Profile) -> TranscodeResult<Self>
    where
        B: MediaBackend<Scaler = S, Frame = S::Frame>,
    {
        let scaler = backend
            .create_scaler(source, profile)
            .map_err(TranscodeError::TransformSetup)?;
        let target = backend
            .alloc_frame(profile)
            .map_err(TranscodeError::FrameAlloc)?;
        Ok(Self::new(scaler, target))
    }

    pub fn new(scaler: S, target: S::Frame) -> Self {
        Self {
            target,
            scaler,
            converted: 0,
        }
    }

    /// Refill the target frame from `source` and hand it out for encoding.
    ///
    /// The source timestamp is not carried over; the encode stage stamps its own.
    pub fn convert(&mut self, source: &S::Frame) -> TranscodeResult<&mut S::Frame> {
        self.scaler
            .scale(source, &mut self.target)
            .map_err(TranscodeError::Transform)?;
        self.target.set_pts(None);
        self.converted += 1;
        Ok(&mut self.target)
    }

    pub fn converted(&self) -> u64 {
        self.converted
    }
}
