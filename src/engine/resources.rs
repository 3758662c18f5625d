//! Resource set of one transcode run

use crate::engine::decode::DecodeStage;
use crate::engine::encode::EncodeStage;
use crate::engine::transform::TransformStage;
use crate::output::MuxWriter;
use crate::ports::MediaBackend;

/// Every context a run acquires, filled in as setup progresses.
///
/// Dropping it releases whatever was acquired in a fixed order regardless of
/// where the run stopped: transform (frame buffer, then scaler), encoder,
/// decoder, output (I/O handle, then container), input.
pub struct Resources<B: MediaBackend> {
    pub transform: Option<TransformStage<B::Scaler>>,
    pub encode: Option<EncodeStage<B::Encoder>>,
    pub decode: Option<DecodeStage<B::Decoder>>,
    pub writer: Option<MuxWriter<B::Output>>,
    pub input: Option<B::Input>,
}

impl<B: MediaBackend> Resources<B> {
    pub fn new() -> Self {
        Self {
            transform: None,
            encode: None,
            decode: None,
            writer: None,
            input: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.transform.is_none()
            && self.encode.is_none()
            && self.decode.is_none()
            && self.writer.is_none()
            && self.input.is_none()
    }

    /// Release everything now, in teardown order
    pub fn release(&mut self) {
        drop(self.transform.take());
        drop(self.encode.take());
        drop(self.decode.take());
        if let Some(mut writer) = self.writer.take() {
            writer.close();
            drop(writer);
        }
        drop(self.input.take());
    }
}

impl<B: MediaBackend> Default for Resources<B> {
    fn default() -> Self {
        Self::new()
    }
}

impl<B: MediaBackend> Drop for Resources<B> {
    fn drop(&mut self) {
        self.release();
    }
}
