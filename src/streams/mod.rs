//! Stream selection module

use serde::{Deserialize, Serialize};

use crate::domain::model::StreamDescriptor;
use crate::error::MediaStreamRole;

pub mod classifier;

pub use classifier::StreamClassifier;

/// Streams picked from an input container for one run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamSelection {
    /// Stream that is decoded, transformed and re-encoded
    pub video: StreamDescriptor,
    /// Stream forwarded without decoding, if any
    pub audio: Option<StreamDescriptor>,
    /// Input indices that are read and dropped
    pub ignored: Vec<usize>,
}

impl StreamSelection {
    pub fn has_audio(&self) -> bool {
        self.audio.is_some()
    }

    /// Where packets of input stream `index` go, `None` for discarded streams
    pub fn route(&self, index: usize) -> Option<MediaStreamRole> {
        if index == self.video.index {
            Some(MediaStreamRole::Video)
        } else if self.audio.as_ref().map(|a| a.index) == Some(index) {
            Some(MediaStreamRole::Audio)
        } else {
            None
        }
    }
}
