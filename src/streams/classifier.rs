//! Stream classification

use crate::domain::model::{MediaInfo, MediaKind};
use crate::error::{TranscodeError, TranscodeResult};
use crate::streams::StreamSelection;

/// Picks the first video stream and, unless disabled, the first audio stream
pub struct StreamClassifier {
    audio_enabled: bool,
}

impl StreamClassifier {
    pub fn new() -> Self {
        Self {
            audio_enabled: true,
        }
    }

    /// Route every audio stream to the ignored set
    pub fn without_audio() -> Self {
        Self {
            audio_enabled: false,
        }
    }

    /// Classify the stream table of an opened input.
    ///
    /// Fails with `NoVideoStream` when the container has no video stream;
    /// a missing audio stream only disables passthrough.
    pub fn classify(&self, info: &MediaInfo) -> TranscodeResult<StreamSelection> {
        let mut video = None;
        let mut audio = None;
        let mut ignored = Vec::new();

        for stream in &info.streams {
            match stream.kind() {
                MediaKind::Video if video.is_none() => video = Some(stream.clone()),
                MediaKind::Audio if self.audio_enabled && audio.is_none() => {
                    audio = Some(stream.clone())
                }
                _ => ignored.push(stream.index),
            }
        }

        let video = video.ok_or_else(|| TranscodeError::NoVideoStream {
            path: info.path.clone(),
        })?;

        Ok(StreamSelection {
            video,
            audio,
            ignored,
        })
    }
}

impl Default for StreamClassifier {
    fn default() -> Self {
        Self::new()
    }
}
