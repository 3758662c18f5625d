// Inspect interactor - Orchestrates media file inspection use case

use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::app::transcode_interactor::BackendFactory;
use crate::domain::errors::*;
use crate::domain::model::*;
use crate::error::TranscodeError;
use crate::ports::*;
use crate::streams::{StreamClassifier, StreamSelection};
use crate::utils::Utils;

/// Interactor for media file inspection use case
pub struct InspectInteractor<B: MediaBackend + 'static> {
    backend: BackendFactory<B>,
    fs_port: Arc<dyn FsPort>,
    log_port: Arc<dyn LogPort>,
}

impl<B: MediaBackend + 'static> InspectInteractor<B> {
    /// Create new inspect interactor with injected ports
    pub fn new(backend: BackendFactory<B>, fs_port: Arc<dyn FsPort>, log_port: Arc<dyn LogPort>) -> Self {
        Self {
            backend,
            fs_port,
            log_port,
        }
    }

    /// Open the input, read its stream table and classify it
    pub async fn execute(&self, request: InspectRequest) -> Result<InspectReport, DomainError> {
        self.log_port.log_event(
            &LogEvent::new(LogLevel::Info, "Inspecting media file").with("input", request.input.display()),
        );

        if !self.fs_port.file_exists(&request.input).await? {
            return Err(DomainError::FileNotFound(request.input.display().to_string()));
        }

        let media = {
            let factory = Arc::clone(&self.backend);
            let input = request.input.clone();
            tokio::task::spawn_blocking(move || -> Result<MediaInfo, DomainError> {
                let backend = factory().map_err(|e| {
                    DomainError::InternalError(format!("Media backend unavailable: {}", e))
                })?;
                let demuxer = backend
                    .open_input(&input)
                    .map_err(|source| TranscodeError::InputOpen {
                        path: input.display().to_string(),
                        source,
                    })?;
                Ok(demuxer.media_info().clone())
            })
            .await
            .map_err(|e| DomainError::InternalError(format!("Inspect worker failed: {}", e)))??
        };

        let classifier = if request.audio_enabled {
            StreamClassifier::new()
        } else {
            StreamClassifier::without_audio()
        };
        let (selection, selection_error) = match classifier.classify(&media) {
            Ok(selection) => (Some(selection), None),
            Err(e) => (None, Some(e.to_string())),
        };

        let file_size = self.fs_port.get_file_size(&request.input).await.ok();
        self.log_port.log_event(
            &LogEvent::new(LogLevel::Debug, "Media file probed")
                .with("streams", media.total_streams())
                .with("container", &media.container),
        );

        Ok(InspectReport {
            media,
            selection,
            selection_error,
            file_size,
        })
    }
}

/// Request for media file inspection
#[derive(Debug, Clone)]
pub struct InspectRequest {
    pub input: PathBuf,
    /// Classify as a `--no-audio` transcode would
    pub audio_enabled: bool,
}

impl InspectRequest {
    pub fn new(input: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            audio_enabled: true,
        }
    }
}

/// Stream table of an input plus what a transcode would do with each stream
#[derive(Debug, Clone, Serialize)]
pub struct InspectReport {
    pub media: MediaInfo,
    pub selection: Option<StreamSelection>,
    /// Why no selection could be made (for example no video stream)
    pub selection_error: Option<String>,
    pub file_size: Option<u64>,
}

impl InspectReport {
    fn role_of(&self, index: usize) -> &'static str {
        match &self.selection {
            Some(selection) if selection.video.index == index => "transcode",
            Some(selection) if selection.audio.as_ref().map(|a| a.index) == Some(index) => "passthrough",
            _ => "ignored",
        }
    }

    /// Format as human-readable text
    pub fn summary(&self) -> String {
        let mut output = String::new();

        output.push_str("Media File Information:\n");
        output.push_str(&format!("  File: {}\n", self.media.path));
        output.push_str(&format!("  Container: {}\n", self.media.container));
        match self.media.duration_seconds {
            Some(duration) => output.push_str(&format!("  Duration: {:.3}s\n", duration)),
            None => output.push_str("  Duration: unknown\n"),
        }
        if let Some(size) = self.file_size {
            output.push_str(&format!("  File Size: {}\n", Utils::format_file_size(size)));
        }

        output.push_str(&format!("\nStreams ({}):\n", self.media.total_streams()));
        for stream in &self.media.streams {
            output.push_str(&format!("  {}  [{}]\n", stream, self.role_of(stream.index)));
        }

        if let Some(error) = &self.selection_error {
            output.push_str(&format!("\nCannot transcode: {}\n", error));
        }

        output
    }
}
