//! Error handling module for Transmux

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Diagnostic reported by a media collaborator (demuxer, muxer, codec, scaler)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendError {
    pub message: String,
    /// Native error code of the collaborator, when it has one
    pub code: Option<i32>,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            code: None,
        }
    }

    pub fn with_code(message: impl Into<String>, code: i32) -> Self {
        Self {
            message: message.into(),
            code: Some(code),
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} (code {})", self.message, code),
            None => f.write_str(&self.message),
        }
    }
}

impl std::error::Error for BackendError {}

/// Failure to open a decoder or encoder
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CodecOpenError {
    /// No codec is registered under the requested id or name
    Unavailable(String),
    /// A codec was found but refused to initialize
    Open(BackendError),
}

/// Main error type for transcode runs
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranscodeError {
    /// Input container could not be opened or probed
    #[error("Failed to open input {path}: {source}")]
    InputOpen { path: String, source: BackendError },

    /// Input has no video stream to transcode
    #[error("No video stream found in {path}")]
    NoVideoStream { path: String },

    /// No decoder for the input video codec
    #[error("No decoder available for codec {codec}")]
    DecoderUnavailable { codec: String },

    /// Decoder found but failed to initialize
    #[error("Failed to open decoder for {codec}: {source}")]
    DecoderOpen { codec: String, source: BackendError },

    /// Encoder named by the profile is not available
    #[error("Encoder not found: {encoder}")]
    EncoderUnavailable { encoder: String },

    /// Encoder found but failed to initialize
    #[error("Failed to open encoder {encoder}: {source}")]
    EncoderOpen { encoder: String, source: BackendError },

    /// Output context or stream creation failed
    #[error("Failed to set up output {path}: {source}")]
    OutputSetup { path: String, source: BackendError },

    /// Output file could not be opened for writing
    #[error("Failed to open output file {path}: {source}")]
    OutputOpen { path: String, source: BackendError },

    /// Container header write failed
    #[error("Failed to write output header: {0}")]
    HeaderWrite(BackendError),

    /// Scaling / pixel format conversion context could not be created
    #[error("Failed to create frame transform: {0}")]
    TransformSetup(BackendError),

    /// Target frame buffer allocation failed
    #[error("Failed to allocate frame buffer: {0}")]
    FrameAlloc(BackendError),

    /// Reading the next input packet failed
    #[error("Failed to read input packet: {0}")]
    Demux(BackendError),

    /// Decoder reported a fatal error
    #[error("Decode error: {0}")]
    Decode(BackendError),

    /// Frame conversion failed mid-stream
    #[error("Frame transform error: {0}")]
    Transform(BackendError),

    /// Encoder reported a fatal error
    #[error("Encode error: {0}")]
    Encode(BackendError),

    /// Interleaved packet write failed
    #[error("Failed to write {stream} packet: {source}")]
    Mux { stream: MediaStreamRole, source: BackendError },

    /// Trailer write failed; output is not finalized even though all frames were processed
    #[error("Failed to write output trailer: {0}")]
    TrailerWrite(BackendError),

    /// Caller requested cancellation between packets
    #[error("Transcode cancelled after {packets} input packets")]
    Cancelled { packets: u64 },

    /// Profile rejected before any collaborator was opened
    #[error("Invalid profile: {0}")]
    InvalidProfile(String),
}

/// Which output stream a mux error concerns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaStreamRole {
    Video,
    Audio,
}

impl fmt::Display for MediaStreamRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaStreamRole::Video => f.write_str("video"),
            MediaStreamRole::Audio => f.write_str("audio"),
        }
    }
}

/// Stable taxonomy code of a transcode error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InputOpen,
    NoVideoStream,
    DecoderUnavailable,
    DecoderOpen,
    EncoderUnavailable,
    EncoderOpen,
    OutputSetup,
    OutputOpen,
    HeaderWrite,
    TransformSetup,
    FrameAlloc,
    Demux,
    Decode,
    Transform,
    Encode,
    Mux,
    TrailerWrite,
    Cancelled,
    InvalidProfile,
}

/// Coarse class of an error kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Failed before any data was processed
    Setup,
    /// Failed while packets were flowing; output left unfinalized
    SteadyState,
    /// All frames processed but the container could not be finalized
    Finalize,
    Cancelled,
    Configuration,
}

impl ErrorKind {
    pub fn category(&self) -> ErrorCategory {
        match self {
            ErrorKind::InputOpen
            | ErrorKind::NoVideoStream
            | ErrorKind::DecoderUnavailable
            | ErrorKind::DecoderOpen
            | ErrorKind::EncoderUnavailable
            | ErrorKind::EncoderOpen
            | ErrorKind::OutputSetup
            | ErrorKind::OutputOpen
            | ErrorKind::HeaderWrite
            | ErrorKind::TransformSetup
            | ErrorKind::FrameAlloc => ErrorCategory::Setup,
            ErrorKind::Demux
            | ErrorKind::Decode
            | ErrorKind::Transform
            | ErrorKind::Encode
            | ErrorKind::Mux => ErrorCategory::SteadyState,
            ErrorKind::TrailerWrite => ErrorCategory::Finalize,
            ErrorKind::Cancelled => ErrorCategory::Cancelled,
            ErrorKind::InvalidProfile => ErrorCategory::Configuration,
        }
    }

    /// Snake-case code used in logs and JSON reports
    pub fn code(&self) -> &'static str {
        match self {
            ErrorKind::InputOpen => "input_open",
            ErrorKind::NoVideoStream => "no_video_stream",
            ErrorKind::DecoderUnavailable => "decoder_unavailable",
            ErrorKind::DecoderOpen => "decoder_open",
            ErrorKind::EncoderUnavailable => "encoder_unavailable",
            ErrorKind::EncoderOpen => "encoder_open",
            ErrorKind::OutputSetup => "output_setup",
            ErrorKind::OutputOpen => "output_open",
            ErrorKind::HeaderWrite => "header_write",
            ErrorKind::TransformSetup => "transform_setup",
            ErrorKind::FrameAlloc => "frame_alloc",
            ErrorKind::Demux => "demux",
            ErrorKind::Decode => "decode",
            ErrorKind::Transform => "transform",
            ErrorKind::Encode => "encode",
            ErrorKind::Mux => "mux",
            ErrorKind::TrailerWrite => "trailer_write",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::InvalidProfile => "invalid_profile",
        }
    }
}

impl TranscodeError {
    /// Taxonomy code of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranscodeError::InputOpen { .. } => ErrorKind::InputOpen,
            TranscodeError::NoVideoStream { .. } => ErrorKind::NoVideoStream,
            TranscodeError::DecoderUnavailable { .. } => ErrorKind::DecoderUnavailable,
            TranscodeError::DecoderOpen { .. } => ErrorKind::DecoderOpen,
            TranscodeError::EncoderUnavailable { .. } => ErrorKind::EncoderUnavailable,
            TranscodeError::EncoderOpen { .. } => ErrorKind::EncoderOpen,
            TranscodeError::OutputSetup { .. } => ErrorKind::OutputSetup,
            TranscodeError::OutputOpen { .. } => ErrorKind::OutputOpen,
            TranscodeError::HeaderWrite(_) => ErrorKind::HeaderWrite,
            TranscodeError::TransformSetup(_) => ErrorKind::TransformSetup,
            TranscodeError::FrameAlloc(_) => ErrorKind::FrameAlloc,
            TranscodeError::Demux(_) => ErrorKind::Demux,
            TranscodeError::Decode(_) => ErrorKind::Decode,
            TranscodeError::Transform(_) => ErrorKind::Transform,
            TranscodeError::Encode(_) => ErrorKind::Encode,
            TranscodeError::Mux { .. } => ErrorKind::Mux,
            TranscodeError::TrailerWrite(_) => ErrorKind::TrailerWrite,
            TranscodeError::Cancelled { .. } => ErrorKind::Cancelled,
            TranscodeError::InvalidProfile(_) => ErrorKind::InvalidProfile,
        }
    }

    /// Underlying collaborator diagnostic, if the error came from one
    pub fn backend(&self) -> Option<&BackendError> {
        match self {
            TranscodeError::InputOpen { source, .. }
            | TranscodeError::DecoderOpen { source, .. }
            | TranscodeError::EncoderOpen { source, .. }
            | TranscodeError::OutputSetup { source, .. }
            | TranscodeError::OutputOpen { source, .. }
            | TranscodeError::Mux { source, .. } => Some(source),
            TranscodeError::HeaderWrite(source)
            | TranscodeError::TransformSetup(source)
            | TranscodeError::FrameAlloc(source)
            | TranscodeError::Demux(source)
            | TranscodeError::Decode(source)
            | TranscodeError::Transform(source)
            | TranscodeError::Encode(source)
            | TranscodeError::TrailerWrite(source) => Some(source),
            _ => None,
        }
    }

    /// Whether the run failed before the output header was written
    pub fn is_setup_failure(&self) -> bool {
        matches!(
            self.kind().category(),
            ErrorCategory::Setup | ErrorCategory::Configuration
        )
    }

    pub(crate) fn decoder_open(codec: &str, err: CodecOpenError) -> Self {
        match err {
            CodecOpenError::Unavailable(_) => TranscodeError::DecoderUnavailable {
                codec: codec.to_string(),
            },
            CodecOpenError::Open(source) => TranscodeError::DecoderOpen {
                codec: codec.to_string(),
                source,
            },
        }
    }

    pub(crate) fn encoder_open(encoder: &str, err: CodecOpenError) -> Self {
        match err {
            CodecOpenError::Unavailable(_) => TranscodeError::EncoderUnavailable {
                encoder: encoder.to_string(),
            },
            CodecOpenError::Open(source) => TranscodeError::EncoderOpen {
                encoder: encoder.to_string(),
                source,
            },
        }
    }
}

/// Result type alias for transcode operations
pub type TranscodeResult<T> = std::result::Result<T, TranscodeError>;
