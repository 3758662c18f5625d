// Ports - Interface definitions (contracts)

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::errors::*;
use crate::domain::model::*;
use crate::error::{BackendError, CodecOpenError};

/// Result of handing input to a codec
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    /// Input was queued inside the codec
    Accepted,
    /// The codec refuses input until its pending output has been drained
    OutputPending,
}

/// Result of pulling output from a codec
#[derive(Debug, PartialEq, Eq)]
pub enum CodecOutput<T> {
    /// One unit of output is ready
    Ready(T),
    /// Nothing buffered; the codec wants more input
    NeedsMoreInput,
    /// The codec was flushed and has emitted everything it had
    EndOfStream,
}

/// Compressed packet as seen by the pipeline
pub trait MediaPacket {
    fn stream_index(&self) -> usize;

    fn set_stream_index(&mut self, index: usize);

    fn pts(&self) -> Option<i64>;

    fn dts(&self) -> Option<i64>;

    /// Rescale pts, dts and duration from `from` into `to`
    fn rescale_ts(&mut self, from: Timebase, to: Timebase);

    /// Drop the source container's byte-offset hint
    fn clear_position(&mut self);

    /// Payload size in bytes
    fn size(&self) -> usize;
}

/// Raw video frame as seen by the pipeline
pub trait VideoFrame {
    fn width(&self) -> u32;

    fn height(&self) -> u32;

    fn pixel_format(&self) -> PixelFormat;

    fn pts(&self) -> Option<i64>;

    fn set_pts(&mut self, pts: Option<i64>);
}

/// Opened input container
pub trait Demuxer {
    type Packet: MediaPacket;

    /// Container information and the stream table, in container order
    fn media_info(&self) -> &MediaInfo;

    /// Next packet in file order; `Ok(None)` at end of input
    fn read_packet(&mut self) -> Result<Option<Self::Packet>, BackendError>;
}

/// Output container being written
pub trait Muxer {
    type Packet: MediaPacket;

    /// Container wants codec parameter sets in its header instead of in-band
    fn requires_global_header(&self) -> bool;

    /// Open the output file handle (no-op for formats that do their own I/O)
    fn open_io(&mut self) -> Result<(), BackendError>;

    fn write_header(&mut self) -> Result<(), BackendError>;

    /// Timebase chosen for an output stream; only final after `write_header`
    fn stream_time_base(&self, index: usize) -> Option<Timebase>;

    /// Write one packet, buffering as needed for correct interleaving
    fn write_interleaved(&mut self, packet: &mut Self::Packet) -> Result<(), BackendError>;

    fn write_trailer(&mut self) -> Result<(), BackendError>;

    /// Close the output file handle; the container context itself is released on drop
    fn close_io(&mut self);
}

/// Video decoder bound to one input stream
pub trait VideoDecoder {
    type Packet: MediaPacket;
    type Frame: VideoFrame;

    fn codec_name(&self) -> &str;

    /// Shape of the frames this decoder produces
    fn output_params(&self) -> VideoParams;

    fn send_packet(&mut self, packet: &Self::Packet) -> Result<SendStatus, BackendError>;

    /// Signal end of input; buffered frames stay available to `receive_frame`
    fn send_eof(&mut self) -> Result<(), BackendError>;

    fn receive_frame(&mut self) -> Result<CodecOutput<Self::Frame>, BackendError>;
}

/// Video encoder configured from a profile
pub trait VideoEncoder {
    type Packet: MediaPacket;
    type Frame: VideoFrame;

    fn name(&self) -> &str;

    /// Timebase of the timestamps on produced packets
    fn time_base(&self) -> Timebase;

    fn send_frame(&mut self, frame: &Self::Frame) -> Result<SendStatus, BackendError>;

    fn send_eof(&mut self) -> Result<(), BackendError>;

    fn receive_packet(&mut self) -> Result<CodecOutput<Self::Packet>, BackendError>;
}

/// Pixel format / resolution conversion
pub trait FrameScaler {
    type Frame: VideoFrame;

    /// Convert `source` into the pre-allocated `target`, overwriting its pixels
    fn scale(&mut self, source: &Self::Frame, target: &mut Self::Frame) -> Result<(), BackendError>;
}

/// Factory for every media collaborator of one transcode run
pub trait MediaBackend {
    type Packet: MediaPacket;
    type Frame: VideoFrame;
    type Input: Demuxer<Packet = Self::Packet>;
    type Output: Muxer<Packet = Self::Packet>;
    type Decoder: VideoDecoder<Packet = Self::Packet, Frame = Self::Frame>;
    type Encoder: VideoEncoder<Packet = Self::Packet, Frame = Self::Frame>;
    type Scaler: FrameScaler<Frame = Self::Frame>;

    /// Open and probe an input container
    fn open_input(&self, path: &Path) -> Result<Self::Input, BackendError>;

    /// Open a decoder for one stream of `input`
    fn open_decoder(
        &self,
        input: &Self::Input,
        stream: &StreamDescriptor,
        low_delay: bool,
    ) -> Result<Self::Decoder, CodecOpenError>;

    /// Allocate an output container; the format follows the path's extension
    fn create_output(&self, path: &Path) -> Result<Self::Output, BackendError>;

    fn open_encoder(
        &self,
        profile: &Profile,
        global_header: bool,
    ) -> Result<Self::Encoder, CodecOpenError>;

    /// Add the re-encoded video stream, returning its output index
    fn add_video_stream(
        &self,
        output: &mut Self::Output,
        encoder: &Self::Encoder,
    ) -> Result<usize, BackendError>;

    /// Add a stream copying the parameters of `stream` from `input`
    fn add_passthrough_stream(
        &self,
        output: &mut Self::Output,
        input: &Self::Input,
        stream: &StreamDescriptor,
    ) -> Result<usize, BackendError>;

    fn create_scaler(
        &self,
        source: &VideoParams,
        profile: &Profile,
    ) -> Result<Self::Scaler, BackendError>;

    /// Allocate the reusable target frame at the profile's shape
    fn alloc_frame(&self, profile: &Profile) -> Result<Self::Frame, BackendError>;
}

/// Port for configuration management
#[async_trait]
pub trait ConfigPort: Send + Sync {
    /// Resolve the encode profile from the config file and environment
    async fn load_profile(&self, config_file: Option<&Path>) -> Result<Profile, DomainError>;

    /// Path of the configuration file that was or would be read
    async fn get_config_file_path(&self) -> Result<String, DomainError>;
}

/// Port for file system operations
#[async_trait]
pub trait FsPort: Send + Sync {
    async fn file_exists(&self, file_path: &Path) -> Result<bool, DomainError>;

    /// Create directory (including parent directories)
    async fn create_directory(&self, dir_path: &Path) -> Result<(), DomainError>;

    async fn get_file_size(&self, file_path: &Path) -> Result<u64, DomainError>;
}

/// Port for logging and observability
pub trait LogPort: Send + Sync {
    /// Log structured event
    fn log_event(&self, event: &LogEvent);

    fn info(&self, message: &str) {
        self.log_event(&LogEvent::new(LogLevel::Info, message));
    }

    fn warn(&self, message: &str) {
        self.log_event(&LogEvent::new(LogLevel::Warn, message));
    }

    fn error(&self, message: &str) {
        self.log_event(&LogEvent::new(LogLevel::Error, message));
    }

    fn debug(&self, message: &str) {
        self.log_event(&LogEvent::new(LogLevel::Debug, message));
    }

    fn trace(&self, message: &str) {
        self.log_event(&LogEvent::new(LogLevel::Trace, message));
    }
}

/// Log event with structured data
#[derive(Debug, Clone)]
pub struct LogEvent {
    pub level: LogLevel,
    pub message: String,
    pub timestamp: std::time::SystemTime,
    pub context: BTreeMap<String, String>,
}

impl LogEvent {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            timestamp: std::time::SystemTime::now(),
            context: BTreeMap::new(),
        }
    }

    /// Attach a structured field
    pub fn with(mut self, key: &str, value: impl fmt::Display) -> Self {
        self.context.insert(key.to_string(), value.to_string());
        self
    }
}

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    /// Parse log level from string
    pub fn parse(level_str: &str) -> Result<Self, DomainError> {
        match level_str.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(DomainError::BadArgs(format!(
                "Invalid log level: {}. Valid levels: trace, debug, info, warn, error",
                level_str
            ))),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

/// Log port that discards everything
pub struct NullLog;

impl LogPort for NullLog {
    fn log_event(&self, _event: &LogEvent) {}
}
