// Domain models - Core types and data structures

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::domain::errors::DomainError;

/// Timebase for timestamp calculations - rational unit in which a stream's timestamps are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Timebase {
    pub num: i32,
    pub den: i32,
}

impl Timebase {
    /// Create a new timebase
    pub fn new(num: i32, den: i32) -> Result<Self, DomainError> {
        if den <= 0 {
            return Err(DomainError::BadArgs(
                "Timebase denominator must be positive".to_string(),
            ));
        }
        if num <= 0 {
            return Err(DomainError::BadArgs(
                "Timebase numerator must be positive".to_string(),
            ));
        }
        Ok(Self { num, den })
    }

    /// Convert to floating point seconds
    pub fn to_seconds(&self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// Rescale a timestamp from this timebase into `target`.
    ///
    /// Exact integer arithmetic, rounding to nearest with halves away from
    /// zero. The mapping is monotonic: `a <= b` implies
    /// `rescale(a) <= rescale(b)` for any pair of positive timebases.
    pub fn rescale(&self, ts: i64, target: Timebase) -> i64 {
        if *self == target {
            return ts;
        }

        let b = self.num as i128 * target.den as i128;
        let c = target.num as i128 * self.den as i128;
        if c <= 0 || b < 0 {
            return ts;
        }

        let product = ts as i128 * b;
        let half = c / 2;
        let scaled = if product >= 0 {
            (product + half) / c
        } else {
            -((-product + half) / c)
        };

        scaled.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Convert PTS to seconds
    pub fn pts_to_seconds(&self, pts: i64) -> f64 {
        pts as f64 * self.to_seconds()
    }

    /// Microsecond timebase used for container-level durations
    pub fn av_time_base() -> Self {
        Self { num: 1, den: 1_000_000 }
    }

    /// Timebase of a constant frame rate stream (one tick per frame)
    pub fn per_frame(fps: u32) -> Self {
        Self {
            num: 1,
            den: fps.max(1).min(i32::MAX as u32) as i32,
        }
    }
}

impl fmt::Display for Timebase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Pixel format name as understood by the codec collaborator (e.g. `yuv420p`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PixelFormat(String);

impl PixelFormat {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into().to_lowercase())
    }

    pub fn yuv420p() -> Self {
        Self::new("yuv420p")
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Planar 4:2:0 formats need even dimensions
    pub fn is_chroma_subsampled_420(&self) -> bool {
        let name = self.0.as_str();
        name.starts_with("yuv420") || name.starts_with("yuvj420") || name == "nv12" || name == "nv21"
    }
}

impl fmt::Display for PixelFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Kind of media carried by a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Other,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => f.write_str("video"),
            MediaKind::Audio => f.write_str("audio"),
            MediaKind::Other => f.write_str("other"),
        }
    }
}

/// Video stream parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoParams {
    pub width: u32,
    pub height: u32,
    pub pixel_format: Option<PixelFormat>,
}

/// Audio stream parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioParams {
    pub sample_rate: u32,
    pub channels: u32,
}

impl AudioParams {
    /// Human readable channel layout
    pub fn layout_name(&self) -> String {
        match self.channels {
            1 => "mono".to_string(),
            2 => "stereo".to_string(),
            6 => "5.1".to_string(),
            8 => "7.1".to_string(),
            n => format!("{} channels", n),
        }
    }
}

/// Kind-specific stream parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum StreamParams {
    Video(VideoParams),
    Audio(AudioParams),
    Other,
}

/// One entry of an input container's stream table. Immutable once read.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    pub index: usize,
    pub codec: String,
    pub time_base: Timebase,
    pub params: StreamParams,
}

impl StreamDescriptor {
    pub fn kind(&self) -> MediaKind {
        match self.params {
            StreamParams::Video(_) => MediaKind::Video,
            StreamParams::Audio(_) => MediaKind::Audio,
            StreamParams::Other => MediaKind::Other,
        }
    }

    pub fn video(&self) -> Option<&VideoParams> {
        match &self.params {
            StreamParams::Video(video) => Some(video),
            _ => None,
        }
    }

    pub fn audio(&self) -> Option<&AudioParams> {
        match &self.params {
            StreamParams::Audio(audio) => Some(audio),
            _ => None,
        }
    }
}

impl fmt::Display for StreamDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} {} {} tb={}", self.index, self.kind(), self.codec, self.time_base)?;
        match &self.params {
            StreamParams::Video(v) => {
                write!(f, " {}x{}", v.width, v.height)?;
                if let Some(fmt) = &v.pixel_format {
                    write!(f, " {}", fmt)?;
                }
                Ok(())
            }
            StreamParams::Audio(a) => write!(f, " {}Hz {}", a.sample_rate, a.layout_name()),
            StreamParams::Other => Ok(()),
        }
    }
}

/// Container-level information about an opened input
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaInfo {
    pub path: String,
    pub container: String,
    pub duration_seconds: Option<f64>,
    pub streams: Vec<StreamDescriptor>,
}

impl MediaInfo {
    pub fn total_streams(&self) -> usize {
        self.streams.len()
    }
}

/// Target encode profile. Supplied by the caller; immutable for the duration of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Target width in pixels
    pub width: u32,
    /// Target height in pixels
    pub height: u32,
    /// Target pixel format
    pub pixel_format: PixelFormat,
    /// Target bitrate in bits per second
    pub bit_rate: u64,
    /// Output frame rate; the encoder timebase is `1/frame_rate`
    pub frame_rate: u32,
    /// Distance between two key frames
    pub gop_size: u32,
    pub max_b_frames: u32,
    /// Encoder name as registered with the codec collaborator
    pub encoder: String,
    pub preset: Option<String>,
    pub tune: Option<String>,
    pub profile: Option<String>,
    /// Additional encoder private options
    pub options: BTreeMap<String, String>,
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            width: 720,
            height: 480,
            pixel_format: PixelFormat::yuv420p(),
            bit_rate: 2_000_000,
            frame_rate: 30,
            gop_size: 30,
            max_b_frames: 0,
            encoder: "libx264".to_string(),
            preset: Some("ultrafast".to_string()),
            tune: Some("zerolatency".to_string()),
            profile: Some("baseline".to_string()),
            options: BTreeMap::new(),
        }
    }
}

impl Profile {
    /// Encoder timebase: one tick per output frame
    pub fn time_base(&self) -> Timebase {
        Timebase::per_frame(self.frame_rate)
    }

    /// Encoder-specific tuning knobs, named options first, then extras
    pub fn encoder_options(&self) -> Vec<(String, String)> {
        let mut options = Vec::new();
        for (key, value) in [
            ("preset", &self.preset),
            ("tune", &self.tune),
            ("profile", &self.profile),
        ] {
            if let Some(value) = value {
                options.push((key.to_string(), value.clone()));
            }
        }
        for (key, value) in &self.options {
            if !options.iter().any(|(k, _)| k == key) {
                options.push((key.clone(), value.clone()));
            }
        }
        options
    }
}

impl fmt::Display for Profile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}x{} {} @ {} bps, {} fps, gop {}, b-frames {}",
            self.encoder,
            self.width,
            self.height,
            self.pixel_format,
            self.bit_rate,
            self.frame_rate,
            self.gop_size,
            self.max_b_frames
        )
    }
}

/// Counters of one transcode invocation
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Stats {
    /// Frames submitted to the encoder; also the next video encoder pts
    pub frame_count: i64,
    /// Input packets routed to the decoder
    pub video_packet_count: u64,
    /// Audio packets forwarded to the multiplexer
    pub audio_packet_count: u64,
    /// Encoded packets recovered by the encoder flush
    pub flush_count: u64,
    pub video_packets_written: u64,
    pub decoded_frames: u64,
    pub ignored_packets: u64,
    /// A decode error cut the decoder flush short
    pub flush_decode_error: bool,
}
