//! In-memory media backend for driving the pipeline without real media.
//!
//! Every container, codec, scaler and target frame records `open:<name>` when
//! created and `close:<name>` when released, so tests can check that each run
//! releases exactly what it acquired and in which order.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::Path;
use std::sync::{Arc, Mutex};

use transmux_cli::domain::model::*;
use transmux_cli::error::{BackendError, CodecOpenError};
use transmux_cli::ports::*;

pub type Journal = Arc<Mutex<Vec<String>>>;

/// Release order of a run, first to last
pub const TEARDOWN_ORDER: [&str; 7] = [
    "frame", "scaler", "encoder", "decoder", "io", "output", "input",
];

struct Guard {
    journal: Journal,
    name: &'static str,
}

impl Guard {
    fn open(journal: &Journal, name: &'static str) -> Self {
        record(journal, format!("open:{}", name));
        Self {
            journal: Arc::clone(journal),
            name,
        }
    }
}

impl Drop for Guard {
    fn drop(&mut self) {
        record(&self.journal, format!("close:{}", self.name));
    }
}

fn record(journal: &Journal, event: String) {
    if let Ok(mut events) = journal.lock() {
        events.push(event);
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StubPacket {
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub position: i64,
    pub data: Vec<u8>,
}

impl MediaPacket for StubPacket {
    fn stream_index(&self) -> usize {
        self.stream_index
    }

    fn set_stream_index(&mut self, index: usize) {
        self.stream_index = index;
    }

    fn pts(&self) -> Option<i64> {
        self.pts
    }

    fn dts(&self) -> Option<i64> {
        self.dts
    }

    fn rescale_ts(&mut self, from: Timebase, to: Timebase) {
        self.pts = self.pts.map(|ts| from.rescale(ts, to));
        self.dts = self.dts.map(|ts| from.rescale(ts, to));
        self.duration = from.rescale(self.duration, to);
    }

    fn clear_position(&mut self) {
        self.position = -1;
    }

    fn size(&self) -> usize {
        self.data.len()
    }
}

pub struct StubFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pts: Option<i64>,
    /// Decode order of the source picture
    pub serial: u64,
    _guard: Option<Guard>,
}

impl VideoFrame for StubFrame {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn pixel_format(&self) -> PixelFormat {
        self.format.clone()
    }

    fn pts(&self) -> Option<i64> {
        self.pts
    }

    fn set_pts(&mut self, pts: Option<i64>) {
        self.pts = pts;
    }
}

/// Input container contents
#[derive(Debug, Clone)]
pub struct StubMedia {
    pub container: String,
    pub duration_seconds: Option<f64>,
    pub streams: Vec<StreamDescriptor>,
    pub packets: Vec<StubPacket>,
}

impl StubMedia {
    pub fn new() -> Self {
        Self {
            container: "stub".to_string(),
            duration_seconds: None,
            streams: Vec::new(),
            packets: Vec::new(),
        }
    }

    pub fn with_video(mut self, width: u32, height: u32, time_base: Timebase) -> Self {
        let index = self.streams.len();
        self.streams.push(StreamDescriptor {
            index,
            codec: "h264".to_string(),
            time_base,
            params: StreamParams::Video(VideoParams {
                width,
                height,
                pixel_format: Some(PixelFormat::new("yuv422p")),
            }),
        });
        self
    }

    pub fn with_audio(mut self, sample_rate: u32, channels: u32) -> Self {
        let index = self.streams.len();
        self.streams.push(StreamDescriptor {
            index,
            codec: "aac".to_string(),
            time_base: Timebase {
                num: 1,
                den: sample_rate as i32,
            },
            params: StreamParams::Audio(AudioParams {
                sample_rate,
                channels,
            }),
        });
        self
    }

    pub fn with_data_stream(mut self) -> Self {
        let index = self.streams.len();
        self.streams.push(StreamDescriptor {
            index,
            codec: "bin_data".to_string(),
            time_base: Timebase { num: 1, den: 1000 },
            params: StreamParams::Other,
        });
        self
    }

    /// Append `count` packets for `stream`, timestamps from `pts(n)`
    pub fn with_packets(mut self, stream: usize, count: usize, pts: impl Fn(usize) -> i64) -> Self {
        for n in 0..count {
            let ts = pts(n);
            let mut data = vec![stream as u8, 0xC0];
            data.extend_from_slice(&(n as u32).to_be_bytes());
            self.packets.push(StubPacket {
                stream_index: stream,
                pts: Some(ts),
                dts: Some(ts),
                duration: 1,
                position: 1000 + n as i64,
                data,
            });
        }
        self
    }

    /// Order packets by presentation time across streams, keeping per-stream order
    pub fn interleaved(mut self) -> Self {
        let time_bases: Vec<Timebase> = self.streams.iter().map(|s| s.time_base).collect();
        self.packets.sort_by(|a, b| {
            let seconds = |p: &StubPacket| {
                time_bases[p.stream_index].pts_to_seconds(p.pts.unwrap_or(0))
            };
            seconds(a)
                .partial_cmp(&seconds(b))
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        self
    }

    pub fn packets_of(&self, stream: usize) -> Vec<&StubPacket> {
        self.packets
            .iter()
            .filter(|p| p.stream_index == stream)
            .collect()
    }
}

/// Codec behaviour and failure injection
#[derive(Debug, Clone, Default)]
pub struct StubBehavior {
    /// Frames the decoder holds back until flushed
    pub decoder_delay: usize,
    /// Packets the encoder holds back until flushed
    pub encoder_delay: usize,
    /// Every k-th frame is first refused with OutputPending while output is buffered
    pub encoder_pending_every: Option<usize>,
    /// Encoder refuses all input without producing output
    pub encoder_stall: bool,
    pub global_header: bool,
    /// Timebase the muxer assigns to the video stream at header time
    pub video_output_time_base: Option<Timebase>,
    /// Timebase the muxer assigns to the audio stream at header time
    pub audio_output_time_base: Option<Timebase>,

    pub fail_open_input: bool,
    pub decoder_unavailable: bool,
    pub encoder_unavailable: bool,
    pub fail_output_setup: bool,
    pub fail_open_io: bool,
    pub fail_header: bool,
    pub fail_scaler: bool,
    pub fail_alloc_frame: bool,
    pub fail_read_at: Option<usize>,
    /// Decoder errors when asked for this frame (0-based) before end of input
    pub fail_decode_at: Option<u64>,
    /// Decoder errors on the first receive after end of input
    pub fail_flush_decode: bool,
    pub fail_encode_at: Option<usize>,
    pub fail_audio_write_at: Option<usize>,
    /// Video write with this index (0-based) fails
    pub fail_video_write_at: Option<usize>,
    pub fail_trailer: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WrittenPacket {
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub position: i64,
    pub data: Vec<u8>,
}

/// Shared observation points of a backend
#[derive(Clone, Default)]
pub struct Recorder {
    pub journal: Journal,
    pub written: Arc<Mutex<Vec<WrittenPacket>>>,
    pub output_time_bases: Arc<Mutex<Vec<Timebase>>>,
    pub global_header_requested: Arc<Mutex<Option<bool>>>,
    pub encoder_pts: Arc<Mutex<Vec<Option<i64>>>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<String> {
        self.journal.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn written(&self) -> Vec<WrittenPacket> {
        self.written.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn written_on(&self, stream: usize) -> Vec<WrittenPacket> {
        self.written()
            .into_iter()
            .filter(|p| p.stream_index == stream)
            .collect()
    }

    pub fn has_event(&self, event: &str) -> bool {
        self.events().iter().any(|e| e == event)
    }

    /// Every opened resource was closed exactly once, after it was opened
    pub fn assert_balanced(&self) {
        let events = self.events();
        for name in TEARDOWN_ORDER {
            let opens: Vec<usize> = positions(&events, &format!("open:{}", name));
            let closes: Vec<usize> = positions(&events, &format!("close:{}", name));
            assert_eq!(
                opens.len(),
                closes.len(),
                "{} opened {} times but closed {} times: {:?}",
                name,
                opens.len(),
                closes.len(),
                events
            );
            for (open, close) in opens.iter().zip(&closes) {
                assert!(open < close, "{} closed before it was opened: {:?}", name, events);
            }
        }
    }

    /// Closes happened in the fixed teardown order
    pub fn assert_teardown_order(&self) {
        let events = self.events();
        let closes: Vec<&str> = events
            .iter()
            .filter_map(|e| e.strip_prefix("close:"))
            .collect();
        let ranks: Vec<usize> = closes
            .iter()
            .map(|name| {
                TEARDOWN_ORDER
                    .iter()
                    .position(|n| n == name)
                    .unwrap_or_else(|| panic!("unknown resource {}", name))
            })
            .collect();
        assert!(
            ranks.windows(2).all(|w| w[0] < w[1]),
            "unexpected teardown order: {:?}",
            closes
        );
    }
}

fn positions(events: &[String], event: &str) -> Vec<usize> {
    events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.as_str() == event)
        .map(|(i, _)| i)
        .collect()
}

#[derive(Clone)]
pub struct StubBackend {
    pub media: StubMedia,
    pub behavior: StubBehavior,
    pub recorder: Recorder,
}

impl StubBackend {
    pub fn new(media: StubMedia) -> Self {
        Self::with_behavior(media, StubBehavior::default())
    }

    pub fn with_behavior(media: StubMedia, behavior: StubBehavior) -> Self {
        Self {
            media,
            behavior,
            recorder: Recorder::default(),
        }
    }
}

pub struct StubInput {
    info: MediaInfo,
    packets: VecDeque<StubPacket>,
    read: usize,
    fail_read_at: Option<usize>,
    _guard: Guard,
}

impl Demuxer for StubInput {
    type Packet = StubPacket;

    fn media_info(&self) -> &MediaInfo {
        &self.info
    }

    fn read_packet(&mut self) -> Result<Option<StubPacket>, BackendError> {
        if self.fail_read_at == Some(self.read) {
            return Err(BackendError::with_code("I/O error", -5));
        }
        self.read += 1;
        Ok(self.packets.pop_front())
    }
}

pub struct StubOutput {
    recorder: Recorder,
    behavior: StubBehavior,
    streams: Vec<(MediaKind, Timebase)>,
    audio_writes: usize,
    video_writes: usize,
    io_open: bool,
    io_guard: Option<Guard>,
    _guard: Guard,
}

impl Muxer for StubOutput {
    type Packet = StubPacket;

    fn requires_global_header(&self) -> bool {
        self.behavior.global_header
    }

    fn open_io(&mut self) -> Result<(), BackendError> {
        if self.behavior.fail_open_io {
            return Err(BackendError::with_code("Permission denied", -13));
        }
        self.io_guard = Some(Guard::open(&self.recorder.journal, "io"));
        self.io_open = true;
        Ok(())
    }

    fn write_header(&mut self) -> Result<(), BackendError> {
        if self.behavior.fail_header {
            return Err(BackendError::with_code("Invalid argument", -22));
        }
        for (kind, time_base) in self.streams.iter_mut() {
            let chosen = match kind {
                MediaKind::Video => self.behavior.video_output_time_base,
                _ => self.behavior.audio_output_time_base,
            };
            if let Some(chosen) = chosen {
                *time_base = chosen;
            }
        }
        if let Ok(mut bases) = self.recorder.output_time_bases.lock() {
            *bases = self.streams.iter().map(|(_, tb)| *tb).collect();
        }
        record(&self.recorder.journal, "write:header".to_string());
        Ok(())
    }

    fn stream_time_base(&self, index: usize) -> Option<Timebase> {
        self.streams.get(index).map(|(_, tb)| *tb)
    }

    fn write_interleaved(&mut self, packet: &mut StubPacket) -> Result<(), BackendError> {
        if let Some((MediaKind::Audio, _)) = self.streams.get(packet.stream_index) {
            if self.behavior.fail_audio_write_at == Some(self.audio_writes) {
                return Err(BackendError::with_code("No space left on device", -28));
            }
            self.audio_writes += 1;
        }
        if let Some((MediaKind::Video, _)) = self.streams.get(packet.stream_index) {
            if self.behavior.fail_video_write_at == Some(self.video_writes) {
                return Err(BackendError::with_code("Input/output error", -5));
            }
            self.video_writes += 1;
        }
        if let Ok(mut written) = self.recorder.written.lock() {
            written.push(WrittenPacket {
                stream_index: packet.stream_index,
                pts: packet.pts,
                dts: packet.dts,
                position: packet.position,
                data: packet.data.clone(),
            });
        }
        Ok(())
    }

    fn write_trailer(&mut self) -> Result<(), BackendError> {
        if self.behavior.fail_trailer {
            return Err(BackendError::with_code("No space left on device", -28));
        }
        record(&self.recorder.journal, "write:trailer".to_string());
        Ok(())
    }

    fn close_io(&mut self) {
        if self.io_open {
            self.io_open = false;
            self.io_guard = None;
        }
    }
}

pub struct StubDecoder {
    params: VideoParams,
    delay: usize,
    buffered: VecDeque<StubFrame>,
    submitted: u64,
    emitted: u64,
    eof: bool,
    fail_decode_at: Option<u64>,
    fail_flush_decode: bool,
    _guard: Guard,
}

impl VideoDecoder for StubDecoder {
    type Packet = StubPacket;
    type Frame = StubFrame;

    fn codec_name(&self) -> &str {
        "h264"
    }

    fn output_params(&self) -> VideoParams {
        self.params.clone()
    }

    fn send_packet(&mut self, packet: &StubPacket) -> Result<SendStatus, BackendError> {
        self.buffered.push_back(StubFrame {
            width: self.params.width,
            height: self.params.height,
            format: self
                .params
                .pixel_format
                .clone()
                .unwrap_or_else(PixelFormat::yuv420p),
            pts: packet.pts,
            serial: self.submitted,
            _guard: None,
        });
        self.submitted += 1;
        Ok(SendStatus::Accepted)
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        self.eof = true;
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<CodecOutput<StubFrame>, BackendError> {
        if !self.eof && self.fail_decode_at == Some(self.emitted) && !self.buffered.is_empty() {
            return Err(BackendError::with_code("Invalid data found when processing input", -1094995529));
        }
        if self.eof && self.fail_flush_decode {
            self.fail_flush_decode = false;
            return Err(BackendError::with_code("Invalid data found when processing input", -1094995529));
        }
        if self.buffered.len() > self.delay || (self.eof && !self.buffered.is_empty()) {
            if let Some(frame) = self.buffered.pop_front() {
                self.emitted += 1;
                return Ok(CodecOutput::Ready(frame));
            }
        }
        if self.eof {
            Ok(CodecOutput::EndOfStream)
        } else {
            Ok(CodecOutput::NeedsMoreInput)
        }
    }
}

pub struct StubEncoder {
    time_base: Timebase,
    delay: usize,
    pending_every: Option<usize>,
    stall: bool,
    pending: bool,
    last_refused: Option<usize>,
    buffered: VecDeque<StubPacket>,
    accepted: usize,
    eof: bool,
    fail_encode_at: Option<usize>,
    encoder_pts: Arc<Mutex<Vec<Option<i64>>>>,
    _guard: Guard,
}

impl VideoEncoder for StubEncoder {
    type Packet = StubPacket;
    type Frame = StubFrame;

    fn name(&self) -> &str {
        "stub264"
    }

    fn time_base(&self) -> Timebase {
        self.time_base
    }

    fn send_frame(&mut self, frame: &StubFrame) -> Result<SendStatus, BackendError> {
        if self.fail_encode_at == Some(self.accepted) {
            return Err(BackendError::with_code("Generic error in an external library", -542398533));
        }
        if self.stall {
            return Ok(SendStatus::OutputPending);
        }
        if let Some(every) = self.pending_every {
            let due = self.accepted > 0 && self.accepted % every == 0;
            if due && self.last_refused != Some(self.accepted) && !self.buffered.is_empty() {
                self.last_refused = Some(self.accepted);
                self.pending = true;
                return Ok(SendStatus::OutputPending);
            }
        }
        self.accepted += 1;
        if let Ok(mut pts) = self.encoder_pts.lock() {
            pts.push(frame.pts);
        }
        self.buffered.push_back(StubPacket {
            stream_index: 0,
            pts: frame.pts,
            dts: frame.pts,
            duration: 1,
            position: -1,
            data: frame.serial.to_be_bytes().to_vec(),
        });
        Ok(SendStatus::Accepted)
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        self.eof = true;
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<CodecOutput<StubPacket>, BackendError> {
        if self.buffered.len() > self.delay || self.pending || (self.eof && !self.buffered.is_empty()) {
            if let Some(packet) = self.buffered.pop_front() {
                self.pending = false;
                return Ok(CodecOutput::Ready(packet));
            }
        }
        if self.eof {
            Ok(CodecOutput::EndOfStream)
        } else {
            Ok(CodecOutput::NeedsMoreInput)
        }
    }
}

pub struct StubScaler {
    _guard: Guard,
}

impl FrameScaler for StubScaler {
    type Frame = StubFrame;

    fn scale(&mut self, source: &StubFrame, target: &mut StubFrame) -> Result<(), BackendError> {
        target.serial = source.serial;
        Ok(())
    }
}

impl MediaBackend for StubBackend {
    type Packet = StubPacket;
    type Frame = StubFrame;
    type Input = StubInput;
    type Output = StubOutput;
    type Decoder = StubDecoder;
    type Encoder = StubEncoder;
    type Scaler = StubScaler;

    fn open_input(&self, path: &Path) -> Result<StubInput, BackendError> {
        if self.behavior.fail_open_input {
            return Err(BackendError::with_code("No such file or directory", -2));
        }
        Ok(StubInput {
            info: MediaInfo {
                path: path.display().to_string(),
                container: self.media.container.clone(),
                duration_seconds: self.media.duration_seconds,
                streams: self.media.streams.clone(),
            },
            packets: self.media.packets.iter().cloned().collect(),
            read: 0,
            fail_read_at: self.behavior.fail_read_at,
            _guard: Guard::open(&self.recorder.journal, "input"),
        })
    }

    fn open_decoder(
        &self,
        _input: &StubInput,
        stream: &StreamDescriptor,
        _low_delay: bool,
    ) -> Result<StubDecoder, CodecOpenError> {
        if self.behavior.decoder_unavailable {
            return Err(CodecOpenError::Unavailable(stream.codec.clone()));
        }
        let params = stream
            .video()
            .cloned()
            .ok_or_else(|| CodecOpenError::Open(BackendError::new("not a video stream")))?;
        Ok(StubDecoder {
            params,
            delay: self.behavior.decoder_delay,
            buffered: VecDeque::new(),
            submitted: 0,
            emitted: 0,
            eof: false,
            fail_decode_at: self.behavior.fail_decode_at,
            fail_flush_decode: self.behavior.fail_flush_decode,
            _guard: Guard::open(&self.recorder.journal, "decoder"),
        })
    }

    fn create_output(&self, _path: &Path) -> Result<StubOutput, BackendError> {
        if self.behavior.fail_output_setup {
            return Err(BackendError::new("Unable to choose an output format"));
        }
        Ok(StubOutput {
            recorder: self.recorder.clone(),
            behavior: self.behavior.clone(),
            streams: Vec::new(),
            audio_writes: 0,
            video_writes: 0,
            io_open: false,
            io_guard: None,
            _guard: Guard::open(&self.recorder.journal, "output"),
        })
    }

    fn open_encoder(&self, profile: &Profile, global_header: bool) -> Result<StubEncoder, CodecOpenError> {
        if self.behavior.encoder_unavailable {
            return Err(CodecOpenError::Unavailable(profile.encoder.clone()));
        }
        if let Ok(mut requested) = self.recorder.global_header_requested.lock() {
            *requested = Some(global_header);
        }
        Ok(StubEncoder {
            time_base: profile.time_base(),
            delay: self.behavior.encoder_delay,
            pending_every: self.behavior.encoder_pending_every,
            stall: self.behavior.encoder_stall,
            pending: false,
            last_refused: None,
            buffered: VecDeque::new(),
            accepted: 0,
            eof: false,
            fail_encode_at: self.behavior.fail_encode_at,
            encoder_pts: Arc::clone(&self.recorder.encoder_pts),
            _guard: Guard::open(&self.recorder.journal, "encoder"),
        })
    }

    fn add_video_stream(&self, output: &mut StubOutput, encoder: &StubEncoder) -> Result<usize, BackendError> {
        output.streams.push((MediaKind::Video, encoder.time_base));
        Ok(output.streams.len() - 1)
    }

    fn add_passthrough_stream(
        &self,
        output: &mut StubOutput,
        _input: &StubInput,
        stream: &StreamDescriptor,
    ) -> Result<usize, BackendError> {
        output.streams.push((stream.kind(), stream.time_base));
        Ok(output.streams.len() - 1)
    }

    fn create_scaler(&self, _source: &VideoParams, _profile: &Profile) -> Result<StubScaler, BackendError> {
        if self.behavior.fail_scaler {
            return Err(BackendError::new("Invalid dimensions"));
        }
        Ok(StubScaler {
            _guard: Guard::open(&self.recorder.journal, "scaler"),
        })
    }

    fn alloc_frame(&self, profile: &Profile) -> Result<StubFrame, BackendError> {
        if self.behavior.fail_alloc_frame {
            return Err(BackendError::with_code("Cannot allocate memory", -12));
        }
        Ok(StubFrame {
            width: profile.width,
            height: profile.height,
            format: profile.pixel_format.clone(),
            pts: None,
            serial: 0,
            _guard: Some(Guard::open(&self.recorder.journal, "frame")),
        })
    }
}

/// 10 seconds of 30 fps video stamped in a 1/25 timebase, stream 0
pub fn mismatched_timebase_video(frames: usize) -> StubMedia {
    StubMedia::new()
        .with_video(1920, 1080, Timebase { num: 1, den: 25 })
        .with_packets(0, frames, |n| (n as i64 * 25 + 15) / 30)
}

/// Video at 1/90000 plus stereo 44.1 kHz audio, interleaved by time
pub fn video_with_audio(video_frames: usize, audio_packets: usize) -> StubMedia {
    StubMedia::new()
        .with_video(1280, 720, Timebase { num: 1, den: 90_000 })
        .with_audio(44_100, 2)
        .with_packets(0, video_frames, |n| n as i64 * 3000)
        .with_packets(1, audio_packets, |n| n as i64 * 1024)
        .interleaved()
}
