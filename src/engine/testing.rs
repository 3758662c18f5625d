//! In-memory codec doubles for stage unit tests

use std::collections::VecDeque;

use crate::domain::model::{PixelFormat, Timebase, VideoParams};
use crate::error::BackendError;
use crate::ports::{
    CodecOutput, FrameScaler, MediaPacket, SendStatus, VideoDecoder, VideoEncoder, VideoFrame,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FakePacket {
    pub stream_index: usize,
    pub pts: Option<i64>,
    pub dts: Option<i64>,
    pub duration: i64,
    pub position: i64,
    pub data: Vec<u8>,
}

impl FakePacket {
    pub fn new(stream_index: usize, pts: Option<i64>, data: Vec<u8>) -> Self {
        Self {
            stream_index,
            pts,
            dts: pts,
            duration: 1,
            position: 4096,
            data,
        }
    }
}

impl MediaPacket for FakePacket {
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

#[derive(Debug, Clone, PartialEq)]
pub struct FakeFrame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub pts: Option<i64>,
}

impl FakeFrame {
    pub fn new(width: u32, height: u32, format: &str) -> Self {
        Self {
            width,
            height,
            format: PixelFormat::new(format),
            pts: None,
        }
    }
}

impl VideoFrame for FakeFrame {
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

/// Decoder that holds back `delay` frames until end of stream
pub struct FakeDecoder {
    pub delay: usize,
    pub buffered: VecDeque<FakeFrame>,
    pub eof: bool,
    pub emitted: u64,
    pub fail_receive_at: Option<u64>,
}

impl FakeDecoder {
    pub fn with_delay(delay: usize) -> Self {
        Self {
            delay,
            buffered: VecDeque::new(),
            eof: false,
            emitted: 0,
            fail_receive_at: None,
        }
    }
}

impl VideoDecoder for FakeDecoder {
    type Packet = FakePacket;
    type Frame = FakeFrame;

    fn codec_name(&self) -> &str {
        "fake"
    }

    fn output_params(&self) -> VideoParams {
        VideoParams {
            width: 64,
            height: 48,
            pixel_format: Some(PixelFormat::yuv420p()),
        }
    }

    fn send_packet(&mut self, packet: &FakePacket) -> Result<SendStatus, BackendError> {
        let mut frame = FakeFrame::new(64, 48, "yuv420p");
        frame.pts = packet.pts;
        self.buffered.push_back(frame);
        Ok(SendStatus::Accepted)
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        self.eof = true;
        Ok(())
    }

    fn receive_frame(&mut self) -> Result<CodecOutput<FakeFrame>, BackendError> {
        if self.fail_receive_at == Some(self.emitted) {
            return Err(BackendError::with_code("corrupt slice", -1094995529));
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

/// Encoder with a fixed output delay and an optional input queue limit
pub struct FakeEncoder {
    pub delay: usize,
    pub queue_limit: Option<usize>,
    pub buffered: VecDeque<FakePacket>,
    pub eof: bool,
    pub accepted_pts: Vec<Option<i64>>,
    pub stall: bool,
}

impl FakeEncoder {
    pub fn with_delay(delay: usize) -> Self {
        Self {
            delay,
            queue_limit: None,
            buffered: VecDeque::new(),
            eof: false,
            accepted_pts: Vec::new(),
            stall: false,
        }
    }
}

impl VideoEncoder for FakeEncoder {
    type Packet = FakePacket;
    type Frame = FakeFrame;

    fn name(&self) -> &str {
        "fake264"
    }

    fn time_base(&self) -> Timebase {
        Timebase { num: 1, den: 30 }
    }

    fn send_frame(&mut self, frame: &FakeFrame) -> Result<SendStatus, BackendError> {
        if self.stall {
            return Ok(SendStatus::OutputPending);
        }
        if let Some(limit) = self.queue_limit {
            if self.buffered.len() >= limit {
                return Ok(SendStatus::OutputPending);
            }
        }
        self.accepted_pts.push(frame.pts);
        self.buffered.push_back(FakePacket::new(0, frame.pts, vec![0xAB; 8]));
        Ok(SendStatus::Accepted)
    }

    fn send_eof(&mut self) -> Result<(), BackendError> {
        self.eof = true;
        Ok(())
    }

    fn receive_packet(&mut self) -> Result<CodecOutput<FakePacket>, BackendError> {
        let limited = self
            .queue_limit
            .map(|limit| self.buffered.len() >= limit)
            .unwrap_or(false);
        if self.buffered.len() > self.delay || limited || (self.eof && !self.buffered.is_empty()) {
            if let Some(packet) = self.buffered.pop_front() {
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

/// Scaler that records the shapes it converted
#[derive(Default)]
pub struct FakeScaler {
    pub calls: Vec<(u32, u32, PixelFormat)>,
    pub fail: bool,
}

impl FrameScaler for FakeScaler {
    type Frame = FakeFrame;

    fn scale(&mut self, source: &FakeFrame, _target: &mut FakeFrame) -> Result<(), BackendError> {
        if self.fail {
            return Err(BackendError::new("bad source dimensions"));
        }
        self.calls
            .push((source.width, source.height, source.format.clone()));
        Ok(())
    }
}
