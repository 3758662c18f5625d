//! Decode stage: compressed video packets in, raw frames out

use std::fmt;

use crate::domain::model::StreamDescriptor;
use crate::error::{BackendError, TranscodeError, TranscodeResult};
use crate::ports::{CodecOutput, MediaBackend, SendStatus, VideoDecoder};

/// Lifecycle of a codec stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageState {
    /// Initialized, nothing submitted yet
    Open,
    /// Accepting input
    Feeding,
    /// Emitting buffered output
    Draining,
    /// End of stream reached; terminal
    Flushed,
}

impl fmt::Display for StageState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageState::Open => f.write_str("open"),
            StageState::Feeding => f.write_str("feeding"),
            StageState::Draining => f.write_str("draining"),
            StageState::Flushed => f.write_str("flushed"),
        }
    }
}

/// Wraps one decoder bound to the selected video stream
pub struct DecodeStage<D: VideoDecoder> {
    decoder: D,
    state: StageState,
    eof_sent: bool,
    frames_emitted: u64,
}

impl<D: VideoDecoder> DecodeStage<D> {
    /// Resolve and open a decoder for `stream`
    pub fn open<B>(
        backend: &B,
        input: &B::Input,
        stream: &StreamDescriptor,
        low_delay: bool,
    ) -> TranscodeResult<Self>
    where
        B: MediaBackend<Decoder = D>,
    {
        let decoder = backend
            .open_decoder(input, stream, low_delay)
            .map_err(|e| TranscodeError::decoder_open(&stream.codec, e))?;
        Ok(Self::new(decoder))
    }

    pub fn new(decoder: D) -> Self {
        Self {
            decoder,
            state: StageState::Open,
            eof_sent: false,
            frames_emitted: 0,
        }
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Frames produced so far, including those recovered by the flush
    pub fn frames_emitted(&self) -> u64 {
        self.frames_emitted
    }

    /// Hand one compressed packet to the decoder.
    ///
    /// `OutputPending` means the packet was not taken: drain, then submit it again.
    pub fn submit(&mut self, packet: &D::Packet) -> TranscodeResult<SendStatus> {
        if self.eof_sent {
            return Err(TranscodeError::Decode(BackendError::new(
                "packet submitted after decoder flush",
            )));
        }

        let status = self
            .decoder
            .send_packet(packet)
            .map_err(TranscodeError::Decode)?;
        if status == SendStatus::Accepted {
            self.state = StageState::Feeding;
        }
        Ok(status)
    }

    /// Signal end of input; the next `drain` returns whatever the decoder still buffers
    pub fn flush(&mut self) -> TranscodeResult<()> {
        if self.eof_sent {
            return Ok(());
        }
        self.eof_sent = true;
        self.state = StageState::Draining;
        self.decoder.send_eof().map_err(TranscodeError::Decode)
    }

    /// Pull decoded frames until the decoder needs input or reaches end of stream.
    ///
    /// The returned sequence is finite and not restartable; call `drain` again
    /// after each `submit`.
    pub fn drain(&mut self) -> FrameDrain<'_, D> {
        FrameDrain {
            done: self.state == StageState::Flushed,
            stage: self,
        }
    }
}

/// Lazy sequence of decoded frames
pub struct FrameDrain<'a, D: VideoDecoder> {
    stage: &'a mut DecodeStage<D>,
    done: bool,
}

impl<D: VideoDecoder> Iterator for FrameDrain<'_, D> {
    type Item = TranscodeResult<D::Frame>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.stage.decoder.receive_frame() {
            Ok(CodecOutput::Ready(frame)) => {
                self.stage.state = StageState::Draining;
                self.stage.frames_emitted += 1;
                Some(Ok(frame))
            }
            Ok(CodecOutput::NeedsMoreInput) => {
                self.done = true;
                if !self.stage.eof_sent {
                    self.stage.state = StageState::Feeding;
                }
                None
            }
            Ok(CodecOutput::EndOfStream) => {
                self.done = true;
                self.stage.state = StageState::Flushed;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(TranscodeError::Decode(e)))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::{FakeDecoder, FakeFrame, FakePacket};

    fn packet() -> FakePacket {
        FakePacket::new(0, Some(0), vec![1, 2, 3])
    }

    #[test]
    fn test_needs_more_input_ends_drain_without_error() {
        let mut stage = DecodeStage::new(FakeDecoder::with_delay(2));
        assert_eq!(stage.state(), StageState::Open);

        assert_eq!(stage.submit(&packet()).unwrap(), SendStatus::Accepted);
        assert_eq!(stage.drain().count(), 0);
        assert_eq!(stage.state(), StageState::Feeding);

        stage.submit(&packet()).unwrap();
        stage.submit(&packet()).unwrap();
        let frames: Vec<FakeFrame> = stage.drain().map(|f| f.unwrap()).collect();
        assert_eq!(frames.len(), 1);
    }

    #[test]
    fn test_flush_recovers_buffered_frames() {
        let mut stage = DecodeStage::new(FakeDecoder::with_delay(3));
        for _ in 0..5 {
            stage.submit(&packet()).unwrap();
            for frame in stage.drain() {
                frame.unwrap();
            }
        }
        assert_eq!(stage.frames_emitted(), 2);

        stage.flush().unwrap();
        assert_eq!(stage.drain().count(), 3);
        assert_eq!(stage.state(), StageState::Flushed);
        assert_eq!(stage.frames_emitted(), 5);

        // terminal
        assert_eq!(stage.drain().count(), 0);
    }

    #[test]
    fn test_submit_after_flush_is_rejected() {
        let mut stage = DecodeStage::new(FakeDecoder::with_delay(0));
        stage.flush().unwrap();
        assert!(matches!(stage.submit(&packet()), Err(TranscodeError::Decode(_))));
    }

    #[test]
    fn test_decode_error_is_yielded_once() {
        let mut decoder = FakeDecoder::with_delay(0);
        decoder.fail_receive_at = Some(1);
        let mut stage = DecodeStage::new(decoder);

        stage.submit(&packet()).unwrap();
        stage.submit(&packet()).unwrap();
        let results: Vec<_> = stage.drain().collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(matches!(results[1], Err(TranscodeError::Decode(_))));
    }
}
