//! Encode stage: raw frames in, compressed video packets out

use crate::domain::model::{Profile, Timebase};
use crate::engine::decode::StageState;
use crate::error::{BackendError, TranscodeError, TranscodeResult};
use crate::ports::{CodecOutput, MediaBackend, SendStatus, VideoEncoder, VideoFrame};

/// Wraps one encoder configured from the profile
pub struct EncodeStage<E: VideoEncoder> {
    encoder: E,
    state: StageState,
    eof_sent: bool,
    next_pts: i64,
}

impl<E: VideoEncoder> EncodeStage<E> {
    /// Resolve the profile's encoder and open it with the profile's settings
    pub fn open<B>(backend: &B, profile: &Profile, global_header: bool) -> TranscodeResult<Self>
    where
        B: MediaBackend<Encoder = E>,
    {
        let encoder = backend
            .open_encoder(profile, global_header)
            .map_err(|e| TranscodeError::encoder_open(&profile.encoder, e))?;
        Ok(Self::new(encoder))
    }

    pub fn new(encoder: E) -> Self {
        Self {
            encoder,
            state: StageState::Open,
            eof_sent: false,
            next_pts: 0,
        }
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn state(&self) -> StageState {
        self.state
    }

    pub fn time_base(&self) -> Timebase {
        self.encoder.time_base()
    }

    /// Frames accepted so far; also the pts the next accepted frame gets
    pub fn frame_count(&self) -> i64 {
        self.next_pts
    }

    /// Stamp `frame` with the next output pts and hand it to the encoder.
    ///
    /// The counter only advances when the encoder accepts the frame, so a
    /// resubmission after `OutputPending` reuses the same pts.
    pub fn submit(&mut self, frame: &mut E::Frame) -> TranscodeResult<SendStatus> {
        if self.eof_sent {
            return Err(TranscodeError::Encode(BackendError::new(
                "frame submitted after encoder flush",
            )));
        }

        frame.set_pts(Some(self.next_pts));
        let status = self
            .encoder
            .send_frame(frame)
            .map_err(TranscodeError::Encode)?;
        if status == SendStatus::Accepted {
            self.next_pts += 1;
            self.state = StageState::Feeding;
        }
        Ok(status)
    }

    pub fn flush(&mut self) -> TranscodeResult<()> {
        if self.eof_sent {
            return Ok(());
        }
        self.eof_sent = true;
        self.state = StageState::Draining;
        self.encoder.send_eof().map_err(TranscodeError::Encode)
    }

    /// Pull encoded packets until the encoder needs input or is fully flushed
    pub fn drain(&mut self) -> PacketDrain<'_, E> {
        PacketDrain {
            done: self.state == StageState::Flushed,
            stage: self,
        }
    }
}

/// Lazy sequence of encoded packets, timestamps in the encoder timebase
pub struct PacketDrain<'a, E: VideoEncoder> {
    stage: &'a mut EncodeStage<E>,
    done: bool,
}

impl<E: VideoEncoder> Iterator for PacketDrain<'_, E> {
    type Item = TranscodeResult<E::Packet>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.stage.encoder.receive_packet() {
            Ok(CodecOutput::Ready(packet)) => {
                self.stage.state = StageState::Draining;
                Some(Ok(packet))
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
                Some(Err(TranscodeError::Encode(e)))
            }
        }
    }
}
