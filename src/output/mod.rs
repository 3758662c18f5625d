//! Output container writing module

use crate::domain::model::Timebase;
use crate::ports::MediaPacket;

pub mod writer;

pub use writer::MuxWriter;

/// Destination of one routed stream: output index plus the timebase move
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamRoute {
    pub output_index: usize,
    pub source: Timebase,
    pub destination: Timebase,
}

impl StreamRoute {
    pub fn new(output_index: usize, source: Timebase, destination: Timebase) -> Self {
        Self {
            output_index,
            source,
            destination,
        }
    }

    /// Retarget a packet at the output stream
    pub fn apply<P: MediaPacket>(&self, packet: &mut P) {
        packet.rescale_ts(self.source, self.destination);
        packet.set_stream_index(self.output_index);
    }
}
