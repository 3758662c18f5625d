//! Audio passthrough stage

use crate::output::StreamRoute;
use crate::ports::MediaPacket;

/// Forwards audio packets untouched apart from timestamps and stream index
#[derive(Debug, Clone, Copy)]
pub struct AudioPassthrough {
    input_index: usize,
    route: StreamRoute,
}

impl AudioPassthrough {
    pub fn new(input_index: usize, route: StreamRoute) -> Self {
        Self { input_index, route }
    }

    pub fn input_index(&self) -> usize {
        self.input_index
    }

    pub fn route(&self) -> &StreamRoute {
        &self.route
    }

    /// Retarget `packet` at the output audio stream; the payload is never touched
    pub fn forward<P: MediaPacket>(&self, packet: &mut P) {
        self.route.apply(packet);
        packet.clear_position();
    }
}
