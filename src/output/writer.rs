//! Multiplexer writer

use std::path::Path;

use crate::domain::model::Timebase;
use crate::error::{BackendError, MediaStreamRole, TranscodeError, TranscodeResult};
use crate::ports::Muxer;

/// Owns the output container and enforces header → packets → trailer
pub struct MuxWriter<M: Muxer> {
    output: M,
    path: String,
    io_open: bool,
    header_written: bool,
    trailer_written: bool,
    packets_written: u64,
}

impl<M: Muxer> MuxWriter<M> {
    pub fn new(output: M, path: &Path) -> Self {
        Self {
            output,
            path: path.display().to_string(),
            io_open: false,
            header_written: false,
            trailer_written: false,
            packets_written: 0,
        }
    }

    pub fn requires_global_header(&self) -> bool {
        self.output.requires_global_header()
    }

    /// Access for stream creation; only meaningful before `open`
    pub fn output_mut(&mut self) -> &mut M {
        &mut self.output
    }

    /// Open the output file and write the container header
    pub fn open(&mut self) -> TranscodeResult<()> {
        self.output
            .open_io()
            .map_err(|source| TranscodeError::OutputOpen {
                path: self.path.clone(),
                source,
            })?;
        self.io_open = true;

        self.output
            .write_header()
            .map_err(TranscodeError::HeaderWrite)?;
        self.header_written = true;
        Ok(())
    }

    /// Final timebase of an output stream, as chosen by the container at header time
    pub fn stream_time_base(&self, index: usize) -> TranscodeResult<Timebase> {
        self.output
            .stream_time_base(index)
            .ok_or_else(|| TranscodeError::OutputSetup {
                path: self.path.clone(),
                source: BackendError::new(format!("output stream {} does not exist", index)),
            })
    }

    /// Write one packet whose timestamps are already in the destination timebase
    pub fn write(&mut self, packet: &mut M::Packet, role: MediaStreamRole) -> TranscodeResult<()> {
        if !self.header_written || self.trailer_written {
            return Err(TranscodeError::Mux {
                stream: role,
                source: BackendError::new("packet written outside header/trailer window"),
            });
        }

        self.output
            .write_interleaved(packet)
            .map_err(|source| TranscodeError::Mux {
                stream: role,
                source,
            })?;
        self.packets_written += 1;
        Ok(())
    }

    /// Flush interleaving buffers and write the trailer
    pub fn finish(&mut self) -> TranscodeResult<()> {
        if !self.header_written {
            return Err(TranscodeError::TrailerWrite(BackendError::new(
                "trailer requested before header",
            )));
        }
        if self.trailer_written {
            return Ok(());
        }

        self.output
            .write_trailer()
            .map_err(TranscodeError::TrailerWrite)?;
        self.trailer_written = true;
        Ok(())
    }

    pub fn header_written(&self) -> bool {
        self.header_written
    }

    pub fn trailer_written(&self) -> bool {
        self.trailer_written
    }

    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// Close the output file handle; the container itself goes with `self`
    pub fn close(&mut self) {
        if self.io_open {
            self.output.close_io();
            self.io_open = false;
        }
    }
}

impl<M: Muxer> Drop for MuxWriter<M> {
    fn drop(&mut self) {
        self.close();
    }
}
