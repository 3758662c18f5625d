//! Transmux library
//!
//! A single-pass transcoding pipeline: the first video stream of an input
//! container is decoded, converted to a target profile and re-encoded, the
//! first audio stream is copied through untouched, and both are multiplexed
//! into a new container.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod output;
pub mod ports;
pub mod streams;
pub mod utils;

// Re-export commonly used types
pub use domain::errors::DomainError;
pub use domain::model::{MediaInfo, Profile, Stats, StreamDescriptor, Timebase};
pub use engine::{transcode, EngineConfig, Transcoder};
pub use error::{ErrorKind, TranscodeError, TranscodeResult};
