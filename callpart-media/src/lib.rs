//! # Call Part Media
//!
//! Turns parsed group-call audio parts into per-speaker PCM frames.
//! This crate tracks which decoder channel slot carries which speaker,
//! demultiplexes interleaved PCM accordingly and owns the codec seam shared
//! between consecutive parts.

#![warn(clippy::all)]

pub mod channels;
pub mod decoder;
pub mod error;
#[cfg(feature = "opus")]
mod multistream;
pub mod part;
pub mod state;

/// Duration of one produced frame in milliseconds
pub const FRAME_DURATION_MS: i32 = 10;

/// Samples per channel in one frame at 48 kHz
pub const SAMPLES_PER_FRAME: usize = 480;

// Re-export main types
pub use channels::{ChannelMapping, ChannelMappingTable, StreamingPartChannel};
#[cfg(feature = "opus")]
pub use decoder::OpusPersistentDecoder;
pub use decoder::{PersistentDecoder, StreamParams, MAX_OPUS_FRAME_SAMPLES};
pub use error::{MediaError, MediaResult};
pub use part::{ContainerParser, OggOpusParser, OggOpusPart, ParsedPart, ReadPcmResult};
pub use state::{PartPhase, PartState};
