//! # Call Part Core
//!
//! Byte-level building blocks for decoding group-call audio parts.
//! This crate parses the embedded channel reassignment records, serves a
//! part's bytes to container readers and reads the Ogg Opus container that
//! carries the audio and its metadata, with symphonia doing the demuxing.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod io;
pub mod metadata;
pub mod ogg;
pub mod records;

// Re-export main types
pub use error::{ErrorCategory, PartError, PartResult};
pub use io::{PartByteSource, ReadOutcome, SeekMode, IO_PAGE_SIZE};
pub use metadata::{PartMetadata, CHANNEL_UPDATES_TAG, ENDPOINT_MAPPING_TAG};
pub use ogg::{ChannelLayout, OggOpusStream, OpusHead, OPUS_SAMPLE_RATE, SILENT_CHANNEL};
pub use records::{
    parse_channel_updates, try_parse_channel_updates, write_channel_updates, ChannelUpdate,
    ChannelUpdateTable,
};
