//! Media error types
//!
//! None of these cross the part facade: a failed decode ends the part's
//! stream and is only logged.

use callpart_core::PartError;
use thiserror::Error;

/// Main error type for decoding operations
#[derive(Error, Debug)]
pub enum MediaError {
    /// Decoding operation failed
    #[error("Decoding failed: {codec} - {reason}")]
    DecodingFailed {
        /// Codec name
        codec: String,
        /// Failure reason
        reason: String,
    },

    /// Codec initialization failed
    #[error("Codec initialization failed: {codec} - {reason}")]
    CodecInitializationFailed {
        /// Codec name
        codec: String,
        /// Failure reason
        reason: String,
    },

    /// The decoder cannot produce this channel layout
    #[error("Unsupported channel layout: {channels} channels at {sample_rate} Hz")]
    UnsupportedChannelLayout {
        /// Channel count
        channels: u8,
        /// Sample rate in Hz
        sample_rate: u32,
    },

    /// Container or metadata error
    #[error(transparent)]
    Part(#[from] PartError),
}

/// Result type alias for media operations
pub type MediaResult<T> = Result<T, MediaError>;

impl MediaError {
    /// Whether later packets of the same stream may still decode
    pub fn is_recoverable(&self) -> bool {
        match self {
            MediaError::DecodingFailed { .. } => true,
            MediaError::Part(e) => e.is_recoverable(),
            _ => false,
        }
    }
}
