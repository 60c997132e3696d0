//! # Call Part - Group-Call Audio Part Decoding
//!
//! Decodes bounded parts of a multi-participant call's audio stream into
//! 10ms PCM frames, one per speaker, while following the speaker-to-channel
//! reassignments embedded in each part.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use callpart::{AudioStreamingPart, OpusPersistentDecoder};
//!
//! # fn fetch_part() -> Vec<u8> { Vec::new() }
//! // One decoder for the whole call, lent to each part in turn
//! let mut decoder = OpusPersistentDecoder::new();
//!
//! let mut part = AudioStreamingPart::new(fetch_part(), "ogg", false);
//! while !part.is_finished() {
//!     for channel in part.get_10ms_per_channel(&mut decoder) {
//!         println!("ssrc {} -> {} samples", channel.ssrc, channel.num_samples);
//!     }
//! }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

// Re-export core types for easy access
pub use callpart_core::{
    parse_channel_updates, write_channel_updates, ChannelLayout, ChannelUpdate, PartByteSource,
    PartError, PartMetadata, ReadOutcome, SeekMode,
};

pub use callpart_media::{
    ChannelMapping, ContainerParser, MediaError, MediaResult, OggOpusParser, ParsedPart,
    PartPhase, PartState, PersistentDecoder, ReadPcmResult, StreamParams, StreamingPartChannel,
    FRAME_DURATION_MS, SAMPLES_PER_FRAME,
};

#[cfg(feature = "opus")]
pub use callpart_media::OpusPersistentDecoder;

#[cfg(feature = "diagnostics")]
pub use callpart_diagnostics::{DebugLogger, DiagnosticsError, PartAnalyzer, PartReport};

// Public API modules
pub mod config;
pub mod part;

// Re-export main API types
pub use config::{GlobalConfig, PartConfig};
pub use part::AudioStreamingPart;

use thiserror::Error;

/// Errors raised while setting up the library
///
/// Part playback itself never fails; see [`AudioStreamingPart`].
#[derive(Error, Debug)]
pub enum CallPartError {
    /// Logging could not be initialized
    #[cfg(feature = "diagnostics")]
    #[error(transparent)]
    Diagnostics(#[from] DiagnosticsError),
}

/// Main entry point holding global settings
#[derive(Debug, Clone, Default)]
pub struct CallPart {
    config: GlobalConfig,
}

impl CallPart {
    /// Initialize with default settings
    pub fn init() -> Result<Self, CallPartError> {
        Self::init_with(GlobalConfig::default())
    }

    /// Initialize with custom global configuration
    ///
    /// Installs the log subscriber when `debug_logging` is set and the
    /// diagnostics feature is enabled.
    pub fn init_with(config: GlobalConfig) -> Result<Self, CallPartError> {
        #[cfg(feature = "diagnostics")]
        config.init_logging()?;

        Ok(Self { config })
    }

    /// Global configuration in use
    pub fn config(&self) -> &GlobalConfig {
        &self.config
    }

    /// Open a part with the given per-part settings
    pub fn part(&self, data: Vec<u8>, config: &PartConfig) -> AudioStreamingPart {
        AudioStreamingPart::from_config(data, config)
    }

    /// Replay a part's reassignment records without decoding audio
    #[cfg(feature = "diagnostics")]
    pub fn analyze(&self, data: Vec<u8>, config: &PartConfig) -> PartReport {
        let parsed = OggOpusParser.parse(data, &config.container);
        PartAnalyzer::analyze(parsed.as_ref())
    }
}
