//! Public part handle
//!
//! [`AudioStreamingPart`] owns the state of one part for its whole life.
//! Construction from an empty blob leaves it uninitialized, and every
//! operation then returns an empty default instead of failing.

use crate::config::PartConfig;
use callpart_media::{
    ContainerParser, OggOpusParser, PartState, PersistentDecoder, StreamingPartChannel,
};
use std::collections::BTreeMap;

static EMPTY_MAPPING: BTreeMap<String, i32> = BTreeMap::new();

#[derive(Debug)]
enum PartSlot {
    Uninitialized,
    Loaded(PartState),
}

/// One encoded part being played back
#[derive(Debug)]
pub struct AudioStreamingPart {
    slot: PartSlot,
}

impl AudioStreamingPart {
    /// Parse an Ogg Opus part
    pub fn new(data: Vec<u8>, container: &str, single_channel: bool) -> Self {
        let config = PartConfig {
            container: container.to_string(),
            single_channel,
        };
        Self::with_parser(&OggOpusParser, data, &config)
    }

    /// Parse a part described by `config`
    pub fn from_config(data: Vec<u8>, config: &PartConfig) -> Self {
        Self::with_parser(&OggOpusParser, data, config)
    }

    /// Parse a part with a caller-supplied container parser
    pub fn with_parser(parser: &dyn ContainerParser, data: Vec<u8>, config: &PartConfig) -> Self {
        if data.is_empty() {
            tracing::debug!("Empty part blob, nothing to decode");
            return Self {
                slot: PartSlot::Uninitialized,
            };
        }

        let parsed = parser.parse(data, &config.container);
        Self {
            slot: PartSlot::Loaded(PartState::new(parsed, config.single_channel)),
        }
    }

    /// Speaker name to numeric id table, empty when uninitialized
    pub fn endpoint_mapping(&self) -> &BTreeMap<String, i32> {
        match &self.slot {
            PartSlot::Uninitialized => &EMPTY_MAPPING,
            PartSlot::Loaded(state) => state.endpoint_mapping(),
        }
    }

    /// Milliseconds left to play, 0 when uninitialized
    pub fn remaining_milliseconds(&self) -> i32 {
        match &self.slot {
            PartSlot::Uninitialized => 0,
            PartSlot::Loaded(state) => state.remaining_ms(),
        }
    }

    /// Next 10ms, one channel per speaker; empty once the part has ended
    ///
    /// `decoder` must not be in use by another part during the call.
    pub fn get_10ms_per_channel(
        &mut self,
        decoder: &mut dyn PersistentDecoder,
    ) -> Vec<StreamingPartChannel> {
        match &mut self.slot {
            PartSlot::Uninitialized => Vec::new(),
            PartSlot::Loaded(state) => state.produce_frame(decoder),
        }
    }

    /// Whether the blob was non-empty
    pub fn is_initialized(&self) -> bool {
        matches!(self.slot, PartSlot::Loaded(_))
    }

    /// Whether no further frames will be produced
    pub fn is_finished(&self) -> bool {
        match &self.slot {
            PartSlot::Uninitialized => true,
            PartSlot::Loaded(state) => state.is_drained(),
        }
    }

    /// Underlying state, for inspection
    pub fn state(&self) -> Option<&PartState> {
        match &self.slot {
            PartSlot::Uninitialized => None,
            PartSlot::Loaded(state) => Some(state),
        }
    }
}
