//! Per-part reassignment and demultiplexing
//!
//! [`PartState`] walks one parsed part in 10ms steps. Before each step it
//! applies the reassignment records due at the current frame, then pulls
//! interleaved PCM and splits it into one channel per speaker.
//!
//! In multi-channel mode every speaker named by any record gets a channel
//! in every frame, whether or not it is currently bound to a slot, so the
//! output set never changes over the life of the part. In single-channel
//! mode the decoder's slots are passed through with ids `slot + 1`; those ids
//! are positional only.

use crate::channels::{ChannelMappingTable, StreamingPartChannel};
use crate::decoder::PersistentDecoder;
use crate::part::ParsedPart;
use crate::FRAME_DURATION_MS;
use std::collections::{BTreeMap, BTreeSet};

/// Lifecycle of a part
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PartPhase {
    /// Frames are still being produced
    Active,
    /// The stream ended; every further frame is empty
    Drained,
}

/// State machine turning a parsed part into per-speaker frames
#[derive(Debug)]
pub struct PartState {
    single_channel: bool,
    part: Box<dyn ParsedPart>,
    all_ssrcs: BTreeSet<u32>,
    mapping: ChannelMappingTable,
    pcm_10ms: Vec<i16>,
    frame_index: i32,
    remaining_ms: i32,
    phase: PartPhase,
}

fn deinterleave(pcm: &[i16], slot: usize, channels: usize, samples: usize) -> Vec<i16> {
    pcm.iter()
        .skip(slot)
        .step_by(channels)
        .take(samples)
        .copied()
        .collect()
}

impl PartState {
    /// Start a part
    ///
    /// A multi-channel part without any reassignment records has nobody to
    /// emit and is drained immediately.
    pub fn new(part: Box<dyn ParsedPart>, single_channel: bool) -> Self {
        let mut state = Self {
            single_channel,
            part,
            all_ssrcs: BTreeSet::new(),
            mapping: ChannelMappingTable::new(),
            pcm_10ms: Vec::new(),
            frame_index: 0,
            remaining_ms: 0,
            phase: PartPhase::Active,
        };

        if state.part.channel_updates().is_empty() && !single_channel {
            tracing::debug!("Part has no channel updates, nothing to play");
            state.phase = PartPhase::Drained;
            return state;
        }

        state.remaining_ms = state.part.duration_ms().max(0);
        state.all_ssrcs = state
            .part
            .channel_updates()
            .iter()
            .map(|update| update.ssrc)
            .collect();

        tracing::debug!(
            updates = state.part.channel_updates().len(),
            speakers = state.all_ssrcs.len(),
            duration_ms = state.remaining_ms,
            single_channel,
            "Part state created"
        );
        state
    }

    /// Speaker name to numeric id table of the part
    pub fn endpoint_mapping(&self) -> &BTreeMap<String, i32> {
        self.part.endpoint_mapping()
    }

    /// Milliseconds left to play, never negative
    pub fn remaining_ms(&self) -> i32 {
        self.remaining_ms
    }

    /// Index of the next frame to produce
    pub fn frame_index(&self) -> i32 {
        self.frame_index
    }

    /// Current lifecycle phase
    pub fn phase(&self) -> PartPhase {
        self.phase
    }

    /// Whether the part has ended
    pub fn is_drained(&self) -> bool {
        self.phase == PartPhase::Drained
    }

    /// Every speaker referenced by the part's records, ascending
    pub fn speakers(&self) -> &BTreeSet<u32> {
        &self.all_ssrcs
    }

    /// Current speaker to slot bindings
    pub fn current_mapping(&self) -> &ChannelMappingTable {
        &self.mapping
    }

    fn drain(&mut self) {
        tracing::debug!(
            frame_index = self.frame_index,
            remaining_ms = self.remaining_ms,
            "Part drained"
        );
        self.phase = PartPhase::Drained;
    }

    /// Produce the next 10ms, one channel per speaker
    ///
    /// Returns an empty list once the part is drained.
    pub fn produce_frame(
        &mut self,
        decoder: &mut dyn PersistentDecoder,
    ) -> Vec<StreamingPartChannel> {
        if self.phase == PartPhase::Drained {
            return Vec::new();
        }

        for update in self.part.channel_updates() {
            if update.frame_index == self.frame_index {
                tracing::trace!(
                    frame_index = self.frame_index,
                    ssrc = update.ssrc,
                    channel = update.channel_id,
                    "Applying channel update"
                );
                self.mapping.apply_update(update.ssrc, update.channel_id);
            }
        }

        let read = self.part.read_pcm(decoder, &mut self.pcm_10ms);
        if read.num_samples == 0 {
            self.drain();
            return Vec::new();
        }
        if read.num_channels == 0 || read.num_samples * read.num_channels > self.pcm_10ms.len() {
            tracing::warn!(
                samples = read.num_samples,
                channels = read.num_channels,
                buffer = self.pcm_10ms.len(),
                "Decoder reported more samples than it wrote"
            );
            self.drain();
            return Vec::new();
        }

        let samples = read.num_samples;
        let channels = read.num_channels;
        let result = if self.single_channel {
            (0..channels)
                .map(|slot| {
                    StreamingPartChannel::new(
                        slot as u32 + 1,
                        deinterleave(&self.pcm_10ms, slot, channels, samples),
                    )
                })
                .collect()
        } else {
            self.all_ssrcs
                .iter()
                .map(|&ssrc| match self.mapping.channel_for(ssrc) {
                    Some(slot) if slot >= 0 && (slot as usize) < channels => {
                        StreamingPartChannel::new(
                            ssrc,
                            deinterleave(&self.pcm_10ms, slot as usize, channels, samples),
                        )
                    }
                    Some(slot) => {
                        tracing::trace!(ssrc, slot, channels, "Mapped slot out of range");
                        StreamingPartChannel::silence(ssrc, samples)
                    }
                    None => StreamingPartChannel::silence(ssrc, samples),
                })
                .collect()
        };

        self.remaining_ms = (self.remaining_ms - FRAME_DURATION_MS).max(0);
        self.frame_index += 1;

        result
    }
}
