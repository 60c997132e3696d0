//! Offline replay of a part's reassignment records
//!
//! Applies the records through the same mapping table the state machine
//! uses, without decoding audio, and reports the binding after every frame
//! that carries updates.

use crate::DiagnosticsError;
use callpart_core::ChannelUpdate;
use callpart_media::{ChannelMapping, ChannelMappingTable, ParsedPart};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Mapping state after one frame's updates
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineEntry {
    /// Frame at which the updates apply
    pub frame_index: i32,
    /// Updates applied at this frame, in record order
    pub updates: Vec<ChannelUpdate>,
    /// Bindings after the updates, oldest first
    pub mapping: Vec<ChannelMapping>,
    /// Speakers emitted as silence from this frame on
    pub unmapped: Vec<u32>,
}

/// Summary of a parsed part
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartReport {
    /// Container duration in milliseconds
    pub duration_ms: i32,
    /// Number of reassignment records
    pub record_count: usize,
    /// Every speaker named by a record, ascending
    pub speakers: Vec<u32>,
    /// Speaker name to numeric id
    pub endpoints: BTreeMap<String, i32>,
    /// One entry per distinct frame index carrying updates
    pub timeline: Vec<TimelineEntry>,
    /// Records that can never apply because their frame index is negative
    pub unreachable_records: usize,
}

impl PartReport {
    /// Bindings in effect while `frame_index` plays
    pub fn mapping_at(&self, frame_index: i32) -> &[ChannelMapping] {
        self.timeline
            .iter()
            .rev()
            .find(|entry| entry.frame_index <= frame_index)
            .map(|entry| entry.mapping.as_slice())
            .unwrap_or(&[])
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, DiagnosticsError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Builds [`PartReport`]s
#[derive(Debug, Default)]
pub struct PartAnalyzer;

impl PartAnalyzer {
    /// Replay every record of `part`
    pub fn analyze(part: &dyn ParsedPart) -> PartReport {
        let updates = part.channel_updates();
        let speakers: BTreeSet<u32> = updates.iter().map(|u| u.ssrc).collect();

        // Group by frame, keeping record order inside a frame.
        let mut by_frame: BTreeMap<i32, Vec<ChannelUpdate>> = BTreeMap::new();
        for update in updates.iter().filter(|u| u.frame_index >= 0) {
            by_frame.entry(update.frame_index).or_default().push(*update);
        }

        let mut table = ChannelMappingTable::new();
        let timeline = by_frame
            .into_iter()
            .map(|(frame_index, updates)| {
                for update in &updates {
                    table.apply_update(update.ssrc, update.channel_id);
                }
                let unmapped = speakers
                    .iter()
                    .copied()
                    .filter(|&ssrc| table.channel_for(ssrc).is_none())
                    .collect();
                TimelineEntry {
                    frame_index,
                    updates,
                    mapping: table.entries().to_vec(),
                    unmapped,
                }
            })
            .collect();

        let unreachable_records = updates.iter().filter(|u| u.frame_index < 0).count();
        if unreachable_records > 0 {
            tracing::warn!(unreachable_records, "Part has records with negative frame index");
        }

        PartReport {
            duration_ms: part.duration_ms(),
            record_count: updates.len(),
            speakers: speakers.into_iter().collect(),
            endpoints: part.endpoint_mapping().clone(),
            timeline,
            unreachable_records,
        }
    }
}
