//! Speaker channels and the slot mapping table

/// One speaker's samples for a single 10ms frame
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamingPartChannel {
    /// Speaker stream source identifier
    pub ssrc: u32,
    /// Mono 16-bit PCM
    pub pcm_data: Vec<i16>,
    /// Number of samples in `pcm_data`
    pub num_samples: usize,
}

impl StreamingPartChannel {
    /// Channel carrying the given samples
    pub fn new(ssrc: u32, pcm_data: Vec<i16>) -> Self {
        let num_samples = pcm_data.len();
        Self {
            ssrc,
            pcm_data,
            num_samples,
        }
    }

    /// Channel of `num_samples` zero samples
    pub fn silence(ssrc: u32, num_samples: usize) -> Self {
        Self::new(ssrc, vec![0; num_samples])
    }

    /// Whether every sample is zero
    pub fn is_silent(&self) -> bool {
        self.pcm_data.iter().all(|&s| s == 0)
    }
}

/// A current binding of a speaker to a decoder channel slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct ChannelMapping {
    /// Speaker stream source identifier
    pub ssrc: u32,
    /// Decoder channel slot
    pub channel_index: i32,
}

/// Ordered set of current bindings
///
/// No two entries share an ssrc and no two share a slot. Entries are kept
/// in insertion order, newest last; the table stays as small as the number
/// of concurrent speakers so every lookup is a linear scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChannelMappingTable {
    entries: Vec<ChannelMapping>,
}

impl ChannelMappingTable {
    /// Create an empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `ssrc` to `channel_index`, evicting conflicting bindings
    ///
    /// Scans newest to oldest. An identical binding leaves the table as is;
    /// any binding sharing only the ssrc or only the slot is removed before
    /// the new one is appended. Returns whether the table changed.
    pub fn apply_update(&mut self, ssrc: u32, channel_index: i32) -> bool {
        for i in (0..self.entries.len()).rev() {
            let entry = self.entries[i];
            if entry.ssrc == ssrc && entry.channel_index == channel_index {
                return false;
            } else if entry.ssrc == ssrc || entry.channel_index == channel_index {
                tracing::trace!(
                    evicted_ssrc = entry.ssrc,
                    evicted_channel = entry.channel_index,
                    ssrc,
                    channel_index,
                    "Evicting channel mapping"
                );
                self.entries.remove(i);
            }
        }

        self.entries.push(ChannelMapping {
            ssrc,
            channel_index,
        });
        true
    }

    /// Slot currently carrying `ssrc`
    pub fn channel_for(&self, ssrc: u32) -> Option<i32> {
        self.entries
            .iter()
            .find(|entry| entry.ssrc == ssrc)
            .map(|entry| entry.channel_index)
    }

    /// Bindings, oldest first
    pub fn entries(&self) -> &[ChannelMapping] {
        &self.entries
    }

    /// Number of bindings
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing is bound
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slot_conflict_evicts_previous_speaker() {
        let mut table = ChannelMappingTable::new();
        table.apply_update(100, 0);
        table.apply_update(200, 1);
        table.apply_update(200, 0);

        assert_eq!(table.channel_for(200), Some(0));
        assert_eq!(table.channel_for(100), None);
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_ssrc_conflict_moves_speaker() {
        let mut table = ChannelMappingTable::new();
        table.apply_update(100, 0);
        table.apply_update(100, 2);

        assert_eq!(table.entries(), &[ChannelMapping { ssrc: 100, channel_index: 2 }]);
    }

    #[test]
    fn test_double_conflict_evicts_both() {
        let mut table = ChannelMappingTable::new();
        table.apply_update(100, 0);
        table.apply_update(200, 1);
        table.apply_update(100, 1);

        assert_eq!(table.entries(), &[ChannelMapping { ssrc: 100, channel_index: 1 }]);
    }

    #[test]
    fn test_identical_update_is_noop() {
        let mut table = ChannelMappingTable::new();
        assert!(table.apply_update(100, 0));
        table.apply_update(300, 1);
        let before = table.clone();

        assert!(!table.apply_update(100, 0));
        assert_eq!(table, before);
    }

    #[test]
    fn test_silence_channel() {
        let channel = StreamingPartChannel::silence(7, 480);
        assert_eq!(channel.num_samples, 480);
        assert!(channel.is_silent());
    }
}
