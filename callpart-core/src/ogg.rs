//! Ogg Opus container reading
//!
//! Audio parts are Ogg-encapsulated Opus. symphonia's Ogg reader does the
//! demuxing over a [`PartByteSource`]: page sync, CRC checks and packet
//! reassembly. This module interprets the `OpusHead` identification header
//! it exposes and collects the comment tags and audio packets of the first
//! Opus track.

use crate::error::{PartError, PartResult};
use crate::io::PartByteSource;
use bytes::{Buf, Bytes};
use std::io;
use symphonia::core::codecs::CODEC_TYPE_OPUS;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::{FormatOptions, FormatReader};
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::Value;
use symphonia::default::formats::OggReader;

/// Opus always runs its granule clock at 48 kHz
pub const OPUS_SAMPLE_RATE: u32 = 48_000;

/// Mapping table entry for an output channel that is always silent
pub const SILENT_CHANNEL: u8 = 255;

const OPUS_HEAD_MAGIC: &[u8; 8] = b"OpusHead";
const OPUS_HEAD_MIN_SIZE: usize = 19;

/// How output channels map onto the coded Opus streams
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelLayout {
    /// Channel mapping family; 0 is one mono or stereo stream
    pub family: u8,
    /// Number of coded streams
    pub streams: u8,
    /// How many of the streams are coupled (stereo)
    pub coupled_streams: u8,
    /// Decoded stream channel feeding each output channel
    pub mapping: Vec<u8>,
}

impl ChannelLayout {
    /// Family 0 layout: one stream, coupled when stereo
    pub fn single_stream(channels: u8) -> Self {
        Self {
            family: 0,
            streams: 1,
            coupled_streams: u8::from(channels == 2),
            mapping: (0..channels).collect(),
        }
    }

    /// Whether decoding needs a multistream decoder
    pub fn is_multistream(&self) -> bool {
        self.family != 0
    }
}

/// Opus identification header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpusHead {
    /// Encapsulation version
    pub version: u8,
    /// Output channel count
    pub channel_count: u8,
    /// Samples to drop at 48 kHz before playback
    pub pre_skip: u16,
    /// Sample rate of the original input, informational
    pub input_sample_rate: u32,
    /// Output gain in Q7.8 dB
    pub output_gain: i16,
    /// Stream layout
    pub layout: ChannelLayout,
}

fn invalid(reason: impl Into<String>) -> PartError {
    PartError::InvalidContainer {
        reason: reason.into(),
    }
}

impl OpusHead {
    /// Parse an `OpusHead` packet
    pub fn parse(packet: &[u8]) -> PartResult<Self> {
        if packet.len() < OPUS_HEAD_MIN_SIZE || &packet[..8] != OPUS_HEAD_MAGIC {
            return Err(invalid("missing OpusHead packet"));
        }

        let mut buf = &packet[8..];
        let version = buf.get_u8();
        let channel_count = buf.get_u8();
        let pre_skip = buf.get_u16_le();
        let input_sample_rate = buf.get_u32_le();
        let output_gain = buf.get_i16_le();
        let family = buf.get_u8();

        if version >> 4 != 0 {
            return Err(invalid(format!("unsupported OpusHead version {}", version)));
        }
        if channel_count == 0 {
            return Err(invalid("OpusHead declares zero channels"));
        }

        let layout = if family == 0 {
            if channel_count > 2 {
                return Err(invalid(format!(
                    "mapping family 0 with {} channels",
                    channel_count
                )));
            }
            ChannelLayout::single_stream(channel_count)
        } else {
            let channels = channel_count as usize;
            if buf.remaining() < 2 + channels {
                return Err(PartError::Truncated {
                    field: "channel_mapping",
                    offset: OPUS_HEAD_MIN_SIZE,
                });
            }
            let streams = buf.get_u8();
            let coupled_streams = buf.get_u8();
            let mapping = buf[..channels].to_vec();

            let decoded = streams as usize + coupled_streams as usize;
            if streams == 0 || coupled_streams > streams || decoded > 255 {
                return Err(invalid(format!(
                    "{} streams with {} coupled",
                    streams, coupled_streams
                )));
            }
            if let Some(&entry) = mapping
                .iter()
                .find(|&&entry| entry != SILENT_CHANNEL && entry as usize >= decoded)
            {
                return Err(invalid(format!(
                    "mapping entry {} beyond {} decoded channels",
                    entry, decoded
                )));
            }

            ChannelLayout {
                family,
                streams,
                coupled_streams,
                mapping,
            }
        };

        Ok(Self {
            version,
            channel_count,
            pre_skip,
            input_sample_rate,
            output_gain,
            layout,
        })
    }
}

/// A fully read Ogg Opus part
#[derive(Debug, Clone)]
pub struct OggOpusStream {
    /// Identification header
    pub head: OpusHead,
    /// `(key, value)` comment tags in stream order
    pub tags: Vec<(String, String)>,
    /// Audio packets in stream order
    pub packets: Vec<Bytes>,
    /// End granule of the last packet, 0 when none
    pub final_granule: i64,
}

fn container_error(stage: &str, error: SymphoniaError) -> PartError {
    invalid(format!("{}: {}", stage, error))
}

impl OggOpusStream {
    /// Demux the first Opus track of a part
    pub fn read(source: PartByteSource) -> PartResult<Self> {
        let total_size = source.len();
        let stream =
            MediaSourceStream::new(Box::new(source), MediaSourceStreamOptions::default());
        let mut reader = OggReader::try_new(stream, &FormatOptions::default())
            .map_err(|e| container_error("open", e))?;

        let (track_id, head) = {
            let track = reader
                .tracks()
                .iter()
                .find(|track| track.codec_params.codec == CODEC_TYPE_OPUS)
                .ok_or_else(|| invalid("no Opus track"))?;
            let header = track
                .codec_params
                .extra_data
                .as_deref()
                .ok_or_else(|| invalid("Opus track without OpusHead"))?;
            (track.id, OpusHead::parse(header)?)
        };

        let tags: Vec<(String, String)> = reader
            .metadata()
            .current()
            .map(|revision| {
                revision
                    .tags()
                    .iter()
                    .filter_map(|tag| match &tag.value {
                        Value::String(value) => Some((tag.key.clone(), value.clone())),
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();

        let mut packets = Vec::new();
        let mut end_ts = 0u64;
        loop {
            let packet = match reader.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(e)) if e.kind() == io::ErrorKind::UnexpectedEof => {
                    break
                }
                Err(SymphoniaError::ResetRequired) => {
                    tracing::debug!("Ignoring chained Ogg stream");
                    break;
                }
                Err(e) if !packets.is_empty() => {
                    tracing::warn!(
                        packets = packets.len(),
                        "Stopping at unreadable Ogg data: {}",
                        e
                    );
                    break;
                }
                Err(e) => return Err(container_error("read packet", e)),
            };

            if packet.track_id() != track_id {
                continue;
            }
            end_ts = end_ts.max(packet.ts().saturating_add(packet.dur()));
            packets.push(Bytes::from(packet.data.into_vec()));
        }

        tracing::debug!(
            total_size,
            channels = head.channel_count,
            family = head.layout.family,
            packets = packets.len(),
            tags = tags.len(),
            "Read Ogg Opus stream"
        );

        Ok(Self {
            head,
            tags,
            packets,
            final_granule: i64::try_from(end_ts).unwrap_or(i64::MAX),
        })
    }

    /// Playable duration in milliseconds
    pub fn duration_ms(&self) -> i32 {
        let samples = (self.final_granule - i64::from(self.head.pre_skip)).max(0);
        (samples * 1000 / i64::from(OPUS_SAMPLE_RATE)).min(i64::from(i32::MAX)) as i32
    }

    /// Comment tags as `(key, value)` slices
    pub fn tag_pairs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tags.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn head(channels: u8, family: u8, table: &[u8]) -> Vec<u8> {
        let mut packet = OPUS_HEAD_MAGIC.to_vec();
        packet.extend_from_slice(&[1, channels]);
        packet.extend_from_slice(&312u16.to_le_bytes());
        packet.extend_from_slice(&48_000u32.to_le_bytes());
        packet.extend_from_slice(&0i16.to_le_bytes());
        packet.push(family);
        packet.extend_from_slice(table);
        packet
    }

    #[test]
    fn test_opus_head_fields() {
        let head = OpusHead::parse(&head(2, 0, &[])).unwrap();

        assert_eq!(head.channel_count, 2);
        assert_eq!(head.pre_skip, 312);
        assert_eq!(head.layout, ChannelLayout::single_stream(2));
        assert_eq!(head.layout.coupled_streams, 1);
        assert!(!head.layout.is_multistream());
    }

    #[test]
    fn test_opus_head_keeps_mapping_table() {
        // Three slots: one coupled stream plus one mono stream
        let head = OpusHead::parse(&head(3, 1, &[2, 1, 0, 2, 1])).unwrap();

        assert_eq!(head.layout.family, 1);
        assert_eq!(head.layout.streams, 2);
        assert_eq!(head.layout.coupled_streams, 1);
        assert_eq!(head.layout.mapping, vec![0, 2, 1]);
        assert!(head.layout.is_multistream());
    }

    #[test]
    fn test_opus_head_accepts_silent_channels() {
        let head = OpusHead::parse(&head(2, 255, &[1, 0, 0, SILENT_CHANNEL])).unwrap();
        assert_eq!(head.layout.mapping, vec![0, SILENT_CHANNEL]);
    }

    #[test]
    fn test_opus_head_rejects_bad_layouts() {
        assert!(matches!(
            OpusHead::parse(&head(3, 0, &[])),
            Err(PartError::InvalidContainer { .. })
        ));
        assert!(matches!(
            OpusHead::parse(&head(3, 1, &[2, 1, 0])),
            Err(PartError::Truncated { field: "channel_mapping", .. })
        ));
        // Entry 3 with only 3 decoded channels
        assert!(matches!(
            OpusHead::parse(&head(2, 1, &[2, 1, 0, 3])),
            Err(PartError::InvalidContainer { .. })
        ));
        assert!(matches!(
            OpusHead::parse(&head(2, 1, &[1, 2, 0, 1])),
            Err(PartError::InvalidContainer { .. })
        ));
    }

    #[test]
    fn test_opus_head_rejects_other_packets() {
        assert!(OpusHead::parse(b"OpusTags\0\0\0\0\0\0\0\0\0\0\0").is_err());
        assert!(OpusHead::parse(&head(0, 0, &[])).is_err());
    }
}
