//! Parsed parts: container metadata plus on-demand PCM
//!
//! A [`ParsedPart`] is what the state machine sees of an encoded part: its
//! reassignment records, duration, endpoint table and a PCM pull. The
//! [`OggOpusParser`] builds one from an Ogg Opus blob.

use crate::decoder::{PersistentDecoder, StreamParams};
use crate::SAMPLES_PER_FRAME;
use bytes::Bytes;
use callpart_core::{
    ChannelUpdate, OggOpusStream, PartByteSource, PartError, PartMetadata, PartResult,
    OPUS_SAMPLE_RATE,
};
use std::collections::{BTreeMap, VecDeque};
use std::fmt;

/// Outcome of one PCM pull
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadPcmResult {
    /// Samples per channel written; zero means the part is exhausted
    pub num_samples: usize,
    /// Interleaved channel count of the written samples
    pub num_channels: usize,
}

/// Decoded view of one encoded part
pub trait ParsedPart: fmt::Debug {
    /// Reassignment records in their original order
    fn channel_updates(&self) -> &[ChannelUpdate];

    /// Duration reported by the container in milliseconds
    fn duration_ms(&self) -> i32;

    /// Speaker name to numeric id
    fn endpoint_mapping(&self) -> &BTreeMap<String, i32>;

    /// Replace `pcm` with up to 10ms of interleaved samples
    fn read_pcm(&mut self, decoder: &mut dyn PersistentDecoder, pcm: &mut Vec<i16>)
        -> ReadPcmResult;
}

/// Turns encoded bytes into a [`ParsedPart`]
///
/// Parsing never fails outright: malformed input produces a part with no
/// records, zero duration and no audio.
pub trait ContainerParser: fmt::Debug {
    /// Parse `data` according to the container format hint
    fn parse(&self, data: Vec<u8>, container: &str) -> Box<dyn ParsedPart>;
}

/// Parser for Ogg-encapsulated Opus parts
#[derive(Debug, Clone, Copy, Default)]
pub struct OggOpusParser;

impl OggOpusParser {
    /// Whether the container hint names a format this parser reads
    pub fn supports(container: &str) -> bool {
        container.eq_ignore_ascii_case("ogg") || container.eq_ignore_ascii_case("opus")
    }
}

impl ContainerParser for OggOpusParser {
    fn parse(&self, data: Vec<u8>, container: &str) -> Box<dyn ParsedPart> {
        Box::new(OggOpusPart::new(data, container))
    }
}

/// An Ogg Opus part decoded lazily, 10ms at a time
#[derive(Debug, Default)]
pub struct OggOpusPart {
    metadata: PartMetadata,
    duration_ms: i32,
    params: Option<StreamParams>,
    packets: VecDeque<Bytes>,
    decoded: Vec<i16>,
    decoded_offset: usize,
    pre_skip_remaining: usize,
}

impl OggOpusPart {
    /// Parse a part, falling back to an empty one on malformed input
    pub fn new(data: Vec<u8>, container: &str) -> Self {
        match Self::open(data, container) {
            Ok(part) => part,
            Err(e) => {
                tracing::warn!(
                    category = ?e.category(),
                    "Failed to parse {} part: {}",
                    container,
                    e
                );
                Self::default()
            }
        }
    }

    /// Parse a part, reporting why it could not be read
    pub fn open(data: Vec<u8>, container: &str) -> PartResult<Self> {
        if !OggOpusParser::supports(container) {
            return Err(PartError::UnsupportedContainer {
                container: container.to_string(),
            });
        }

        let stream = OggOpusStream::read(PartByteSource::new(data))?;
        let metadata = PartMetadata::from_tags(stream.tag_pairs());
        let duration_ms = stream.duration_ms();

        tracing::debug!(
            channels = stream.head.channel_count,
            packets = stream.packets.len(),
            updates = metadata.channel_updates.len(),
            duration_ms,
            "Parsed Ogg Opus part"
        );

        Ok(Self {
            metadata,
            duration_ms,
            params: Some(StreamParams {
                sample_rate: OPUS_SAMPLE_RATE,
                channels: stream.head.channel_count,
                layout: stream.head.layout,
            }),
            pre_skip_remaining: stream.head.pre_skip as usize,
            packets: stream.packets.into(),
            decoded: Vec::new(),
            decoded_offset: 0,
        })
    }

    /// Stream parameters, `None` for a part that failed to parse
    pub fn params(&self) -> Option<&StreamParams> {
        self.params.as_ref()
    }

    /// Decode packets until one yields audible samples
    ///
    /// A packet that fails to decode is skipped. An error the codec cannot
    /// recover from ends the part and drops the decoder state.
    fn decode_next(&mut self, decoder: &mut dyn PersistentDecoder, params: &StreamParams) -> bool {
        let channels = params.channels as usize;
        self.decoded.clear();
        self.decoded_offset = 0;

        while let Some(packet) = self.packets.pop_front() {
            match decoder.decode_packet(params, &packet, &mut self.decoded) {
                Ok(samples) => {
                    let skipped = self.pre_skip_remaining.min(samples);
                    self.pre_skip_remaining -= skipped;
                    if samples > skipped {
                        self.decoded_offset = skipped * channels;
                        return true;
                    }
                    self.decoded.clear();
                }
                Err(e) if e.is_recoverable() => {
                    tracing::debug!(
                        remaining = self.packets.len(),
                        "Skipping undecodable packet: {}",
                        e
                    );
                    self.decoded.clear();
                }
                Err(e) => {
                    tracing::warn!(remaining = self.packets.len(), "Ending part early: {}", e);
                    self.packets.clear();
                    self.decoded.clear();
                    decoder.reset();
                    return false;
                }
            }
        }

        false
    }
}

impl ParsedPart for OggOpusPart {
    fn channel_updates(&self) -> &[ChannelUpdate] {
        &self.metadata.channel_updates
    }

    fn duration_ms(&self) -> i32 {
        self.duration_ms
    }

    fn endpoint_mapping(&self) -> &BTreeMap<String, i32> {
        &self.metadata.endpoint_mapping
    }

    fn read_pcm(
        &mut self,
        decoder: &mut dyn PersistentDecoder,
        pcm: &mut Vec<i16>,
    ) -> ReadPcmResult {
        pcm.clear();
        let Some(params) = self.params.take() else {
            return ReadPcmResult::default();
        };
        let channels = params.channels as usize;

        let mut written = 0;
        while written < SAMPLES_PER_FRAME {
            let available = (self.decoded.len() - self.decoded_offset) / channels;
            if available == 0 {
                if self.decode_next(decoder, &params) {
                    continue;
                }
                break;
            }

            let take = available.min(SAMPLES_PER_FRAME - written);
            let end = self.decoded_offset + take * channels;
            pcm.extend_from_slice(&self.decoded[self.decoded_offset..end]);
            self.decoded_offset = end;
            written += take;
        }

        self.params = Some(params);
        ReadPcmResult {
            num_samples: written,
            num_channels: channels,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{MediaError, MediaResult};

    /// Emits `samples` frames per packet, sample value = packet's first byte
    #[derive(Debug)]
    struct ConstantDecoder {
        samples: usize,
    }

    impl PersistentDecoder for ConstantDecoder {
        fn decode_packet(
            &mut self,
            params: &StreamParams,
            packet: &[u8],
            pcm: &mut Vec<i16>,
        ) -> MediaResult<usize> {
            let value = i16::from(packet[0]);
            pcm.extend(std::iter::repeat(value).take(self.samples * params.channels as usize));
            Ok(self.samples)
        }
    }

    fn part(channels: u8, pre_skip: usize, packets: &[u8]) -> OggOpusPart {
        OggOpusPart {
            params: Some(StreamParams::single_stream(OPUS_SAMPLE_RATE, channels)),
            packets: packets.iter().map(|&b| Bytes::from(vec![b])).collect(),
            pre_skip_remaining: pre_skip,
            ..OggOpusPart::default()
        }
    }

    #[test]
    fn test_twenty_ms_packets_split_into_two_frames() {
        let mut part = part(2, 0, &[1, 2]);
        let mut decoder = ConstantDecoder { samples: 960 };
        let mut pcm = Vec::new();

        for expected in [1, 1, 2, 2] {
            let result = part.read_pcm(&mut decoder, &mut pcm);
            assert_eq!(result, ReadPcmResult { num_samples: 480, num_channels: 2 });
            assert_eq!(pcm.len(), 960);
            assert!(pcm.iter().all(|&s| s == expected));
        }

        assert_eq!(part.read_pcm(&mut decoder, &mut pcm).num_samples, 0);
        assert!(pcm.is_empty());
    }

    #[test]
    fn test_pre_skip_is_dropped_and_tail_is_short() {
        let mut part = part(1, 600, &[1, 2]);
        let mut decoder = ConstantDecoder { samples: 960 };
        let mut pcm = Vec::new();

        // 1920 decoded, 600 skipped: 480 + 480 + 360
        let first = part.read_pcm(&mut decoder, &mut pcm);
        assert_eq!(first.num_samples, 480);
        assert_eq!(&pcm[..360], &[1; 360][..]);
        assert_eq!(&pcm[360..], &[2; 120][..]);

        assert_eq!(part.read_pcm(&mut decoder, &mut pcm).num_samples, 480);
        assert_eq!(part.read_pcm(&mut decoder, &mut pcm).num_samples, 360);
        assert_eq!(part.read_pcm(&mut decoder, &mut pcm).num_samples, 0);
    }

    /// Fails on packets whose first byte is listed, decoding the rest
    #[derive(Debug)]
    struct FlakyDecoder {
        fail_on: Vec<u8>,
        error: fn() -> MediaError,
        resets: usize,
    }

    impl PersistentDecoder for FlakyDecoder {
        fn decode_packet(
            &mut self,
            params: &StreamParams,
            packet: &[u8],
            pcm: &mut Vec<i16>,
        ) -> MediaResult<usize> {
            if self.fail_on.contains(&packet[0]) {
                return Err((self.error)());
            }
            let value = i16::from(packet[0]);
            pcm.extend(std::iter::repeat(value).take(480 * params.channels as usize));
            Ok(480)
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    fn corrupt_packet() -> MediaError {
        MediaError::DecodingFailed {
            codec: "Opus".to_string(),
            reason: "corrupted stream".to_string(),
        }
    }

    fn bad_layout() -> MediaError {
        MediaError::UnsupportedChannelLayout {
            channels: 9,
            sample_rate: 48000,
        }
    }

    #[test]
    fn test_corrupt_packet_is_skipped() {
        let mut part = part(1, 0, &[1, 2, 3]);
        let mut decoder = FlakyDecoder {
            fail_on: vec![2],
            error: corrupt_packet,
            resets: 0,
        };
        let mut pcm = Vec::new();

        assert_eq!(part.read_pcm(&mut decoder, &mut pcm).num_samples, 480);
        assert!(pcm.iter().all(|&s| s == 1));
        assert_eq!(part.read_pcm(&mut decoder, &mut pcm).num_samples, 480);
        assert!(pcm.iter().all(|&s| s == 3));
        assert_eq!(part.read_pcm(&mut decoder, &mut pcm).num_samples, 0);
        assert_eq!(decoder.resets, 0);
    }

    #[test]
    fn test_unrecoverable_error_ends_part() {
        let mut part = part(1, 0, &[1, 2, 3]);
        let mut decoder = FlakyDecoder {
            fail_on: vec![2],
            error: bad_layout,
            resets: 0,
        };
        let mut pcm = Vec::new();

        assert_eq!(part.read_pcm(&mut decoder, &mut pcm).num_samples, 480);
        assert_eq!(part.read_pcm(&mut decoder, &mut pcm).num_samples, 0);
        assert_eq!(part.read_pcm(&mut decoder, &mut pcm).num_samples, 0);
        assert_eq!(decoder.resets, 1);
    }

    #[test]
    fn test_unparsed_part_is_empty() {
        let mut part = OggOpusPart::new(vec![1, 2, 3], "ogg");
        let mut decoder = ConstantDecoder { samples: 960 };
        let mut pcm = vec![5; 10];

        assert!(part.channel_updates().is_empty());
        assert_eq!(part.duration_ms(), 0);
        assert_eq!(part.read_pcm(&mut decoder, &mut pcm), ReadPcmResult::default());
        assert!(pcm.is_empty());
    }

    #[test]
    fn test_unsupported_container_hint() {
        let err = OggOpusPart::open(vec![0; 64], "mp4").unwrap_err();
        assert!(matches!(err, PartError::UnsupportedContainer { .. }));
        assert!(OggOpusParser::supports("OGG"));
    }
}
