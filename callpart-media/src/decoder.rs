//! Persistent decoders shared across consecutive parts
//!
//! Codec state has to survive from one part to the next or every part
//! boundary would click. The caller owns the decoder and lends it to one
//! part at a time; parts never keep it.

use crate::error::MediaResult;
use callpart_core::ChannelLayout;
use std::fmt;

#[cfg(feature = "opus")]
use crate::error::MediaError;
#[cfg(feature = "opus")]
use crate::multistream::MultistreamDecoder;
#[cfg(feature = "opus")]
use audiopus::{coder::Decoder as OpusDecoder, Channels, SampleRate};

/// Longest Opus frame (120ms) in samples per channel at 48 kHz
pub const MAX_OPUS_FRAME_SAMPLES: usize = 5760;

/// Parameters of the encoded stream a packet belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamParams {
    /// Output sample rate in Hz
    pub sample_rate: u32,
    /// Interleaved channel count
    pub channels: u8,
    /// How output channels map onto coded streams
    pub layout: ChannelLayout,
}

impl StreamParams {
    /// Mono or stereo stream coded as a single Opus stream
    pub fn single_stream(sample_rate: u32, channels: u8) -> Self {
        Self {
            sample_rate,
            channels,
            layout: ChannelLayout::single_stream(channels),
        }
    }
}

/// Decoder whose state outlives a single part
///
/// Implementations must tolerate parameter changes between calls by
/// recreating their codec state.
pub trait PersistentDecoder: fmt::Debug {
    /// Decode one packet, appending interleaved PCM to `pcm`
    ///
    /// Returns the number of samples per channel appended.
    fn decode_packet(
        &mut self,
        params: &StreamParams,
        packet: &[u8],
        pcm: &mut Vec<i16>,
    ) -> MediaResult<usize>;

    /// Drop codec state so the next packet starts fresh
    fn reset(&mut self) {}
}

#[cfg(feature = "opus")]
enum OpusCodec {
    Single(OpusDecoder),
    Multi(MultistreamDecoder),
}

/// Opus decoder kept alive across parts
///
/// Family 0 streams go through audiopus; any other mapping family uses the
/// libopus multistream decoder with the stream's mapping table.
#[cfg(feature = "opus")]
#[derive(Default)]
pub struct OpusPersistentDecoder {
    active: Option<(StreamParams, OpusCodec)>,
    scratch: Vec<i16>,
}

#[cfg(feature = "opus")]
impl fmt::Debug for OpusPersistentDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpusPersistentDecoder")
            .field("params", &self.params())
            .finish()
    }
}

#[cfg(feature = "opus")]
fn single_stream_decoder(params: &StreamParams) -> MediaResult<OpusDecoder> {
    let unsupported = || MediaError::UnsupportedChannelLayout {
        channels: params.channels,
        sample_rate: params.sample_rate,
    };
    let sample_rate = match params.sample_rate {
        8000 => SampleRate::Hz8000,
        12000 => SampleRate::Hz12000,
        16000 => SampleRate::Hz16000,
        24000 => SampleRate::Hz24000,
        48000 => SampleRate::Hz48000,
        _ => return Err(unsupported()),
    };
    let channels = match params.channels {
        1 => Channels::Mono,
        2 => Channels::Stereo,
        _ => return Err(unsupported()),
    };

    OpusDecoder::new(sample_rate, channels).map_err(|e| MediaError::CodecInitializationFailed {
        codec: "Opus".to_string(),
        reason: format!("{:?}", e),
    })
}

#[cfg(feature = "opus")]
impl OpusPersistentDecoder {
    /// Create a decoder; codec state is built on the first packet
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters of the live codec state, if any
    pub fn params(&self) -> Option<&StreamParams> {
        self.active.as_ref().map(|(params, _)| params)
    }

    fn codec_for(&mut self, params: &StreamParams) -> MediaResult<&mut OpusCodec> {
        if self.params() != Some(params) {
            let codec = if params.layout.is_multistream() {
                OpusCodec::Multi(MultistreamDecoder::new(params)?)
            } else {
                OpusCodec::Single(single_stream_decoder(params)?)
            };
            tracing::debug!(
                sample_rate = params.sample_rate,
                channels = params.channels,
                family = params.layout.family,
                streams = params.layout.streams,
                "Opus decoder (re)created"
            );
            self.active = Some((params.clone(), codec));
        }

        match self.active.as_mut() {
            Some((_, codec)) => Ok(codec),
            None => Err(MediaError::CodecInitializationFailed {
                codec: "Opus".to_string(),
                reason: "decoder missing after initialization".to_string(),
            }),
        }
    }
}

#[cfg(feature = "opus")]
impl PersistentDecoder for OpusPersistentDecoder {
    fn decode_packet(
        &mut self,
        params: &StreamParams,
        packet: &[u8],
        pcm: &mut Vec<i16>,
    ) -> MediaResult<usize> {
        let channels = params.channels as usize;
        let mut scratch = std::mem::take(&mut self.scratch);
        scratch.resize(MAX_OPUS_FRAME_SAMPLES * channels, 0);

        let decoded = self.codec_for(params).and_then(|codec| match codec {
            OpusCodec::Single(decoder) => decoder
                .decode(Some(packet), &mut scratch, false)
                .map_err(|e| MediaError::DecodingFailed {
                    codec: "Opus".to_string(),
                    reason: format!("{:?}", e),
                }),
            OpusCodec::Multi(decoder) => decoder.decode(packet, &mut scratch),
        });

        if let Ok(samples) = decoded {
            pcm.extend_from_slice(&scratch[..samples * channels]);
        }
        self.scratch = scratch;
        decoded
    }

    fn reset(&mut self) {
        tracing::debug!("Opus decoder state dropped");
        self.active = None;
    }
}

#[cfg(all(test, feature = "opus"))]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_layout_is_rejected() {
        let mut decoder = OpusPersistentDecoder::new();
        let mut pcm = Vec::new();
        let params = StreamParams::single_stream(48000, 6);

        let err = decoder.decode_packet(&params, &[0xF8], &mut pcm).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedChannelLayout { channels: 6, .. }));
        assert!(pcm.is_empty());
        assert_eq!(decoder.params(), None);
    }

    #[test]
    fn test_decoder_persists_until_params_change() {
        let mut decoder = OpusPersistentDecoder::new();
        let mut pcm = Vec::new();
        let mono = StreamParams::single_stream(48000, 1);

        // TOC-only packet; the result does not matter, only the codec state.
        let _ = decoder.decode_packet(&mono, &[0xF8], &mut pcm);
        assert_eq!(decoder.params(), Some(&mono));

        decoder.reset();
        assert_eq!(decoder.params(), None);
    }

    #[test]
    fn test_multistream_layout_uses_multistream_codec() {
        let mut decoder = OpusPersistentDecoder::new();
        let mut pcm = Vec::new();
        let params = StreamParams {
            sample_rate: 48000,
            channels: 3,
            layout: ChannelLayout {
                family: 1,
                streams: 2,
                coupled_streams: 1,
                mapping: vec![0, 2, 1],
            },
        };

        let _ = decoder.decode_packet(&params, &[0xF8], &mut pcm);
        assert!(matches!(decoder.active, Some((_, OpusCodec::Multi(_)))));
    }

    #[test]
    fn test_mapping_table_must_cover_every_channel() {
        let mut decoder = OpusPersistentDecoder::new();
        let mut pcm = Vec::new();
        let params = StreamParams {
            sample_rate: 48000,
            channels: 3,
            layout: ChannelLayout {
                family: 255,
                streams: 3,
                coupled_streams: 0,
                mapping: vec![0, 1],
            },
        };

        let err = decoder.decode_packet(&params, &[0xF8], &mut pcm).unwrap_err();
        assert!(matches!(err, MediaError::UnsupportedChannelLayout { channels: 3, .. }));
    }
}
