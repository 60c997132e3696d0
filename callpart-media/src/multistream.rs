//! Multistream Opus decoding
//!
//! Group parts can pack one speaker slot per output channel across several
//! coded streams (mapping family 1 or 255). audiopus only wraps the single
//! stream decoder, so this drives libopus' multistream API through
//! `audiopus_sys`.

use crate::decoder::StreamParams;
use crate::error::{MediaError, MediaResult};
use audiopus_sys as ffi;
use std::ffi::CStr;
use std::os::raw::c_int;
use std::ptr::NonNull;

const CODEC: &str = "Opus multistream";

fn opus_error(code: c_int) -> String {
    // SAFETY: opus_strerror returns a static NUL-terminated string for any code.
    let message = unsafe { CStr::from_ptr(ffi::opus_strerror(code)) };
    format!("{} ({})", message.to_string_lossy(), code)
}

/// Owned libopus multistream decoder
pub(crate) struct MultistreamDecoder {
    raw: NonNull<ffi::OpusMSDecoder>,
    channels: usize,
}

// SAFETY: the decoder state has no thread affinity and is only reachable
// through `&mut self`.
unsafe impl Send for MultistreamDecoder {}

impl MultistreamDecoder {
    pub(crate) fn new(params: &StreamParams) -> MediaResult<Self> {
        let layout = &params.layout;
        let supported_rate = matches!(params.sample_rate, 8000 | 12000 | 16000 | 24000 | 48000);
        let channels = params.channels as usize;
        if !supported_rate || channels == 0 || layout.mapping.len() != channels {
            return Err(MediaError::UnsupportedChannelLayout {
                channels: params.channels,
                sample_rate: params.sample_rate,
            });
        }

        let mut error: c_int = 0;
        // SAFETY: `mapping` holds exactly `channels` entries, which is all
        // libopus reads from it.
        let raw = unsafe {
            ffi::opus_multistream_decoder_create(
                params.sample_rate as _,
                params.channels as _,
                layout.streams as _,
                layout.coupled_streams as _,
                layout.mapping.as_ptr(),
                &mut error,
            )
        };

        match NonNull::new(raw) {
            Some(raw) if error == 0 => Ok(Self { raw, channels }),
            raw => {
                if let Some(raw) = raw {
                    // SAFETY: created above and never handed out.
                    unsafe { ffi::opus_multistream_decoder_destroy(raw.as_ptr()) };
                }
                Err(MediaError::CodecInitializationFailed {
                    codec: CODEC.to_string(),
                    reason: opus_error(error),
                })
            }
        }
    }

    /// Decode one packet into `pcm`, returning samples per channel
    pub(crate) fn decode(&mut self, packet: &[u8], pcm: &mut [i16]) -> MediaResult<usize> {
        let frame_size = pcm.len() / self.channels;
        let len = i32::try_from(packet.len()).map_err(|_| MediaError::DecodingFailed {
            codec: CODEC.to_string(),
            reason: format!("packet of {} bytes", packet.len()),
        })?;

        // SAFETY: `packet` is valid for `len` bytes and `pcm` has room for
        // `frame_size * channels` interleaved samples.
        let decoded = unsafe {
            ffi::opus_multistream_decode(
                self.raw.as_ptr(),
                packet.as_ptr(),
                len,
                pcm.as_mut_ptr(),
                frame_size as _,
                0,
            )
        };

        if decoded < 0 {
            return Err(MediaError::DecodingFailed {
                codec: CODEC.to_string(),
                reason: opus_error(decoded),
            });
        }
        Ok(decoded as usize)
    }
}

impl Drop for MultistreamDecoder {
    fn drop(&mut self) {
        // SAFETY: `raw` came from opus_multistream_decoder_create and is
        // destroyed exactly once.
        unsafe { ffi::opus_multistream_decoder_destroy(self.raw.as_ptr()) };
    }
}
