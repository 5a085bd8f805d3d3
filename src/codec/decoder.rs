//! Opus decoder wrapper
//!
//! Decodes Opus packets back to 16-bit little-endian PCM. The sampling
//! frequency can be reset mid-stream when the sender renegotiates the format.

use bytes::Bytes;
use opus::{Channels, Decoder};

use crate::error::CodecError;

/// Opus decoder wrapper
pub struct OpusDecoder {
    decoder: Decoder,
    sample_rate: u32,
    channels: u16,
    /// Decoding buffer (reused to avoid allocations), sized for the maximum
    /// 120 ms Opus frame.
    decode_buffer: Vec<i16>,
    frames_decoded: u64,
}

impl OpusDecoder {
    /// Create a new Opus decoder
    pub fn new(sample_rate: u32, channels: u16) -> Result<Self, CodecError> {
        let decoder = Self::build(sample_rate, channels)?;
        Ok(Self {
            decoder,
            sample_rate,
            channels,
            decode_buffer: vec![0i16; Self::buffer_len(sample_rate, channels)],
            frames_decoded: 0,
        })
    }

    fn build(sample_rate: u32, channels: u16) -> Result<Decoder, CodecError> {
        let opus_channels = match channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            _ => {
                return Err(CodecError::DecoderInit(format!(
                    "Unsupported channel count: {}",
                    channels
                )))
            }
        };
        Decoder::new(sample_rate, opus_channels).map_err(|e| CodecError::DecoderInit(e.to_string()))
    }

    fn buffer_len(sample_rate: u32, channels: u16) -> usize {
        (sample_rate as usize * channels as usize * 120) / 1000
    }

    /// Decode one Opus packet to interleaved 16-bit little-endian PCM.
    pub fn decode(&mut self, data: &[u8]) -> Result<Bytes, CodecError> {
        let samples = self
            .decoder
            .decode(data, &mut self.decode_buffer, false)
            .map_err(|e| CodecError::DecodingFailed(e.to_string()))?;

        let total_samples = samples * self.channels as usize;
        self.frames_decoded += 1;

        let mut pcm = Vec::with_capacity(total_samples * 2);
        for sample in &self.decode_buffer[..total_samples] {
            pcm.extend_from_slice(&sample.to_le_bytes());
        }
        Ok(Bytes::from(pcm))
    }

    /// Reset the sampling frequency after a mid-stream format change.
    ///
    /// Opus decoders are bound to their rate at creation, so this rebuilds the
    /// inner decoder; any codec state (and the packet in flight) is lost,
    /// which is acceptable at a format boundary.
    pub fn set_sampling_frequency(&mut self, sample_rate: u32) -> Result<(), CodecError> {
        if sample_rate == self.sample_rate {
            return Ok(());
        }
        self.decoder = Self::build(sample_rate, self.channels)?;
        self.sample_rate = sample_rate;
        self.decode_buffer = vec![0i16; Self::buffer_len(sample_rate, self.channels)];
        Ok(())
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Get frames decoded so far
    pub fn frames_decoded(&self) -> u64 {
        self.frames_decoded
    }
}
