//! Opus encoder wrapper
//!
//! Buffered encoder for the VBAN Opus path. Input is 16-bit little-endian
//! PCM; the encoder accumulates samples until a whole Opus frame is available
//! and emits zero or more encoded packets per call.

use bytes::Bytes;
use opus::{Application, Channels, Encoder};

use crate::error::CodecError;

/// Maximum encoded Opus packet size (the spec ceiling is 1275 bytes).
const MAX_PACKET_BYTES: usize = 1500;

/// Opus encoder with internal sub-frame buffering
pub struct OpusEncoder {
    encoder: Encoder,
    sample_rate: u32,
    channels: u16,
    /// Frame size in samples per channel (default 480 = 10 ms at 48 kHz).
    frame_size: usize,
    /// Pending interleaved samples, less than one frame.
    pending: Vec<i16>,
    /// Encoding buffer (reused to avoid allocations)
    encode_buffer: Vec<u8>,
    frames_encoded: u64,
    bytes_produced: u64,
}

impl OpusEncoder {
    /// Create an encoder. `frame_size` is in samples per channel and must be
    /// a valid Opus frame duration for the sample rate (2.5/5/10/20/40/60 ms).
    pub fn new(sample_rate: u32, channels: u16, frame_size: usize) -> Result<Self, CodecError> {
        let opus_channels = match channels {
            1 => Channels::Mono,
            2 => Channels::Stereo,
            _ => {
                return Err(CodecError::EncoderInit(format!(
                    "Unsupported channel count: {}",
                    channels
                )))
            }
        };

        let encoder = Encoder::new(sample_rate, opus_channels, Application::Audio)
            .map_err(|e| CodecError::EncoderInit(e.to_string()))?;

        Ok(Self {
            encoder,
            sample_rate,
            channels,
            frame_size,
            pending: Vec::with_capacity(frame_size * channels as usize),
            encode_buffer: vec![0u8; MAX_PACKET_BYTES],
            frames_encoded: 0,
            bytes_produced: 0,
        })
    }

    /// Encode a chunk of 16-bit little-endian PCM.
    ///
    /// The chunk may be smaller or larger than one Opus frame: samples are
    /// buffered and one packet is emitted per complete frame, so a call can
    /// return no packets (still buffering) or several.
    pub fn encode(&mut self, pcm: &[u8]) -> Result<Vec<Bytes>, CodecError> {
        if pcm.len() % 2 != 0 {
            return Err(CodecError::InvalidFrameSize(pcm.len()));
        }
        self.pending.extend(
            pcm.chunks_exact(2)
                .map(|pair| i16::from_le_bytes([pair[0], pair[1]])),
        );

        let samples_per_frame = self.frame_size * self.channels as usize;
        let mut packets = Vec::new();
        while self.pending.len() >= samples_per_frame {
            let frame: Vec<i16> = self.pending.drain(..samples_per_frame).collect();
            let size = self
                .encoder
                .encode(&frame, &mut self.encode_buffer)
                .map_err(|e| CodecError::EncodingFailed(e.to_string()))?;

            self.frames_encoded += 1;
            self.bytes_produced += size as u64;
            packets.push(Bytes::copy_from_slice(&self.encode_buffer[..size]));
        }
        Ok(packets)
    }

    /// Get frame size in samples (per channel)
    pub fn frame_size(&self) -> usize {
        self.frame_size
    }

    /// Get sample rate
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Get channel count
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Get statistics
    pub fn stats(&self) -> EncoderStats {
        EncoderStats {
            frames_encoded: self.frames_encoded,
            bytes_produced: self.bytes_produced,
        }
    }
}

/// Encoder statistics
#[derive(Debug, Clone)]
pub struct EncoderStats {
    pub frames_encoded: u64,
    pub bytes_produced: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pcm16(samples: &[i16]) -> Vec<u8> {
        samples.iter().flat_map(|s| s.to_le_bytes()).collect()
    }

    #[test]
    fn test_encoder_creation() {
        let encoder = OpusEncoder::new(48000, 2, 480);
        assert!(encoder.is_ok());
        assert!(OpusEncoder::new(48000, 3, 480).is_err());
    }

    #[test]
    fn test_sub_frame_input_buffers() {
        let mut encoder = OpusEncoder::new(48000, 2, 480).unwrap();

        // 256 samples/channel is less than one 480-sample frame: no output yet.
        let chunk = pcm16(&vec![0i16; 256 * 2]);
        let packets = encoder.encode(&chunk).unwrap();
        assert!(packets.is_empty());

        // A second chunk crosses the frame boundary and flushes one packet.
        let packets = encoder.encode(&chunk).unwrap();
        assert_eq!(packets.len(), 1);
        assert!(!packets[0].is_empty());
    }

    #[test]
    fn test_exact_frame_emits_one_packet() {
        let mut encoder = OpusEncoder::new(48000, 2, 480).unwrap();
        let chunk = pcm16(&vec![0i16; 480 * 2]);
        let packets = encoder.encode(&chunk).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(encoder.stats().frames_encoded, 1);
    }

    #[test]
    fn test_odd_byte_length_rejected() {
        let mut encoder = OpusEncoder::new(48000, 2, 480).unwrap();
        assert!(matches!(
            encoder.encode(&[0u8; 3]),
            Err(CodecError::InvalidFrameSize(3))
        ));
    }
}
