//! VBAN wire header codec
//!
//! Every VBAN datagram starts with a fixed 28-byte header followed by the
//! payload. All multi-byte integers are little-endian. The header codec is
//! pure: it never looks at the payload and holds no state.

use crate::error::ProtocolError;
use crate::protocol::tables;

/// Frame identity tag; datagrams that do not start with it are discarded.
pub const VBAN_MAGIC: &[u8; 4] = b"VBAN";

/// Fixed header size; the payload is everything after this offset.
pub const VBAN_HEADER_SIZE: usize = 28;

/// Stream-name field width. Names are NUL-padded, compared up to the first NUL.
pub const STREAM_NAME_SIZE: usize = 16;

/// Format byte: PCM, 16-bit signed integer samples.
pub const FORMAT_PCM16: u8 = 0x01;

/// Format byte: user-defined codec slot carrying Opus packets, 16-bit class.
pub const FORMAT_OPUS: u8 = 0xF1;

/// Format byte for text frames: UTF-8 flag.
pub const FORMAT_UTF8: u8 = 0x10;

/// Subprotocol id, carried in the top 3 bits of the SR byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubProtocol {
    Audio,
    Serial,
    Txt,
    Service,
    /// Ids 4..=7 are reserved by the protocol; kept verbatim for round-trips.
    Reserved(u8),
}

impl SubProtocol {
    /// Decode from the 3-bit wire id.
    pub fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => SubProtocol::Audio,
            1 => SubProtocol::Serial,
            2 => SubProtocol::Txt,
            3 => SubProtocol::Service,
            other => SubProtocol::Reserved(other),
        }
    }

    /// The 3-bit wire id (unshifted).
    pub fn bits(self) -> u8 {
        match self {
            SubProtocol::Audio => 0,
            SubProtocol::Serial => 1,
            SubProtocol::Txt => 2,
            SubProtocol::Service => 3,
            SubProtocol::Reserved(other) => other & 0x07,
        }
    }
}

/// Structured view of the 28-byte VBAN header.
///
/// `rate_index` is the raw 5-bit index from the SR byte: a sample-rate index
/// for audio frames, a bit-rate index for serial/text frames. Resolution to Hz
/// happens in [`VbanHeader::sample_rate`] so that serial frames (whose indices
/// exceed the sample-rate table) still decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VbanHeader {
    pub subprotocol: SubProtocol,
    pub rate_index: u8,
    /// Samples per frame, 1..=256. Values above 256 are not encodable and
    /// clamp to 256 on the wire; a documented protocol limitation.
    pub samples_per_frame: u16,
    /// Channel count, 1..=256.
    pub channels: u16,
    /// Codec/data-format byte ([`FORMAT_PCM16`], [`FORMAT_OPUS`], ...).
    pub format: u8,
    /// Logical stream identity, at most 16 bytes.
    pub stream_name: String,
    /// Per-sender monotonic sequence number, wraps at 2^32.
    pub frame_counter: u32,
}

impl VbanHeader {
    /// Header for an audio frame. Fails if the sample rate is not in the
    /// protocol catalogue.
    pub fn audio(
        stream_name: &str,
        sample_rate: u32,
        samples_per_frame: u16,
        channels: u16,
        format: u8,
    ) -> Result<Self, ProtocolError> {
        Ok(Self {
            subprotocol: SubProtocol::Audio,
            rate_index: tables::sample_rate_index(sample_rate)?,
            samples_per_frame,
            channels,
            format,
            stream_name: stream_name.to_string(),
            frame_counter: 0,
        })
    }

    /// Header for a text frame on the serial/text subprotocol. Fails if the
    /// baud rate is not in the protocol catalogue.
    pub fn text(stream_name: &str, baud_rate: u32) -> Result<Self, ProtocolError> {
        Ok(Self {
            subprotocol: SubProtocol::Txt,
            rate_index: tables::baud_rate_index(baud_rate)?,
            samples_per_frame: 1,
            channels: 1,
            format: FORMAT_UTF8,
            stream_name: stream_name.to_string(),
            frame_counter: 0,
        })
    }

    /// Resolve the rate index against the sample-rate table.
    ///
    /// Indices 21..=31 are encodable but undefined and fail as malformed.
    pub fn sample_rate(&self) -> Result<u32, ProtocolError> {
        tables::sample_rate_at(self.rate_index)
    }

    /// Pack into the 28-byte wire representation.
    pub fn encode(&self) -> Result<[u8; VBAN_HEADER_SIZE], ProtocolError> {
        let name = self.stream_name.as_bytes();
        if name.len() > STREAM_NAME_SIZE {
            return Err(ProtocolError::StreamNameTooLong(name.len()));
        }

        let mut buf = [0u8; VBAN_HEADER_SIZE];
        buf[0..4].copy_from_slice(VBAN_MAGIC);
        buf[4] = (self.subprotocol.bits() << 5) | (self.rate_index & 0x1F);
        // Stored as n-1; sample counts above the encodable maximum clamp to 256.
        buf[5] = (self.samples_per_frame.clamp(1, 256) - 1) as u8;
        buf[6] = (self.channels.clamp(1, 256) - 1) as u8;
        buf[7] = self.format;
        buf[8..8 + name.len()].copy_from_slice(name);
        buf[24..28].copy_from_slice(&self.frame_counter.to_le_bytes());
        Ok(buf)
    }

    /// Parse the first 28 bytes of a datagram.
    pub fn decode(data: &[u8]) -> Result<Self, ProtocolError> {
        if data.len() < VBAN_HEADER_SIZE {
            return Err(ProtocolError::MalformedHeader("truncated datagram"));
        }
        if &data[0..4] != VBAN_MAGIC {
            return Err(ProtocolError::MalformedHeader("bad magic"));
        }

        let name_field = &data[8..8 + STREAM_NAME_SIZE];
        let name_len = name_field
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(STREAM_NAME_SIZE);
        let stream_name = std::str::from_utf8(&name_field[..name_len])
            .map_err(|_| ProtocolError::MalformedHeader("stream name is not UTF-8"))?
            .to_string();

        Ok(Self {
            subprotocol: SubProtocol::from_bits(data[4] >> 5),
            rate_index: data[4] & 0x1F,
            samples_per_frame: data[5] as u16 + 1,
            channels: data[6] as u16 + 1,
            format: data[7],
            stream_name,
            frame_counter: u32::from_le_bytes([data[24], data[25], data[26], data[27]]),
        })
    }
}
