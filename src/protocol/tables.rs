//! Protocol rate tables
//!
//! VBAN encodes sample rates and serial bit rates as indices into fixed
//! catalogues rather than carrying the rate itself on the wire.

use crate::error::ProtocolError;

/// Sample-rate catalogue (Hz), indexed by the low 5 bits of the SR byte.
///
/// The ordering is defined by the protocol and must not change: it interleaves
/// the 6 kHz, 8 kHz and 11.025 kHz families.
pub const SAMPLE_RATES: [u32; 21] = [
    6000, 12000, 24000, 48000, 96000, 192000, 384000, // 6 kHz family
    8000, 16000, 32000, 64000, 128000, 256000, 512000, // 8 kHz family
    11025, 22050, 44100, 88200, 176400, 352800, 705600, // 11.025 kHz family
];

/// Serial bit-rate catalogue (bps) for the text/serial subprotocol.
pub const BAUD_RATES: [u32; 25] = [
    0, 110, 150, 300, 600, 1200, 2400, 4800, 9600, 14400, 19200, 31250, 38400, 57600, 115200,
    128000, 230400, 250000, 256000, 460800, 921600, 1000000, 1500000, 2000000, 3000000,
];

/// Look up the wire index for a sample rate.
pub fn sample_rate_index(rate: u32) -> Result<u8, ProtocolError> {
    SAMPLE_RATES
        .iter()
        .position(|&r| r == rate)
        .map(|i| i as u8)
        .ok_or(ProtocolError::UnsupportedSampleRate(rate))
}

/// Resolve a wire index to a sample rate.
///
/// The 5-bit field can encode up to 31, but only 0..=20 are defined; anything
/// above that is a malformed header, not an out-of-bounds read.
pub fn sample_rate_at(index: u8) -> Result<u32, ProtocolError> {
    SAMPLE_RATES
        .get(index as usize)
        .copied()
        .ok_or(ProtocolError::MalformedHeader("sample-rate index out of range"))
}

/// Look up the wire index for a serial bit rate.
pub fn baud_rate_index(rate: u32) -> Result<u8, ProtocolError> {
    BAUD_RATES
        .iter()
        .position(|&r| r == rate)
        .map(|i| i as u8)
        .ok_or(ProtocolError::UnsupportedBaudRate(rate))
}
