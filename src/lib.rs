//! # VBAN Stream
//!
//! VBAN audio streaming over UDP: raw PCM16 or Opus-compressed frames tagged
//! with a stream identity and a sequence counter, plus a minimal text/serial
//! subprotocol for out-of-band messages.
//!
//! ## Architecture Overview
//!
//! ```text
//!   SENDER                                        RECEIVER
//!   ┌────────────┐                                ┌────────────┐
//!   │ AudioSource│ (cpal capture)                 │  AudioSink │ (cpal playback)
//!   └─────┬──────┘                                └─────▲──────┘
//!         │ PCM16 chunks                                │ PCM16
//!   ┌─────▼──────┐    silence gate / Opus        ┌──────┴─────┐
//!   │ SendSession│──────────────────────────────▶│ReceiveSessn│
//!   └─────┬──────┘  28-byte header + payload     └──────▲─────┘
//!         │                                             │ name filter,
//!   ┌─────▼──────┐         UDP datagrams         ┌──────┴─────┐ format drift
//!   │ UdpChannel │ ─────────────────────────────▶│ UdpChannel │
//!   └────────────┘                               └────────────┘
//! ```
//!
//! The sessions own their format state and audio endpoint exclusively and run
//! one blocking cycle at a time; sender and receiver can run concurrently
//! since they share nothing.

pub mod audio;
pub mod codec;
pub mod config;
pub mod error;
pub mod network;
pub mod protocol;
pub mod session;

pub use error::{Error, Result};

/// Crate-wide constants
pub mod constants {
    use std::time::Duration;

    /// Default sample rate for audio processing
    pub const DEFAULT_SAMPLE_RATE: u32 = 48000;

    /// Default channel count (stereo)
    pub const DEFAULT_CHANNELS: u16 = 2;

    /// Default samples per channel per frame on the raw PCM path
    pub const DEFAULT_CHUNK_SIZE: usize = 256;

    /// Default capture chunk on the Opus path: one 10 ms frame at 48 kHz
    pub const OPUS_CHUNK_SIZE: usize = 480;

    /// Default VBAN UDP port
    pub const DEFAULT_VBAN_PORT: u16 = 6980;

    /// Receive buffer size; VBAN datagrams top out at 1436 bytes
    pub const RECV_BUFFER_SIZE: usize = 2048;

    /// Exactly-silent frames are suppressed after this much silence
    pub const SILENCE_TIMEOUT: Duration = Duration::from_secs(60);
}
