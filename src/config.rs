//! TOML configuration for the sender and receiver binaries
//!
//! The core sessions take their parameters directly; these structs only exist
//! so the binaries can be driven from a file instead of flags.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;

use crate::constants::{
    DEFAULT_CHANNELS, DEFAULT_CHUNK_SIZE, DEFAULT_SAMPLE_RATE, DEFAULT_VBAN_PORT, OPUS_CHUNK_SIZE,
};
use crate::error::{Error, Result};

/// Sender binary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SenderConfig {
    /// Destination address of the receiver.
    pub target: SocketAddr,
    pub stream_name: String,
    pub sample_rate: u32,
    pub channels: u16,
    /// Samples per channel captured per cycle; ignored when `opus` is set.
    pub chunk_size: usize,
    /// Compress with Opus instead of raw PCM16.
    pub opus: bool,
    pub verbose: bool,
}

impl Default for SenderConfig {
    fn default() -> Self {
        Self {
            target: SocketAddr::from(([127, 0, 0, 1], DEFAULT_VBAN_PORT)),
            stream_name: "Stream1".to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            chunk_size: DEFAULT_CHUNK_SIZE,
            opus: false,
            verbose: false,
        }
    }
}

/// Receiver binary configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReceiverConfig {
    /// Local address to listen on.
    pub bind: SocketAddr,
    pub stream_name: String,
    /// Initial sink format; renegotiated from the stream afterwards.
    pub sample_rate: u32,
    pub channels: u16,
    /// Attach an Opus decoder for compressed streams.
    pub opus: bool,
    pub verbose: bool,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind: SocketAddr::from(([0, 0, 0, 0], DEFAULT_VBAN_PORT)),
            stream_name: "Stream1".to_string(),
            sample_rate: DEFAULT_SAMPLE_RATE,
            channels: DEFAULT_CHANNELS,
            opus: true,
            verbose: false,
        }
    }
}

impl SenderConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load(path)
    }

    /// Effective chunk size for the configured codec.
    pub fn effective_chunk_size(&self) -> usize {
        if self.opus {
            OPUS_CHUNK_SIZE
        } else {
            self.chunk_size
        }
    }
}

impl ReceiverConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load(path)
    }
}

fn load<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    let text = std::fs::read_to_string(&path)?;
    toml::from_str(&text).map_err(|e| Error::Config(e.to_string()))
}
