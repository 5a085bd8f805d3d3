//! Error types for the VBAN streaming crate

use thiserror::Error;

/// Main error type for the crate
#[derive(Error, Debug)]
pub enum Error {
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("Codec error: {0}")]
    Codec(#[from] CodecError),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Wire-protocol errors
///
/// `MalformedHeader` is always non-fatal: the offending datagram is dropped
/// and the session continues. The rate/name errors are fatal at configuration
/// time and non-fatal when a peer sends them mid-stream.
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("malformed header: {0}")]
    MalformedHeader(&'static str),

    #[error("unsupported sample rate: {0} Hz")]
    UnsupportedSampleRate(u32),

    #[error("unsupported baud rate: {0} bps")]
    UnsupportedBaudRate(u32),

    #[error("stream name too long: {0} bytes (max 16)")]
    StreamNameTooLong(usize),
}

/// Audio sink/source errors
///
/// Sink and source failures are fatal to the session that owns the device.
#[derive(Error, Debug)]
pub enum AudioError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open stream: {0}")]
    StreamError(String),

    #[error("Sink reconfiguration failed: {0}")]
    SinkReconfigurationFailed(String),

    #[error("Sink write failed: {0}")]
    SinkWriteFailed(String),

    #[error("Source read failed: {0}")]
    SourceReadFailed(String),
}

/// Codec errors: non-fatal mid-stream (frame dropped), fatal at init
#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Encoder initialization failed: {0}")]
    EncoderInit(String),

    #[error("Decoder initialization failed: {0}")]
    DecoderInit(String),

    #[error("Encoding failed: {0}")]
    EncodingFailed(String),

    #[error("Decoding failed: {0}")]
    DecodingFailed(String),

    #[error("Invalid frame size: {0}")]
    InvalidFrameSize(usize),
}

/// Network errors
#[derive(Error, Debug)]
pub enum NetworkError {
    #[error("Socket bind failed: {0}")]
    BindFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    ReceiveFailed(String),
}

/// Result type alias for the crate
pub type Result<T> = std::result::Result<T, Error>;
