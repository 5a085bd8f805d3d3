//! Opus codec wrapper
//!
//! 16-bit PCM only: this crate's Opus path matches the VBAN payload format
//! and does not support other bit depths.

pub mod decoder;
pub mod encoder;

pub use decoder::OpusDecoder;
pub use encoder::OpusEncoder;
