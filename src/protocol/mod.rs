//! VBAN wire protocol: header codec and rate tables

pub mod header;
pub mod tables;

pub use header::{
    SubProtocol, VbanHeader, FORMAT_OPUS, FORMAT_PCM16, FORMAT_UTF8, STREAM_NAME_SIZE,
    VBAN_HEADER_SIZE, VBAN_MAGIC,
};
pub use tables::{baud_rate_index, sample_rate_at, sample_rate_index, BAUD_RATES, SAMPLE_RATES};
