//! Audio sink/source abstraction
//!
//! Sessions own their audio endpoint exclusively and talk to it through these
//! traits; the cpal implementations live in [`capture`] and [`playback`].
//! PCM is always 16-bit little-endian interleaved.

pub mod capture;
pub mod playback;

use bytes::Bytes;

use crate::error::AudioError;

pub use capture::CpalSource;
pub use playback::CpalSink;

/// Playback endpoint. Must support reopening with new parameters.
pub trait AudioSink {
    /// Reopen the sink with a new channel count and sample rate. On failure
    /// the previous configuration stays usable where the backend permits.
    fn reconfigure(&mut self, channels: u16, sample_rate: u32) -> Result<(), AudioError>;

    /// Render one chunk of PCM. Blocks when the device buffer is full.
    fn write(&mut self, pcm: &[u8]) -> Result<(), AudioError>;

    /// Release the device. Idempotent.
    fn close(&mut self);
}

/// Capture endpoint.
pub trait AudioSource {
    /// Block until `frames` samples per channel have been captured and return
    /// them as interleaved PCM bytes.
    fn read(&mut self, frames: usize) -> Result<Bytes, AudioError>;

    /// Release the device. Idempotent.
    fn close(&mut self);
}

/// Default input device of the default host.
pub(crate) fn default_input_device() -> Result<cpal::Device, AudioError> {
    use cpal::traits::HostTrait;
    cpal::default_host()
        .default_input_device()
        .ok_or_else(|| AudioError::DeviceNotFound("no default input device".to_string()))
}

/// Default output device of the default host.
pub(crate) fn default_output_device() -> Result<cpal::Device, AudioError> {
    use cpal::traits::HostTrait;
    cpal::default_host()
        .default_output_device()
        .ok_or_else(|| AudioError::DeviceNotFound("no default output device".to_string()))
}
