//! Send session: PCM in, datagrams out
//!
//! Pulls fixed-size chunks from the audio source, frames them under the
//! session's stream identity, and transmits them. Exactly-silent chunks stop
//! being transmitted once the stream has been silent for the suppression
//! timeout; frames keep flowing during the first 60 s of silence so a
//! receiver joining mid-silence can still learn the format.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::{BufMut, BytesMut};

use crate::audio::AudioSource;
use crate::codec::OpusEncoder;
use crate::constants::{DEFAULT_CHUNK_SIZE, SILENCE_TIMEOUT};
use crate::error::{ProtocolError, Result};
use crate::network::DatagramChannel;
use crate::protocol::{
    sample_rate_index, VbanHeader, FORMAT_OPUS, FORMAT_PCM16, STREAM_NAME_SIZE, VBAN_HEADER_SIZE,
};

/// Root-mean-square energy of 16-bit little-endian PCM.
///
/// Integer accumulation throughout: exact zero gates the suppression policy,
/// so no floating-point rounding may creep in. RMS values below one quantize
/// to zero, so a chunk that is almost-but-not-quite silent counts as silent.
pub fn pcm16_rms(pcm: &[u8]) -> u64 {
    let mut sum: u64 = 0;
    let mut count: u64 = 0;
    for pair in pcm.chunks_exact(2) {
        let sample = i16::from_le_bytes([pair[0], pair[1]]) as i64;
        sum += (sample * sample) as u64;
        count += 1;
    }
    if count == 0 {
        return 0;
    }
    isqrt(sum / count)
}

fn isqrt(n: u64) -> u64 {
    if n == 0 {
        return 0;
    }
    let mut x = n;
    let mut y = x / 2 + 1;
    while y < x {
        x = y;
        y = (x + n / x) / 2;
    }
    x
}

/// Silence-suppression state: the instant of the last non-silent chunk.
struct SilenceGate {
    last_non_silent: Instant,
    timeout: Duration,
}

impl SilenceGate {
    fn new(timeout: Duration) -> Self {
        Self {
            last_non_silent: Instant::now(),
            timeout,
        }
    }

    /// Record the chunk's energy and decide whether it may be dropped.
    /// Returns true only for exactly-silent chunks past the timeout.
    fn observe(&mut self, energy: u64, now: Instant) -> bool {
        if energy > 0 {
            self.last_non_silent = now;
            return false;
        }
        now.duration_since(self.last_non_silent) > self.timeout
    }

    #[cfg(test)]
    fn backdate(&mut self, by: Duration) {
        self.last_non_silent -= by;
    }
}

/// Sending end of one VBAN audio stream
pub struct SendSession<S: AudioSource, C: DatagramChannel> {
    channel: C,
    source: S,
    stream_name: String,
    sample_rate: u32,
    channels: u16,
    /// Samples per channel pulled from the source each cycle.
    chunk_size: usize,
    frame_counter: u32,
    encoder: Option<OpusEncoder>,
    silence: SilenceGate,
    running: Arc<AtomicBool>,
    verbose: bool,
}

impl<S: AudioSource, C: DatagramChannel> SendSession<S, C> {
    /// Create a PCM16 send session. Fails if the sample rate is not in the
    /// protocol catalogue or the stream name exceeds 16 bytes.
    pub fn new(
        channel: C,
        source: S,
        stream_name: impl Into<String>,
        sample_rate: u32,
        channels: u16,
    ) -> Result<Self> {
        let stream_name = stream_name.into();
        if stream_name.len() > STREAM_NAME_SIZE {
            return Err(ProtocolError::StreamNameTooLong(stream_name.len()).into());
        }
        sample_rate_index(sample_rate)?;

        Ok(Self {
            channel,
            source,
            stream_name,
            sample_rate,
            channels,
            chunk_size: DEFAULT_CHUNK_SIZE,
            frame_counter: 0,
            encoder: None,
            silence: SilenceGate::new(SILENCE_TIMEOUT),
            running: Arc::new(AtomicBool::new(true)),
            verbose: false,
        })
    }

    /// Switch the payload to Opus. `chunk_size` becomes the source chunk and
    /// should be a multiple of the encoder frame (480 = 10 ms at 48 kHz); the
    /// encoder buffers sub-frame remainders across cycles.
    pub fn enable_opus(&mut self, encoder: OpusEncoder, chunk_size: usize) {
        self.chunk_size = chunk_size;
        self.encoder = Some(encoder);
    }

    /// Override the per-cycle chunk size on the raw PCM path.
    ///
    /// Chunks above 256 samples still go out, but the header's sample count
    /// clamps at the wire maximum of 256.
    pub fn set_chunk_size(&mut self, frames: usize) {
        self.chunk_size = frames;
    }

    /// Log one line per transmitted frame.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Cooperative stop flag.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Frames produced so far, including suppressed ones.
    pub fn frame_counter(&self) -> u32 {
        self.frame_counter
    }

    /// Capture and transmit until stopped or the source fails. The source is
    /// released on the way out.
    pub fn run(&mut self) -> Result<()> {
        let result = loop {
            if !self.running.load(Ordering::SeqCst) {
                break Ok(());
            }
            if let Err(e) = self.run_once() {
                break Err(e);
            }
        };
        self.source.close();
        result
    }

    /// One capture/transmit cycle. The counter advances even for suppressed
    /// cycles, so counter gaps stay meaningful to a gap-detecting receiver.
    pub fn run_once(&mut self) -> Result<()> {
        self.frame_counter = self.frame_counter.wrapping_add(1);

        let pcm = self.source.read(self.chunk_size)?;

        let energy = pcm16_rms(&pcm);
        if self.silence.observe(energy, Instant::now()) {
            return Ok(());
        }

        let format = if self.encoder.is_some() {
            FORMAT_OPUS
        } else {
            FORMAT_PCM16
        };
        let mut header = VbanHeader::audio(
            &self.stream_name,
            self.sample_rate,
            self.chunk_size.min(u16::MAX as usize) as u16,
            self.channels,
            format,
        )?;
        header.frame_counter = self.frame_counter;

        let mut frame = BytesMut::with_capacity(VBAN_HEADER_SIZE + pcm.len());
        frame.put_slice(&header.encode()?);
        match &mut self.encoder {
            Some(encoder) => match encoder.encode(&pcm) {
                Ok(packets) => {
                    for packet in packets {
                        frame.put_slice(&packet);
                    }
                }
                Err(e) => {
                    tracing::warn!("codec encode failed, frame dropped: {}", e);
                    return Ok(());
                }
            },
            None => frame.put_slice(&pcm),
        }

        // Never transmit a header-only datagram: while the encoder is still
        // buffering there is no payload to carry.
        if frame.len() <= VBAN_HEADER_SIZE {
            return Ok(());
        }

        match self.channel.send(&frame) {
            Ok(_) => {
                if self.verbose {
                    tracing::debug!(
                        stream = %self.stream_name,
                        rate = self.sample_rate,
                        channels = self.channels,
                        format = format,
                        frame = self.frame_counter,
                        size = frame.len(),
                        "frame transmitted"
                    );
                }
            }
            Err(e) => {
                // Transient transmit failure: the frame is dropped, the
                // session keeps going.
                tracing::warn!("datagram send failed, frame dropped: {}", e);
            }
        }
        Ok(())
    }

    #[cfg(test)]
    fn backdate_silence(&mut self, by: Duration) {
        self.silence.backdate(by);
    }
}
