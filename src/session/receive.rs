//! Receive session: datagrams in, PCM out
//!
//! Matches incoming VBAN audio frames against a configured stream name,
//! follows mid-session format changes by reconfiguring the sink, and renders
//! the payload (raw PCM16 or Opus) to the audio sink.
//!
//! Protocol noise is absorbed: malformed headers, foreign streams, other
//! subprotocols and codec decode failures drop the datagram and keep the
//! session alive. Sink failures end the session.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use bytes::Bytes;

use crate::audio::AudioSink;
use crate::codec::OpusDecoder;
use crate::constants::RECV_BUFFER_SIZE;
use crate::error::Result;
use crate::network::DatagramChannel;
use crate::protocol::{SubProtocol, VbanHeader, FORMAT_OPUS, VBAN_HEADER_SIZE};
use crate::session::StreamFormat;

/// Receiving end of one VBAN audio stream
pub struct ReceiveSession<S: AudioSink, C: DatagramChannel> {
    channel: C,
    sink: S,
    stream_name: String,
    format: StreamFormat,
    decoder: Option<OpusDecoder>,
    running: Arc<AtomicBool>,
    verbose: bool,
    recv_buf: Vec<u8>,
    sink_closed: bool,
}

impl<S: AudioSink, C: DatagramChannel> ReceiveSession<S, C> {
    /// Create a session rendering `stream_name` to `sink`, which must already
    /// be open with `format`.
    pub fn new(channel: C, sink: S, stream_name: impl Into<String>, format: StreamFormat) -> Self {
        Self {
            channel,
            sink,
            stream_name: stream_name.into(),
            format,
            decoder: None,
            running: Arc::new(AtomicBool::new(true)),
            verbose: false,
            recv_buf: vec![0u8; RECV_BUFFER_SIZE],
            sink_closed: false,
        }
    }

    /// Attach an Opus decoder for frames tagged with the user-defined codec.
    /// Without one, Opus frames are dropped.
    pub fn set_decoder(&mut self, decoder: OpusDecoder) {
        self.decoder = Some(decoder);
    }

    /// Log one line per accepted frame.
    pub fn set_verbose(&mut self, verbose: bool) {
        self.verbose = verbose;
    }

    /// Cooperative stop flag; clearing it stops the loop at the next cycle
    /// boundary.
    pub fn running_flag(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }

    /// Currently negotiated format.
    pub fn format(&self) -> StreamFormat {
        self.format
    }

    /// Process datagrams until the running flag clears or a fatal sink error
    /// occurs. The sink is released exactly once on the way out.
    pub fn run(&mut self) -> Result<()> {
        let result = loop {
            if !self.running.load(Ordering::SeqCst) {
                break Ok(());
            }
            if let Err(e) = self.run_once() {
                break Err(e);
            }
        };
        self.close_sink();
        result
    }

    /// One receive cycle. Non-fatal drops return `Ok`.
    pub fn run_once(&mut self) -> Result<()> {
        let (len, peer) = match self.channel.recv_from(&mut self.recv_buf) {
            Ok(received) => received,
            Err(e)
                if e.kind() == std::io::ErrorKind::WouldBlock
                    || e.kind() == std::io::ErrorKind::TimedOut =>
            {
                // Timeout poll so a stop request can take effect.
                return Ok(());
            }
            Err(e) => {
                tracing::warn!("datagram receive failed: {}", e);
                return Ok(());
            }
        };

        let header = match VbanHeader::decode(&self.recv_buf[..len]) {
            Ok(header) => header,
            Err(e) => {
                tracing::trace!("dropping datagram: {}", e);
                return Ok(());
            }
        };

        if header.subprotocol != SubProtocol::Audio {
            return Ok(());
        }

        let sample_rate = match header.sample_rate() {
            Ok(rate) => rate,
            Err(e) => {
                tracing::trace!("dropping datagram: {}", e);
                return Ok(());
            }
        };

        // Identity filter, not an error: other streams share the port.
        if header.stream_name != self.stream_name {
            return Ok(());
        }

        if header.channels != self.format.channels || sample_rate != self.format.sample_rate {
            tracing::info!(
                "stream format changed: {} ch @ {} Hz -> {} ch @ {} Hz",
                self.format.channels,
                self.format.sample_rate,
                header.channels,
                sample_rate
            );
            self.sink.reconfigure(header.channels, sample_rate)?;
            if let Some(decoder) = &mut self.decoder {
                if let Err(e) = decoder.set_sampling_frequency(sample_rate) {
                    tracing::error!("decoder rate reset failed: {}", e);
                }
            }
        }
        self.format = StreamFormat {
            sample_rate,
            channels: header.channels,
            format: header.format,
        };

        let payload = &self.recv_buf[VBAN_HEADER_SIZE..len];
        let pcm: Bytes = if header.format == FORMAT_OPUS {
            match &mut self.decoder {
                Some(decoder) => match decoder.decode(payload) {
                    Ok(pcm) => pcm,
                    Err(e) => {
                        tracing::warn!("codec decode failed, frame dropped: {}", e);
                        return Ok(());
                    }
                },
                None => {
                    tracing::warn!("Opus frame on a PCM-only session, frame dropped");
                    return Ok(());
                }
            }
        } else {
            Bytes::copy_from_slice(payload)
        };

        self.sink.write(&pcm)?;

        if self.verbose {
            tracing::debug!(
                stream = %header.stream_name,
                rate = sample_rate,
                channels = header.channels,
                format = header.format,
                frame = header.frame_counter,
                size = len,
                peer = %peer,
                "frame rendered"
            );
        }
        Ok(())
    }

    fn close_sink(&mut self) {
        if !self.sink_closed {
            self.sink.close();
            self.sink_closed = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{AudioError, Error};
    use crate::protocol::FORMAT_PCM16;
    use crate::session::testing::{MockChannel, MockSink};

    fn audio_frame(name: &str, rate: u32, channels: u16, format: u8, payload: &[u8]) -> Vec<u8> {
        let header = VbanHeader::audio(name, rate, 256, channels, format).unwrap();
        let mut frame = header.encode().unwrap().to_vec();
        frame.extend_from_slice(payload);
        frame
    }

    fn session(
        channel: &MockChannel,
        sink: &MockSink,
    ) -> ReceiveSession<MockSink, MockChannel> {
        ReceiveSession::new(
            channel.clone(),
            sink.clone(),
            "Stream1",
            StreamFormat::pcm(48000, 2),
        )
    }

    #[test]
    fn test_payload_reaches_sink() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        let mut session = session(&channel, &sink);

        let payload = [1u8, 2, 3, 4];
        channel.push_datagram(audio_frame("Stream1", 48000, 2, FORMAT_PCM16, &payload));
        session.run_once().unwrap();

        let state = sink.0.borrow();
        assert_eq!(state.writes, vec![payload.to_vec()]);
        assert!(state.reconfigures.is_empty());
    }

    #[test]
    fn test_foreign_stream_is_discarded() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        let mut session = session(&channel, &sink);

        // Different name, and a different format that must not be adopted.
        channel.push_datagram(audio_frame("Other1", 44100, 1, FORMAT_PCM16, &[0u8; 8]));
        session.run_once().unwrap();

        assert_eq!(session.format(), StreamFormat::pcm(48000, 2));
        let state = sink.0.borrow();
        assert!(state.writes.is_empty());
        assert!(state.reconfigures.is_empty());
    }

    #[test]
    fn test_malformed_datagrams_are_nonfatal() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        let mut session = session(&channel, &sink);

        channel.push_datagram(vec![0u8; 10]); // truncated
        channel.push_datagram(b"JUNKJUNKJUNKJUNKJUNKJUNKJUNKJUNK".to_vec()); // bad magic
        session.run_once().unwrap();
        session.run_once().unwrap();

        assert!(sink.0.borrow().writes.is_empty());
    }

    #[test]
    fn test_text_subprotocol_is_ignored() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        let mut session = session(&channel, &sink);

        let mut frame = VbanHeader::text("Stream1", 9600).unwrap().encode().unwrap().to_vec();
        frame.extend_from_slice(b"hello");
        channel.push_datagram(frame);
        session.run_once().unwrap();

        assert!(sink.0.borrow().writes.is_empty());
    }

    #[test]
    fn test_format_change_reconfigures_once() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        let mut session = session(&channel, &sink);

        channel.push_datagram(audio_frame("Stream1", 44100, 1, FORMAT_PCM16, &[0u8; 8]));
        channel.push_datagram(audio_frame("Stream1", 44100, 1, FORMAT_PCM16, &[0u8; 8]));
        session.run_once().unwrap();
        session.run_once().unwrap();

        let state = sink.0.borrow();
        assert_eq!(state.reconfigures, vec![(1, 44100)]);
        assert_eq!(state.writes.len(), 2);
        assert_eq!(session.format().sample_rate, 44100);
        assert_eq!(session.format().channels, 1);
    }

    #[test]
    fn test_matching_format_never_reconfigures() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        let mut session = session(&channel, &sink);

        for _ in 0..3 {
            channel.push_datagram(audio_frame("Stream1", 48000, 2, FORMAT_PCM16, &[0u8; 8]));
        }
        for _ in 0..3 {
            session.run_once().unwrap();
        }

        assert!(sink.0.borrow().reconfigures.is_empty());
    }

    #[test]
    fn test_reconfigure_failure_is_fatal() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        sink.0.borrow_mut().fail_reconfigure = true;
        let mut session = session(&channel, &sink);

        channel.push_datagram(audio_frame("Stream1", 44100, 2, FORMAT_PCM16, &[0u8; 8]));
        let result = session.run_once();
        assert!(matches!(
            result,
            Err(Error::Audio(AudioError::SinkReconfigurationFailed(_)))
        ));
    }

    #[test]
    fn test_write_failure_is_fatal() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        sink.0.borrow_mut().fail_write = true;
        let mut session = session(&channel, &sink);

        channel.push_datagram(audio_frame("Stream1", 48000, 2, FORMAT_PCM16, &[0u8; 8]));
        let result = session.run_once();
        assert!(matches!(
            result,
            Err(Error::Audio(AudioError::SinkWriteFailed(_)))
        ));
    }

    #[test]
    fn test_opus_frame_without_decoder_is_dropped() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        let mut session = session(&channel, &sink);

        channel.push_datagram(audio_frame("Stream1", 48000, 2, FORMAT_OPUS, &[0u8; 8]));
        session.run_once().unwrap();

        assert!(sink.0.borrow().writes.is_empty());
    }

    #[test]
    fn test_undefined_rate_index_is_dropped() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        let mut session = session(&channel, &sink);

        let mut frame = audio_frame("Stream1", 48000, 2, FORMAT_PCM16, &[0u8; 8]);
        frame[4] = 0x15; // audio subprotocol, index 21: encodable but undefined
        channel.push_datagram(frame);
        session.run_once().unwrap();

        assert!(sink.0.borrow().writes.is_empty());
        assert_eq!(session.format(), StreamFormat::pcm(48000, 2));
    }

    #[test]
    fn test_stop_closes_sink_exactly_once() {
        let channel = MockChannel::default();
        let sink = MockSink::default();
        let mut session = session(&channel, &sink);

        session.running_flag().store(false, Ordering::SeqCst);
        session.run().unwrap();
        session.run().unwrap();

        assert_eq!(sink.0.borrow().closes, 1);
    }
}
