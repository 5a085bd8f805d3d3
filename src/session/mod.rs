//! VBAN stream sessions
//!
//! One session per direction: [`ReceiveSession`] renders a matched stream to
//! an audio sink, [`SendSession`] broadcasts captured audio under its own
//! identity, [`TextSession`] sends out-of-band text on the serial subprotocol.
//! Each session exclusively owns its format state, counters and audio
//! endpoint; cycles never overlap within a session.

pub mod receive;
pub mod send;
pub mod text;

pub use receive::ReceiveSession;
pub use send::{pcm16_rms, SendSession};
pub use text::TextSession;

use crate::protocol::FORMAT_PCM16;

/// Negotiated stream format, owned by the receive session.
///
/// Tracks the format last advertised by accepted frames of the matched
/// stream; a `(channels, sample_rate)` divergence forces a sink
/// reconfiguration before the diverging payload is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    pub sample_rate: u32,
    pub channels: u16,
    /// Codec/data-format byte of the last accepted frame.
    pub format: u8,
}

impl StreamFormat {
    /// Plain PCM16 format, the usual starting point before the first frame.
    pub fn pcm(sample_rate: u32, channels: u16) -> Self {
        Self {
            sample_rate,
            channels,
            format: FORMAT_PCM16,
        }
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory stand-ins for the session collaborators.

    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::io;
    use std::net::SocketAddr;
    use std::rc::Rc;

    use bytes::{BufMut, Bytes, BytesMut};

    use crate::audio::{AudioSink, AudioSource};
    use crate::error::AudioError;
    use crate::network::DatagramChannel;

    #[derive(Default)]
    pub struct ChannelState {
        pub inbox: VecDeque<Vec<u8>>,
        pub sent: Vec<Vec<u8>>,
    }

    /// Datagram channel over in-memory queues.
    #[derive(Clone, Default)]
    pub struct MockChannel(pub Rc<RefCell<ChannelState>>);

    impl MockChannel {
        pub fn push_datagram(&self, data: Vec<u8>) {
            self.0.borrow_mut().inbox.push_back(data);
        }

        pub fn sent(&self) -> Vec<Vec<u8>> {
            self.0.borrow().sent.clone()
        }
    }

    impl DatagramChannel for MockChannel {
        fn recv_from(&self, buf: &mut [u8]) -> io::Result<(usize, SocketAddr)> {
            match self.0.borrow_mut().inbox.pop_front() {
                Some(data) => {
                    buf[..data.len()].copy_from_slice(&data);
                    Ok((data.len(), "127.0.0.1:6980".parse().unwrap()))
                }
                None => Err(io::Error::new(io::ErrorKind::WouldBlock, "inbox empty")),
            }
        }

        fn send(&self, data: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().sent.push(data.to_vec());
            Ok(data.len())
        }
    }

    #[derive(Default)]
    pub struct SinkState {
        pub writes: Vec<Vec<u8>>,
        pub reconfigures: Vec<(u16, u32)>,
        pub closes: usize,
        pub fail_reconfigure: bool,
        pub fail_write: bool,
    }

    /// Audio sink recording every call.
    #[derive(Clone, Default)]
    pub struct MockSink(pub Rc<RefCell<SinkState>>);

    impl AudioSink for MockSink {
        fn reconfigure(&mut self, channels: u16, sample_rate: u32) -> Result<(), AudioError> {
            let mut state = self.0.borrow_mut();
            if state.fail_reconfigure {
                return Err(AudioError::SinkReconfigurationFailed(
                    "mock reconfigure failure".to_string(),
                ));
            }
            state.reconfigures.push((channels, sample_rate));
            Ok(())
        }

        fn write(&mut self, pcm: &[u8]) -> Result<(), AudioError> {
            let mut state = self.0.borrow_mut();
            if state.fail_write {
                return Err(AudioError::SinkWriteFailed("mock write failure".to_string()));
            }
            state.writes.push(pcm.to_vec());
            Ok(())
        }

        fn close(&mut self) {
            self.0.borrow_mut().closes += 1;
        }
    }

    /// Audio source yielding queued chunks, then silence.
    pub struct MockSource {
        pub channels: u16,
        pub queue: VecDeque<Vec<i16>>,
        pub fail: bool,
    }

    impl MockSource {
        pub fn silent(channels: u16) -> Self {
            Self {
                channels,
                queue: VecDeque::new(),
                fail: false,
            }
        }

        pub fn with_chunks(channels: u16, chunks: Vec<Vec<i16>>) -> Self {
            Self {
                channels,
                queue: chunks.into(),
                fail: false,
            }
        }
    }

    impl AudioSource for MockSource {
        fn read(&mut self, frames: usize) -> Result<Bytes, AudioError> {
            if self.fail {
                return Err(AudioError::SourceReadFailed("mock read failure".to_string()));
            }
            let samples = match self.queue.pop_front() {
                Some(chunk) => chunk,
                None => vec![0i16; frames * self.channels as usize],
            };
            let mut pcm = BytesMut::with_capacity(samples.len() * 2);
            for sample in samples {
                pcm.put_i16_le(sample);
            }
            Ok(pcm.freeze())
        }

        fn close(&mut self) {}
    }
}
