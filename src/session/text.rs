//! Text session: out-of-band messages on the serial/text subprotocol
//!
//! A stripped-down sender: no audio, no codec, just a baud-rate tag and a
//! UTF-8 payload appended verbatim after the header. The receiver treats the
//! remaining datagram bytes as the whole message; there is no length prefix.

use bytes::{BufMut, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::network::DatagramChannel;
use crate::protocol::{VbanHeader, STREAM_NAME_SIZE, VBAN_HEADER_SIZE};

/// Text sender for one stream identity
pub struct TextSession<C: DatagramChannel> {
    channel: C,
    header: VbanHeader,
}

impl<C: DatagramChannel> TextSession<C> {
    /// Create a text session. Fails if the baud rate is not in the protocol
    /// catalogue or the stream name exceeds 16 bytes.
    pub fn new(channel: C, stream_name: impl Into<String>, baud_rate: u32) -> Result<Self> {
        let stream_name = stream_name.into();
        if stream_name.len() > STREAM_NAME_SIZE {
            return Err(ProtocolError::StreamNameTooLong(stream_name.len()).into());
        }
        Ok(Self {
            channel,
            header: VbanHeader::text(&stream_name, baud_rate)?,
        })
    }

    /// Send one UTF-8 message. Transmission failure is reported and the
    /// session stays usable.
    pub fn send(&mut self, text: &str) -> Result<()> {
        self.header.frame_counter = self.header.frame_counter.wrapping_add(1);

        let mut frame = BytesMut::with_capacity(VBAN_HEADER_SIZE + text.len());
        frame.put_slice(&self.header.encode()?);
        frame.put_slice(text.as_bytes());

        if let Err(e) = self.channel.send(&frame) {
            tracing::warn!("text send failed, message dropped: {}", e);
        }
        Ok(())
    }

    /// Frames produced so far.
    pub fn frame_counter(&self) -> u32 {
        self.header.frame_counter
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::protocol::{SubProtocol, FORMAT_UTF8};
    use crate::session::testing::MockChannel;

    #[test]
    fn test_text_frame_layout() {
        let channel = MockChannel::default();
        let mut session = TextSession::new(channel.clone(), "Command1", 256000).unwrap();

        session.send("mute channel 3").unwrap();

        let sent = channel.sent();
        assert_eq!(sent.len(), 1);
        let frame = &sent[0];
        assert_eq!(&frame[VBAN_HEADER_SIZE..], b"mute channel 3");

        let header = VbanHeader::decode(frame).unwrap();
        assert_eq!(header.subprotocol, SubProtocol::Txt);
        assert_eq!(header.format, FORMAT_UTF8);
        assert_eq!(header.stream_name, "Command1");
        assert_eq!(header.frame_counter, 1);
        // Channel fields are zero on the wire for text frames.
        assert_eq!(frame[5], 0);
        assert_eq!(frame[6], 0);
    }

    #[test]
    fn test_counter_advances_per_message() {
        let channel = MockChannel::default();
        let mut session = TextSession::new(channel.clone(), "Command1", 9600).unwrap();
        session.send("a").unwrap();
        session.send("b").unwrap();
        assert_eq!(session.frame_counter(), 2);
        assert_eq!(
            VbanHeader::decode(&channel.sent()[1]).unwrap().frame_counter,
            2
        );
    }

    #[test]
    fn test_catalogue_baud_rates_accepted() {
        let channel = MockChannel::default();
        assert!(TextSession::new(channel, "Command1", 115200).is_ok());
    }

    #[test]
    fn test_unsupported_baud_rate_rejected() {
        let channel = MockChannel::default();
        let result = TextSession::new(channel, "Command1", 12800);
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::UnsupportedBaudRate(12800)))
        ));
    }

    #[test]
    fn test_long_name_rejected() {
        let channel = MockChannel::default();
        let result = TextSession::new(channel, "a-very-long-identity", 9600);
        assert!(matches!(
            result,
            Err(Error::Protocol(ProtocolError::StreamNameTooLong(_)))
        ));
    }
}
