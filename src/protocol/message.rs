//! Typed protocol unit: one CAN-level message.
//!
//! A [`Message`] pairs an MTI with up to 8 payload bytes, a source, an
//! optional destination, and an optional frame-sequence tag. It converts
//! to and from the raw [`CanFrame`] wire unit through the header codec.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use olcb::protocol::{Message, Mti};
//! use olcb::Address;
//!
//! let mut source = Address::from_hex_str("05.01.01.01.8C.00").unwrap();
//! source.set_alias(0x8C0).unwrap();
//!
//! let msg = Message::new(
//!     Mti::INITIALIZATION_COMPLETE,
//!     Bytes::copy_from_slice(&source.full().unwrap()),
//!     Some(source),
//! )
//! .unwrap();
//! assert_eq!(msg.can_header().unwrap(), 0x191008C0);
//! ```

use bytes::Bytes;

use crate::address::Address;
use crate::error::{OlcbError, Result};
use crate::protocol::frame::{CanFrame, MAX_FRAME_DATA};
use crate::protocol::header::{decode_header, encode_header};
use crate::protocol::mti::{FrameTag, Mti};

/// One CAN-level protocol unit.
#[derive(Debug, Clone)]
pub struct Message {
    /// Message type.
    pub mti: Mti,
    /// Payload bytes (0-8).
    pub payload: Bytes,
    /// Originating node, if known.
    pub source: Option<Address>,
    /// Destination node, for addressed messages.
    pub destination: Option<Address>,
    /// Fragment position within a multi-frame sequence.
    pub tag: Option<FrameTag>,
}

impl Message {
    /// Create a message, validating the payload length.
    pub fn new(mti: Mti, payload: Bytes, source: Option<Address>) -> Result<Self> {
        if payload.len() > MAX_FRAME_DATA {
            return Err(OlcbError::InvalidEncoding {
                expected: MAX_FRAME_DATA,
            });
        }
        Ok(Self {
            mti,
            payload,
            source,
            destination: None,
            tag: None,
        })
    }

    /// Set the destination address.
    pub fn with_destination(mut self, destination: Address) -> Self {
        self.destination = Some(destination);
        self
    }

    /// Set the frame-sequence tag.
    pub fn with_tag(mut self, tag: FrameTag) -> Self {
        self.tag = Some(tag);
        self
    }

    /// Compute the 29-bit CAN arbitration id for this message.
    ///
    /// Fails with [`OlcbError::MissingSource`] when no source is set, and
    /// with [`OlcbError::MissingDestination`] for an addressed MTI without
    /// a destination.
    pub fn can_header(&self) -> Result<u32> {
        let source = self.source.as_ref().ok_or(OlcbError::MissingSource)?;
        encode_header(self.mti, source, self.destination.as_ref(), self.tag)
    }

    /// Build the raw wire frame for this message.
    pub fn to_frame(&self) -> Result<CanFrame> {
        CanFrame::new(self.can_header()?, self.payload.clone())
    }

    /// Decode a raw frame into a message.
    ///
    /// Non-extended frames fail with `InvalidEncoding`; headers outside
    /// the MTI registry fail with [`OlcbError::UnknownMti`]. The source is
    /// known only by its alias; the destination is populated for
    /// fragment-class headers.
    pub fn from_frame(frame: &CanFrame) -> Result<Self> {
        if !frame.extended {
            return Err(OlcbError::InvalidEncoding { expected: 4 });
        }
        let decoded = decode_header(frame.id)?;
        let destination = match decoded.destination_alias {
            Some(alias) => Some(Address::from_alias(alias)?),
            None => None,
        };
        Ok(Self {
            mti: decoded.mti,
            payload: frame.data.clone(),
            source: Some(Address::from_alias(decoded.source_alias)?),
            destination,
            tag: decoded.tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source_8c0() -> Address {
        let mut addr = Address::from_hex_str("05.01.01.01.8C.00").unwrap();
        addr.set_alias(0x8C0).unwrap();
        addr
    }

    #[test]
    fn test_payload_too_long() {
        assert!(matches!(
            Message::new(
                Mti::PRODUCER_CONSUMER_EVENT_REPORT,
                Bytes::copy_from_slice(&[0u8; 9]),
                None,
            ),
            Err(OlcbError::InvalidEncoding { expected: 8 })
        ));
    }

    #[test]
    fn test_header_requires_source() {
        let msg = Message::new(Mti::INITIALIZATION_COMPLETE, Bytes::new(), None).unwrap();
        assert!(matches!(msg.can_header(), Err(OlcbError::MissingSource)));
    }

    #[test]
    fn test_frame_roundtrip_global() {
        let source = source_8c0();
        let payload = Bytes::copy_from_slice(&source.full().unwrap());
        let msg =
            Message::new(Mti::INITIALIZATION_COMPLETE, payload.clone(), Some(source)).unwrap();
        let frame = msg.to_frame().unwrap();
        assert_eq!(frame.id, 0x191008C0);
        assert_eq!(frame.data(), payload.as_ref());

        let back = Message::from_frame(&frame).unwrap();
        assert_eq!(back.mti, Mti::INITIALIZATION_COMPLETE);
        assert_eq!(back.source.unwrap().alias().unwrap(), 0x8C0);
        assert_eq!(back.destination, None);
        assert_eq!(back.tag, None);
        assert_eq!(back.payload, payload);
    }

    #[test]
    fn test_frame_roundtrip_datagram_fragment() {
        let msg = Message::new(
            Mti::DATAGRAM,
            Bytes::from_static(b"12345678"),
            Some(source_8c0()),
        )
        .unwrap()
        .with_destination(Address::from_alias(0x123).unwrap())
        .with_tag(FrameTag::First);

        let frame = msg.to_frame().unwrap();
        assert_eq!(frame.id >> 24, 0x1B);

        let back = Message::from_frame(&frame).unwrap();
        assert_eq!(back.mti, Mti::DATAGRAM);
        assert_eq!(back.tag, Some(FrameTag::First));
        assert_eq!(back.source.unwrap().alias().unwrap(), 0x8C0);
        assert_eq!(back.destination.unwrap().alias().unwrap(), 0x123);
    }

    #[test]
    fn test_from_frame_rejects_standard_id() {
        let mut frame = CanFrame::from_parts(0x191008C0, b"").unwrap();
        frame.extended = false;
        assert!(Message::from_frame(&frame).is_err());
    }

    #[test]
    fn test_from_frame_rejects_unknown_mti() {
        let frame = CanFrame::from_parts(0x19ABC001, b"").unwrap();
        assert!(matches!(
            Message::from_frame(&frame),
            Err(OlcbError::UnknownMti(0x0ABC))
        ));
    }
}
