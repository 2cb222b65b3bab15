//! CAN arbitration-id codec.
//!
//! Implements the 29-bit extended-id layout:
//! ```text
//! ┌──────────────┬──────────────────────┬──────────────┐
//! │ class marker │ MTI / dest alias     │ source alias │
//! │ bits 28-24   │ bits 23-12           │ bits 11-0    │
//! └──────────────┴──────────────────────┴──────────────┘
//! ```
//! Class markers: `0x19` global, `0x1A` addressed/no-fragment, `0x1B` first
//! fragment, `0x1C` middle fragment, `0x1D` last fragment, `0x1F` stream
//! data. Fragment-class headers carry the destination alias in bits 23-12;
//! every other class carries the low 12 MTI bits there, so the destination
//! is not recoverable from a non-fragment header.

use crate::address::Address;
use crate::error::{OlcbError, Result};
use crate::protocol::mti::{FrameTag, Mti};

/// Class marker for global (unaddressed) messages.
pub const MARKER_GLOBAL: u8 = 0x19;
/// Class marker for addressed messages carried in a single frame.
pub const MARKER_ADDRESSED: u8 = 0x1A;
/// Class marker for the first frame of a fragmented message.
pub const MARKER_FIRST: u8 = 0x1B;
/// Class marker for a middle frame of a fragmented message.
pub const MARKER_MIDDLE: u8 = 0x1C;
/// Class marker for the last frame of a fragmented message.
pub const MARKER_LAST: u8 = 0x1D;
/// Class marker for stream data frames.
pub const MARKER_STREAM: u8 = 0x1F;

const MTI_MASK: u16 = 0x0FFF;
const ALIAS_MASK: u32 = 0x0FFF;
const STREAM_MTI_BIT: u16 = 0x1000;

/// Fields recovered from a 29-bit arbitration id.
///
/// The destination alias is present only for fragment-class headers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedHeader {
    /// Reconstructed MTI. Fragment markers all decode to [`Mti::DATAGRAM`].
    pub mti: Mti,
    /// Sender's 12-bit alias (bits 11-0).
    pub source_alias: u16,
    /// Destination alias, for fragment-class headers only.
    pub destination_alias: Option<u16>,
    /// Fragment position, derived from the class marker.
    pub tag: Option<FrameTag>,
}

/// Encode an MTI plus addressing info into a 29-bit arbitration id.
///
/// The source must have an alias. Addressed MTIs (bit 12 set) additionally
/// require a destination with an alias; its alias replaces the low MTI bits
/// in the header, and the class marker encodes the frame tag. Global MTIs
/// get the `0x19` marker.
///
/// # Example
///
/// ```
/// use olcb::protocol::{encode_header, Mti};
/// use olcb::Address;
///
/// let source = Address::from_alias(0x8C0).unwrap();
/// let id = encode_header(Mti::INITIALIZATION_COMPLETE, &source, None, None).unwrap();
/// assert_eq!(id, 0x191008C0);
/// ```
pub fn encode_header(
    mti: Mti,
    source: &Address,
    destination: Option<&Address>,
    tag: Option<FrameTag>,
) -> Result<u32> {
    let source_alias = u32::from(source.alias()?);
    let mut id = (u32::from(mti.raw() & MTI_MASK) << 12) | source_alias;

    let marker = if mti.is_addressed() {
        let destination = destination.ok_or(OlcbError::MissingDestination)?;
        let destination_alias = u32::from(destination.alias()?);
        id = (id & !(ALIAS_MASK << 12)) | (destination_alias << 12);
        match tag {
            None => MARKER_ADDRESSED,
            Some(FrameTag::First) => MARKER_FIRST,
            Some(FrameTag::Middle) => MARKER_MIDDLE,
            Some(FrameTag::Last) => MARKER_LAST,
        }
    } else {
        MARKER_GLOBAL
    };

    Ok(id | (u32::from(marker) << 24))
}

/// Decode a 29-bit arbitration id back into its protocol fields.
///
/// Fragment markers (`0x1A`..=`0x1D`) fix the MTI to [`Mti::DATAGRAM`] and
/// yield the frame tag and destination alias; the `0x1F` marker ORs the
/// stream bit into the reconstructed MTI. A reconstructed MTI outside the
/// registry fails with [`OlcbError::UnknownMti`].
pub fn decode_header(can_id: u32) -> Result<DecodedHeader> {
    let marker = (can_id >> 24) as u8;
    let source_alias = (can_id & ALIAS_MASK) as u16;

    let tag = match marker {
        MARKER_ADDRESSED => None,
        MARKER_FIRST => Some(FrameTag::First),
        MARKER_MIDDLE => Some(FrameTag::Middle),
        MARKER_LAST => Some(FrameTag::Last),
        _ => {
            let mut raw = ((can_id >> 12) & u32::from(MTI_MASK)) as u16;
            if marker == MARKER_STREAM {
                raw |= STREAM_MTI_BIT;
            }
            let mti = Mti::from_raw(raw);
            if !mti.is_known() {
                return Err(OlcbError::UnknownMti(raw));
            }
            return Ok(DecodedHeader {
                mti,
                source_alias,
                destination_alias: None,
                tag: None,
            });
        }
    };

    Ok(DecodedHeader {
        mti: Mti::DATAGRAM,
        source_alias,
        destination_alias: Some(((can_id >> 12) & ALIAS_MASK) as u16),
        tag,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_alias(alias: u16) -> Address {
        Address::from_alias(alias).unwrap()
    }

    #[test]
    fn test_encode_global() {
        // Initialization Complete from alias 0x8C0: top byte 0x19,
        // MTI field 0x100, low 12 bits 0x8C0.
        let id = encode_header(
            Mti::INITIALIZATION_COMPLETE,
            &with_alias(0x8C0),
            None,
            None,
        )
        .unwrap();
        assert_eq!(id, 0x191008C0);
        assert_eq!(id >> 24, 0x19);
        assert_eq!((id >> 12) & 0xFFF, 0x100);
        assert_eq!(id & 0xFFF, 0x8C0);
    }

    #[test]
    fn test_encode_global_ignores_destination() {
        let id = encode_header(
            Mti::PRODUCER_CONSUMER_EVENT_REPORT,
            &with_alias(0x123),
            Some(&with_alias(0x456)),
            None,
        )
        .unwrap();
        assert_eq!(id >> 24, 0x19);
        assert_eq!((id >> 12) & 0xFFF, 0x5B4);
        assert_eq!(id & 0xFFF, 0x123);
    }

    #[test]
    fn test_encode_datagram_markers() {
        let src = with_alias(0x8C0);
        let dst = with_alias(0x123);
        let cases = [
            (None, 0x1Au32),
            (Some(FrameTag::First), 0x1B),
            (Some(FrameTag::Middle), 0x1C),
            (Some(FrameTag::Last), 0x1D),
        ];
        for (tag, marker) in cases {
            let id = encode_header(Mti::DATAGRAM, &src, Some(&dst), tag).unwrap();
            assert_eq!(id >> 24, marker);
            assert_eq!((id >> 12) & 0xFFF, 0x123);
            assert_eq!(id & 0xFFF, 0x8C0);
        }
    }

    #[test]
    fn test_encode_addressed_without_destination() {
        assert!(matches!(
            encode_header(Mti::DATAGRAM, &with_alias(0x8C0), None, None),
            Err(OlcbError::MissingDestination)
        ));
    }

    #[test]
    fn test_encode_without_source_alias() {
        let no_alias = Address::from_u64(0x0501_0101_8C00).unwrap();
        assert!(matches!(
            encode_header(Mti::INITIALIZATION_COMPLETE, &no_alias, None, None),
            Err(OlcbError::MissingField(_))
        ));
    }

    #[test]
    fn test_decode_global_roundtrip() {
        for mti in [
            Mti::INITIALIZATION_COMPLETE,
            Mti::VERIFY_NODE_ID_GLOBAL,
            Mti::VERIFY_NODE_ID_ADDRESSED,
            Mti::VERIFIED_NODE_ID,
            Mti::PRODUCER_CONSUMER_EVENT_REPORT,
            Mti::PROTOCOL_SUPPORT_INQUIRY,
            Mti::LEARN_EVENT,
        ] {
            let id = encode_header(mti, &with_alias(0x7E1), None, None).unwrap();
            let decoded = decode_header(id).unwrap();
            assert_eq!(decoded.mti, mti);
            assert_eq!(decoded.source_alias, 0x7E1);
            assert_eq!(decoded.destination_alias, None);
            assert_eq!(decoded.tag, None);
        }
    }

    #[test]
    fn test_decode_fragment_roundtrip() {
        let src = with_alias(0x8C0);
        let dst = with_alias(0xABC);
        for tag in [
            None,
            Some(FrameTag::First),
            Some(FrameTag::Middle),
            Some(FrameTag::Last),
        ] {
            let id = encode_header(Mti::DATAGRAM, &src, Some(&dst), tag).unwrap();
            let decoded = decode_header(id).unwrap();
            assert_eq!(decoded.mti, Mti::DATAGRAM);
            assert_eq!(decoded.source_alias, 0x8C0);
            assert_eq!(decoded.destination_alias, Some(0xABC));
            assert_eq!(decoded.tag, tag);
        }
    }

    #[test]
    fn test_decode_stream_marker() {
        // 0x1F frames get the stream bit ORed into the MTI.
        let id = (u32::from(MARKER_STREAM) << 24) | (0xF88 << 12) | 0x8C0;
        let decoded = decode_header(id).unwrap();
        assert_eq!(decoded.mti, Mti::STREAM_DATA_SEND);
        assert_eq!(decoded.source_alias, 0x8C0);
        assert_eq!(decoded.tag, None);
    }

    #[test]
    fn test_decode_unknown_mti() {
        let id = (u32::from(MARKER_GLOBAL) << 24) | (0xABC << 12) | 0x001;
        assert!(matches!(
            decode_header(id),
            Err(OlcbError::UnknownMti(0x0ABC))
        ));
    }
}
