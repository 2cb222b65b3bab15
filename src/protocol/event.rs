//! Event identifiers and the Producer/Consumer Event Report payload.
//!
//! An event id is 8 bytes. Ids in the well-known ranges (first two bytes
//! `01 00` or `01 01`, or first four bytes `09 00 99 FF`) have a meaning
//! fixed by protocol convention and are used verbatim. Any other id can be
//! tagged with a node's 48-bit full address in its high 6 bytes, leaving a
//! 2-byte node-local suffix.

use std::fmt;

use bytes::Bytes;

use crate::address::Address;
use crate::error::{OlcbError, Result};
use crate::protocol::message::Message;
use crate::protocol::mti::Mti;

/// Width of an event id in bytes.
pub const EVENT_ID_LEN: usize = 8;

/// Inclusive upper bound below which a bare integer event value is tagged
/// with the producing node's address.
const NODE_LOCAL_MAX: u64 = 1 << 16;

/// An 8-byte event identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EventId([u8; EVENT_ID_LEN]);

impl EventId {
    /// Create an event id from its 8 raw bytes.
    pub const fn from_bytes(bytes: [u8; EVENT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Create an event id from a big-endian integer, used verbatim.
    pub const fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    /// Create an event id from a byte slice of exactly 8 bytes.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let bytes: [u8; EVENT_ID_LEN] =
            bytes
                .try_into()
                .map_err(|_| OlcbError::InvalidEncoding {
                    expected: EVENT_ID_LEN,
                })?;
        Ok(Self(bytes))
    }

    /// Tag a 2-byte suffix with a node's full address:
    /// `(full << 16) | suffix`.
    ///
    /// Fails with `MissingField` when the source has no full id.
    pub fn tagged(source: &Address, suffix: u16) -> Result<Self> {
        let full = source.as_u64()?;
        Ok(Self::from_u64((full << 16) | u64::from(suffix)))
    }

    /// Coerce a bare integer event value the way a node does: values up to
    /// 2^16 are tagged with the node's own address, larger values are used
    /// as an already-fully-qualified 8-byte id.
    pub fn for_node(value: u64, node_address: &Address) -> Result<Self> {
        if value > NODE_LOCAL_MAX {
            Ok(Self::from_u64(value))
        } else {
            Self::tagged(node_address, value as u16)
        }
    }

    /// Whether this id falls in one of the reserved well-known ranges.
    pub fn is_well_known(&self) -> bool {
        self.0[0..2] == [0x01, 0x00]
            || self.0[0..2] == [0x01, 0x01]
            || self.0[0..4] == [0x09, 0x00, 0x99, 0xFF]
    }

    /// The raw id bytes.
    pub const fn as_bytes(&self) -> &[u8; EVENT_ID_LEN] {
        &self.0
    }

    /// The id as a big-endian integer.
    pub const fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for byte in self.0 {
            if !first {
                write!(f, ".")?;
            }
            write!(f, "{byte:02X}")?;
            first = false;
        }
        Ok(())
    }
}

/// Build a Producer/Consumer Event Report message for an event id.
///
/// The id goes out verbatim: qualification is the caller's concern, via
/// [`EventId::tagged`] or [`EventId::for_node`], before the report is
/// built. Re-tagging here would overwrite the high 6 bytes of an
/// already-fully-qualified id with the sender's address.
pub fn event_report(event_id: EventId, source: Option<Address>) -> Result<Message> {
    Message::new(
        Mti::PRODUCER_CONSUMER_EVENT_REPORT,
        Bytes::copy_from_slice(event_id.as_bytes()),
        source,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_address() -> Address {
        Address::from_hex_str("05.01.01.01.8C.00").unwrap()
    }

    #[test]
    fn test_well_known_ranges() {
        assert!(EventId::from_u64(0x0100_0000_0000_0000).is_well_known());
        assert!(EventId::from_u64(0x0101_0203_0405_0607).is_well_known());
        assert!(EventId::from_u64(0x0900_99FF_0000_0001).is_well_known());
        assert!(!EventId::from_u64(0x0900_99FE_0000_0001).is_well_known());
        assert!(!EventId::from_u64(0x0102_0000_0000_0000).is_well_known());
        assert!(!EventId::from_u64(0x0501_0101_8C00_0001).is_well_known());
        assert!(!EventId::from_u64(0).is_well_known());
    }

    #[test]
    fn test_tagging() {
        // Event 0x0001 tagged with 05:01:01:01:8C:00 yields
        // 05 01 01 01 8C 00 00 01.
        let id = EventId::tagged(&test_address(), 0x0001).unwrap();
        assert_eq!(
            id.as_bytes(),
            &[0x05, 0x01, 0x01, 0x01, 0x8C, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn test_tagging_requires_full_address() {
        let alias_only = Address::from_alias(0x8C0).unwrap();
        assert!(matches!(
            EventId::tagged(&alias_only, 1),
            Err(OlcbError::MissingField(_))
        ));
    }

    #[test]
    fn test_for_node_coercion() {
        let addr = test_address();

        // Small values are tagged with the node address.
        let small = EventId::for_node(0x0001, &addr).unwrap();
        assert_eq!(small.as_u64(), 0x0501_0101_8C00_0001);

        // The boundary value 2^16 is still tagged (low 16 bits wrap to 0).
        let boundary = EventId::for_node(NODE_LOCAL_MAX, &addr).unwrap();
        assert_eq!(boundary.as_u64(), 0x0501_0101_8C00_0000);

        // Larger values are fully-qualified already.
        let big = EventId::for_node(0x0102_0304_0506_0708, &addr).unwrap();
        assert_eq!(big.as_u64(), 0x0102_0304_0506_0708);
    }

    #[test]
    fn test_from_slice_width() {
        assert!(EventId::from_slice(&[0u8; 8]).is_ok());
        assert!(matches!(
            EventId::from_slice(&[0u8; 7]),
            Err(OlcbError::InvalidEncoding { expected: 8 })
        ));
    }

    #[test]
    fn test_event_report_carries_tagged_id() {
        let id = EventId::for_node(1, &test_address()).unwrap();
        let msg = event_report(id, Some(test_address())).unwrap();
        assert_eq!(msg.mti, Mti::PRODUCER_CONSUMER_EVENT_REPORT);
        assert_eq!(
            msg.payload.as_ref(),
            &[0x05, 0x01, 0x01, 0x01, 0x8C, 0x00, 0x00, 0x01]
        );
    }

    #[test]
    fn test_event_report_never_retags_qualified_id() {
        // A fully-qualified id naming another node's address must survive
        // even when the sender's own address is attached as source.
        let id = EventId::from_u64(0x0102_0304_0506_0708);
        let msg = event_report(id, Some(test_address())).unwrap();
        assert_eq!(msg.payload.as_ref(), id.as_bytes());
    }

    #[test]
    fn test_event_report_well_known_verbatim() {
        let id = EventId::from_u64(0x0101_0000_0000_0001);
        let msg = event_report(id, Some(test_address())).unwrap();
        assert_eq!(msg.payload.as_ref(), id.as_bytes());
    }

    #[test]
    fn test_event_report_without_source_verbatim() {
        let id = EventId::from_u64(0x0102_0304_0506_0708);
        let msg = event_report(id, None).unwrap();
        assert_eq!(msg.payload.as_ref(), id.as_bytes());
        assert!(msg.source.is_none());
    }

    #[test]
    fn test_display() {
        let id = EventId::from_u64(0x0501_0101_8C00_0001);
        assert_eq!(id.to_string(), "05.01.01.01.8C.00.00.01");
    }
}
