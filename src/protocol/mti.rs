//! Message Type Indicators and frame sequence tags.
//!
//! An MTI is a 12-bit code identifying a protocol message's semantic type,
//! plus one reserved high bit marking "addressed" messages. The registry of
//! named constants below mirrors the OpenLCB standard MTI allocation; the
//! membership test is used to reject malformed or unsupported frames.

use std::fmt;

/// Message Type Indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Mti(u16);

/// Position of fragmented messages within a multi-frame sequence.
///
/// A message with no tag is a single frame (or not fragmented at all).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameTag {
    /// First frame of a multi-frame sequence.
    First,
    /// Any frame between the first and the last.
    Middle,
    /// Final frame of a multi-frame sequence.
    Last,
}

impl Mti {
    pub const INITIALIZATION_COMPLETE: Mti = Mti(0x0100);
    pub const INITIALIZATION_COMPLETE_SIMPLE: Mti = Mti(0x0101);
    pub const VERIFY_NODE_ID_ADDRESSED: Mti = Mti(0x0488);
    pub const VERIFY_NODE_ID_GLOBAL: Mti = Mti(0x0490);
    pub const VERIFIED_NODE_ID: Mti = Mti(0x0170);
    pub const VERIFIED_NODE_ID_SIMPLE: Mti = Mti(0x0171);
    pub const OPTIONAL_INTERACTION_REJECTED: Mti = Mti(0x0068);
    pub const TERMINATE_DUE_TO_ERROR: Mti = Mti(0x00A8);
    pub const PROTOCOL_SUPPORT_INQUIRY: Mti = Mti(0x0828);
    pub const PROTOCOL_SUPPORT_REPLY: Mti = Mti(0x0668);
    pub const IDENTIFY_CONSUMER: Mti = Mti(0x08F4);
    pub const CONSUMER_RANGE_IDENTIFIED: Mti = Mti(0x04A4);
    pub const CONSUMER_IDENTIFIED_VALIDITY_UNKNOWN: Mti = Mti(0x04C7);
    pub const CONSUMER_IDENTIFIED_VALID: Mti = Mti(0x04C4);
    pub const CONSUMER_IDENTIFIED_INVALID: Mti = Mti(0x04C5);
    pub const CONSUMER_IDENTIFIED_RESERVED: Mti = Mti(0x04C6);
    pub const IDENTIFY_PRODUCER: Mti = Mti(0x0914);
    pub const PRODUCER_RANGE_IDENTIFIED: Mti = Mti(0x0524);
    pub const PRODUCER_IDENTIFIED_VALIDITY_UNKNOWN: Mti = Mti(0x0547);
    pub const PRODUCER_IDENTIFIED_VALID: Mti = Mti(0x0544);
    pub const PRODUCER_IDENTIFIED_INVALID: Mti = Mti(0x0545);
    pub const PRODUCER_IDENTIFIED_RESERVED: Mti = Mti(0x0546);
    pub const IDENTIFY_EVENTS_ADDRESSED: Mti = Mti(0x0968);
    pub const IDENTIFY_EVENTS_GLOBAL: Mti = Mti(0x0970);
    pub const LEARN_EVENT: Mti = Mti(0x0594);
    pub const PRODUCER_CONSUMER_EVENT_REPORT: Mti = Mti(0x05B4);
    pub const PCER_WITH_PAYLOAD_FIRST: Mti = Mti(0x0F14);
    pub const PCER_WITH_PAYLOAD_MIDDLE: Mti = Mti(0x0F15);
    pub const PCER_WITH_PAYLOAD_LAST: Mti = Mti(0x0F16);
    pub const TRACTION_CONTROL_COMMAND: Mti = Mti(0x05E8);
    pub const TRACTION_CONTROL_REPLY: Mti = Mti(0x01E8);
    pub const TRACTION_PROXY_COMMAND_OBSOLETE: Mti = Mti(0x09E9);
    pub const TRACTION_PROXY_REPLY_OBSOLETE: Mti = Mti(0x05E9);
    pub const XPRESSNET: Mti = Mti(0x0820);
    pub const REMOTE_BUTTON_REQUEST: Mti = Mti(0x0948);
    pub const REMOTE_BUTTON_REPLY: Mti = Mti(0x0549);
    pub const SIMPLE_TRAIN_NODE_IDENT_INFO_REQUEST: Mti = Mti(0x0DA8);
    pub const SIMPLE_TRAIN_NODE_IDENT_INFO_REPLY: Mti = Mti(0x09C8);
    pub const SIMPLE_NODE_IDENT_INFO_REQUEST: Mti = Mti(0x0DE8);
    pub const SIMPLE_NODE_IDENT_INFO_REPLY: Mti = Mti(0x0A08);
    pub const DATAGRAM: Mti = Mti(0x1C48);
    pub const DATAGRAM_RECEIVED_OK: Mti = Mti(0x0A28);
    pub const DATAGRAM_REJECTED: Mti = Mti(0x0A48);
    pub const STREAM_INITIATE_REQUEST: Mti = Mti(0x0CC8);
    pub const STREAM_INITIATE_REPLY: Mti = Mti(0x0868);
    pub const STREAM_DATA_SEND: Mti = Mti(0x1F88);
    pub const STREAM_DATA_PROCEED: Mti = Mti(0x0888);
    pub const STREAM_DATA_COMPLETE: Mti = Mti(0x08A8);
    pub const NODE_NUMBER_ALLOCATE: Mti = Mti(0x2000);
    pub const NO_FILTERING: Mti = Mti(0x2020);

    /// Every MTI this stack recognizes, in registry order.
    ///
    /// The Datagram entry stands for all four CAN fragment markers; the
    /// header codec folds them back into [`Mti::DATAGRAM`] on decode.
    pub const KNOWN: &'static [Mti] = &[
        Mti::INITIALIZATION_COMPLETE,
        Mti::INITIALIZATION_COMPLETE_SIMPLE,
        Mti::VERIFY_NODE_ID_ADDRESSED,
        Mti::VERIFY_NODE_ID_GLOBAL,
        Mti::VERIFIED_NODE_ID,
        Mti::VERIFIED_NODE_ID_SIMPLE,
        Mti::OPTIONAL_INTERACTION_REJECTED,
        Mti::TERMINATE_DUE_TO_ERROR,
        Mti::PROTOCOL_SUPPORT_INQUIRY,
        Mti::PROTOCOL_SUPPORT_REPLY,
        Mti::IDENTIFY_CONSUMER,
        Mti::CONSUMER_RANGE_IDENTIFIED,
        Mti::CONSUMER_IDENTIFIED_VALIDITY_UNKNOWN,
        Mti::CONSUMER_IDENTIFIED_VALID,
        Mti::CONSUMER_IDENTIFIED_INVALID,
        Mti::CONSUMER_IDENTIFIED_RESERVED,
        Mti::IDENTIFY_PRODUCER,
        Mti::PRODUCER_RANGE_IDENTIFIED,
        Mti::PRODUCER_IDENTIFIED_VALIDITY_UNKNOWN,
        Mti::PRODUCER_IDENTIFIED_VALID,
        Mti::PRODUCER_IDENTIFIED_INVALID,
        Mti::PRODUCER_IDENTIFIED_RESERVED,
        Mti::IDENTIFY_EVENTS_ADDRESSED,
        Mti::IDENTIFY_EVENTS_GLOBAL,
        Mti::LEARN_EVENT,
        Mti::PRODUCER_CONSUMER_EVENT_REPORT,
        Mti::PCER_WITH_PAYLOAD_FIRST,
        Mti::PCER_WITH_PAYLOAD_MIDDLE,
        Mti::PCER_WITH_PAYLOAD_LAST,
        Mti::TRACTION_CONTROL_COMMAND,
        Mti::TRACTION_CONTROL_REPLY,
        Mti::TRACTION_PROXY_COMMAND_OBSOLETE,
        Mti::TRACTION_PROXY_REPLY_OBSOLETE,
        Mti::XPRESSNET,
        Mti::REMOTE_BUTTON_REQUEST,
        Mti::REMOTE_BUTTON_REPLY,
        Mti::SIMPLE_TRAIN_NODE_IDENT_INFO_REQUEST,
        Mti::SIMPLE_TRAIN_NODE_IDENT_INFO_REPLY,
        Mti::SIMPLE_NODE_IDENT_INFO_REQUEST,
        Mti::SIMPLE_NODE_IDENT_INFO_REPLY,
        Mti::DATAGRAM,
        Mti::DATAGRAM_RECEIVED_OK,
        Mti::DATAGRAM_REJECTED,
        Mti::STREAM_INITIATE_REQUEST,
        Mti::STREAM_INITIATE_REPLY,
        Mti::STREAM_DATA_SEND,
        Mti::STREAM_DATA_PROCEED,
        Mti::STREAM_DATA_COMPLETE,
        Mti::NODE_NUMBER_ALLOCATE,
        Mti::NO_FILTERING,
    ];

    /// Bit marking an MTI whose CAN encoding carries a destination alias.
    const ADDRESSED_BIT: u16 = 0x1000;

    /// Create an MTI from its raw value without a registry check.
    pub const fn from_raw(value: u16) -> Self {
        Self(value)
    }

    /// The raw MTI value.
    pub const fn raw(self) -> u16 {
        self.0
    }

    /// Whether this MTI's CAN encoding carries a destination alias in the
    /// header (bit 12 of the MTI value).
    pub const fn is_addressed(self) -> bool {
        self.0 & Self::ADDRESSED_BIT != 0
    }

    /// Whether this MTI is one of the known registry values.
    pub fn is_known(self) -> bool {
        Self::KNOWN.contains(&self)
    }
}

impl fmt::Display for Mti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

impl From<Mti> for u16 {
    fn from(value: Mti) -> Self {
        value.raw()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_membership() {
        assert!(Mti::INITIALIZATION_COMPLETE.is_known());
        assert!(Mti::DATAGRAM.is_known());
        assert!(Mti::NO_FILTERING.is_known());
        assert!(!Mti::from_raw(0x0ABC).is_known());
        assert!(!Mti::from_raw(0x0000).is_known());
    }

    #[test]
    fn test_addressed_bit() {
        // Only the datagram and stream-data MTIs carry bit 12.
        assert!(Mti::DATAGRAM.is_addressed());
        assert!(Mti::STREAM_DATA_SEND.is_addressed());
        assert!(!Mti::INITIALIZATION_COMPLETE.is_addressed());
        assert!(!Mti::VERIFY_NODE_ID_ADDRESSED.is_addressed());
        assert!(!Mti::PRODUCER_CONSUMER_EVENT_REPORT.is_addressed());
    }

    #[test]
    fn test_no_duplicate_registry_values() {
        for (i, a) in Mti::KNOWN.iter().enumerate() {
            for b in &Mti::KNOWN[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
