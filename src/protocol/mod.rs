//! Protocol module - wire codec, message types, events, and datagrams.
//!
//! This module implements the CAN-level protocol:
//! - 29-bit arbitration-id encoding/decoding
//! - the MTI registry and frame-sequence tags
//! - typed messages over raw CAN frames
//! - event identifiers and datagram fragmentation
//! - the protocol-support bitmask

mod datagram;
mod event;
mod frame;
mod header;
mod message;
mod mti;
mod protocol_set;

pub use datagram::Datagram;
pub use event::{event_report, EventId, EVENT_ID_LEN};
pub use frame::{CanFrame, EXTENDED_ID_MASK, MAX_FRAME_DATA};
pub use header::{
    decode_header, encode_header, DecodedHeader, MARKER_ADDRESSED, MARKER_FIRST, MARKER_GLOBAL,
    MARKER_LAST, MARKER_MIDDLE, MARKER_STREAM,
};
pub use message::Message;
pub use mti::{FrameTag, Mti};
pub use protocol_set::ProtocolSet;
