//! # olcb
//!
//! OpenLCB/LCC node protocol stack for CAN control networks.
//!
//! This crate implements the CAN-level wire protocol used by
//! OpenLCB/Layout Command Control nodes: the 29-bit arbitration-id codec,
//! the MTI registry, event reports, datagram fragmentation and
//! reassembly, and a node runtime that answers verification and
//! protocol-support inquiries and dispatches events to registered
//! consumers.
//!
//! ## Architecture
//!
//! - **Protocol layer** ([`protocol`]): messages, events, datagrams, and
//!   the header codec between typed [`protocol::Message`]s and raw
//!   [`protocol::CanFrame`]s
//! - **Node layer** ([`node`]): identity, outbound operations, and
//!   synchronous inbound dispatch
//! - **Transport layer** ([`transport`]): the frame-carrier boundary,
//!   with an in-process loopback bus for tests and demos
//!
//! ## Example
//!
//! ```
//! use olcb::node::Node;
//! use olcb::protocol::ProtocolSet;
//! use olcb::transport::LoopbackBus;
//! use olcb::Address;
//!
//! let mut bus = LoopbackBus::new();
//! let node = Node::builder(Address::from_hex_str("05.01.01.01.8C.00").unwrap())
//!     .transport(bus.port())
//!     .protocols(ProtocolSet::EVENT_EXCHANGE | ProtocolSet::DATAGRAM)
//!     .start()
//!     .unwrap();
//!
//! node.produce(1).unwrap();
//! bus.pump_all();
//! ```

pub mod error;
pub mod node;
pub mod protocol;
pub mod transport;

mod address;

pub use address::{Address, ALIAS_MAX, FULL_ID_LEN};
pub use error::{OlcbError, Result};
