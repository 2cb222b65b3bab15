//! Node runtime: identity, outbound operations, and inbound dispatch.
//!
//! A [`Node`] owns an [`Address`], the transports it talks through, a
//! consumer registry, and the datagram reassembly state. It is built
//! through [`NodeBuilder`], which announces the node on its transports
//! and broadcasts Initialization-Complete before handing back a
//! [`NodeHandle`].
//!
//! The handle serializes access: every operation locks the node, and
//! inbound frames are processed one at a time, each fully handled
//! (including any reply it provokes) before the next.

mod registry;
mod reassembly;

pub use registry::{Consumer, ConsumerRegistry};
pub use reassembly::ReassemblyQueue;

use std::sync::Arc;

use bytes::Bytes;
use parking_lot::{Mutex, MutexGuard};
use tracing::{debug, trace, warn};

use crate::address::{Address, ALIAS_MAX};
use crate::error::{OlcbError, Result};
use crate::protocol::{event_report, CanFrame, Datagram, EventId, Message, Mti, ProtocolSet};
use crate::transport::Transport;

/// Callback invoked with each fully reassembled inbound datagram.
///
/// Runs under the node lock; must not call back into the node (see
/// [`NodeHandle`]).
pub type DatagramHandler = Box<dyn FnMut(&Datagram) + Send>;

/// Callback invoked for decoded messages no built-in rule handles.
///
/// Runs under the node lock; must not call back into the node.
pub type MessageHandler = Box<dyn FnMut(&Message) + Send>;

/// A protocol endpoint on the control network.
pub struct Node {
    address: Address,
    transports: Vec<Arc<dyn Transport>>,
    consumers: ConsumerRegistry,
    reassembly: ReassemblyQueue,
    protocols: ProtocolSet,
    datagram_handler: Option<DatagramHandler>,
    unknown_handler: Option<MessageHandler>,
}

impl Node {
    /// Start configuring a node with the given address.
    pub fn builder(address: Address) -> NodeBuilder {
        NodeBuilder {
            address,
            transports: Vec::new(),
            protocols: ProtocolSet::NONE,
            datagram_handler: None,
            unknown_handler: None,
        }
    }

    /// This node's address.
    pub fn address(&self) -> &Address {
        &self.address
    }

    /// This node's alias.
    pub fn alias(&self) -> Result<u16> {
        self.address.alias()
    }

    /// Change this node's alias.
    pub fn set_alias(&mut self, alias: u16) -> Result<u16> {
        self.address.set_alias(alias)
    }

    /// Protocols this node advertises.
    pub fn supported_protocols(&self) -> ProtocolSet {
        self.protocols
    }

    /// Add protocols to the advertised set.
    pub fn add_supported_protocol(&mut self, protocols: ProtocolSet) {
        self.protocols |= protocols;
    }

    /// Encode a message and write it to every transport.
    ///
    /// Fails with [`OlcbError::NoTransport`] when none is attached.
    pub fn send(&self, message: &Message) -> Result<()> {
        if self.transports.is_empty() {
            return Err(OlcbError::NoTransport);
        }
        let frame = message.to_frame()?;
        trace!(
            mti = %message.mti,
            id = format_args!("{:#010x}", frame.id),
            "sending frame"
        );
        for transport in &self.transports {
            transport.send_raw(&frame)?;
        }
        Ok(())
    }

    /// Send a sequence of messages in order.
    pub fn send_all(&self, messages: &[Message]) -> Result<()> {
        for message in messages {
            self.send(message)?;
        }
        Ok(())
    }

    /// Produce an event: broadcast a Producer/Consumer Event Report.
    ///
    /// Values up to 2^16 are tagged with this node's full id; larger
    /// values are taken as already-fully-qualified 8-byte event ids.
    pub fn produce(&self, event: u64) -> Result<()> {
        let event_id = EventId::for_node(event, &self.address)?;
        self.send(&event_report(event_id, Some(self.address))?)
    }

    /// Send a datagram, fragmenting across frames as needed.
    pub fn send_datagram(&self, destination: &Address, payload: Bytes) -> Result<()> {
        let datagram = Datagram::new(payload, self.address, *destination);
        self.send_all(&datagram.to_messages()?)
    }

    /// Register a consumer for an event, with the same integer coercion
    /// as [`Node::produce`].
    pub fn add_consumer<C: Consumer + 'static>(&mut self, event: u64, consumer: C) -> Result<()> {
        let event_id = EventId::for_node(event, &self.address)?;
        self.consumers.add(event_id, consumer)
    }

    /// Deregister the consumer for an event. No-op when absent.
    pub fn remove_consumer(&mut self, event: u64) -> Result<()> {
        let event_id = EventId::for_node(event, &self.address)?;
        self.consumers.remove(&event_id);
        Ok(())
    }

    /// Replace (or install) the consumer for an event.
    pub fn replace_consumer<C: Consumer + 'static>(
        &mut self,
        event: u64,
        consumer: C,
    ) -> Result<()> {
        let event_id = EventId::for_node(event, &self.address)?;
        self.consumers.replace(event_id, consumer)
    }

    /// Invoke the registered consumer for an event locally, handing it
    /// the same report message a remote producer would have sent.
    pub fn run_consumer(&mut self, event: u64) -> Result<()> {
        let event_id = EventId::for_node(event, &self.address)?;
        let message = event_report(event_id, Some(self.address))?;
        self.consumers.dispatch(&event_id, &message)
    }

    /// Ask a specific peer (payload carries its 2-byte alias) or the
    /// whole bus (payload carries our full id) to verify a node id.
    pub fn verify_node_id(&self, destination: Option<&Address>) -> Result<()> {
        let message = match destination {
            Some(peer) => Message::new(
                Mti::VERIFY_NODE_ID_ADDRESSED,
                Bytes::copy_from_slice(&peer.alias_bytes()?),
                Some(self.address),
            )?
            .with_destination(*peer),
            None => Message::new(
                Mti::VERIFY_NODE_ID_GLOBAL,
                Bytes::copy_from_slice(&self.address.full()?),
                Some(self.address),
            )?,
        };
        self.send(&message)
    }

    /// Broadcast Verified-Node-ID with this node's full id.
    pub fn verified_node_id(&self) -> Result<()> {
        let mti = if self.protocols.contains(ProtocolSet::SIMPLE_PROTOCOL_SUBSET) {
            Mti::VERIFIED_NODE_ID_SIMPLE
        } else {
            Mti::VERIFIED_NODE_ID
        };
        self.send(&Message::new(
            mti,
            Bytes::copy_from_slice(&self.address.full()?),
            Some(self.address),
        )?)
    }

    /// Answer a Protocol-Support-Inquiry with the advertised bitmask.
    pub fn protocol_support_reply(&self, destination: &Address) -> Result<()> {
        let message = Message::new(
            Mti::PROTOCOL_SUPPORT_REPLY,
            Bytes::copy_from_slice(&self.protocols.to_bytes()),
            Some(self.address),
        )?
        .with_destination(*destination);
        self.send(&message)
    }

    /// Process one inbound frame, including any reply it provokes.
    ///
    /// Bus noise never surfaces as an error: undecodable frames are
    /// dropped with a trace log, and failures sending replies are logged
    /// and swallowed.
    pub fn handle_frame(&mut self, frame: &CanFrame) {
        let message = match Message::from_frame(frame) {
            Ok(message) => message,
            Err(err) => {
                trace!(
                    id = format_args!("{:#010x}", frame.id),
                    %err,
                    "dropping undecodable frame"
                );
                return;
            }
        };
        self.handle_message(&message);
    }

    fn handle_message(&mut self, message: &Message) {
        match message.mti {
            Mti::VERIFY_NODE_ID_ADDRESSED => {
                let own = match self.address.alias_bytes() {
                    Ok(bytes) => bytes,
                    Err(_) => return,
                };
                if message.payload.as_ref() == own {
                    self.log_reply(self.verified_node_id());
                } else {
                    trace!("verify request for another alias");
                }
            }
            Mti::VERIFY_NODE_ID_GLOBAL => {
                self.log_reply(self.verified_node_id());
            }
            Mti::PROTOCOL_SUPPORT_INQUIRY => {
                if let Some(peer) = &message.source {
                    self.log_reply(self.protocol_support_reply(peer));
                }
            }
            Mti::PRODUCER_CONSUMER_EVENT_REPORT => {
                let event_id = match EventId::from_slice(&message.payload) {
                    Ok(id) => id,
                    Err(err) => {
                        trace!(%err, "dropping malformed event report");
                        return;
                    }
                };
                match self.consumers.dispatch(&event_id, message) {
                    Ok(()) => {}
                    Err(OlcbError::NotRegistered(_)) => {
                        trace!(event = %event_id, "no consumer registered");
                    }
                    Err(err) => warn!(%err, "consumer dispatch failed"),
                }
            }
            Mti::DATAGRAM => self.handle_datagram_frame(message),
            other => {
                trace!(mti = %other, "unhandled message");
                if let Some(handler) = self.unknown_handler.as_mut() {
                    handler(message);
                }
            }
        }
    }

    fn handle_datagram_frame(&mut self, message: &Message) {
        let own_alias = match self.address.alias() {
            Ok(alias) => alias,
            Err(_) => return,
        };
        let target = message.destination.as_ref().and_then(|d| d.alias().ok());
        if target != Some(own_alias) {
            trace!("datagram frame for another node");
            return;
        }
        let source = match &message.source {
            Some(source) => *source,
            None => return,
        };
        let source_alias = match source.alias() {
            Ok(alias) => alias,
            Err(_) => return,
        };
        match self
            .reassembly
            .accept(source_alias, message.tag, message.payload.clone())
        {
            Ok(Some(payload)) => {
                debug!(source_alias, len = payload.len(), "datagram complete");
                let datagram = Datagram::new(payload, source, self.address);
                if let Some(handler) = self.datagram_handler.as_mut() {
                    handler(&datagram);
                }
            }
            Ok(None) => {}
            Err(err) => debug!(source_alias, %err, "dropping datagram fragment"),
        }
    }

    fn log_reply(&self, result: Result<()>) {
        if let Err(err) = result {
            warn!(%err, "failed to send reply");
        }
    }
}

/// Fluent configuration for a [`Node`].
pub struct NodeBuilder {
    address: Address,
    transports: Vec<Arc<dyn Transport>>,
    protocols: ProtocolSet,
    datagram_handler: Option<DatagramHandler>,
    unknown_handler: Option<MessageHandler>,
}

impl NodeBuilder {
    /// Attach a transport. May be called more than once; sends go to
    /// every attached transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transports.push(transport);
        self
    }

    /// Add protocols to the advertised support set.
    pub fn protocols(mut self, protocols: ProtocolSet) -> Self {
        self.protocols |= protocols;
        self
    }

    /// Install the handler for reassembled inbound datagrams.
    pub fn datagram_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Datagram) + Send + 'static,
    {
        self.datagram_handler = Some(Box::new(handler));
        self
    }

    /// Install the handler for messages no built-in rule covers.
    pub fn unknown_handler<F>(mut self, handler: F) -> Self
    where
        F: FnMut(&Message) + Send + 'static,
    {
        self.unknown_handler = Some(Box::new(handler));
        self
    }

    /// Bring the node up.
    ///
    /// Assigns a temporary alias (the low 12 bits of the full id) when
    /// none is set, announces the node and its inbound listener on every
    /// transport, and broadcasts Initialization-Complete (the Simple
    /// variant when the protocol set contains the Simple subset flag).
    pub fn start(self) -> Result<NodeHandle> {
        let mut address = self.address;
        if !address.has_alias() {
            let temporary = (address.as_u64()? & u64::from(ALIAS_MAX)) as u16;
            address.set_alias(temporary)?;
            debug!(alias = format_args!("{temporary:#05x}"), "assigned temporary alias");
        }

        let transports = self.transports;
        let node = Node {
            address,
            transports: transports.clone(),
            consumers: ConsumerRegistry::new(),
            reassembly: ReassemblyQueue::new(),
            protocols: self.protocols,
            datagram_handler: self.datagram_handler,
            unknown_handler: self.unknown_handler,
        };
        let handle = NodeHandle {
            inner: Arc::new(Mutex::new(node)),
        };

        for transport in &transports {
            transport.register_connected_device(&address);
            let weak = Arc::downgrade(&handle.inner);
            transport.register_listener(Box::new(move |frame| {
                if let Some(node) = weak.upgrade() {
                    node.lock().handle_frame(frame);
                }
            }));
        }

        let mti = if self.protocols.contains(ProtocolSet::SIMPLE_PROTOCOL_SUBSET) {
            Mti::INITIALIZATION_COMPLETE_SIMPLE
        } else {
            Mti::INITIALIZATION_COMPLETE
        };
        let announce = Message::new(
            mti,
            Bytes::copy_from_slice(&address.full()?),
            Some(address),
        )?;
        handle.inner.lock().send(&announce)?;
        debug!(address = %address, "node started");

        Ok(handle)
    }
}

/// Cloneable, lock-per-operation handle to a started [`Node`].
///
/// The node lock is not reentrant and is held while consumers and the
/// datagram/unknown handlers run. A handler that calls back into a
/// captured `NodeHandle` during dispatch will deadlock; queue such work
/// and perform it after dispatch returns.
#[derive(Clone)]
pub struct NodeHandle {
    inner: Arc<Mutex<Node>>,
}

impl NodeHandle {
    /// Lock the node for a sequence of operations.
    pub fn lock(&self) -> MutexGuard<'_, Node> {
        self.inner.lock()
    }

    /// This node's address.
    pub fn address(&self) -> Address {
        *self.inner.lock().address()
    }

    /// See [`Node::send`].
    pub fn send(&self, message: &Message) -> Result<()> {
        self.inner.lock().send(message)
    }

    /// See [`Node::produce`].
    pub fn produce(&self, event: u64) -> Result<()> {
        self.inner.lock().produce(event)
    }

    /// See [`Node::send_datagram`].
    pub fn send_datagram(&self, destination: &Address, payload: Bytes) -> Result<()> {
        self.inner.lock().send_datagram(destination, payload)
    }

    /// See [`Node::add_consumer`].
    pub fn add_consumer<C: Consumer + 'static>(&self, event: u64, consumer: C) -> Result<()> {
        self.inner.lock().add_consumer(event, consumer)
    }

    /// See [`Node::remove_consumer`].
    pub fn remove_consumer(&self, event: u64) -> Result<()> {
        self.inner.lock().remove_consumer(event)
    }

    /// See [`Node::replace_consumer`].
    pub fn replace_consumer<C: Consumer + 'static>(&self, event: u64, consumer: C) -> Result<()> {
        self.inner.lock().replace_consumer(event, consumer)
    }

    /// See [`Node::run_consumer`].
    pub fn run_consumer(&self, event: u64) -> Result<()> {
        self.inner.lock().run_consumer(event)
    }

    /// See [`Node::verify_node_id`].
    pub fn verify_node_id(&self, destination: Option<&Address>) -> Result<()> {
        self.inner.lock().verify_node_id(destination)
    }

    /// See [`Node::verified_node_id`].
    pub fn verified_node_id(&self) -> Result<()> {
        self.inner.lock().verified_node_id()
    }

    /// See [`Node::add_supported_protocol`].
    pub fn add_supported_protocol(&self, protocols: ProtocolSet) {
        self.inner.lock().add_supported_protocol(protocols);
    }

    /// See [`Node::supported_protocols`].
    pub fn supported_protocols(&self) -> ProtocolSet {
        self.inner.lock().supported_protocols()
    }

    /// See [`Node::protocol_support_reply`].
    pub fn protocol_support_reply(&self, destination: &Address) -> Result<()> {
        self.inner.lock().protocol_support_reply(destination)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::transport::LoopbackBus;

    use super::*;

    const TEST_ID: &str = "05.01.01.01.8C.00";

    fn test_node() -> Node {
        Node {
            address: {
                let mut addr = Address::from_hex_str(TEST_ID).unwrap();
                addr.set_alias(0x8C0).unwrap();
                addr
            },
            transports: Vec::new(),
            consumers: ConsumerRegistry::new(),
            reassembly: ReassemblyQueue::new(),
            protocols: ProtocolSet::NONE,
            datagram_handler: None,
            unknown_handler: None,
        }
    }

    #[test]
    fn test_send_without_transport() {
        let node = test_node();
        let message = Message::new(
            Mti::INITIALIZATION_COMPLETE,
            Bytes::new(),
            Some(*node.address()),
        )
        .unwrap();
        assert!(matches!(node.send(&message), Err(OlcbError::NoTransport)));
    }

    #[test]
    fn test_start_assigns_temporary_alias() {
        let mut bus = LoopbackBus::new();
        let node = Node::builder(Address::from_hex_str(TEST_ID).unwrap())
            .transport(bus.port())
            .start()
            .unwrap();
        // Low 12 bits of ..8C.00.
        assert_eq!(node.address().alias().unwrap(), 0xC00);
    }

    #[test]
    fn test_start_broadcasts_initialization_complete() {
        let mut bus = LoopbackBus::new();
        let observer = bus.port();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            observer.register_listener(Box::new(move |frame| {
                seen.lock().push(frame.clone());
            }));
        }

        Node::builder(Address::from_hex_str(TEST_ID).unwrap())
            .transport(bus.port())
            .start()
            .unwrap();
        bus.pump_all();

        let frames = seen.lock();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].id, 0x19100C00);
        assert_eq!(
            frames[0].data(),
            &[0x05, 0x01, 0x01, 0x01, 0x8C, 0x00]
        );
    }

    #[test]
    fn test_start_simple_subset_variant() {
        let mut bus = LoopbackBus::new();
        let observer = bus.port();
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            observer.register_listener(Box::new(move |frame| {
                seen.lock().push(frame.id);
            }));
        }

        Node::builder(Address::from_hex_str(TEST_ID).unwrap())
            .transport(bus.port())
            .protocols(ProtocolSet::SIMPLE_PROTOCOL_SUBSET)
            .start()
            .unwrap();
        bus.pump_all();

        // Initialization_Complete_Simple is MTI 0x0101.
        assert_eq!(*seen.lock(), vec![0x19101C00]);
    }

    #[test]
    fn test_run_consumer_invokes_locally() {
        let mut node = test_node();
        let hits = Arc::new(AtomicUsize::new(0));
        {
            let hits = Arc::clone(&hits);
            node.add_consumer(7, move |_message: &Message| {
                hits.fetch_add(1, Ordering::SeqCst);
            })
            .unwrap();
        }
        node.run_consumer(7).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        assert!(matches!(
            node.run_consumer(8),
            Err(OlcbError::NotRegistered(_))
        ));
    }

    #[test]
    fn test_run_consumer_qualified_id_payload_verbatim() {
        let mut node = test_node();
        let qualified = 0x0102_0304_0506_0708u64;
        let seen = Arc::new(Mutex::new(Vec::new()));
        {
            let seen = Arc::clone(&seen);
            node.add_consumer(qualified, move |message: &Message| {
                seen.lock().push(message.payload.clone());
            })
            .unwrap();
        }
        node.run_consumer(qualified).unwrap();

        let seen = seen.lock();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0].as_ref(),
            &[0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]
        );
    }

    #[test]
    fn test_verify_addressed_ignores_other_alias() {
        let mut node = test_node();
        // Addressed to alias 0x123, not ours. No transport attached, so a
        // reply attempt would be logged, not sent; the point is no panic
        // and no state change.
        let message = Message::new(
            Mti::VERIFY_NODE_ID_ADDRESSED,
            Bytes::from_static(&[0x01, 0x23]),
            Some(Address::from_alias(0x456).unwrap()),
        )
        .unwrap();
        node.handle_message(&message);
    }

    #[test]
    fn test_datagram_frame_for_other_node_ignored() {
        let hits = Arc::new(AtomicUsize::new(0));
        let mut node = test_node();
        {
            let hits = Arc::clone(&hits);
            node.datagram_handler = Some(Box::new(move |_datagram| {
                hits.fetch_add(1, Ordering::SeqCst);
            }));
        }

        let other = Message::new(Mti::DATAGRAM, Bytes::from_static(b"x"), Some(Address::from_alias(0x111).unwrap()))
            .unwrap()
            .with_destination(Address::from_alias(0x999).unwrap());
        node.handle_message(&other);
        assert_eq!(hits.load(Ordering::SeqCst), 0);

        let ours = Message::new(Mti::DATAGRAM, Bytes::from_static(b"x"), Some(Address::from_alias(0x111).unwrap()))
            .unwrap()
            .with_destination(Address::from_alias(0x8C0).unwrap());
        node.handle_message(&ours);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unknown_handler_receives_unmatched() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let mut node = test_node();
        {
            let seen = Arc::clone(&seen);
            node.unknown_handler = Some(Box::new(move |message: &Message| {
                seen.lock().push(message.mti);
            }));
        }

        let message = Message::new(
            Mti::LEARN_EVENT,
            Bytes::from_static(&[0u8; 8]),
            Some(Address::from_alias(0x111).unwrap()),
        )
        .unwrap();
        node.handle_message(&message);
        assert_eq!(*seen.lock(), vec![Mti::LEARN_EVENT]);
    }
}
