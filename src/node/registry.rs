//! Consumer registry for dispatching event reports by event id.
//!
//! The registry maps 8-byte event ids to consumers. Unlike bus traffic,
//! registry misuse is a programmer error and is surfaced immediately:
//! double registration fails, dispatching to an unregistered id fails.
//! Removing an absent id is a no-op.
//!
//! # Example
//!
//! ```
//! use olcb::node::ConsumerRegistry;
//! use olcb::protocol::EventId;
//!
//! let mut registry = ConsumerRegistry::new();
//! registry
//!     .add(EventId::from_u64(1), |_msg: &olcb::protocol::Message| {
//!         println!("turnout thrown");
//!     })
//!     .unwrap();
//! assert!(registry.contains(&EventId::from_u64(1)));
//! ```

use std::collections::HashMap;

use crate::error::{OlcbError, Result};
use crate::protocol::{EventId, Message};

/// Trait for event consumers.
///
/// Consumers receive the decoded Producer/Consumer Event Report message,
/// so richer handlers can inspect the sender.
///
/// When registered on a node, consumers run under the node lock during
/// dispatch and must not call back into the node synchronously.
pub trait Consumer: Send {
    /// Handle one received event report.
    fn on_event(&mut self, message: &Message);
}

impl<F> Consumer for F
where
    F: FnMut(&Message) + Send,
{
    fn on_event(&mut self, message: &Message) {
        self(message)
    }
}

/// Registry mapping event ids to consumers.
#[derive(Default)]
pub struct ConsumerRegistry {
    consumers: HashMap<EventId, Box<dyn Consumer>>,
}

impl ConsumerRegistry {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            consumers: HashMap::new(),
        }
    }

    /// Register a consumer for an event id.
    ///
    /// Fails with [`OlcbError::AlreadyRegistered`] if the id is taken.
    pub fn add<C: Consumer + 'static>(&mut self, event_id: EventId, consumer: C) -> Result<()> {
        if self.consumers.contains_key(&event_id) {
            return Err(OlcbError::AlreadyRegistered(event_id));
        }
        self.consumers.insert(event_id, Box::new(consumer));
        Ok(())
    }

    /// Deregister the consumer for an event id. No-op when absent.
    pub fn remove(&mut self, event_id: &EventId) {
        self.consumers.remove(event_id);
    }

    /// Replace (or install) the consumer for an event id.
    pub fn replace<C: Consumer + 'static>(&mut self, event_id: EventId, consumer: C) -> Result<()> {
        self.remove(&event_id);
        self.add(event_id, consumer)
    }

    /// Invoke the consumer registered for an event id.
    ///
    /// Fails with [`OlcbError::NotRegistered`] when absent.
    pub fn dispatch(&mut self, event_id: &EventId, message: &Message) -> Result<()> {
        let consumer = self
            .consumers
            .get_mut(event_id)
            .ok_or(OlcbError::NotRegistered(*event_id))?;
        consumer.on_event(message);
        Ok(())
    }

    /// Whether a consumer is registered for an event id.
    pub fn contains(&self, event_id: &EventId) -> bool {
        self.consumers.contains_key(event_id)
    }

    /// Number of registered consumers.
    pub fn len(&self) -> usize {
        self.consumers.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.consumers.is_empty()
    }
}
