//! Transport abstraction.
//!
//! A [`Transport`] carries raw CAN frames between a node and whatever
//! physical or virtual bus sits behind it. The node layer is transport
//! agnostic: it hands fully encoded [`CanFrame`]s to `send_raw` and
//! receives inbound frames through a registered listener callback.
//!
//! [`loopback`] provides an in-process bus for wiring nodes together in
//! tests and demos without real hardware.

mod loopback;

pub use loopback::{BusPort, LoopbackBus};

use crate::address::Address;
use crate::error::Result;
use crate::protocol::CanFrame;

/// Callback invoked for every frame arriving on a transport.
pub type FrameListener = Box<dyn FnMut(&CanFrame) + Send>;

/// A bidirectional CAN frame carrier.
pub trait Transport: Send + Sync {
    /// Write one frame to the bus.
    fn send_raw(&self, frame: &CanFrame) -> Result<()>;

    /// Register a callback for inbound frames.
    ///
    /// A transport may hold multiple listeners; each inbound frame is
    /// offered to all of them in registration order.
    fn register_listener(&self, listener: FrameListener);

    /// Announce a node that sends and receives through this transport.
    ///
    /// Transports that track bus membership (alias tables, filters) use
    /// this; others may ignore it.
    fn register_connected_device(&self, address: &Address);
}
