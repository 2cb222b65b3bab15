//! In-process loopback bus.
//!
//! [`LoopbackBus`] models a shared CAN segment entirely in memory. Each
//! participant takes a [`BusPort`] (a [`Transport`] implementation);
//! frames written to any port are queued on the bus and handed to every
//! *other* port's listeners when the bus is pumped. A port never hears
//! its own transmissions, matching a CAN controller that filters out
//! self-originated traffic.
//!
//! Delivery is explicit: queued frames sit until [`LoopbackBus::pump`]
//! or [`LoopbackBus::pump_all`] runs, which keeps test scenarios
//! deterministic and lets callers interleave traffic precisely.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::address::Address;
use crate::error::Result;
use crate::protocol::CanFrame;

use super::{FrameListener, Transport};

type FrameQueue = Arc<Mutex<VecDeque<(usize, CanFrame)>>>;

/// A shared in-memory CAN segment.
#[derive(Default)]
pub struct LoopbackBus {
    queue: FrameQueue,
    ports: Vec<Arc<BusPort>>,
}

impl LoopbackBus {
    /// Create a bus with no ports attached.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach a new port to the bus.
    pub fn port(&mut self) -> Arc<BusPort> {
        let port = Arc::new(BusPort {
            id: self.ports.len(),
            queue: Arc::clone(&self.queue),
            listeners: Mutex::new(Vec::new()),
            devices: Mutex::new(Vec::new()),
        });
        self.ports.push(Arc::clone(&port));
        port
    }

    /// Deliver every frame currently queued, in FIFO order.
    ///
    /// Frames enqueued by listeners *during* this pass are left for the
    /// next call. Returns the number of frames delivered.
    pub fn pump(&self) -> usize {
        let pending: Vec<(usize, CanFrame)> = {
            let mut queue = self.queue.lock();
            queue.drain(..).collect()
        };

        for (sender, frame) in &pending {
            for port in &self.ports {
                if port.id == *sender {
                    continue;
                }
                let mut listeners = port.listeners.lock();
                for listener in listeners.iter_mut() {
                    listener(frame);
                }
            }
        }
        pending.len()
    }

    /// Pump repeatedly until the queue stays empty.
    ///
    /// Covers request/reply exchanges where delivering one frame makes a
    /// node enqueue another. Returns the total number of frames
    /// delivered.
    pub fn pump_all(&self) -> usize {
        let mut total = 0;
        loop {
            let delivered = self.pump();
            if delivered == 0 {
                return total;
            }
            total += delivered;
        }
    }

    /// Frames queued and not yet delivered.
    pub fn pending(&self) -> usize {
        self.queue.lock().len()
    }
}

/// One attachment point on a [`LoopbackBus`].
pub struct BusPort {
    id: usize,
    queue: FrameQueue,
    listeners: Mutex<Vec<FrameListener>>,
    devices: Mutex<Vec<Address>>,
}

impl BusPort {
    /// Addresses announced on this port via
    /// [`Transport::register_connected_device`].
    pub fn connected_devices(&self) -> Vec<Address> {
        self.devices.lock().clone()
    }
}

impl Transport for BusPort {
    fn send_raw(&self, frame: &CanFrame) -> Result<()> {
        trace!(port = self.id, id = format_args!("{:#010x}", frame.id), "queueing frame");
        self.queue.lock().push_back((self.id, frame.clone()));
        Ok(())
    }

    fn register_listener(&self, listener: FrameListener) {
        self.listeners.lock().push(listener);
    }

    fn register_connected_device(&self, address: &Address) {
        self.devices.lock().push(*address);
    }
}
