//! Datagram fragmentation and joining.
//!
//! A datagram is an arbitrary-length byte payload exchanged between two
//! addressed nodes, carried over one or more 8-byte CAN frames. A payload
//! that fits a single frame is sent untagged; anything longer is split
//! into `ceil(len / 8)` frames tagged first/middle/last so the receiver
//! can reassemble them in order.

use bytes::Bytes;

use crate::address::Address;
use crate::error::Result;
use crate::protocol::frame::MAX_FRAME_DATA;
use crate::protocol::message::Message;
use crate::protocol::mti::{FrameTag, Mti};

/// An arbitrary-length payload between two addressed nodes.
#[derive(Debug, Clone)]
pub struct Datagram {
    /// The datagram contents.
    pub payload: Bytes,
    /// Originating node.
    pub source: Address,
    /// Receiving node.
    pub destination: Address,
}

impl Datagram {
    /// Create a datagram between two nodes.
    pub fn new(payload: Bytes, source: Address, destination: Address) -> Self {
        Self {
            payload,
            source,
            destination,
        }
    }

    /// Split this datagram into the CAN message sequence that carries it.
    ///
    /// One frame's worth of payload (or less, including empty) produces a
    /// single untagged message. Longer payloads produce first/middle/last
    /// tagged messages of 8 bytes each, the final one possibly shorter.
    pub fn to_messages(&self) -> Result<Vec<Message>> {
        let chunks: Vec<Bytes> = if self.payload.len() <= MAX_FRAME_DATA {
            vec![self.payload.clone()]
        } else {
            (0..self.payload.len())
                .step_by(MAX_FRAME_DATA)
                .map(|start| {
                    let end = usize::min(start + MAX_FRAME_DATA, self.payload.len());
                    self.payload.slice(start..end)
                })
                .collect()
        };

        let last = chunks.len() - 1;
        chunks
            .into_iter()
            .enumerate()
            .map(|(index, chunk)| {
                let message = Message::new(Mti::DATAGRAM, chunk, Some(self.source))?
                    .with_destination(self.destination);
                Ok(if last == 0 {
                    message
                } else if index == 0 {
                    message.with_tag(FrameTag::First)
                } else if index == last {
                    message.with_tag(FrameTag::Last)
                } else {
                    message.with_tag(FrameTag::Middle)
                })
            })
            .collect()
    }

    /// Join a message sequence back into a datagram, concatenating the
    /// payloads in list order.
    ///
    /// This is the direct inverse of [`Datagram::to_messages`]; inbound
    /// traffic goes through the node's per-alias reassembly queue instead.
    pub fn from_messages(messages: &[Message]) -> Option<Self> {
        let first = messages.first()?;
        let mut payload = Vec::new();
        for message in messages {
            payload.extend_from_slice(&message.payload);
        }
        Some(Self {
            payload: Bytes::from(payload),
            source: first.source?,
            destination: first.destination?,
        })
    }
}
