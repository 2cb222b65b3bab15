//! Datagram reassembly, keyed by originating alias.
//!
//! Each sending peer gets its own entry, so concurrent multi-frame
//! datagrams from different aliases never share a buffer. Per alias the
//! machine has two states:
//! - *idle*: no entry; only an untagged frame (complete in itself) or a
//!   "first" frame is meaningful
//! - *collecting*: an entry holds the frames received so far, in arrival
//!   order, until the "last" frame closes it
//!
//! A "first" frame always resets its alias's entry; an interrupted
//! datagram from the same peer is dropped, not merged. A middle or last
//! frame with no open entry is rejected with
//! [`OlcbError::UnexpectedFragment`] and discarded.
//!
//! Entries are never evicted on abandonment: a peer that goes silent
//! mid-datagram leaves its entry allocated until its next "first" frame.

use std::collections::HashMap;

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::{OlcbError, Result};
use crate::protocol::FrameTag;

/// Per-source-alias reassembly state.
#[derive(Debug, Default)]
pub struct ReassemblyQueue {
    /// Open entries: frames collected so far for each sending alias.
    entries: HashMap<u16, Vec<Bytes>>,
}

impl ReassemblyQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Feed one decoded datagram frame into the machine.
    ///
    /// Returns `Ok(Some(payload))` when a datagram completed (either a
    /// single untagged frame or a closed multi-frame sequence),
    /// `Ok(None)` while collecting, and
    /// [`OlcbError::UnexpectedFragment`] for a middle/last frame with no
    /// open entry.
    pub fn accept(
        &mut self,
        source_alias: u16,
        tag: Option<FrameTag>,
        payload: Bytes,
    ) -> Result<Option<Bytes>> {
        match tag {
            // Single-frame datagram: complete without touching the queue.
            None => Ok(Some(payload)),

            Some(FrameTag::First) => {
                if let Some(stale) = self.entries.insert(source_alias, vec![payload]) {
                    debug!(
                        source_alias,
                        frames = stale.len(),
                        "discarding interrupted datagram"
                    );
                }
                Ok(None)
            }

            Some(FrameTag::Middle) => {
                let entry = self
                    .entries
                    .get_mut(&source_alias)
                    .ok_or(OlcbError::UnexpectedFragment { source_alias })?;
                entry.push(payload);
                Ok(None)
            }

            Some(FrameTag::Last) => {
                let mut entry = self
                    .entries
                    .remove(&source_alias)
                    .ok_or(OlcbError::UnexpectedFragment { source_alias })?;
                entry.push(payload);

                let mut assembled = BytesMut::new();
                for frame in &entry {
                    assembled.extend_from_slice(frame);
                }
                Ok(Some(assembled.freeze()))
            }
        }
    }

    /// Whether an entry is open for this alias.
    pub fn is_collecting(&self, source_alias: u16) -> bool {
        self.entries.contains_key(&source_alias)
    }

    /// Number of open entries.
    pub fn open_entries(&self) -> usize {
        self.entries.len()
    }
}
