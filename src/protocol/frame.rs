//! Raw CAN wire unit.
//!
//! A [`CanFrame`] is what the transport boundary carries: a 29-bit extended
//! arbitration id plus 0-8 payload bytes. Uses `bytes::Bytes` for zero-copy
//! payload sharing.

use bytes::Bytes;

use crate::error::{OlcbError, Result};

/// Maximum payload of a classic CAN frame.
pub const MAX_FRAME_DATA: usize = 8;

/// Mask of the 29 significant arbitration-id bits.
pub const EXTENDED_ID_MASK: u32 = 0x1FFF_FFFF;

/// A raw CAN frame as exchanged with a transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CanFrame {
    /// 29-bit arbitration id.
    pub id: u32,
    /// Payload bytes (0-8).
    pub data: Bytes,
    /// Whether this is an extended (29-bit) frame. Standard-id frames are
    /// not part of the protocol and are dropped at decode.
    pub extended: bool,
}

impl CanFrame {
    /// Create an extended frame, validating id width and payload length.
    pub fn new(id: u32, data: Bytes) -> Result<Self> {
        if id & !EXTENDED_ID_MASK != 0 {
            return Err(OlcbError::InvalidEncoding { expected: 4 });
        }
        if data.len() > MAX_FRAME_DATA {
            return Err(OlcbError::InvalidEncoding {
                expected: MAX_FRAME_DATA,
            });
        }
        Ok(Self {
            id,
            data,
            extended: true,
        })
    }

    /// Create an extended frame from a byte slice (copies data).
    pub fn from_parts(id: u32, data: &[u8]) -> Result<Self> {
        Self::new(id, Bytes::copy_from_slice(data))
    }

    /// Get a reference to the payload bytes.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Get the payload length.
    #[inline]
    pub fn data_len(&self) -> usize {
        self.data.len()
    }
}
