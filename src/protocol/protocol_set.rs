//! Protocol-support bitmask.
//!
//! Nodes advertise the protocol features they implement as a 3-byte
//! bitmask carried in the Protocol-Support-Reply payload. Sets compose
//! with bitwise OR and iterate as their 3 constituent bytes in
//! transmission order.

/// A set of supported protocol features.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ProtocolSet(u32);

impl ProtocolSet {
    /// The empty set.
    pub const NONE: Self = Self(0);

    pub const SIMPLE_PROTOCOL_SUBSET: Self = Self(0x800000);
    pub const DATAGRAM: Self = Self(0x400000);
    pub const STREAM: Self = Self(0x200000);
    pub const MEMORY_CONFIGURATION: Self = Self(0x100000);
    pub const RESERVATION: Self = Self(0x080000);
    pub const EVENT_EXCHANGE: Self = Self(0x040000);
    pub const IDENTIFICATION: Self = Self(0x020000);
    pub const TEACHING_LEARNING_CONFIGURATION: Self = Self(0x010000);
    pub const REMOTE_BUTTON: Self = Self(0x008000);
    pub const ABBREVIATED_DEFAULT_CDI: Self = Self(0x004000);
    pub const DISPLAY: Self = Self(0x002000);
    pub const SIMPLE_NODE_INFORMATION: Self = Self(0x001000);
    pub const CONFIGURATION_DESCRIPTION_INFORMATION: Self = Self(0x000800);
    pub const TRAIN_CONTROL: Self = Self(0x000400);
    pub const FUNCTION_DESCRIPTION_INFORMATION: Self = Self(0x000200);
    pub const FUNCTION_CONFIGURATION: Self = Self(0x000040);
    pub const FIRMWARE_UPGRADE: Self = Self(0x000020);
    pub const FIRMWARE_UPGRADE_ACTIVE: Self = Self(0x000010);

    /// Create a set from a raw 3-byte mask.
    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & 0xFF_FFFF)
    }

    /// The raw mask value.
    pub const fn into_bits(self) -> u32 {
        self.0
    }

    /// Whether every flag of `other` is present in this set.
    pub const fn contains(self, other: ProtocolSet) -> bool {
        self.0 & other.0 == other.0
    }

    /// Whether no flag is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The mask as the 3 payload bytes of a Protocol-Support-Reply,
    /// most-significant byte first.
    pub const fn to_bytes(self) -> [u8; 3] {
        [
            (self.0 >> 16) as u8,
            (self.0 >> 8) as u8,
            self.0 as u8,
        ]
    }
}

impl std::ops::BitOr for ProtocolSet {
    type Output = Self;
    fn bitor(self, rhs: Self) -> Self::Output {
        Self(self.0 | rhs.0)
    }
}

impl std::ops::BitOrAssign for ProtocolSet {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl IntoIterator for ProtocolSet {
    type Item = u8;
    type IntoIter = std::array::IntoIter<u8, 3>;
    fn into_iter(self) -> Self::IntoIter {
        self.to_bytes().into_iter()
    }
}
