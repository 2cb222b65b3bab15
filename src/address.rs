//! Node identity: 48-bit full id and 12-bit CAN alias.
//!
//! An [`Address`] may know either component, or both. A node's own address
//! always carries a full id; addresses observed on the bus usually carry
//! only the alias decoded from a CAN header. Equality therefore works under
//! partial knowledge: two addresses are equal if no field known on both
//! sides disagrees.
//!
//! # Example
//!
//! ```
//! use olcb::Address;
//!
//! let addr = Address::from_hex_str("05.01.01.01.8C.00").unwrap();
//! assert_eq!(addr.as_u64().unwrap(), 0x0501_0101_8C00);
//! assert_eq!(addr.to_string(), "05.01.01.01.8C.00");
//! ```

use std::fmt;

use crate::error::{OlcbError, Result};

/// Width of a full node id in bytes.
pub const FULL_ID_LEN: usize = 6;

/// Highest valid 12-bit alias value.
pub const ALIAS_MAX: u16 = 0x0FFF;

/// A node identity with optionally-known components.
///
/// Once attached to a node at least one of the two fields is set. The full
/// id is immutable in practice after a node starts; the alias may be
/// (re)assigned by the temporary-alias allocation scheme.
#[derive(Debug, Clone, Copy, Default)]
pub struct Address {
    full: Option<[u8; FULL_ID_LEN]>,
    alias: Option<u16>,
}

impl Address {
    /// Create an address from a 6-byte full node id.
    pub fn from_bytes(full: [u8; FULL_ID_LEN]) -> Self {
        Self {
            full: Some(full),
            alias: None,
        }
    }

    /// Create an address from a dotted-hex string such as
    /// `"05.01.01.01.8C.00"`.
    pub fn from_hex_str(s: &str) -> Result<Self> {
        let mut full = [0u8; FULL_ID_LEN];
        let mut count = 0;
        for (slot, part) in full.iter_mut().zip(s.split('.')) {
            // from_str_radix also accepts signed forms like "+0"; only
            // plain hex digits are a valid part.
            if part.is_empty()
                || part.len() > 2
                || !part.bytes().all(|b| b.is_ascii_hexdigit())
            {
                return Err(OlcbError::InvalidEncoding {
                    expected: FULL_ID_LEN,
                });
            }
            *slot = u8::from_str_radix(part, 16).map_err(|_| OlcbError::InvalidEncoding {
                expected: FULL_ID_LEN,
            })?;
            count += 1;
        }
        if count != FULL_ID_LEN || s.split('.').count() != FULL_ID_LEN {
            return Err(OlcbError::InvalidEncoding {
                expected: FULL_ID_LEN,
            });
        }
        Ok(Self::from_bytes(full))
    }

    /// Create an address from an unsigned big-endian integer.
    ///
    /// The value must fit in 48 bits.
    pub fn from_u64(value: u64) -> Result<Self> {
        if value > 0xFFFF_FFFF_FFFF {
            return Err(OlcbError::InvalidEncoding {
                expected: FULL_ID_LEN,
            });
        }
        let wide = value.to_be_bytes();
        let mut full = [0u8; FULL_ID_LEN];
        full.copy_from_slice(&wide[2..]);
        Ok(Self::from_bytes(full))
    }

    /// Create an address known only by its 12-bit alias, as decoded from a
    /// CAN header.
    pub fn from_alias(alias: u16) -> Result<Self> {
        if alias > ALIAS_MAX {
            return Err(OlcbError::InvalidEncoding { expected: 2 });
        }
        Ok(Self {
            full: None,
            alias: Some(alias),
        })
    }

    /// Whether the full 48-bit id is known.
    pub fn has_full(&self) -> bool {
        self.full.is_some()
    }

    /// Whether the 12-bit alias is known.
    pub fn has_alias(&self) -> bool {
        self.alias.is_some()
    }

    /// The full id bytes.
    pub fn full(&self) -> Result<[u8; FULL_ID_LEN]> {
        self.full.ok_or(OlcbError::MissingField("full address"))
    }

    /// The full id as a big-endian integer.
    pub fn as_u64(&self) -> Result<u64> {
        let full = self.full()?;
        let mut wide = [0u8; 8];
        wide[2..].copy_from_slice(&full);
        Ok(u64::from_be_bytes(wide))
    }

    /// The 12-bit alias.
    pub fn alias(&self) -> Result<u16> {
        self.alias.ok_or(OlcbError::MissingField("alias"))
    }

    /// The alias as the 2-byte big-endian payload form used by
    /// Verify-Node-ID-addressed messages.
    pub fn alias_bytes(&self) -> Result<[u8; 2]> {
        Ok(self.alias()?.to_be_bytes())
    }

    /// Set or reassign the alias, validating the 12-bit range.
    pub fn set_alias(&mut self, alias: u16) -> Result<u16> {
        if alias > ALIAS_MAX {
            return Err(OlcbError::InvalidEncoding { expected: 2 });
        }
        self.alias = Some(alias);
        Ok(alias)
    }

    /// Set the full node id.
    pub fn set_full(&mut self, full: [u8; FULL_ID_LEN]) -> [u8; FULL_ID_LEN] {
        self.full = Some(full);
        full
    }
}

/// Equality under partial knowledge: a field participates only when known
/// on both sides; addresses with disjoint knowledge compare unequal.
///
/// This is deliberately not `Eq`: the relation is not transitive across
/// addresses with partial knowledge. Addresses are never used as map keys.
impl PartialEq for Address {
    fn eq(&self, other: &Self) -> bool {
        match (
            (self.full, other.full),
            (self.alias, other.alias),
        ) {
            ((Some(a), Some(b)), (Some(x), Some(y))) => a == b && x == y,
            ((Some(a), Some(b)), _) => a == b,
            (_, (Some(x), Some(y))) => x == y,
            ((None, None), (None, None)) => true,
            _ => false,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.full {
            Some(full) => {
                let mut first = true;
                for byte in full {
                    if !first {
                        write!(f, ".")?;
                    }
                    write!(f, "{byte:02X}")?;
                    first = false;
                }
                Ok(())
            }
            None => match self.alias {
                Some(alias) => write!(f, "alias {alias:03X}"),
                None => write!(f, "unset"),
            },
        }
    }
}
