use crate::error::{Error, Result};

/// Raw key bytes.
pub type Key = Vec<u8>;

/// Raw value bytes.
pub type Value = Vec<u8>;

/// Monotonically increasing counter assigned to each write record.
pub type SequenceNumber = u64;

/// Largest sequence number an internal key can carry (56 bits).
pub const MAX_SEQUENCE: SequenceNumber = (1 << 56) - 1;

/// Distinguishes puts from deletes.
///
/// The discriminants are the on-wire tags of the batch format and the low
/// byte of an internal key trailer, so they must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    /// A delete (tombstone marker).
    Delete = 0x00,
    /// A normal put operation.
    Put = 0x01,
}

impl ValueType {
    /// Type used when building a seek key: with the sequence set to
    /// [`MAX_SEQUENCE`] it sorts before every real entry of the same user key.
    pub const SEEK: ValueType = ValueType::Put;

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for ValueType {
    type Error = Error;

    fn try_from(tag: u8) -> Result<Self> {
        match tag {
            0x00 => Ok(ValueType::Delete),
            0x01 => Ok(ValueType::Put),
            _ => Err(Error::Corruption(format!("invalid value type {tag:#x}"))),
        }
    }
}
