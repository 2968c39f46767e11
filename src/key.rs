//! Internal key codec.
//!
//! An internal key is the user key followed by an 8-byte little-endian
//! trailer packing `(sequence << 8) | value_type`:
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────┐
//! │ user key (var)   │ trailer u64 LE: seq (56b) | type (8b)│
//! └──────────────────┴──────────────────────────────────────┘
//! ```
//!
//! Ordering is defined by [`InternalKeyComparator`](crate::comparator::InternalKeyComparator).

use std::fmt;

use crate::error::{Error, Result};
use crate::types::{MAX_SEQUENCE, SequenceNumber, ValueType};

/// Width of the packed sequence/type trailer.
pub const TRAILER_LEN: usize = 8;

#[inline]
fn pack_trailer(seq: SequenceNumber, vt: ValueType) -> u64 {
    (seq << 8) | vt.as_u8() as u64
}

/// Write `user_key ‖ trailer(seq, vt)` into `dst`, replacing its contents.
///
/// `dst` is reused across calls by the batch apply path, so it is cleared
/// rather than reallocated.
pub fn make_internal_key(
    dst: &mut Vec<u8>,
    user_key: &[u8],
    seq: SequenceNumber,
    vt: ValueType,
) -> Result<()> {
    if seq > MAX_SEQUENCE {
        return Err(Error::SequenceOverflow(seq));
    }
    dst.clear();
    dst.reserve(user_key.len() + TRAILER_LEN);
    dst.extend_from_slice(user_key);
    dst.extend_from_slice(&pack_trailer(seq, vt).to_le_bytes());
    Ok(())
}

/// Borrowed view of a decoded internal key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedInternalKey<'a> {
    pub user_key: &'a [u8],
    pub sequence: SequenceNumber,
    pub value_type: ValueType,
}

/// Split an internal key into its parts.
pub fn parse_internal_key(ik: &[u8]) -> Result<ParsedInternalKey<'_>> {
    if ik.len() < TRAILER_LEN {
        return Err(Error::Corruption("invalid internal key length".into()));
    }
    let (user_key, trailer) = ik.split_at(ik.len() - TRAILER_LEN);
    let mut buf = [0u8; TRAILER_LEN];
    buf.copy_from_slice(trailer);
    let num = u64::from_le_bytes(buf);
    let tag = (num & 0xff) as u8;
    let value_type = ValueType::try_from(tag)
        .map_err(|_| Error::Corruption(format!("invalid internal key type {tag:#x}")))?;
    Ok(ParsedInternalKey {
        user_key,
        sequence: num >> 8,
        value_type,
    })
}

/// User-key prefix of an internal key. Short input is returned unchanged.
pub fn extract_user_key(ik: &[u8]) -> &[u8] {
    &ik[..ik.len().saturating_sub(TRAILER_LEN)]
}

/// Owned internal key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct InternalKey(Vec<u8>);

impl InternalKey {
    pub fn new(user_key: &[u8], seq: SequenceNumber, vt: ValueType) -> Result<Self> {
        let mut buf = Vec::new();
        make_internal_key(&mut buf, user_key, seq, vt)?;
        Ok(InternalKey(buf))
    }

    /// Key that positions a seek at the newest entry visible at `seq`.
    pub fn for_seek(user_key: &[u8], seq: SequenceNumber) -> Result<Self> {
        Self::new(user_key, seq, ValueType::SEEK)
    }

    /// Wrap already-encoded bytes after checking they parse.
    pub fn decode_from(bytes: Vec<u8>) -> Result<Self> {
        parse_internal_key(&bytes)?;
        Ok(InternalKey(bytes))
    }

    pub fn user_key(&self) -> &[u8] {
        extract_user_key(&self.0)
    }

    pub fn parse(&self) -> ParsedInternalKey<'_> {
        // Construction guarantees a valid trailer.
        match parse_internal_key(&self.0) {
            Ok(p) => p,
            Err(_) => unreachable!("InternalKey holds a validated encoding"),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }
}

impl AsRef<[u8]> for InternalKey {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for InternalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let p = self.parse();
        write!(
            f,
            "{:?}@{}:{:?}",
            String::from_utf8_lossy(p.user_key),
            p.sequence,
            p.value_type
        )
    }
}
