use crate::error::{Error, Result};

/// The iteration abstraction exposed by the memtable.
///
/// Positioning calls return `Ok(true)` when they land on an entry and
/// `Ok(false)` when they run off either end. After [`release`](Self::release)
/// every positioning call fails with [`Error::IteratorReleased`].
pub trait StorageIterator {
    /// Move to the first entry in range.
    fn first(&mut self) -> Result<bool>;

    /// Move to the last entry in range.
    fn last(&mut self) -> Result<bool>;

    /// Move to the first entry with key >= target.
    fn seek(&mut self, key: &[u8]) -> Result<bool>;

    /// Advance. From an exhausted backward walk this restarts at `first`.
    fn next(&mut self) -> Result<bool>;

    /// Step back. From an exhausted forward walk this restarts at `last`.
    fn prev(&mut self) -> Result<bool>;

    /// Returns the current key. Empty when not valid.
    fn key(&self) -> &[u8];

    /// Returns the current value. Empty when not valid.
    fn value(&self) -> &[u8];

    /// Returns true if the iterator is positioned at a live entry.
    fn is_valid(&self) -> bool;

    /// Sticky error from the last failed positioning call, if any.
    fn error(&self) -> Option<&Error>;

    /// Detach from the source. Idempotent.
    fn release(&mut self);
}

/// Half-open key range `[start, limit)`.
///
/// `None` for `start` means before all keys, `None` for `limit` means after
/// all keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyRange {
    pub start: Option<Vec<u8>>,
    pub limit: Option<Vec<u8>>,
}

impl KeyRange {
    pub fn new(start: Option<&[u8]>, limit: Option<&[u8]>) -> Self {
        KeyRange {
            start: start.map(<[u8]>::to_vec),
            limit: limit.map(<[u8]>::to_vec),
        }
    }

    /// Every key starting with `prefix`, under bytewise ordering.
    pub fn prefix(prefix: &[u8]) -> Self {
        let mut limit = None;
        for i in (0..prefix.len()).rev() {
            if prefix[i] != 0xff {
                let mut l = prefix[..=i].to_vec();
                l[i] += 1;
                limit = Some(l);
                break;
            }
        }
        KeyRange {
            start: Some(prefix.to_vec()),
            limit,
        }
    }
}
