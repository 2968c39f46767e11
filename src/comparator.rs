use std::cmp::Ordering;

use crate::key::TRAILER_LEN;

/// Ordering policy over keys.
///
/// The skip list calls `compare` for every step of every search, so
/// implementations should be cheap and must be a total order.
pub trait Comparator: Send + Sync {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering;

    /// Human-readable name, persisted by engines to detect comparator changes.
    fn name(&self) -> &str;
}

/// Plain lexicographic byte order.
#[derive(Debug, Default, Clone, Copy)]
pub struct BytewiseComparator;

impl Comparator for BytewiseComparator {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        a.cmp(b)
    }

    fn name(&self) -> &str {
        "leveldb.BytewiseComparator"
    }
}

/// Orders internal keys: user key ascending via the wrapped policy, then the
/// 64-bit trailer descending so newer sequence numbers come first.
///
/// Every key handed to it must carry an 8-byte trailer. A shorter key means
/// a user key leaked into an internal-key store, which is a contract violation.
#[derive(Debug, Default, Clone, Copy)]
pub struct InternalKeyComparator<C> {
    user: C,
}

impl<C: Comparator> InternalKeyComparator<C> {
    pub fn new(user: C) -> Self {
        InternalKeyComparator { user }
    }

    pub fn user_comparator(&self) -> &C {
        &self.user
    }
}

#[inline]
fn split_trailer(key: &[u8]) -> (&[u8], u64) {
    assert!(
        key.len() >= TRAILER_LEN,
        "internal key of {} bytes has no trailer",
        key.len()
    );
    let (user, trailer) = key.split_at(key.len() - TRAILER_LEN);
    let mut buf = [0u8; TRAILER_LEN];
    buf.copy_from_slice(trailer);
    (user, u64::from_le_bytes(buf))
}

impl<C: Comparator> Comparator for InternalKeyComparator<C> {
    fn compare(&self, a: &[u8], b: &[u8]) -> Ordering {
        let (ua, ta) = split_trailer(a);
        let (ub, tb) = split_trailer(b);
        self.user.compare(ua, ub).then_with(|| tb.cmp(&ta))
    }

    fn name(&self) -> &str {
        self.user.name()
    }
}
