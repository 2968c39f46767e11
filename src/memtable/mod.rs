pub mod iter;
pub mod skiplist;

use parking_lot::RwLock;
use tracing::debug;

use crate::comparator::{BytewiseComparator, Comparator};
use crate::error::Result;
use crate::iterator::KeyRange;
use crate::options::Options;
use crate::types::{Key, Value};

pub use iter::MemTableIterator;
use skiplist::SkipList;

/// In-memory sorted buffer for writes. Wraps a [`SkipList`] in a RwLock.
///
/// Every write goes here first. When size exceeds the threshold the engine
/// freezes it and flushes it to a sorted table.
///
/// Mutations take the write lock for the whole find-and-splice, reads take
/// the read lock. Iterators lock per positioning call, so they may observe
/// writes that land between calls; the sequence numbers in internal keys
/// are what give snapshot reads one layer up.
pub struct MemTable<C = BytewiseComparator> {
    list: RwLock<SkipList<C>>,
    write_buffer_size: usize,
}

impl<C: Comparator> MemTable<C> {
    /// Create an empty memtable with default options and the given initial
    /// arena capacity.
    pub fn new(cmp: C, capacity: usize) -> Self {
        let opts = Options::default().with_capacity(capacity);
        debug!(capacity, comparator = cmp.name(), "memtable created");
        MemTable {
            write_buffer_size: opts.write_buffer_size,
            list: RwLock::new(SkipList::with_capacity(cmp, capacity)),
        }
    }

    /// Create an empty memtable from validated options.
    pub fn with_options(cmp: C, opts: &Options) -> Result<Self> {
        let list = SkipList::with_options(cmp, opts)?;
        debug!(
            capacity = opts.capacity,
            max_height = opts.max_height,
            seed = opts.seed,
            comparator = list.comparator().name(),
            "memtable created"
        );
        Ok(MemTable {
            list: RwLock::new(list),
            write_buffer_size: opts.write_buffer_size,
        })
    }

    /// Insert or update a key-value pair.
    pub fn put(&self, key: &[u8], value: &[u8]) {
        self.list.write().put(key, value);
    }

    /// Remove `key`. Fails with `NotFound` if absent.
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.list.write().delete(key)
    }

    /// Value stored under exactly `key`.
    pub fn get(&self, key: &[u8]) -> Result<Value> {
        self.list.read().get(key).map(<[u8]>::to_vec)
    }

    /// First entry with key >= `key`, for successor lookups.
    pub fn find(&self, key: &[u8]) -> Result<(Key, Value)> {
        self.list
            .read()
            .find(key)
            .map(|(k, v)| (k.to_vec(), v.to_vec()))
    }

    pub fn contains(&self, key: &[u8]) -> bool {
        self.list.read().contains(key)
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.list.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.read().is_empty()
    }

    /// Live key+value bytes.
    pub fn size(&self) -> usize {
        self.list.read().size()
    }

    /// Key/value buffer capacity.
    pub fn capacity(&self) -> usize {
        self.list.read().capacity()
    }

    /// Key/value buffer headroom before it has to grow.
    pub fn free(&self) -> usize {
        self.list.read().free()
    }

    /// Check if memtable has reached the flush threshold.
    pub fn is_full(&self) -> bool {
        self.size() >= self.write_buffer_size
    }

    /// Restore the empty state, keeping buffers for reuse.
    pub fn reset(&self) {
        let mut list = self.list.write();
        list.reset();
        debug!(capacity = list.capacity(), "memtable reset");
    }

    /// Iterator over `range`, or over everything when `range` is `None`.
    ///
    /// The iterator is not safe to share between threads, but any number of
    /// iterators may run alongside each other and alongside writers.
    pub fn iter(&self, range: Option<KeyRange>) -> MemTableIterator<'_, C> {
        MemTableIterator::new(self, range)
    }

    pub(crate) fn list(&self) -> &RwLock<SkipList<C>> {
        &self.list
    }
}
