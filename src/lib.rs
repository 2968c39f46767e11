//! # LSM memtable and write batches
//!
//! The write path of a log-structured-merge key/value engine:
//!
//! - [`memtable`]: an arena-backed skip list keeping recent writes sorted,
//!   safe for one writer and many readers.
//! - [`batch`]: the write batch, its binary encoding, and replay into the
//!   memtable under consecutive sequence numbers.
//! - [`key`]: internal keys (user key + sequence + type) and their ordering.
//!
//! ## Core idea
//! Writes are grouped into a batch, the batch is logged, then applied to the
//! memtable with one sequence number per record. Internal keys sort by user
//! key ascending and sequence descending, so a scan sees the newest version
//! of each key first.
//!
//! ```
//! use lsm_memdb::{Batch, BytewiseComparator, InternalKeyComparator, MemTable};
//! use lsm_memdb::key::{InternalKey, parse_internal_key};
//!
//! let mem = MemTable::new(InternalKeyComparator::new(BytewiseComparator), 4096);
//! let mut batch = Batch::new();
//! batch.put(b"k", b"v");
//! batch.put_mem(100, &mem).unwrap();
//!
//! let seek = InternalKey::for_seek(b"k", 200).unwrap();
//! let (ik, value) = mem.find(seek.as_bytes()).unwrap();
//! assert_eq!(parse_internal_key(&ik).unwrap().sequence, 100);
//! assert_eq!(value, b"v");
//! ```

pub mod batch;
pub mod coding;
pub mod comparator;
pub mod error;
pub mod iterator;
pub mod key;
pub mod memtable;
pub mod options;
pub mod types;

// Public re-exports for the top-level API
pub use batch::{Batch, BatchRecord, BatchReplay};
pub use comparator::{BytewiseComparator, Comparator, InternalKeyComparator};
pub use error::{Error, Result};
pub use iterator::{KeyRange, StorageIterator};
pub use memtable::{MemTable, MemTableIterator};
pub use options::Options;
pub use types::{Key, MAX_SEQUENCE, SequenceNumber, Value, ValueType};
