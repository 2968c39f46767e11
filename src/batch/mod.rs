//! Write batches: the atomic unit of mutation replayed into the memtable.
//!
//! A batch is one growable buffer of encoded records plus an index of where
//! each record's key and value sit in it:
//!
//! ```text
//! record:  tag(1B) | varint(key_len) | key | [varint(val_len) | value]
//!          tag 0x00 = delete, 0x01 = put; the value part only for put
//! ```
//!
//! `dump`/`load` move that record stream in and out without copying.
//! [`codec`] adds the 12-byte header (sequence + record count) used when a
//! batch is persisted or recovered.

pub mod codec;

use tracing::trace;

use crate::coding::{MAX_VARINT_LEN32, put_uvarint};
use crate::comparator::{Comparator, InternalKeyComparator};
use crate::error::{Error, Result};
use crate::key::{TRAILER_LEN, make_internal_key};
use crate::memtable::MemTable;
use crate::types::{MAX_SEQUENCE, SequenceNumber, ValueType};

pub use codec::{
    BATCH_HEADER_LEN, batches_len, decode_batch_header, decode_batch_to_mem, encode_batch_header,
    write_batches_with_header,
};

/// Above this many records the buffer grows by a shrinking fraction of its
/// current size instead of doubling.
const BATCH_GROW_REC: usize = 3000;

/// Sink for [`Batch::replay`].
pub trait BatchReplay {
    fn put(&mut self, key: &[u8], value: &[u8]);
    fn delete(&mut self, key: &[u8]);
}

/// Location of one record inside the batch buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct BatchIndex {
    pub(crate) value_type: ValueType,
    pub(crate) key_pos: usize,
    pub(crate) key_len: usize,
    pub(crate) value_pos: usize,
    pub(crate) value_len: usize,
}

impl BatchIndex {
    #[inline]
    pub(crate) fn key<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        &data[self.key_pos..self.key_pos + self.key_len]
    }

    #[inline]
    pub(crate) fn value<'a>(&self, data: &'a [u8]) -> &'a [u8] {
        match self.value_type {
            ValueType::Put => &data[self.value_pos..self.value_pos + self.value_len],
            ValueType::Delete => &[],
        }
    }

    fn record<'a>(&self, data: &'a [u8]) -> BatchRecord<'a> {
        match self.value_type {
            ValueType::Put => BatchRecord::Put {
                key: self.key(data),
                value: self.value(data),
            },
            ValueType::Delete => BatchRecord::Delete { key: self.key(data) },
        }
    }

    #[inline]
    fn internal_len(&self) -> usize {
        self.key_len + self.value_len + TRAILER_LEN
    }
}

/// Borrowed view of one batch record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchRecord<'a> {
    Put { key: &'a [u8], value: &'a [u8] },
    Delete { key: &'a [u8] },
}

impl<'a> BatchRecord<'a> {
    pub fn value_type(&self) -> ValueType {
        match self {
            BatchRecord::Put { .. } => ValueType::Put,
            BatchRecord::Delete { .. } => ValueType::Delete,
        }
    }

    pub fn key(&self) -> &'a [u8] {
        match *self {
            BatchRecord::Put { key, .. } | BatchRecord::Delete { key } => key,
        }
    }

    pub fn value(&self) -> Option<&'a [u8]> {
        match *self {
            BatchRecord::Put { value, .. } => Some(value),
            BatchRecord::Delete { .. } => None,
        }
    }
}

/// An ordered group of puts and deletes applied together.
///
/// Not synchronized: build it on one thread, then replay or apply it once.
#[derive(Debug, Default, Clone)]
pub struct Batch {
    data: Vec<u8>,
    index: Vec<BatchIndex>,
    // Sum of key + value + trailer over all records: the arena growth a
    // full apply will cost the memtable.
    internal_len: usize,
}

impl Batch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty batch with `n` bytes of buffer preallocated.
    pub fn with_capacity(n: usize) -> Self {
        Batch {
            data: Vec::with_capacity(n),
            ..Self::default()
        }
    }

    /// Append a put of `key` → `value`.
    pub fn put(&mut self, key: &[u8], value: &[u8]) {
        self.append_rec(ValueType::Put, key, value);
    }

    /// Append a delete of `key`.
    pub fn delete(&mut self, key: &[u8]) {
        self.append_rec(ValueType::Delete, key, &[]);
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    pub fn internal_len(&self) -> usize {
        self.internal_len
    }

    /// Clear for reuse. Capacity is kept.
    pub fn reset(&mut self) {
        self.data.clear();
        self.index.clear();
        self.internal_len = 0;
    }

    /// The encoded record stream, without header. Feed it back to [`load`](Self::load).
    pub fn dump(&self) -> &[u8] {
        &self.data
    }

    /// Replace the contents by decoding `data`, which becomes the batch
    /// buffer as-is.
    ///
    /// On error the batch is left empty.
    pub fn load(&mut self, data: Vec<u8>) -> Result<()> {
        self.decode(data, None)
    }

    /// Decode a header-framed batch (as written by [`write_batches_with_header`])
    /// and return its starting sequence number. The record count in the header
    /// must match the records present.
    pub fn load_with_header(&mut self, mut data: Vec<u8>) -> Result<SequenceNumber> {
        let (seq, count) = decode_batch_header(&data)?;
        data.drain(..BATCH_HEADER_LEN);
        self.decode(data, Some(count))?;
        Ok(seq)
    }

    /// Header + record stream in one buffer.
    pub fn encode(&self, seq: SequenceNumber) -> Result<Vec<u8>> {
        let header = encode_batch_header(seq, self.len())?;
        let mut buf = Vec::with_capacity(BATCH_HEADER_LEN + self.data.len());
        buf.extend_from_slice(&header);
        buf.extend_from_slice(&self.data);
        Ok(buf)
    }

    /// Records in append order.
    pub fn iter(&self) -> impl Iterator<Item = BatchRecord<'_>> + '_ {
        self.index.iter().map(|rec| rec.record(&self.data))
    }

    /// Apply every record, in append order, to `r`.
    pub fn replay<R: BatchReplay + ?Sized>(&self, r: &mut R) {
        for rec in &self.index {
            match rec.value_type {
                ValueType::Put => r.put(rec.key(&self.data), rec.value(&self.data)),
                ValueType::Delete => r.delete(rec.key(&self.data)),
            }
        }
    }

    /// Concatenate `other`'s records after this batch's, keeping order.
    pub fn append(&mut self, other: &Batch) {
        let base = self.data.len();
        let first = self.index.len();
        self.data.extend_from_slice(&other.data);
        self.index.extend_from_slice(&other.index);
        self.internal_len += other.internal_len;

        if base != 0 {
            for rec in &mut self.index[first..] {
                rec.key_pos += base;
                if rec.value_type == ValueType::Put {
                    rec.value_pos += base;
                }
            }
        }
    }

    /// Insert every record into `mem` as an internal key, record `i` getting
    /// sequence `seq + i`. Delete records go in as tombstones with an empty
    /// value.
    ///
    /// The whole sequence range is checked before anything is written, and
    /// the write lock is held for the whole batch.
    pub fn put_mem<C: Comparator>(
        &self,
        seq: SequenceNumber,
        mem: &MemTable<InternalKeyComparator<C>>,
    ) -> Result<()> {
        self.check_sequence_range(seq)?;
        let mut list = mem.list().write();
        let mut ik = Vec::new();
        for (i, rec) in self.index.iter().enumerate() {
            make_internal_key(&mut ik, rec.key(&self.data), seq + i as u64, rec.value_type)?;
            list.put(&ik, rec.value(&self.data));
        }
        trace!(seq, records = self.index.len(), "batch applied to memtable");
        Ok(())
    }

    /// Undo [`put_mem`](Self::put_mem) for the same `seq` by deleting exactly
    /// the internal keys it inserted. Earlier versions of the same user keys
    /// are untouched.
    pub fn revert_mem<C: Comparator>(
        &self,
        seq: SequenceNumber,
        mem: &MemTable<InternalKeyComparator<C>>,
    ) -> Result<()> {
        self.check_sequence_range(seq)?;
        let mut list = mem.list().write();
        let mut ik = Vec::new();
        for (i, rec) in self.index.iter().enumerate() {
            make_internal_key(&mut ik, rec.key(&self.data), seq + i as u64, rec.value_type)?;
            list.delete(&ik)?;
        }
        trace!(seq, records = self.index.len(), "batch reverted from memtable");
        Ok(())
    }

    fn check_sequence_range(&self, seq: SequenceNumber) -> Result<()> {
        if self.index.is_empty() {
            return Ok(());
        }
        let span = self.index.len() as u64 - 1;
        match seq.checked_add(span) {
            Some(last) if last <= MAX_SEQUENCE => Ok(()),
            Some(last) => Err(Error::SequenceOverflow(last)),
            None => Err(Error::SequenceOverflow(seq)),
        }
    }

    /// Reserve room for `n` more bytes. Growth is proportional to the
    /// current size, damped once the batch holds many records.
    fn grow(&mut self, n: usize) {
        let o = self.data.len();
        if self.data.capacity() - o < n {
            let div = if self.index.len() > BATCH_GROW_REC {
                self.index.len() / BATCH_GROW_REC
            } else {
                1
            };
            self.data.reserve_exact(n + o / div);
        }
    }

    fn append_rec(&mut self, value_type: ValueType, key: &[u8], value: &[u8]) {
        let mut n = 1 + MAX_VARINT_LEN32 + key.len();
        if value_type == ValueType::Put {
            n += MAX_VARINT_LEN32 + value.len();
        }
        self.grow(n);

        self.data.push(value_type.as_u8());
        put_uvarint(&mut self.data, key.len() as u64);
        let key_pos = self.data.len();
        self.data.extend_from_slice(key);

        let (value_pos, value_len) = match value_type {
            ValueType::Put => {
                put_uvarint(&mut self.data, value.len() as u64);
                let pos = self.data.len();
                self.data.extend_from_slice(value);
                (pos, value.len())
            }
            ValueType::Delete => (0, 0),
        };

        let rec = BatchIndex {
            value_type,
            key_pos,
            key_len: key.len(),
            value_pos,
            value_len,
        };
        self.internal_len += rec.internal_len();
        self.index.push(rec);
    }

    fn decode(&mut self, data: Vec<u8>, expected: Option<usize>) -> Result<()> {
        self.data = data;
        self.index.clear();
        self.internal_len = 0;
        if let Err(err) = self.decode_index(expected) {
            self.reset();
            return Err(err);
        }
        Ok(())
    }

    fn decode_index(&mut self, expected: Option<usize>) -> Result<()> {
        let Batch {
            data,
            index,
            internal_len,
        } = self;
        codec::decode_batch(data, |_, rec| {
            *internal_len += rec.internal_len();
            index.push(rec);
            Ok(())
        })?;
        match expected {
            Some(n) if n != index.len() => Err(Error::batch_corrupted(format!(
                "invalid records length: {n} vs {}",
                index.len()
            ))),
            _ => Ok(()),
        }
    }
}

impl<C: Comparator> BatchReplay for MemTable<C> {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        MemTable::put(self, key, value);
    }

    fn delete(&mut self, key: &[u8]) {
        // Deleting an absent key is a no-op on replay.
        let _ = MemTable::delete(self, key);
    }
}
