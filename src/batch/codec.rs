//! Batch wire format.
//!
//! ```text
//! ┌──────────────┬─────────────────┬──────────────────────────────┐
//! │ seq (8B, LE) │ count (4B, LE)  │ record * count               │
//! └──────────────┴─────────────────┴──────────────────────────────┘
//! ```
//!
//! Several batches may share one header (group commit): their record
//! streams are concatenated and `count` is the total.

use std::io::Write;

use tracing::{trace, warn};

use crate::batch::{Batch, BatchIndex};
use crate::coding::{decode_fixed_u32, decode_fixed_u64, get_uvarint};
use crate::comparator::{Comparator, InternalKeyComparator};
use crate::error::{Error, Result};
use crate::key::make_internal_key;
use crate::memtable::MemTable;
use crate::types::{MAX_SEQUENCE, SequenceNumber, ValueType};

/// Header size: 8-byte sequence + 4-byte record count.
pub const BATCH_HEADER_LEN: usize = 8 + 4;

fn corrupted(offset: usize, reason: impl Into<String>) -> Error {
    let reason = reason.into();
    warn!(offset, %reason, "rejecting corrupt batch");
    Error::BatchCorrupted(reason)
}

/// Fails with `BatchTooLarge` if `count` does not fit in 32 bits.
pub fn encode_batch_header(seq: SequenceNumber, count: usize) -> Result<[u8; BATCH_HEADER_LEN]> {
    let count = u32::try_from(count).map_err(|_| Error::BatchTooLarge(count))?;
    let mut buf = [0u8; BATCH_HEADER_LEN];
    buf[..8].copy_from_slice(&seq.to_le_bytes());
    buf[8..].copy_from_slice(&count.to_le_bytes());
    Ok(buf)
}

/// Returns `(seq, record_count)`.
pub fn decode_batch_header(data: &[u8]) -> Result<(SequenceNumber, usize)> {
    if data.len() < BATCH_HEADER_LEN {
        return Err(corrupted(0, "too short"));
    }
    let seq = decode_fixed_u64(data);
    let count = decode_fixed_u32(&data[8..]) as usize;
    Ok((seq, count))
}

/// Read `varint(len) ‖ bytes` at `*o`. Returns `(pos, len)` of the bytes
/// and advances `*o` past them, or `None` if either part is truncated.
fn read_len_prefixed(data: &[u8], o: &mut usize) -> Option<(usize, usize)> {
    let (x, n) = get_uvarint(&data[*o..])?;
    let start = *o + n;
    let len = usize::try_from(x).ok()?;
    if len > data.len() - start {
        return None;
    }
    *o = start + len;
    Some((start, len))
}

/// Walk a header-less record stream until the buffer is exhausted, calling
/// `f(i, record)` for each record in order.
pub(crate) fn decode_batch<F>(data: &[u8], mut f: F) -> Result<()>
where
    F: FnMut(usize, BatchIndex) -> Result<()>,
{
    let mut o = 0;
    let mut i = 0;
    while o < data.len() {
        let at = o;
        let tag = data[o];
        let value_type = ValueType::try_from(tag)
            .map_err(|_| corrupted(at, format!("bad record: invalid type {tag:#x}")))?;
        o += 1;

        let (key_pos, key_len) = read_len_prefixed(data, &mut o)
            .ok_or_else(|| corrupted(at, "bad record: invalid key length"))?;

        let (value_pos, value_len) = match value_type {
            ValueType::Put => read_len_prefixed(data, &mut o)
                .ok_or_else(|| corrupted(at, "bad record: invalid value length"))?,
            ValueType::Delete => (0, 0),
        };

        f(
            i,
            BatchIndex {
                value_type,
                key_pos,
                key_len,
                value_pos,
                value_len,
            },
        )?;
        i += 1;
    }
    Ok(())
}

/// Recovery path: decode a header-framed buffer straight into `mem`.
///
/// Record `i` is inserted under sequence `seq + i`. Fails if the stream holds
/// more or fewer records than the header declares; records decoded before a
/// failure stay in `mem`. Returns `(seq, record_count)`.
pub fn decode_batch_to_mem<C: Comparator>(
    data: &[u8],
    mem: &MemTable<InternalKeyComparator<C>>,
) -> Result<(SequenceNumber, usize)> {
    let (seq, batch_len) = decode_batch_header(data)?;
    let body = &data[BATCH_HEADER_LEN..];
    // An empty batch builds no internal key, so its sequence is not checked.
    if batch_len > 0 {
        let last = seq.checked_add(batch_len as u64 - 1);
        if last.is_none_or(|last| last > MAX_SEQUENCE) {
            return Err(Error::SequenceOverflow(last.unwrap_or(seq)));
        }
    }

    let mut list = mem.list().write();
    let mut ik = Vec::new();
    let mut decoded = 0;
    decode_batch(body, |i, rec| {
        if i >= batch_len {
            return Err(corrupted(BATCH_HEADER_LEN, "invalid records length"));
        }
        make_internal_key(&mut ik, rec.key(body), seq + i as u64, rec.value_type)?;
        list.put(&ik, rec.value(body));
        decoded += 1;
        Ok(())
    })?;
    if decoded != batch_len {
        return Err(corrupted(
            BATCH_HEADER_LEN,
            format!("invalid records length: {batch_len} vs {decoded}"),
        ));
    }
    Ok((seq, batch_len))
}

/// Total records across `batches`.
pub fn batches_len(batches: &[&Batch]) -> usize {
    batches.iter().map(|b| b.len()).sum()
}

/// Write one header for all `batches`, then each batch's record stream.
pub fn write_batches_with_header<W: Write + ?Sized>(
    wr: &mut W,
    batches: &[&Batch],
    seq: SequenceNumber,
) -> Result<()> {
    let count = batches_len(batches);
    wr.write_all(&encode_batch_header(seq, count)?)?;
    for batch in batches {
        wr.write_all(batch.dump())?;
    }
    trace!(seq, count, batches = batches.len(), "wrote batches with header");
    Ok(())
}
