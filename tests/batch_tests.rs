// Write batch encoding
// Building records, dump/load, header framing, and corrupt input.

use lsm_memdb::batch::{
    BATCH_HEADER_LEN, BatchReplay, batches_len, decode_batch_header, encode_batch_header,
};
use lsm_memdb::{Batch, BatchRecord, Error, ValueType};

/// Records replayed into a plain list, for checking order.
#[derive(Default)]
struct Recorder {
    ops: Vec<(ValueType, Vec<u8>, Vec<u8>)>,
}

impl BatchReplay for Recorder {
    fn put(&mut self, key: &[u8], value: &[u8]) {
        self.ops.push((ValueType::Put, key.to_vec(), value.to_vec()));
    }

    fn delete(&mut self, key: &[u8]) {
        self.ops.push((ValueType::Delete, key.to_vec(), Vec::new()));
    }
}

fn reason(err: Error) -> String {
    match err {
        Error::BatchCorrupted(r) => r,
        other => panic!("expected BatchCorrupted, got {other:?}"),
    }
}

// =============================================================================
// Test 1: Empty batch
// =============================================================================
#[test]
fn empty_batch() {
    let b = Batch::new();
    assert_eq!(b.len(), 0);
    assert!(b.is_empty());
    assert!(b.dump().is_empty());
    assert_eq!(b.internal_len(), 0);
    assert_eq!(b.iter().count(), 0);
}

// =============================================================================
// Test 2: Exact record bytes
// =============================================================================
#[test]
fn record_encoding_bytes() {
    let mut b = Batch::new();
    b.put(b"k1", b"v1");
    b.delete(b"k2");
    assert_eq!(
        b.dump(),
        &[0x01, 0x02, b'k', b'1', 0x02, b'v', b'1', 0x00, 0x02, b'k', b'2']
    );
    assert_eq!(b.len(), 2);
}

// =============================================================================
// Test 3: Header scenario: Put k1/v1, Delete k2 at seq 100
// =============================================================================
#[test]
fn encode_with_header() {
    let mut b = Batch::new();
    b.put(b"k1", b"v1");
    b.delete(b"k2");
    let buf = b.encode(100).unwrap();

    assert_eq!(buf.len(), BATCH_HEADER_LEN + b.dump().len());
    assert_eq!(&buf[..8], &100u64.to_le_bytes());
    assert_eq!(&buf[8..12], &2u32.to_le_bytes());
    assert_eq!(decode_batch_header(&buf).unwrap(), (100, 2));
    assert_eq!(&buf[..12], &encode_batch_header(100, 2).unwrap());
}

// =============================================================================
// Test 4: Dump then load yields the same records
// =============================================================================
#[test]
fn dump_load_preserves_records() {
    let mut b = Batch::new();
    b.put(b"alpha", b"1");
    b.delete(b"beta");
    b.put(b"", b"");
    b.put(b"gamma", &[0u8; 300]);

    let mut loaded = Batch::new();
    loaded.load(b.dump().to_vec()).unwrap();

    assert_eq!(loaded.len(), 4);
    assert_eq!(loaded.internal_len(), b.internal_len());
    assert_eq!(loaded.dump(), b.dump());
    let records: Vec<_> = loaded.iter().collect();
    assert_eq!(
        records,
        vec![
            BatchRecord::Put { key: b"alpha", value: b"1" },
            BatchRecord::Delete { key: b"beta" },
            BatchRecord::Put { key: b"", value: b"" },
            BatchRecord::Put { key: b"gamma", value: &[0u8; 300] },
        ]
    );
}

// =============================================================================
// Test 5: Replay follows append order
// =============================================================================
#[test]
fn replay_in_order() {
    let mut b = Batch::new();
    b.put(b"x", b"1");
    b.delete(b"x");
    b.put(b"x", b"2");

    let mut rec = Recorder::default();
    b.replay(&mut rec);
    assert_eq!(
        rec.ops,
        vec![
            (ValueType::Put, b"x".to_vec(), b"1".to_vec()),
            (ValueType::Delete, b"x".to_vec(), vec![]),
            (ValueType::Put, b"x".to_vec(), b"2".to_vec()),
        ]
    );
}

// =============================================================================
// Test 6: Record accessors
// =============================================================================
#[test]
fn record_accessors() {
    let mut b = Batch::new();
    b.put(b"k", b"v");
    b.delete(b"d");
    let recs: Vec<_> = b.iter().collect();
    assert_eq!(recs[0].value_type(), ValueType::Put);
    assert_eq!(recs[0].key(), b"k");
    assert_eq!(recs[0].value(), Some(&b"v"[..]));
    assert_eq!(recs[1].value_type(), ValueType::Delete);
    assert_eq!(recs[1].value(), None);
}

// =============================================================================
// Test 7: Bad type tag
// =============================================================================
#[test]
fn load_rejects_unknown_tag() {
    let mut b = Batch::new();
    let err = b.load(vec![0x07, 0x01, b'k']).unwrap_err();
    assert_eq!(reason(err), "bad record: invalid type 0x7");
    assert!(b.is_empty());
}

// =============================================================================
// Test 8: Truncated key
// =============================================================================
#[test]
fn load_rejects_truncated_key() {
    let mut b = Batch::new();
    // put, key length 5, only 2 key bytes
    let err = b.load(vec![0x01, 0x05, b'a', b'b']).unwrap_err();
    assert_eq!(reason(err), "bad record: invalid key length");

    // key length varint itself cut off
    let err = b.load(vec![0x00, 0x80]).unwrap_err();
    assert_eq!(reason(err), "bad record: invalid key length");
}

// =============================================================================
// Test 9: Truncated value
// =============================================================================
#[test]
fn load_rejects_truncated_value() {
    let mut good = Batch::new();
    good.put(b"key", b"value");
    let mut data = good.dump().to_vec();
    data.pop();

    let mut b = Batch::new();
    let err = b.load(data).unwrap_err();
    assert_eq!(reason(err), "bad record: invalid value length");

    // Put with no value part at all.
    let err = b.load(vec![0x01, 0x01, b'k']).unwrap_err();
    assert_eq!(reason(err), "bad record: invalid value length");
}

// =============================================================================
// Test 10: A failed load leaves the batch empty but usable
// =============================================================================
#[test]
fn failed_load_resets() {
    let mut b = Batch::new();
    b.put(b"keep", b"me");
    assert!(b.load(vec![0xff]).is_err());
    assert!(b.is_empty());
    assert_eq!(b.internal_len(), 0);

    b.put(b"again", b"ok");
    assert_eq!(b.len(), 1);
}

// =============================================================================
// Test 11: Header framing: too short, count mismatch
// =============================================================================
#[test]
fn load_with_header_checks() {
    let mut b = Batch::new();
    let err = b.load_with_header(vec![0; BATCH_HEADER_LEN - 1]).unwrap_err();
    assert_eq!(reason(err), "too short");

    let mut src = Batch::new();
    src.put(b"a", b"1");
    src.put(b"b", b"2");
    let mut buf = src.encode(7).unwrap();
    buf[8] = 3; // claim three records

    let err = b.load_with_header(buf).unwrap_err();
    assert_eq!(reason(err), "invalid records length: 3 vs 2");

    let seq = b.load_with_header(src.encode(7).unwrap()).unwrap();
    assert_eq!(seq, 7);
    assert_eq!(b.len(), 2);
    assert_eq!(b.dump(), src.dump());
}

// =============================================================================
// Test 12: Header-only buffer is an empty batch
// =============================================================================
#[test]
fn header_only_is_empty_batch() {
    let mut b = Batch::new();
    let seq = b.load_with_header(encode_batch_header(42, 0).unwrap().to_vec()).unwrap();
    assert_eq!(seq, 42);
    assert!(b.is_empty());
}

// =============================================================================
// Test 13: Header record count is range-checked, never truncated
// =============================================================================
#[test]
#[cfg(target_pointer_width = "64")]
fn header_rejects_count_beyond_u32() {
    let fits = encode_batch_header(9, u32::MAX as usize).unwrap();
    assert_eq!(decode_batch_header(&fits).unwrap(), (9, u32::MAX as usize));

    let too_many = u32::MAX as usize + 1;
    let err = encode_batch_header(9, too_many).unwrap_err();
    assert!(matches!(err, Error::BatchTooLarge(n) if n == too_many));
    assert!(!err.is_corrupted());
}

// =============================================================================
// Test 14: Append concatenates and keeps both batches readable
// =============================================================================
#[test]
fn append_concatenates() {
    let mut a = Batch::new();
    a.put(b"a1", b"x");
    let mut b = Batch::new();
    b.delete(b"b1");
    b.put(b"b2", b"yy");

    a.append(&b);
    assert_eq!(a.len(), 3);
    assert_eq!(a.internal_len(), (2 + 1 + 8) + (2 + 8) + (2 + 2 + 8));
    let keys: Vec<_> = a.iter().map(|r| r.key().to_vec()).collect();
    assert_eq!(keys, vec![b"a1".to_vec(), b"b1".to_vec(), b"b2".to_vec()]);
    assert_eq!(a.iter().nth(2).unwrap().value(), Some(&b"yy"[..]));

    // The concatenated stream decodes to the same records.
    let mut loaded = Batch::new();
    loaded.load(a.dump().to_vec()).unwrap();
    assert_eq!(loaded.iter().collect::<Vec<_>>(), a.iter().collect::<Vec<_>>());

    // Appending into an empty batch.
    let mut empty = Batch::new();
    empty.append(&b);
    assert_eq!(empty.iter().collect::<Vec<_>>(), b.iter().collect::<Vec<_>>());
    assert_eq!(batches_len(&[&a, &b, &empty]), 3 + 2 + 2);
}

// =============================================================================
// Test 15: Reset keeps the batch reusable
// =============================================================================
#[test]
fn reset_then_reuse() {
    let mut b = Batch::with_capacity(128);
    b.put(b"a", b"1");
    b.reset();
    assert!(b.is_empty());
    assert!(b.dump().is_empty());
    b.delete(b"z");
    assert_eq!(b.dump(), &[0x00, 0x01, b'z']);
}

// =============================================================================
// Test 16: Large batch survives damped growth
// =============================================================================
#[test]
fn many_records() {
    let mut b = Batch::new();
    for i in 0..10_000u32 {
        b.put(&i.to_be_bytes(), &[i as u8; 3]);
    }
    assert_eq!(b.len(), 10_000);
    let mut loaded = Batch::new();
    loaded.load(b.dump().to_vec()).unwrap();
    assert_eq!(loaded.len(), 10_000);
    let last = loaded.iter().last().unwrap();
    assert_eq!(last.key(), &9_999u32.to_be_bytes());
}

mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn op() -> impl Strategy<Value = (bool, Vec<u8>, Vec<u8>)> {
        (
            any::<bool>(),
            prop::collection::vec(any::<u8>(), 0..24),
            prop::collection::vec(any::<u8>(), 0..200),
        )
    }

    proptest! {
        #[test]
        fn load_accepts_whatever_dump_produced(ops in prop::collection::vec(op(), 0..64)) {
            let mut b = Batch::new();
            for (is_put, k, v) in &ops {
                if *is_put { b.put(k, v) } else { b.delete(k) }
            }

            let mut loaded = Batch::new();
            loaded.load(b.dump().to_vec()).unwrap();
            prop_assert_eq!(loaded.len(), ops.len());
            for ((is_put, k, v), rec) in ops.iter().zip(loaded.iter()) {
                prop_assert_eq!(rec.key(), k.as_slice());
                if *is_put {
                    prop_assert_eq!(rec.value(), Some(v.as_slice()));
                } else {
                    prop_assert_eq!(rec.value(), None);
                }
            }
        }

        #[test]
        fn load_never_panics_on_garbage(data in prop::collection::vec(any::<u8>(), 0..256)) {
            let mut b = Batch::new();
            match b.load(data) {
                Ok(()) => prop_assert!(b.len() <= 256),
                Err(err) => {
                    prop_assert!(err.is_corrupted());
                    prop_assert!(b.is_empty());
                }
            }
        }
    }
}
