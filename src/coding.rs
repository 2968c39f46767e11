//! Varint and fixed-width helpers for the batch wire format.

/// Longest encoding of a u64 varint.
pub const MAX_VARINT_LEN64: usize = 10;

/// Longest encoding of a u32 varint; used to size record reservations.
pub const MAX_VARINT_LEN32: usize = 5;

/// Append `v` as an unsigned LEB128 varint. Returns the number of bytes written.
pub fn put_uvarint(dst: &mut Vec<u8>, mut v: u64) -> usize {
    const B: u64 = 0x80;
    let start = dst.len();
    while v >= B {
        dst.push(((v & (B - 1)) | B) as u8);
        v >>= 7;
    }
    dst.push(v as u8);
    dst.len() - start
}

/// Decode an unsigned varint from the front of `data`.
///
/// Returns `(value, bytes_read)`, or `None` if the input ends mid-varint or
/// the value overflows 64 bits.
pub fn get_uvarint(data: &[u8]) -> Option<(u64, usize)> {
    let mut x: u64 = 0;
    let mut shift = 0u32;
    for (i, &b) in data.iter().enumerate() {
        if i == MAX_VARINT_LEN64 {
            return None;
        }
        if b < 0x80 {
            if i == MAX_VARINT_LEN64 - 1 && b > 1 {
                return None;
            }
            return Some((x | (b as u64) << shift, i + 1));
        }
        x |= ((b & 0x7f) as u64) << shift;
        shift += 7;
    }
    None
}

pub fn decode_fixed_u64(data: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf.copy_from_slice(&data[..8]);
    u64::from_le_bytes(buf)
}

pub fn decode_fixed_u32(data: &[u8]) -> u32 {
    let mut buf = [0u8; 4];
    buf.copy_from_slice(&data[..4]);
    u32::from_le_bytes(buf)
}
