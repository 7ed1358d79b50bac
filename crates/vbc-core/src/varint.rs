//! Variable-length integer codec for ledger keys.
//!
//! Signed values are zig-zag mapped to unsigned and then written as
//! little-endian base-128 groups, seven bits per byte with the high bit set on
//! every byte but the last. The byte layout matches Go's
//! `encoding/binary.AppendVarint`, so stores written by other tooling decode
//! identically.
//!
//! | value      | encoding         |
//! |------------|------------------|
//! | 0          | `00`             |
//! | -1         | `01`             |
//! | 1          | `02`             |
//! | 64         | `80 01`          |
//! | `i64::MIN` | `ff .. ff 01`    |

use crate::error::VarintError;

/// Maximum encoded length of a 64-bit value.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode a signed 64-bit value as a varint.
pub fn encode_varint(value: i64) -> Vec<u8> {
    let mut buf = Vec::with_capacity(MAX_VARINT_LEN);
    append_varint(&mut buf, value);
    buf
}

/// Append the varint encoding of `value` to `buf`.
pub fn append_varint(buf: &mut Vec<u8>, value: i64) {
    let mut ux = (value as u64) << 1;
    if value < 0 {
        ux = !ux;
    }
    append_uvarint(buf, ux);
}

fn append_uvarint(buf: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        buf.push((value as u8) | 0x80);
        value >>= 7;
    }
    buf.push(value as u8);
}

/// Decode a varint from the front of `buf`.
///
/// Returns the value and the number of bytes consumed. Trailing bytes after
/// the terminating byte are ignored.
pub fn decode_varint(buf: &[u8]) -> Result<(i64, usize), VarintError> {
    let (ux, n) = decode_uvarint(buf)?;
    let mut value = (ux >> 1) as i64;
    if ux & 1 != 0 {
        value = !value;
    }
    Ok((value, n))
}

fn decode_uvarint(buf: &[u8]) -> Result<(u64, usize), VarintError> {
    let mut value = 0u64;
    let mut shift = 0u32;

    for (i, &byte) in buf.iter().enumerate() {
        if i == MAX_VARINT_LEN {
            return Err(VarintError::Overflow { consumed: i + 1 });
        }
        if byte < 0x80 {
            // The tenth byte may only carry the single remaining bit.
            if i == MAX_VARINT_LEN - 1 && byte > 1 {
                return Err(VarintError::Overflow { consumed: i + 1 });
            }
            return Ok((value | (u64::from(byte) << shift), i + 1));
        }
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
    }

    Err(VarintError::BufferTooSmall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_edge_values_roundtrip() {
        for value in [0, 1, -1, i64::MAX, i64::MIN] {
            let encoded = encode_varint(value);
            let (decoded, n) = decode_varint(&encoded).unwrap();
            assert_eq!(decoded, value);
            assert_eq!(n, encoded.len());
        }
    }

    #[test]
    fn test_known_encodings() {
        assert_eq!(encode_varint(0), vec![0x00]);
        assert_eq!(encode_varint(-1), vec![0x01]);
        assert_eq!(encode_varint(1), vec![0x02]);
        assert_eq!(encode_varint(63), vec![0x7e]);
        assert_eq!(encode_varint(-64), vec![0x7f]);
        assert_eq!(encode_varint(64), vec![0x80, 0x01]);
        assert_eq!(encode_varint(i64::MAX).len(), MAX_VARINT_LEN);

        let mut min = vec![0xff; 9];
        min.push(0x01);
        assert_eq!(encode_varint(i64::MIN), min);
    }

    #[test]
    fn test_empty_buffer_is_too_small() {
        assert_eq!(decode_varint(&[]), Err(VarintError::BufferTooSmall));
    }

    #[test]
    fn test_unterminated_buffer_is_too_small() {
        assert_eq!(decode_varint(&[0x80, 0x80]), Err(VarintError::BufferTooSmall));
    }

    #[test]
    fn test_overflow_on_tenth_byte() {
        let mut buf = vec![0xff; 9];
        buf.push(0x02);
        assert_eq!(
            decode_varint(&buf),
            Err(VarintError::Overflow { consumed: 10 })
        );
    }

    #[test]
    fn test_overflow_on_eleventh_byte() {
        let buf = [0x80u8; 11];
        assert_eq!(
            decode_varint(&buf),
            Err(VarintError::Overflow { consumed: 11 })
        );
    }

    #[test]
    fn test_trailing_bytes_ignored() {
        let (value, n) = decode_varint(&[0x80, 0x01, 0xaa]).unwrap();
        assert_eq!(value, 64);
        assert_eq!(n, 2);
    }

    proptest! {
        #[test]
        fn varint_roundtrips(value: i64) {
            let encoded = encode_varint(value);
            prop_assert!(encoded.len() <= MAX_VARINT_LEN);
            prop_assert_eq!(decode_varint(&encoded).unwrap(), (value, encoded.len()));
        }
    }
}
