//! LEB128 variable-length integer encoding/decoding.
//!
//! Protobuf calls these "varints": 7 data bits per byte, least significant
//! group first, with the high bit of every byte but the last set.

// This module uses `as` casts which have been thoroughly reviewed for correctness.
#![allow(clippy::as_conversions)]

use crate::buffer::{ReadCursor, WriteCursor};
use crate::error::{Error, Result};

/// Maximum number of bytes a LEB128 encoded `u64` can take.
pub const MAX_VARINT_LEN: usize = 10;

/// Encode `value` into `cursor`, returning the number of bytes written.
///
/// The encoded length is computed up front so that a value that does not fit
/// leaves the cursor untouched.
#[inline]
pub fn encode_varint(value: u64, cursor: &mut WriteCursor<'_>) -> Result<usize> {
    let len = encoded_len(value);
    cursor.ensure(len)?;

    let mut scratch = [0u8; MAX_VARINT_LEN];
    let mut value = value;
    for byte in scratch.iter_mut().take(len - 1) {
        *byte = (value as u8) | 0x80;
        value >>= 7;
    }
    scratch[len - 1] = value as u8;

    cursor.write_bytes(&scratch[..len])?;
    Ok(len)
}

/// Decode a varint from the front of `cursor`.
///
/// Returns [`Error::MalformedVarint`] if 10 bytes are consumed without a
/// terminating byte, or if the 10th byte carries bits beyond `u64::MAX`.
/// Returns [`Error::BufferUnderflow`] if the cursor runs dry first.
#[inline]
pub fn decode_varint(cursor: &mut ReadCursor<'_>) -> Result<u64> {
    let chunk = cursor.peek();

    // Fast path, single byte values.
    if let Some(&b) = chunk.first() {
        if crate::util::likely(b < 0x80) {
            cursor.skip(1)?;
            return Ok(u64::from(b));
        }
    }

    let mut value = 0u64;
    for i in 0..MAX_VARINT_LEN {
        let Some(&b) = chunk.get(i) else {
            return Err(Error::BufferUnderflow {
                needed: i + 1,
                remaining: chunk.len(),
            });
        };

        // The 10th byte only holds the single remaining bit of a u64.
        if i == MAX_VARINT_LEN - 1 && b > 0x01 {
            return Err(Error::MalformedVarint);
        }

        value |= u64::from(b & 0x7f) << (7 * i);
        if b < 0x80 {
            cursor.skip(i + 1)?;
            return Ok(value);
        }
    }

    // Uh oh! We've read 10 bytes and didn't find the final byte.
    Err(Error::MalformedVarint)
}

/// Compute the LEB128 encoded length using leading_zeros.
///
/// LEB128 encodes 7 bits per byte. The number of bytes needed is
/// ceil(significant_bits / 7), with a minimum of 1 byte for value 0.
#[inline]
pub fn encoded_len(value: u64) -> usize {
    // Lookup table mapping leading_zeros (0-64) to LEB128 byte count.
    #[rustfmt::skip]
    const LZ_TO_LEN: [u8; 65] = [
        10,                                         // 0:     64 bits -> 10 bytes
        9, 9, 9, 9, 9, 9, 9,                        // 1-7:   63-57 bits -> 9 bytes
        8, 8, 8, 8, 8, 8, 8,                        // 8-14:  56-50 bits -> 8 bytes
        7, 7, 7, 7, 7, 7, 7,                        // 15-21: 49-43 bits -> 7 bytes
        6, 6, 6, 6, 6, 6, 6,                        // 22-28: 42-36 bits -> 6 bytes
        5, 5, 5, 5, 5, 5, 5,                        // 29-35: 35-29 bits -> 5 bytes
        4, 4, 4, 4, 4, 4, 4,                        // 36-42: 28-22 bits -> 4 bytes
        3, 3, 3, 3, 3, 3, 3,                        // 43-49: 21-15 bits -> 3 bytes
        2, 2, 2, 2, 2, 2, 2,                        // 50-56: 14-8 bits  -> 2 bytes
        1, 1, 1, 1, 1, 1, 1, 1,                     // 57-64: 7-0 bits   -> 1 byte
    ];

    LZ_TO_LEN[value.leading_zeros() as usize] as usize
}

#[inline]
pub const fn zigzag_encode_64(n: i64) -> u64 {
    ((n << 1) ^ (n >> 63)) as u64
}

#[inline]
pub const fn zigzag_decode_64(n: u64) -> i64 {
    ((n >> 1) as i64) ^ (-((n & 1) as i64))
}

#[inline]
pub const fn zigzag_encode_32(n: i32) -> u32 {
    ((n << 1) ^ (n >> 31)) as u32
}

#[inline]
pub const fn zigzag_decode_32(n: u32) -> i32 {
    ((n >> 1) as i32) ^ (-((n & 1) as i32))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;
    use proptest::property_test;

    use super::*;

    #[test]
    fn smoketest_varint() {
        #[track_caller]
        fn test_case(val: u64, len: usize) {
            let mut storage = [0u8; 16];
            let mut writer = WriteCursor::new(&mut storage);
            let encode_len = encode_varint(val, &mut writer).unwrap();
            assert_eq!(len, encode_len, "invalid encode length");
            assert_eq!(len, encoded_len(val), "invalid computed length");

            let mut reader = ReadCursor::new(&storage[..]);
            let rnd = decode_varint(&mut reader).unwrap();
            assert_eq!(rnd, val, "invalid value");
            assert_eq!(reader.position(), len, "invalid decode length");
        }

        test_case(0, 1);
        test_case(1, 1);
        test_case(42, 1);
        test_case(127, 1);
        test_case(128, 2);
        test_case(300, 2);
        // First case that spills to multiple words.
        test_case(72057594037927937, 9);
        test_case(u64::MAX, 10);
    }

    #[test]
    fn test_known_encodings() {
        let mut storage = [0u8; 16];
        let mut writer = WriteCursor::new(&mut storage);
        encode_varint(150, &mut writer).unwrap();
        assert_eq!(writer.written(), &[0x96, 0x01]);

        let mut storage = [0u8; 16];
        let mut writer = WriteCursor::new(&mut storage);
        encode_varint(u64::MAX, &mut writer).unwrap();
        assert_eq!(
            writer.written(),
            &[0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x01]
        );
    }

    #[test]
    fn test_encode_overflow_writes_nothing() {
        let mut storage = [0u8; 1];
        let mut writer = WriteCursor::new(&mut storage);
        let err = encode_varint(300, &mut writer).unwrap_err();
        assert_eq!(
            err,
            Error::BufferOverflow {
                needed: 2,
                remaining: 1
            }
        );
        assert_eq!(writer.position(), 0);

        encode_varint(127, &mut writer).unwrap();
        assert_eq!(writer.remaining(), 0);
    }

    #[test]
    fn test_decode_malformed() {
        // Ten continuation bytes.
        let data = [0xffu8; 11];
        let err = decode_varint(&mut ReadCursor::new(&data)).unwrap_err();
        assert_eq!(err, Error::MalformedVarint);

        // Terminated on the 10th byte, but overflows u64.
        let data = [0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0xff, 0x02];
        let err = decode_varint(&mut ReadCursor::new(&data)).unwrap_err();
        assert_eq!(err, Error::MalformedVarint);
    }

    #[test]
    fn test_decode_underflow() {
        let data = [0x80u8, 0x80];
        let mut reader = ReadCursor::new(&data);
        let err = decode_varint(&mut reader).unwrap_err();
        assert!(matches!(err, Error::BufferUnderflow { .. }));
        assert_eq!(reader.position(), 0);

        let err = decode_varint(&mut ReadCursor::new(&[])).unwrap_err();
        assert!(matches!(err, Error::BufferUnderflow { .. }));
    }

    #[test]
    fn test_zigzag_encoding() {
        // Values from the protobuf encoding guide.
        assert_eq!(zigzag_encode_32(0), 0);
        assert_eq!(zigzag_encode_32(-1), 1);
        assert_eq!(zigzag_encode_32(1), 2);
        assert_eq!(zigzag_encode_32(-2), 3);
        assert_eq!(zigzag_encode_32(2147483647), 4294967294);
        assert_eq!(zigzag_encode_32(-2147483648), 4294967295);

        assert_eq!(zigzag_encode_64(0), 0);
        assert_eq!(zigzag_encode_64(-1), 1);
        assert_eq!(zigzag_encode_64(1), 2);
        assert_eq!(zigzag_encode_64(i64::MAX), u64::MAX - 1);
        assert_eq!(zigzag_encode_64(i64::MIN), u64::MAX);
    }

    #[property_test]
    fn proptest_varint_roundtrip(val: u64) {
        let mut storage = [0u8; 16];
        let mut writer = WriteCursor::new(&mut storage);
        let og_len = encode_varint(val, &mut writer).unwrap();

        let mut reader = ReadCursor::new(&storage[..]);
        let rnd = decode_varint(&mut reader).unwrap();
        prop_assert_eq!(rnd, val, "invalid value");
        prop_assert_eq!(reader.position(), og_len, "invalid length");
        prop_assert_eq!(encoded_len(val), og_len);
    }

    #[property_test]
    fn proptest_matches_leb128_crate(val: u64) {
        let mut expected = Vec::new();
        leb128::write::unsigned(&mut expected, val).unwrap();

        let mut storage = [0u8; 16];
        let mut writer = WriteCursor::new(&mut storage);
        encode_varint(val, &mut writer).unwrap();
        prop_assert_eq!(writer.written(), &expected[..]);
    }

    #[property_test]
    fn proptest_zigzag_roundtrip(val: i64) {
        prop_assert_eq!(zigzag_decode_64(zigzag_encode_64(val)), val);
        let narrow = val as i32;
        prop_assert_eq!(zigzag_decode_32(zigzag_encode_32(narrow)), narrow);
    }
}
