//! Wire format for Google's Protocol Buffers, aka [protobuf](https://protobuf.dev).

use core::num::NonZeroU32;

use crate::buffer::{ReadCursor, WriteCursor};
use crate::error::{Error, InvalidKeyReason, Result};
use crate::leb128;
use crate::util::{CastFrom, unlikely};

/// Minimum value of a protobuf tag.
pub const MINIMUM_TAG_VAL: u32 = 1;
/// Maximum value of a protobuf tag.
pub const MAXIMUM_TAG_VAL: u32 = (1 << 29) - 1;

/// A decoded protobuf field key containing a wire type and tag.
///
/// The layout mirrors the protobuf wire format:
/// * Bits 0-2: wire type (0-5)
/// * Bits 3-31: tag/field number (1 to 2^29-1)
///
/// Since tags start at 1, the minimum raw value is 8 (`1 << 3`), so the key
/// is always non-zero.
#[derive(Clone, Copy, PartialEq, Eq)]
#[repr(transparent)]
pub struct ProtoKey(NonZeroU32);

static_assertions::assert_eq_size!(ProtoKey, Option<ProtoKey>);

#[allow(clippy::as_conversions)]
impl ProtoKey {
    /// Creates a new [`ProtoKey`] from a raw key value, validating the wire type and tag.
    #[inline(always)]
    fn try_from_raw(raw_key: u64) -> Result<Self> {
        let wire_type_raw = (raw_key & 0b111) as u8;
        if unlikely(wire_type_raw > WireType::MAX_VAL) {
            return Err(Error::InvalidWireType {
                value: wire_type_raw,
            });
        }

        let tag = raw_key >> 3;
        if unlikely(tag < u64::from(MINIMUM_TAG_VAL) || tag > u64::from(MAXIMUM_TAG_VAL)) {
            return Err(Error::InvalidKey {
                reason: InvalidKeyReason::TagOutOfRange,
            });
        }

        // The tag check above bounds the key to u32 range and rules out zero.
        NonZeroU32::new(raw_key as u32)
            .map(ProtoKey)
            .ok_or(Error::InvalidKey {
                reason: InvalidKeyReason::TagOutOfRange,
            })
    }

    /// Returns the raw 3-bit wire type code of this key.
    #[inline(always)]
    pub const fn wire_code(self) -> u8 {
        (self.0.get() & 0b111) as u8
    }

    /// Returns the [`WireType`] component of this key.
    #[inline(always)]
    pub fn wire_type(self) -> WireType {
        match self.wire_code() {
            0 => WireType::Varint,
            1 => WireType::I64,
            2 => WireType::Len,
            3 => WireType::SGroup,
            4 => WireType::EGroup,
            // Validated during construction.
            _ => WireType::I32,
        }
    }

    /// Returns the tag/field number component of this key.
    #[inline(always)]
    pub const fn tag(self) -> u32 {
        self.0.get() >> 3
    }

    /// Decomposes this key into its [`WireType`] and tag components.
    #[inline(always)]
    pub fn into_parts(self) -> (WireType, u32) {
        (self.wire_type(), self.tag())
    }
}

impl core::fmt::Debug for ProtoKey {
    #[cold]
    #[inline(never)]
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("ProtoKey")
            .field("wire_type", &self.wire_type())
            .field("tag", &self.tag())
            .finish()
    }
}

/// Encodes the provided tag and wire_type as a protobuf field key.
///
/// See <https://protobuf.dev/programming-guides/encoding>
/// under the "Message Structure" section.
#[inline(always)]
pub fn encode_key(wire_type: WireType, tag: u32, cursor: &mut WriteCursor<'_>) -> Result<usize> {
    let key = (u64::from(tag) << 3) | u64::from(wire_type.into_val());
    leb128::encode_varint(key, cursor)
}

/// Returns the encoded length of a field key (tag + wire type).
#[inline(always)]
pub fn encoded_key_len(tag: u32) -> usize {
    // The wire type only occupies the low 3 bits so it never changes the length.
    leb128::encoded_len(u64::from(tag) << 3)
}

/// Decodes the key from a protobuf encoded message.
#[inline]
pub fn decode_key(cursor: &mut ReadCursor<'_>) -> Result<ProtoKey> {
    if unlikely(cursor.is_empty()) {
        return Err(Error::InvalidKey {
            reason: InvalidKeyReason::EmptyBuffer,
        });
    }
    let raw = leb128::decode_varint(cursor)?;
    ProtoKey::try_from_raw(raw)
}

/// Encodes the length prefix of a length-delimited field.
#[inline(always)]
pub fn encode_len(len: usize, cursor: &mut WriteCursor<'_>) -> Result<usize> {
    leb128::encode_varint(u64::cast_from(len), cursor)
}

/// Returns the size of the length prefix plus the payload itself.
#[inline(always)]
pub fn encoded_len_delimited(len: usize) -> usize {
    leb128::encoded_len(u64::cast_from(len)) + len
}

/// Decodes the length prefix for a length-delimited field.
#[inline(always)]
pub fn decode_len(cursor: &mut ReadCursor<'_>) -> Result<usize> {
    let len = leb128::decode_varint(cursor)?;
    usize::try_from(len).map_err(|_| Error::LengthOverflow { value: len })
}

/// Skips over a field value based on its wire type.
///
/// Protobuf supports backwards and fowards compatiblity by skipping fields
/// we don't know about. We "skip" a field by advancing our cursor past it.
#[inline]
pub fn skip_field(wire_type: WireType, cursor: &mut ReadCursor<'_>) -> Result<()> {
    let skip_len = match wire_type {
        WireType::Varint => {
            leb128::decode_varint(cursor)?;
            return Ok(());
        }
        WireType::I64 => 8,
        WireType::Len => decode_len(cursor)?,
        WireType::I32 => 4,
        WireType::SGroup | WireType::EGroup => {
            return Err(Error::DeprecatedGroupEncoding);
        }
    };
    cursor.skip(skip_len)
}

/// Denotes the type of a field in an encoded protobuf message.
///
/// Protobuf messages are a series of key-value pairs. When encoded each key-value pair
/// is turned into a record consisting of a field number, a [`WireType`], and a payload.
/// The [`WireType`] indicates how large the proceeding payload is.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum WireType {
    /// Variable length integer.
    ///
    /// Used for: `int32`, `int64`, `uint32`, `uint64`, `sint32`, `sint64`, `bool`, `enum`.
    Varint = 0,
    /// 64-bit integer.
    ///
    /// Used for: `fixed64`, `sfixed64`, `double`.
    I64 = 1,
    /// Variable length field.
    ///
    /// Used for: `string`, `bytes`, `message`, packed `repeated` fields.
    Len = 2,
    /// Group start (deprecated).
    SGroup = 3,
    /// Group end (deprecated).
    EGroup = 4,
    /// 32-bit integer.
    ///
    /// Used for: `fixed32`, `sfixed32`, `float`.
    I32 = 5,
}

// N.B. It's not super important that these are the same size, but keeping them as such
// allows the compiler to make as many optimizations as possible.
static_assertions::assert_eq_size!(WireType, Option<WireType>);

#[allow(clippy::as_conversions)]
impl WireType {
    /// Maximum value an [`WireType`] can be.
    const MAX_VAL: u8 = WireType::I32 as u8;

    /// Try to decode a [`WireType`] from the provided raw value.
    #[inline(always)]
    fn try_from_val(value: u8) -> Result<Self> {
        match value {
            0 => Ok(WireType::Varint),
            1 => Ok(WireType::I64),
            2 => Ok(WireType::Len),
            3 => Ok(WireType::SGroup),
            4 => Ok(WireType::EGroup),
            5 => Ok(WireType::I32),
            value => Err(Error::InvalidWireType { value }),
        }
    }

    /// Return the raw value for this [`WireType`].
    #[inline(always)]
    pub const fn into_val(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for WireType {
    type Error = Error;

    #[inline(always)]
    fn try_from(value: u8) -> Result<Self> {
        WireType::try_from_val(value)
    }
}
