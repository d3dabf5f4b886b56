use thiserror::Error;

use crate::descriptor::WireKind;

pub type Result<T> = core::result::Result<T, Error>;

/// Failure of a single encode or decode call.
///
/// Every error is terminal for the call that produced it. The cursor is left
/// somewhere within its bounds, callers should discard it and start over with
/// a fresh one.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    #[error("buffer overflow: need {needed} bytes, {remaining} remaining")]
    BufferOverflow { needed: usize, remaining: usize },
    #[error("buffer underflow: need {needed} bytes, {remaining} remaining")]
    BufferUnderflow { needed: usize, remaining: usize },
    #[error("malformed varint: more than 10 bytes or exceeds 64 bits")]
    MalformedVarint,
    #[error("missing required field '{message}.{field}' (tag {tag})")]
    MissingRequiredField {
        message: &'static str,
        field: &'static str,
        tag: u32,
    },
    #[error("field '{field}' (tag {tag}) expects wire type {expected:?}, got {actual}")]
    WireTypeMismatch {
        field: &'static str,
        tag: u32,
        expected: WireKind,
        actual: u8,
    },
    #[error("field '{field}' (tag {tag}) is {len} bytes, max is {max}")]
    FieldTooLarge {
        field: &'static str,
        tag: u32,
        len: usize,
        max: usize,
    },
    #[error("field '{field}' (tag {tag}) has more than {max} elements")]
    TooManyElements {
        field: &'static str,
        tag: u32,
        max: usize,
    },
    #[error("field '{field}' (tag {tag}) appeared more than once")]
    DuplicateField { field: &'static str, tag: u32 },
    #[error("value for field '{field}' (tag {tag}) does not match its descriptor")]
    ValueKindMismatch { field: &'static str, tag: u32 },
    #[error("invalid 'wire type' value: {value}")]
    InvalidWireType { value: u8 },
    #[error("invalid key: {reason}")]
    InvalidKey { reason: InvalidKeyReason },
    #[error("deprecated group encoding not supported")]
    DeprecatedGroupEncoding,
    #[error("length prefix {value} exceeds platform addressable memory")]
    LengthOverflow { value: u64 },
    #[error("invalid UTF-8 in string field")]
    InvalidUtf8,
    #[error("invalid packed field length: {actual} is not a multiple of {expected_multiple}")]
    InvalidPackedLength { expected_multiple: u8, actual: usize },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum InvalidKeyReason {
    EmptyBuffer,
    TagOutOfRange,
}

impl core::fmt::Display for InvalidKeyReason {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            InvalidKeyReason::EmptyBuffer => write!(f, "empty buffer"),
            InvalidKeyReason::TagOutOfRange => write!(f, "tag out of range"),
        }
    }
}

/// A [`MessageDescriptor`](crate::descriptor::MessageDescriptor) that breaks
/// one of the schema invariants.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DescriptorError {
    #[error("message '{message}': tag {tag} is outside 1..=536870911")]
    TagOutOfRange { message: &'static str, tag: u32 },
    #[error("message '{message}': tag {tag} is used by '{first}' and '{second}'")]
    DuplicateTag {
        message: &'static str,
        tag: u32,
        first: &'static str,
        second: &'static str,
    },
    #[error("message '{message}': field name '{field}' is declared twice")]
    DuplicateName {
        message: &'static str,
        field: &'static str,
    },
    #[error("message '{message}': field '{field}' cannot use wire kind {wire_kind:?}")]
    WireKindMismatch {
        message: &'static str,
        field: &'static str,
        wire_kind: WireKind,
    },
    #[error("message '{message}': field '{field}': {reason}")]
    InvalidOption {
        message: &'static str,
        field: &'static str,
        reason: &'static str,
    },
}
