//! Descriptor-driven message decoder.
//!
//! Records are read until the cursor is exhausted. Each key is resolved
//! against the [`MessageDescriptor`]; records for unknown tags are skipped
//! (and optionally kept verbatim), everything else is converted into a
//! [`Value`] according to the field's wire and data kinds. Presence of
//! required fields is checked once the whole message has been read, for the
//! top-level message and every embedded one.

// This module uses `as` casts which have been thoroughly reviewed for correctness.
#![allow(clippy::as_conversions)]

use bytes::{Buf, BytesMut};
use smallvec::{SmallVec, smallvec};
use tracing::{debug, trace};

use crate::buffer::ReadCursor;
use crate::config::{DecodeOptions, DuplicatePolicy};
use crate::descriptor::{DataKind, FieldDescriptor, MessageDescriptor, WireKind};
use crate::error::{Error, Result};
use crate::leb128::{decode_varint, zigzag_decode_32, zigzag_decode_64};
use crate::value::{FieldValue, Message, Value};
use crate::wire::{ProtoKey, WireType, decode_key, decode_len, skip_field};

/// Per-field "seen" flags, indexed by declaration order.
type Seen = SmallVec<[bool; 16]>;

/// Deserializes [`Message`]s against their [`MessageDescriptor`].
#[derive(Debug, Copy, Clone, Default)]
pub struct Decoder {
    options: DecodeOptions,
}

impl Decoder {
    /// A decoder with the given options, see also [`Config::decoder`](crate::config::Config::decoder).
    pub fn new(options: DecodeOptions) -> Self {
        Decoder { options }
    }

    /// The options this decoder was created with.
    pub fn options(&self) -> DecodeOptions {
        self.options
    }

    /// Decode every remaining byte of `cursor` as one message.
    pub fn decode(
        &self,
        cursor: &mut ReadCursor<'_>,
        descriptor: &MessageDescriptor,
    ) -> Result<Message> {
        let start = cursor.position();
        match self.decode_message(cursor, descriptor) {
            Ok(message) => {
                let read = cursor.position() - start;
                debug!(message = descriptor.name(), read, "decoded message");
                Ok(message)
            }
            Err(err) => {
                let position = cursor.position();
                debug!(message = descriptor.name(), position, %err, "failed to decode message");
                Err(err)
            }
        }
    }

    /// Decode all of `data` as one message.
    pub fn decode_slice(&self, data: &[u8], descriptor: &MessageDescriptor) -> Result<Message> {
        self.decode(&mut ReadCursor::new(data), descriptor)
    }

    fn decode_message(
        &self,
        cursor: &mut ReadCursor<'_>,
        descriptor: &MessageDescriptor,
    ) -> Result<Message> {
        let mut message = if self.options.zero_init {
            Message::zeroed(descriptor)
        } else {
            Message::new()
        };
        let seen = smallvec![false; descriptor.fields().len()];
        self.decode_into(cursor, descriptor, &mut message, seen)?;
        Ok(message)
    }

    /// Read records into `message` until `cursor` is exhausted.
    ///
    /// `seen` holds presence from before this call. It is all `false` for a
    /// fresh message and reflects the existing fields when merging into an
    /// earlier occurrence of an embedded message.
    fn decode_into(
        &self,
        cursor: &mut ReadCursor<'_>,
        descriptor: &MessageDescriptor,
        message: &mut Message,
        mut seen: Seen,
    ) -> Result<()> {
        let mut unknown = BytesMut::new();

        while !cursor.is_empty() {
            let record = cursor.peek();
            let key = decode_key(cursor)?;

            let Some((index, field)) = descriptor.field_by_tag(key.tag()) else {
                skip_field(key.wire_type(), cursor)?;
                trace!(
                    message = descriptor.name(),
                    tag = key.tag(),
                    wire_type = ?key.wire_type(),
                    "skipped unknown field"
                );
                if self.options.preserve_unknown {
                    let consumed = record.len() - cursor.remaining();
                    unknown.extend_from_slice(&record[..consumed]);
                }
                continue;
            };

            let repeat = core::mem::replace(&mut seen[index], true);
            self.decode_field(cursor, field, key, repeat, message)?;
        }

        let missing = descriptor
            .fields()
            .iter()
            .zip(&seen)
            .find(|(field, present)| field.is_required() && !**present);
        if let Some((field, _)) = missing {
            return Err(Error::MissingRequiredField {
                message: descriptor.name(),
                field: field.name(),
                tag: field.tag(),
            });
        }

        if !unknown.is_empty() {
            if !message.unknown().is_empty() {
                let mut all = BytesMut::from(&message.unknown()[..]);
                all.extend_from_slice(&unknown);
                unknown = all;
            }
            message.set_unknown(unknown.freeze());
        }
        Ok(())
    }

    fn decode_field(
        &self,
        cursor: &mut ReadCursor<'_>,
        field: &FieldDescriptor,
        key: ProtoKey,
        repeat: bool,
        message: &mut Message,
    ) -> Result<()> {
        if field.is_repeated() {
            // Packed records are accepted whatever the encode side prefers.
            if key.wire_type() == WireType::Len && field.is_packable() {
                return decode_packed(cursor, field, message);
            }
            check_wire_type(field, key)?;
            let value = self.decode_value(cursor, field)?;
            return push(message, field, value);
        }

        check_wire_type(field, key)?;
        if repeat && self.options.duplicates == DuplicatePolicy::Reject {
            return Err(Error::DuplicateField {
                field: field.name(),
                tag: field.tag(),
            });
        }

        if let (true, DataKind::Message(nested)) = (repeat, field.data_kind()) {
            if let Some(existing) = message.get_mut(field.tag()).and_then(Value::as_message_mut) {
                let len = delimited_len(cursor, field)?;
                let mut payload = cursor.split_to(len)?;
                let seen = nested
                    .fields()
                    .iter()
                    .map(|nested_field| existing.contains(nested_field.tag()))
                    .collect();
                return self.decode_into(&mut payload, nested, existing, seen);
            }
        }

        let value = self.decode_value(cursor, field)?;
        message.insert(field.tag(), FieldValue::Single(value));
        Ok(())
    }

    /// Decode one non-packed payload.
    fn decode_value(&self, cursor: &mut ReadCursor<'_>, field: &FieldDescriptor) -> Result<Value> {
        match field.data_kind() {
            DataKind::Bytes => {
                let len = delimited_len(cursor, field)?;
                Ok(Value::Bytes(cursor.copy_to_bytes(len)))
            }
            DataKind::String => {
                let len = delimited_len(cursor, field)?;
                let data = cursor.read_bytes(len)?;
                let text = core::str::from_utf8(data).map_err(|_| Error::InvalidUtf8)?;
                Ok(Value::String(text.to_owned()))
            }
            DataKind::Message(nested) => {
                let len = delimited_len(cursor, field)?;
                let mut payload = cursor.split_to(len)?;
                self.decode_message(&mut payload, nested).map(Value::Message)
            }
            _ => decode_scalar(cursor, field),
        }
    }
}

fn check_wire_type(field: &FieldDescriptor, key: ProtoKey) -> Result<()> {
    if key.wire_code() != field.kind().wire_type().into_val() {
        return Err(Error::WireTypeMismatch {
            field: field.name(),
            tag: field.tag(),
            expected: field.kind(),
            actual: key.wire_code(),
        });
    }
    Ok(())
}

/// Read a length prefix and check it against the field limit and the bytes
/// left in `cursor`.
fn delimited_len(cursor: &mut ReadCursor<'_>, field: &FieldDescriptor) -> Result<usize> {
    let len = decode_len(cursor)?;
    if let Some(max) = field.max_len() {
        if len > max {
            return Err(Error::FieldTooLarge {
                field: field.name(),
                tag: field.tag(),
                len,
                max,
            });
        }
    }
    let remaining = cursor.remaining();
    if len > remaining {
        return Err(Error::BufferUnderflow {
            needed: len,
            remaining,
        });
    }
    Ok(len)
}

fn decode_packed(
    cursor: &mut ReadCursor<'_>,
    field: &FieldDescriptor,
    message: &mut Message,
) -> Result<()> {
    let len = decode_len(cursor)?;
    let mut packed = cursor.split_to(len)?;
    if let Some(width) = field.kind().fixed_width() {
        if len % usize::from(width) != 0 {
            return Err(Error::InvalidPackedLength {
                expected_multiple: width,
                actual: len,
            });
        }
    }
    while !packed.is_empty() {
        let value = decode_scalar(&mut packed, field)?;
        push(message, field, value)?;
    }
    Ok(())
}

fn push(message: &mut Message, field: &FieldDescriptor, value: Value) -> Result<()> {
    if let Some(max) = field.max_elements() {
        if message.get_repeated(field.tag()).len() >= max {
            return Err(Error::TooManyElements {
                field: field.name(),
                tag: field.tag(),
                max,
            });
        }
    }
    message.push(field.tag(), value);
    Ok(())
}

/// Decode one numeric payload.
fn decode_scalar(cursor: &mut ReadCursor<'_>, field: &FieldDescriptor) -> Result<Value> {
    let raw = match field.kind() {
        WireKind::Varint => decode_varint(cursor)?,
        WireKind::Fixed32 => u64::from(cursor.read_u32_le()?),
        WireKind::Fixed64 => cursor.read_u64_le()?,
        WireKind::LengthDelimited => {
            return Err(Error::ValueKindMismatch {
                field: field.name(),
                tag: field.tag(),
            });
        }
    };

    let zigzag = field.uses_zigzag();
    let value = match field.data_kind() {
        DataKind::Int32 if zigzag => Value::Int32(zigzag_decode_32(raw as u32)),
        // Sign-extended varints and sfixed32 both keep the value in the low 32 bits.
        DataKind::Int32 => Value::Int32(raw as u32 as i32),
        DataKind::Int64 if zigzag => Value::Int64(zigzag_decode_64(raw)),
        DataKind::Int64 => Value::Int64(raw as i64),
        DataKind::Uint32 => Value::Uint32(raw as u32),
        DataKind::Uint64 => Value::Uint64(raw),
        DataKind::Bool => Value::Bool(raw != 0),
        DataKind::Enum => Value::Enum(raw as u32 as i32),
        DataKind::Float => Value::Float(f32::from_bits(raw as u32)),
        DataKind::Double => Value::Double(f64::from_bits(raw)),
        DataKind::Bytes | DataKind::String | DataKind::Message(_) => {
            return Err(Error::ValueKindMismatch {
                field: field.name(),
                tag: field.tag(),
            });
        }
    };
    Ok(value)
}
