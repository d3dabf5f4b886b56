//! Descriptor-driven message encoder.
//!
//! Fields are written in descriptor declaration order, so encoding the same
//! message twice always yields the same bytes. Length-delimited payloads are
//! sized with a dry-run [`Encoder::encoded_len`] pass before anything is
//! written, nothing is ever staged in a scratch buffer.

// This module uses `as` casts which have been thoroughly reviewed for correctness.
#![allow(clippy::as_conversions)]

use tracing::{debug, trace};

use crate::buffer::WriteCursor;
use crate::config::EncodeOptions;
use crate::descriptor::{Cardinality, DataKind, FieldDescriptor, MessageDescriptor, WireKind};
use crate::error::{Error, Result};
use crate::leb128::{self, zigzag_encode_32, zigzag_encode_64};
use crate::value::{FieldValue, Message, Value};
use crate::wire::{WireType, encode_key, encode_len, encoded_key_len, encoded_len_delimited};

/// A numeric payload ready to be written.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum Scalar {
    Varint(u64),
    Fixed32(u32),
    Fixed64(u64),
}

impl Scalar {
    /// Convert `value` into the wire representation `field` asks for.
    fn from_value(field: &FieldDescriptor, value: &Value) -> Result<Self> {
        let mismatch = || Error::ValueKindMismatch {
            field: field.name(),
            tag: field.tag(),
        };
        if !value.matches(field.data_kind()) {
            return Err(mismatch());
        }

        let zigzag = field.uses_zigzag();
        let bits = match *value {
            Value::Int32(v) if zigzag => u64::from(zigzag_encode_32(v)),
            // Negative values are sign-extended to 64 bits.
            Value::Int32(v) => v as i64 as u64,
            Value::Int64(v) if zigzag => zigzag_encode_64(v),
            Value::Int64(v) => v as u64,
            Value::Uint32(v) => u64::from(v),
            Value::Uint64(v) => v,
            Value::Bool(v) => u64::from(v),
            Value::Enum(v) => v as i64 as u64,
            Value::Float(v) => u64::from(v.to_bits()),
            Value::Double(v) => v.to_bits(),
            Value::Bytes(_) | Value::String(_) | Value::Message(_) => return Err(mismatch()),
        };

        match field.kind() {
            WireKind::Varint => Ok(Scalar::Varint(bits)),
            // Truncation keeps the two's complement bits of sfixed32.
            WireKind::Fixed32 => Ok(Scalar::Fixed32(bits as u32)),
            WireKind::Fixed64 => Ok(Scalar::Fixed64(bits)),
            WireKind::LengthDelimited => Err(mismatch()),
        }
    }

    fn encoded_len(self) -> usize {
        match self {
            Scalar::Varint(v) => leb128::encoded_len(v),
            Scalar::Fixed32(_) => 4,
            Scalar::Fixed64(_) => 8,
        }
    }

    fn write(self, cursor: &mut WriteCursor<'_>) -> Result<()> {
        match self {
            Scalar::Varint(v) => leb128::encode_varint(v, cursor).map(|_| ()),
            Scalar::Fixed32(v) => cursor.write_u32_le(v),
            Scalar::Fixed64(v) => cursor.write_u64_le(v),
        }
    }
}

/// Serializes [`Message`]s against their [`MessageDescriptor`].
#[derive(Debug, Copy, Clone, Default)]
pub struct Encoder {
    options: EncodeOptions,
}

impl Encoder {
    /// An encoder with the given options, see also [`Config::encoder`](crate::config::Config::encoder).
    pub fn new(options: EncodeOptions) -> Self {
        Encoder { options }
    }

    /// The options this encoder was created with.
    pub fn options(&self) -> EncodeOptions {
        self.options
    }

    /// Encode `message` into `cursor`, returning the number of bytes written.
    ///
    /// Neither `message` nor `descriptor` is modified. On failure the cursor
    /// may hold a partial message and should be discarded.
    pub fn encode(
        &self,
        message: &Message,
        descriptor: &MessageDescriptor,
        cursor: &mut WriteCursor<'_>,
    ) -> Result<usize> {
        let start = cursor.position();
        match self.encode_message(message, descriptor, cursor) {
            Ok(()) => {
                let written = cursor.position() - start;
                debug!(message = descriptor.name(), written, "encoded message");
                Ok(written)
            }
            Err(err) => {
                debug!(message = descriptor.name(), %err, "failed to encode message");
                Err(err)
            }
        }
    }

    /// Exact number of bytes [`Encoder::encode`] would write.
    pub fn encoded_len(&self, message: &Message, descriptor: &MessageDescriptor) -> Result<usize> {
        self.message_len(message, descriptor)
    }

    /// Encode into a freshly allocated buffer of exactly the right size.
    pub fn encode_to_vec(
        &self,
        message: &Message,
        descriptor: &MessageDescriptor,
    ) -> Result<Vec<u8>> {
        let len = self.message_len(message, descriptor)?;
        let mut buf = vec![0u8; len];
        let mut cursor = WriteCursor::new(&mut buf);
        self.encode(message, descriptor, &mut cursor)?;
        Ok(buf)
    }

    fn is_packed(&self, field: &FieldDescriptor) -> bool {
        field.is_packable() && (field.is_packed() || self.options.packed_repeated)
    }

    fn encode_message(
        &self,
        message: &Message,
        descriptor: &MessageDescriptor,
        cursor: &mut WriteCursor<'_>,
    ) -> Result<()> {
        for field in descriptor.fields() {
            match message.field(field.tag()) {
                Some(value) => self.encode_field(field, value, cursor)?,
                None if field.is_required() => return Err(missing_required(descriptor, field)),
                None => (),
            }
        }
        trace_ignored(message, descriptor);
        cursor.write_bytes(message.unknown())
    }

    fn message_len(&self, message: &Message, descriptor: &MessageDescriptor) -> Result<usize> {
        let mut len = message.unknown().len();
        for field in descriptor.fields() {
            match message.field(field.tag()) {
                Some(value) => len += self.field_len(field, value)?,
                None if field.is_required() => return Err(missing_required(descriptor, field)),
                None => (),
            }
        }
        Ok(len)
    }

    fn encode_field(
        &self,
        field: &FieldDescriptor,
        value: &FieldValue,
        cursor: &mut WriteCursor<'_>,
    ) -> Result<()> {
        let values = elements(field, value)?;

        if self.is_packed(field) {
            if values.is_empty() {
                return Ok(());
            }
            let payload_len = packed_len(field, values)?;
            encode_key(WireType::Len, field.tag(), cursor)?;
            encode_len(payload_len, cursor)?;
            for value in values {
                Scalar::from_value(field, value)?.write(cursor)?;
            }
            return Ok(());
        }

        let wire_type = field.kind().wire_type();
        for value in values {
            encode_key(wire_type, field.tag(), cursor)?;
            self.encode_payload(field, value, cursor)?;
        }
        Ok(())
    }

    fn field_len(&self, field: &FieldDescriptor, value: &FieldValue) -> Result<usize> {
        let values = elements(field, value)?;
        let key_len = encoded_key_len(field.tag());

        if self.is_packed(field) {
            if values.is_empty() {
                return Ok(0);
            }
            return Ok(key_len + encoded_len_delimited(packed_len(field, values)?));
        }

        let mut len = 0;
        for value in values {
            len += key_len + self.payload_len(field, value)?;
        }
        Ok(len)
    }

    fn encode_payload(
        &self,
        field: &FieldDescriptor,
        value: &Value,
        cursor: &mut WriteCursor<'_>,
    ) -> Result<()> {
        match (value, field.data_kind()) {
            (Value::Bytes(data), DataKind::Bytes) => write_delimited(field, data, cursor),
            (Value::String(data), DataKind::String) => {
                write_delimited(field, data.as_bytes(), cursor)
            }
            (Value::Message(nested), DataKind::Message(nested_desc)) => {
                let len = self.message_len(nested, nested_desc)?;
                check_size(field, len)?;
                encode_len(len, cursor)?;
                self.encode_message(nested, nested_desc, cursor)
            }
            (value, _) => Scalar::from_value(field, value)?.write(cursor),
        }
    }

    fn payload_len(&self, field: &FieldDescriptor, value: &Value) -> Result<usize> {
        let len = match (value, field.data_kind()) {
            (Value::Bytes(data), DataKind::Bytes) => data.len(),
            (Value::String(data), DataKind::String) => data.len(),
            (Value::Message(nested), DataKind::Message(nested_desc)) => {
                self.message_len(nested, nested_desc)?
            }
            (value, _) => return Ok(Scalar::from_value(field, value)?.encoded_len()),
        };
        check_size(field, len)?;
        Ok(encoded_len_delimited(len))
    }
}

/// The elements to emit for `value`, a singular field is a slice of one.
///
/// Repeated fields must hold a [`FieldValue::Repeated`] and singular fields
/// a [`FieldValue::Single`], the same shapes the decoder produces.
fn elements<'v>(field: &FieldDescriptor, value: &'v FieldValue) -> Result<&'v [Value]> {
    let mismatch = || Error::ValueKindMismatch {
        field: field.name(),
        tag: field.tag(),
    };
    match (field.cardinality(), value) {
        (Cardinality::Repeated, FieldValue::Single(_)) => Err(mismatch()),
        (Cardinality::Repeated, FieldValue::Repeated(values)) => {
            if let Some(max) = field.max_elements() {
                if values.len() > max {
                    return Err(Error::TooManyElements {
                        field: field.name(),
                        tag: field.tag(),
                        max,
                    });
                }
            }
            Ok(values.as_slice())
        }
        (_, FieldValue::Single(value)) => Ok(core::slice::from_ref(value)),
        (_, FieldValue::Repeated(_)) => Err(mismatch()),
    }
}

fn packed_len(field: &FieldDescriptor, values: &[Value]) -> Result<usize> {
    let mut len = 0;
    for value in values {
        len += Scalar::from_value(field, value)?.encoded_len();
    }
    Ok(len)
}

fn write_delimited(field: &FieldDescriptor, data: &[u8], cursor: &mut WriteCursor<'_>) -> Result<()> {
    check_size(field, data.len())?;
    encode_len(data.len(), cursor)?;
    cursor.write_bytes(data)
}

#[inline]
fn check_size(field: &FieldDescriptor, len: usize) -> Result<()> {
    match field.max_len() {
        Some(max) if len > max => Err(Error::FieldTooLarge {
            field: field.name(),
            tag: field.tag(),
            len,
            max,
        }),
        _ => Ok(()),
    }
}

fn missing_required(descriptor: &MessageDescriptor, field: &FieldDescriptor) -> Error {
    Error::MissingRequiredField {
        message: descriptor.name(),
        field: field.name(),
        tag: field.tag(),
    }
}

fn trace_ignored(message: &Message, descriptor: &MessageDescriptor) {
    if !tracing::enabled!(tracing::Level::TRACE) {
        return;
    }
    for (tag, _) in message.iter() {
        if descriptor.field_by_tag(tag).is_none() {
            trace!(message = descriptor.name(), tag, "ignoring value without a field");
        }
    }
}
