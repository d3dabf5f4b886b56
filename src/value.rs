//! In-memory message instances.
//!
//! A [`Message`] maps field tags to values. It does not know its own schema,
//! the [`MessageDescriptor`] is passed alongside it to the encoder, decoder
//! and text printer.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;

use crate::descriptor::{Cardinality, DataKind, FieldDescriptor, MessageDescriptor};

/// A single field value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Int32(i32),
    Int64(i64),
    Uint32(u32),
    Uint64(u64),
    Bool(bool),
    Enum(i32),
    Float(f32),
    Double(f64),
    Bytes(Bytes),
    String(String),
    Message(Message),
}

impl Value {
    /// The zero value for a field of `kind`. Nested messages are zeroed
    /// recursively.
    pub fn zero(kind: &DataKind) -> Value {
        match kind {
            DataKind::Int32 => Value::Int32(0),
            DataKind::Int64 => Value::Int64(0),
            DataKind::Uint32 => Value::Uint32(0),
            DataKind::Uint64 => Value::Uint64(0),
            DataKind::Bool => Value::Bool(false),
            DataKind::Enum => Value::Enum(0),
            DataKind::Float => Value::Float(0.0),
            DataKind::Double => Value::Double(0.0),
            DataKind::Bytes => Value::Bytes(Bytes::new()),
            DataKind::String => Value::String(String::new()),
            DataKind::Message(nested) => Value::Message(Message::zeroed(nested)),
        }
    }

    /// Whether this value can be stored in a field of `kind`.
    ///
    /// Only the top level is checked, nested messages are checked against
    /// their own descriptor when they are encoded.
    pub fn matches(&self, kind: &DataKind) -> bool {
        matches!(
            (self, kind),
            (Value::Int32(_), DataKind::Int32)
                | (Value::Int64(_), DataKind::Int64)
                | (Value::Uint32(_), DataKind::Uint32)
                | (Value::Uint64(_), DataKind::Uint64)
                | (Value::Bool(_), DataKind::Bool)
                | (Value::Enum(_), DataKind::Enum)
                | (Value::Float(_), DataKind::Float)
                | (Value::Double(_), DataKind::Double)
                | (Value::Bytes(_), DataKind::Bytes)
                | (Value::String(_), DataKind::String)
                | (Value::Message(_), DataKind::Message(_))
        )
    }

    /// Any integer-like value widened to `i64`.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int32(v) | Value::Enum(v) => Some(i64::from(*v)),
            Value::Int64(v) => Some(*v),
            Value::Uint32(v) => Some(i64::from(*v)),
            Value::Uint64(v) => i64::try_from(*v).ok(),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Any integer-like value that fits in a `u64`.
    pub fn as_u64(&self) -> Option<u64> {
        match self {
            Value::Uint32(v) => Some(u64::from(*v)),
            Value::Uint64(v) => Some(*v),
            other => other.as_i64().and_then(|v| u64::try_from(v).ok()),
        }
    }

    /// The value of a `bool` field.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// A `float` or `double` widened to `f64`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            _ => None,
        }
    }

    /// The payload of a `bytes` or `string` field.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(v) => Some(v),
            Value::String(v) => Some(v.as_bytes()),
            _ => None,
        }
    }

    /// The text of a `string` field.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    /// The embedded message of a message field.
    pub fn as_message(&self) -> Option<&Message> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }

    /// Mutable access to the embedded message of a message field.
    pub fn as_message_mut(&mut self) -> Option<&mut Message> {
        match self {
            Value::Message(v) => Some(v),
            _ => None,
        }
    }
}

macro_rules! impl_from_for_value {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )*
    };
}

impl_from_for_value! {
    i32 => Int32,
    i64 => Int64,
    u32 => Uint32,
    u64 => Uint64,
    bool => Bool,
    f32 => Float,
    f64 => Double,
    Bytes => Bytes,
    Vec<u8> => Bytes,
    String => String,
    &str => String,
    Message => Message,
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(Bytes::copy_from_slice(v))
    }
}

/// The value(s) stored for one field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Single(Value),
    Repeated(Vec<Value>),
}

impl FieldValue {
    /// The values as a slice, a single value is a slice of one.
    pub fn as_slice(&self) -> &[Value] {
        match self {
            FieldValue::Single(value) => core::slice::from_ref(value),
            FieldValue::Repeated(values) => values,
        }
    }
}

/// A message instance.
///
/// Absent fields are simply not in the map. Use [`Message::zeroed`] to get an
/// instance where every singular field starts out at its zero value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Message {
    fields: BTreeMap<u32, FieldValue>,
    /// Raw records for tags the decoder did not know, see
    /// [`DecodeOptions::preserve_unknown`](crate::config::DecodeOptions).
    unknown: Bytes,
}

impl Message {
    /// An instance with no fields set.
    pub fn new() -> Self {
        Self::default()
    }

    /// An instance with every optional and required field set to its zero
    /// value. Repeated fields start out empty, i.e. absent.
    pub fn zeroed(descriptor: &MessageDescriptor) -> Self {
        let fields = descriptor
            .fields()
            .iter()
            .filter(|field| field.cardinality() != Cardinality::Repeated)
            .map(|field| (field.tag(), FieldValue::Single(Value::zero(field.data_kind()))))
            .collect();
        Message {
            fields,
            unknown: Bytes::new(),
        }
    }

    /// Builder style [`Message::set`].
    pub fn with(mut self, tag: u32, value: impl Into<Value>) -> Self {
        self.set(tag, value);
        self
    }

    /// Set a singular field, replacing whatever was there.
    pub fn set(&mut self, tag: u32, value: impl Into<Value>) -> &mut Self {
        self.fields.insert(tag, FieldValue::Single(value.into()));
        self
    }

    /// Append to a repeated field.
    pub fn push(&mut self, tag: u32, value: impl Into<Value>) -> &mut Self {
        let value = value.into();
        let slot = self
            .fields
            .entry(tag)
            .or_insert_with(|| FieldValue::Repeated(Vec::new()));
        if let FieldValue::Single(_) = slot {
            let previous = core::mem::replace(slot, FieldValue::Repeated(Vec::new()));
            if let FieldValue::Single(first) = previous {
                *slot = FieldValue::Repeated(vec![first]);
            }
        }
        if let FieldValue::Repeated(values) = slot {
            values.push(value);
        }
        self
    }

    /// Set a repeated field to `values`, in order.
    pub fn set_repeated<V: Into<Value>>(
        &mut self,
        tag: u32,
        values: impl IntoIterator<Item = V>,
    ) -> &mut Self {
        let values = values.into_iter().map(Into::into).collect();
        self.fields.insert(tag, FieldValue::Repeated(values));
        self
    }

    /// The raw stored value(s) for `tag`, singular or repeated.
    pub fn field(&self, tag: u32) -> Option<&FieldValue> {
        self.fields.get(&tag)
    }

    /// Mutable access to the stored value(s) for `tag`.
    pub fn field_mut(&mut self, tag: u32) -> Option<&mut FieldValue> {
        self.fields.get_mut(&tag)
    }

    /// The value of a singular field.
    pub fn get(&self, tag: u32) -> Option<&Value> {
        match self.fields.get(&tag)? {
            FieldValue::Single(value) => Some(value),
            FieldValue::Repeated(_) => None,
        }
    }

    /// Mutable access to the value of a singular field.
    pub fn get_mut(&mut self, tag: u32) -> Option<&mut Value> {
        match self.fields.get_mut(&tag)? {
            FieldValue::Single(value) => Some(value),
            FieldValue::Repeated(_) => None,
        }
    }

    /// The elements of a repeated field, empty when absent.
    pub fn get_repeated(&self, tag: u32) -> &[Value] {
        self.fields.get(&tag).map(FieldValue::as_slice).unwrap_or(&[])
    }

    /// The nested message stored under `tag`.
    pub fn get_message(&self, tag: u32) -> Option<&Message> {
        self.get(tag).and_then(Value::as_message)
    }

    /// Look a field up by name through its descriptor.
    pub fn get_by_name<'a>(
        &'a self,
        descriptor: &MessageDescriptor,
        name: &str,
    ) -> Option<&'a FieldValue> {
        let field = descriptor.field_by_name(name)?;
        self.field(field.tag())
    }

    /// Clear a field, returning what was stored.
    pub fn remove(&mut self, tag: u32) -> Option<FieldValue> {
        self.fields.remove(&tag)
    }

    /// Whether anything is stored under `tag`.
    pub fn contains(&self, tag: u32) -> bool {
        self.fields.contains_key(&tag)
    }

    /// Fields in tag order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &FieldValue)> {
        self.fields.iter().map(|(tag, value)| (*tag, value))
    }

    /// Number of known fields present. Preserved unknown records are not
    /// counted, see [`Message::unknown`].
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// No fields and no unknown records, i.e. encodes to zero bytes.
    ///
    /// A message holding only unknown records has `len() == 0` but is not
    /// empty.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.unknown.is_empty()
    }

    /// Raw encoded records of unknown fields.
    pub fn unknown(&self) -> &Bytes {
        &self.unknown
    }

    /// Replace the raw unknown records, written after the known fields on
    /// encode.
    pub fn set_unknown(&mut self, unknown: Bytes) {
        self.unknown = unknown;
    }

    pub(crate) fn insert(&mut self, tag: u32, value: FieldValue) {
        self.fields.insert(tag, value);
    }

    /// Render this message as protobuf text format.
    pub fn display<'a>(&'a self, descriptor: &'a MessageDescriptor) -> TextFormat<'a> {
        TextFormat {
            message: self,
            descriptor,
        }
    }
}

/// [`fmt::Display`] adapter returned by [`Message::display`].
pub struct TextFormat<'a> {
    message: &'a Message,
    descriptor: &'a MessageDescriptor,
}

impl fmt::Display for TextFormat<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_message(f, self.message, self.descriptor, 0)
    }
}

fn write_message(
    f: &mut fmt::Formatter<'_>,
    message: &Message,
    descriptor: &MessageDescriptor,
    depth: usize,
) -> fmt::Result {
    for field in descriptor.fields() {
        let Some(value) = message.field(field.tag()) else {
            continue;
        };
        for element in value.as_slice() {
            write_field(f, field, element, depth)?;
        }
    }
    Ok(())
}

fn write_field(
    f: &mut fmt::Formatter<'_>,
    field: &FieldDescriptor,
    value: &Value,
    depth: usize,
) -> fmt::Result {
    let indent = depth * 2;
    match (value, field.data_kind()) {
        (Value::Message(nested), DataKind::Message(nested_desc)) => {
            writeln!(f, "{:indent$}{} {{", "", field.name())?;
            write_message(f, nested, nested_desc, depth + 1)?;
            writeln!(f, "{:indent$}}}", "")
        }
        (value, _) => {
            write!(f, "{:indent$}{}: ", "", field.name())?;
            write_scalar(f, value)?;
            writeln!(f)
        }
    }
}

fn write_scalar(f: &mut fmt::Formatter<'_>, value: &Value) -> fmt::Result {
    match value {
        Value::Int32(v) | Value::Enum(v) => write!(f, "{v}"),
        Value::Int64(v) => write!(f, "{v}"),
        Value::Uint32(v) => write!(f, "{v}"),
        Value::Uint64(v) => write!(f, "{v}"),
        Value::Bool(v) => write!(f, "{v}"),
        Value::Float(v) => write!(f, "{v}"),
        Value::Double(v) => write!(f, "{v}"),
        Value::Bytes(v) => write_escaped(f, v),
        Value::String(v) => write_escaped(f, v.as_bytes()),
        // Only reachable when the value does not match its descriptor.
        Value::Message(_) => write!(f, "<message>"),
    }
}

/// C-style escaping as used by protobuf text format: printable ASCII as is,
/// everything else as a 3 digit octal escape.
fn write_escaped(f: &mut fmt::Formatter<'_>, bytes: &[u8]) -> fmt::Result {
    f.write_str("\"")?;
    for &b in bytes {
        match b {
            b'"' => f.write_str("\\\"")?,
            b'\\' => f.write_str("\\\\")?,
            b'\n' => f.write_str("\\n")?,
            0x20..=0x7e => write!(f, "{}", char::from(b))?,
            _ => write!(f, "\\{b:03o}")?,
        }
    }
    f.write_str("\"")
}
