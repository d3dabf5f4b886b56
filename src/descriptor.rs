//! Schema metadata consumed by the encoder and decoder.
//!
//! A [`MessageDescriptor`] is what a schema compiler would emit for one
//! message type: an ordered list of [`FieldDescriptor`]s. Descriptors are
//! validated once by [`MessageDescriptorBuilder::build`], are immutable
//! afterwards, and are shared through [`Arc`] by every encode and decode
//! call, across threads if need be.

use std::fmt;
use std::sync::Arc;

use crate::error::DescriptorError;
use crate::wire::{MAXIMUM_TAG_VAL, MINIMUM_TAG_VAL, WireType};

/// Payload shape of a field on the wire.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum WireKind {
    Varint,
    Fixed32,
    Fixed64,
    LengthDelimited,
}

impl WireKind {
    /// The [`WireType`] written into the key of a record of this kind.
    #[inline(always)]
    pub const fn wire_type(self) -> WireType {
        match self {
            WireKind::Varint => WireType::Varint,
            WireKind::Fixed32 => WireType::I32,
            WireKind::Fixed64 => WireType::I64,
            WireKind::LengthDelimited => WireType::Len,
        }
    }

    /// Width in bytes of a fixed-size payload.
    #[inline(always)]
    pub const fn fixed_width(self) -> Option<u8> {
        match self {
            WireKind::Fixed32 => Some(4),
            WireKind::Fixed64 => Some(8),
            WireKind::Varint | WireKind::LengthDelimited => None,
        }
    }
}

/// Value type of a field.
///
/// Nested message fields carry the descriptor of the embedded message, so a
/// field has a nested descriptor exactly when it is a message field.
#[derive(Clone)]
pub enum DataKind {
    Int32,
    Int64,
    Uint32,
    Uint64,
    Bool,
    Enum,
    Float,
    Double,
    Bytes,
    String,
    Message(Arc<MessageDescriptor>),
}

impl DataKind {
    /// The wire kind a field of this type uses unless told otherwise.
    pub fn default_wire_kind(&self) -> WireKind {
        match self {
            DataKind::Int32
            | DataKind::Int64
            | DataKind::Uint32
            | DataKind::Uint64
            | DataKind::Bool
            | DataKind::Enum => WireKind::Varint,
            DataKind::Float => WireKind::Fixed32,
            DataKind::Double => WireKind::Fixed64,
            DataKind::Bytes | DataKind::String | DataKind::Message(_) => {
                WireKind::LengthDelimited
            }
        }
    }

    /// Whether a field of this type may be encoded with `wire_kind`.
    pub fn supports(&self, wire_kind: WireKind) -> bool {
        match wire_kind {
            WireKind::Varint => matches!(
                self,
                DataKind::Int32
                    | DataKind::Int64
                    | DataKind::Uint32
                    | DataKind::Uint64
                    | DataKind::Bool
                    | DataKind::Enum
            ),
            WireKind::Fixed32 => {
                matches!(self, DataKind::Int32 | DataKind::Uint32 | DataKind::Float)
            }
            WireKind::Fixed64 => {
                matches!(self, DataKind::Int64 | DataKind::Uint64 | DataKind::Double)
            }
            WireKind::LengthDelimited => matches!(
                self,
                DataKind::Bytes | DataKind::String | DataKind::Message(_)
            ),
        }
    }

    /// Signed integer kinds, the ones zig-zag applies to.
    pub fn is_signed_int(&self) -> bool {
        matches!(self, DataKind::Int32 | DataKind::Int64)
    }

    /// Protobuf-ish name, used in text output and errors.
    pub fn name(&self) -> &'static str {
        match self {
            DataKind::Int32 => "int32",
            DataKind::Int64 => "int64",
            DataKind::Uint32 => "uint32",
            DataKind::Uint64 => "uint64",
            DataKind::Bool => "bool",
            DataKind::Enum => "enum",
            DataKind::Float => "float",
            DataKind::Double => "double",
            DataKind::Bytes => "bytes",
            DataKind::String => "string",
            DataKind::Message(nested) => nested.name(),
        }
    }
}

impl fmt::Debug for DataKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataKind::Message(nested) => f.debug_tuple("Message").field(&nested.name()).finish(),
            other => f.write_str(other.name()),
        }
    }
}

/// How many times a field may appear in a message.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Cardinality {
    Optional,
    Required,
    Repeated,
}

/// Varint representation of signed integer fields.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SignedEncoding {
    /// `(n << 1) ^ (n >> 63)`, small negative numbers stay short.
    #[default]
    ZigZag,
    /// Two's complement sign-extended to 64 bits, what protobuf `int32` and
    /// `int64` use. Negative values always take 10 bytes.
    SignExtended,
}

/// Metadata for one field of a message type.
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    name: &'static str,
    tag: u32,
    wire_kind: WireKind,
    data_kind: DataKind,
    cardinality: Cardinality,
    max_size: Option<usize>,
    max_count: Option<usize>,
    signed: SignedEncoding,
    packed: bool,
}

impl FieldDescriptor {
    /// A field whose wire kind is inferred from `data_kind`.
    pub fn new(
        name: &'static str,
        tag: u32,
        data_kind: DataKind,
        cardinality: Cardinality,
    ) -> Self {
        FieldDescriptor {
            name,
            tag,
            wire_kind: data_kind.default_wire_kind(),
            data_kind,
            cardinality,
            max_size: None,
            max_count: None,
            signed: SignedEncoding::default(),
            packed: false,
        }
    }

    /// An optional singular field.
    pub fn optional(name: &'static str, tag: u32, data_kind: DataKind) -> Self {
        Self::new(name, tag, data_kind, Cardinality::Optional)
    }

    /// A singular field that must be present on encode and decode.
    pub fn required(name: &'static str, tag: u32, data_kind: DataKind) -> Self {
        Self::new(name, tag, data_kind, Cardinality::Required)
    }

    /// A field holding any number of elements, in order.
    pub fn repeated(name: &'static str, tag: u32, data_kind: DataKind) -> Self {
        Self::new(name, tag, data_kind, Cardinality::Repeated)
    }

    /// Override the wire kind inferred from the data kind.
    pub fn wire_kind(mut self, wire_kind: WireKind) -> Self {
        self.wire_kind = wire_kind;
        self
    }

    /// Use a little-endian fixed-width encoding, i.e. protobuf `fixed32`,
    /// `sfixed32`, `fixed64` or `sfixed64`.
    pub fn fixed(self) -> Self {
        let wire_kind = match self.data_kind {
            DataKind::Int64 | DataKind::Uint64 | DataKind::Double => WireKind::Fixed64,
            _ => WireKind::Fixed32,
        };
        self.wire_kind(wire_kind)
    }

    /// Encode a signed varint field as sign-extended two's complement
    /// instead of zig-zag.
    pub fn sign_extended(mut self) -> Self {
        self.signed = SignedEncoding::SignExtended;
        self
    }

    /// Maximum payload length of a length-delimited field.
    pub fn max_size(mut self, max_size: usize) -> Self {
        self.max_size = Some(max_size);
        self
    }

    /// Maximum number of elements of a repeated field.
    pub fn max_count(mut self, max_count: usize) -> Self {
        self.max_count = Some(max_count);
        self
    }

    /// Always use packed encoding for this repeated field.
    pub fn packed(mut self) -> Self {
        self.packed = true;
        self
    }

    /// Field name, used in errors and text output.
    #[inline(always)]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Field number on the wire.
    #[inline(always)]
    pub fn tag(&self) -> u32 {
        self.tag
    }

    /// Wire kind of a single (unpacked) record of this field.
    #[inline(always)]
    pub fn kind(&self) -> WireKind {
        self.wire_kind
    }

    /// Value type, including the nested descriptor of message fields.
    #[inline(always)]
    pub fn data_kind(&self) -> &DataKind {
        &self.data_kind
    }

    /// Whether the field is optional, required or repeated.
    #[inline(always)]
    pub fn cardinality(&self) -> Cardinality {
        self.cardinality
    }

    /// Payload limit set through [`FieldDescriptor::max_size`].
    #[inline(always)]
    pub fn max_len(&self) -> Option<usize> {
        self.max_size
    }

    /// Element limit set through [`FieldDescriptor::max_count`].
    #[inline(always)]
    pub fn max_elements(&self) -> Option<usize> {
        self.max_count
    }

    /// Varint representation of signed values.
    #[inline(always)]
    pub fn signed_encoding(&self) -> SignedEncoding {
        self.signed
    }

    /// Whether [`FieldDescriptor::packed`] was set.
    #[inline(always)]
    pub fn is_packed(&self) -> bool {
        self.packed
    }

    /// Shorthand for `cardinality() == Cardinality::Required`.
    #[inline(always)]
    pub fn is_required(&self) -> bool {
        self.cardinality == Cardinality::Required
    }

    #[inline(always)]
    pub fn is_repeated(&self) -> bool {
        self.cardinality == Cardinality::Repeated
    }

    /// Repeated numeric fields can be packed into a single record.
    #[inline(always)]
    pub fn is_packable(&self) -> bool {
        self.is_repeated() && self.wire_kind != WireKind::LengthDelimited
    }

    /// Whether varint values of this field go through zig-zag.
    #[inline(always)]
    pub fn uses_zigzag(&self) -> bool {
        self.wire_kind == WireKind::Varint
            && self.data_kind.is_signed_int()
            && self.signed == SignedEncoding::ZigZag
    }

    fn validate(&self, message: &'static str) -> Result<(), DescriptorError> {
        let invalid = |reason| DescriptorError::InvalidOption {
            message,
            field: self.name,
            reason,
        };

        if !(MINIMUM_TAG_VAL..=MAXIMUM_TAG_VAL).contains(&self.tag) {
            return Err(DescriptorError::TagOutOfRange {
                message,
                tag: self.tag,
            });
        }
        if !self.data_kind.supports(self.wire_kind) {
            return Err(DescriptorError::WireKindMismatch {
                message,
                field: self.name,
                wire_kind: self.wire_kind,
            });
        }
        if self.max_size.is_some() && self.wire_kind != WireKind::LengthDelimited {
            return Err(invalid("max_size only applies to bytes, string and message fields"));
        }
        if self.max_count.is_some() && !self.is_repeated() {
            return Err(invalid("max_count only applies to repeated fields"));
        }
        if self.packed && !self.is_packable() {
            return Err(invalid("only repeated numeric fields can be packed"));
        }
        if self.signed == SignedEncoding::SignExtended
            && !(self.data_kind.is_signed_int() && self.wire_kind == WireKind::Varint)
        {
            return Err(invalid("sign extension only applies to signed varint fields"));
        }
        Ok(())
    }
}

/// Compiled, immutable schema metadata for one message type.
#[derive(Debug)]
pub struct MessageDescriptor {
    name: &'static str,
    /// Declaration order, which is also the order fields are encoded in.
    fields: Vec<FieldDescriptor>,
    /// `(tag, index into fields)` sorted by tag.
    by_tag: Vec<(u32, usize)>,
}

static_assertions::assert_impl_all!(MessageDescriptor: Send, Sync);

impl MessageDescriptor {
    /// Start describing a message type called `name`.
    pub fn builder(name: &'static str) -> MessageDescriptorBuilder {
        MessageDescriptorBuilder {
            name,
            fields: Vec::new(),
        }
    }

    /// Message type name.
    #[inline(always)]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Fields in declaration order.
    #[inline(always)]
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Looks up a field by its tag, returning its declaration index too.
    #[inline]
    pub fn field_by_tag(&self, tag: u32) -> Option<(usize, &FieldDescriptor)> {
        self.by_tag
            .binary_search_by_key(&tag, |(t, _)| *t)
            .ok()
            .map(|pos| {
                let index = self.by_tag[pos].1;
                (index, &self.fields[index])
            })
    }

    /// Looks up a field by its name.
    pub fn field_by_name(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Fields with [`Cardinality::Required`], in declaration order.
    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|field| field.is_required())
    }
}

/// Collects fields for a [`MessageDescriptor`].
#[derive(Debug)]
pub struct MessageDescriptorBuilder {
    name: &'static str,
    fields: Vec<FieldDescriptor>,
}

impl MessageDescriptorBuilder {
    /// Append a field. Declaration order is encode order.
    pub fn field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    /// Validate the schema invariants and freeze the descriptor.
    pub fn build(self) -> Result<Arc<MessageDescriptor>, DescriptorError> {
        let message = self.name;

        for field in &self.fields {
            field.validate(message)?;
        }

        let mut by_tag: Vec<(u32, usize)> = self
            .fields
            .iter()
            .enumerate()
            .map(|(index, field)| (field.tag, index))
            .collect();
        by_tag.sort_unstable();
        if let Some(pair) = by_tag.windows(2).find(|pair| pair[0].0 == pair[1].0) {
            return Err(DescriptorError::DuplicateTag {
                message,
                tag: pair[0].0,
                first: self.fields[pair[0].1].name,
                second: self.fields[pair[1].1].name,
            });
        }

        for (index, field) in self.fields.iter().enumerate() {
            if self.fields[..index].iter().any(|f| f.name == field.name) {
                return Err(DescriptorError::DuplicateName {
                    message,
                    field: field.name,
                });
            }
        }

        Ok(Arc::new(MessageDescriptor {
            name: message,
            fields: self.fields,
            by_tag,
        }))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn inner() -> Arc<MessageDescriptor> {
        MessageDescriptor::builder("Inner")
            .field(FieldDescriptor::optional("thud", 1, DataKind::Bytes).max_size(32))
            .build()
            .unwrap()
    }

    #[test]
    fn test_build_and_lookup() {
        let desc = MessageDescriptor::builder("Outer")
            .field(FieldDescriptor::optional("foo", 7, DataKind::Message(inner())))
            .field(FieldDescriptor::required("bar", 2, DataKind::Int32))
            .field(FieldDescriptor::repeated("baz", 3, DataKind::Uint64).packed())
            .build()
            .unwrap();

        // Declaration order is kept.
        let names: Vec<_> = desc.fields().iter().map(|f| f.name()).collect();
        assert_eq!(names, ["foo", "bar", "baz"]);

        let (index, field) = desc.field_by_tag(2).unwrap();
        assert_eq!(index, 1);
        assert_eq!(field.name(), "bar");
        assert_eq!(field.kind(), WireKind::Varint);
        assert!(field.uses_zigzag());

        let (index, field) = desc.field_by_tag(7).unwrap();
        assert_eq!(index, 0);
        assert_eq!(field.kind(), WireKind::LengthDelimited);
        assert!(matches!(field.data_kind(), DataKind::Message(m) if m.name() == "Inner"));

        assert!(desc.field_by_tag(1).is_none());
        assert_eq!(desc.field_by_name("baz").unwrap().tag(), 3);
        assert_eq!(desc.required_fields().count(), 1);
    }

    #[test]
    fn test_default_wire_kinds() {
        let cases = [
            (DataKind::Int32, WireKind::Varint),
            (DataKind::Uint64, WireKind::Varint),
            (DataKind::Bool, WireKind::Varint),
            (DataKind::Enum, WireKind::Varint),
            (DataKind::Float, WireKind::Fixed32),
            (DataKind::Double, WireKind::Fixed64),
            (DataKind::Bytes, WireKind::LengthDelimited),
            (DataKind::String, WireKind::LengthDelimited),
        ];
        for (data_kind, wire_kind) in cases {
            assert_eq!(data_kind.default_wire_kind(), wire_kind, "{data_kind:?}");
        }

        let field = FieldDescriptor::optional("a", 1, DataKind::Int64).fixed();
        assert_eq!(field.kind(), WireKind::Fixed64);
        assert!(!field.uses_zigzag());
        let field = FieldDescriptor::optional("a", 1, DataKind::Uint32).fixed();
        assert_eq!(field.kind(), WireKind::Fixed32);
    }

    #[test]
    fn test_duplicate_tag() {
        let err = MessageDescriptor::builder("Dup")
            .field(FieldDescriptor::optional("a", 1, DataKind::Int32))
            .field(FieldDescriptor::optional("b", 1, DataKind::Bool))
            .build()
            .unwrap_err();
        assert_eq!(
            err,
            DescriptorError::DuplicateTag {
                message: "Dup",
                tag: 1,
                first: "a",
                second: "b",
            }
        );
    }

    #[test]
    fn test_duplicate_name() {
        let err = MessageDescriptor::builder("Dup")
            .field(FieldDescriptor::optional("a", 1, DataKind::Int32))
            .field(FieldDescriptor::optional("a", 2, DataKind::Bool))
            .build()
            .unwrap_err();
        assert!(matches!(err, DescriptorError::DuplicateName { field: "a", .. }));
    }

    #[test]
    fn test_tag_range() {
        for tag in [0, MAXIMUM_TAG_VAL + 1] {
            let err = MessageDescriptor::builder("Range")
                .field(FieldDescriptor::optional("a", tag, DataKind::Int32))
                .build()
                .unwrap_err();
            assert_eq!(
                err,
                DescriptorError::TagOutOfRange {
                    message: "Range",
                    tag
                }
            );
        }
        MessageDescriptor::builder("Range")
            .field(FieldDescriptor::optional("a", MAXIMUM_TAG_VAL, DataKind::Int32))
            .build()
            .unwrap();
    }

    #[test]
    fn test_invalid_combinations() {
        let invalid = [
            FieldDescriptor::optional("a", 1, DataKind::Bool).fixed(),
            FieldDescriptor::optional("a", 1, DataKind::Bytes).wire_kind(WireKind::Varint),
            FieldDescriptor::optional("a", 1, DataKind::Int32).max_size(4),
            FieldDescriptor::optional("a", 1, DataKind::Int32).max_count(4),
            FieldDescriptor::optional("a", 1, DataKind::Int32).packed(),
            FieldDescriptor::repeated("a", 1, DataKind::String).packed(),
            FieldDescriptor::optional("a", 1, DataKind::Uint32).sign_extended(),
            FieldDescriptor::optional("a", 1, DataKind::Int32).fixed().sign_extended(),
        ];
        for field in invalid {
            let result = MessageDescriptor::builder("Bad").field(field.clone()).build();
            assert!(result.is_err(), "{field:?} should be rejected");
        }
    }
}
