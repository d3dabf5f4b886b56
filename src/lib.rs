//! A descriptor-driven codec for the protobuf wire format.
//!
//! Messages are described at runtime by [`MessageDescriptor`]s and held as
//! [`Message`] instances. Encoding writes into a caller supplied, fixed
//! capacity buffer through a [`WriteCursor`], decoding reads from a bounded
//! [`ReadCursor`]. Running out of room is an error, never a reallocation.
//!
//! ```
//! use nanomon::{DataKind, FieldDescriptor, Message, MessageDescriptor, ReadCursor, WriteCursor};
//!
//! let desc = MessageDescriptor::builder("Point")
//!     .field(FieldDescriptor::required("x", 1, DataKind::Int32))
//!     .field(FieldDescriptor::required("y", 2, DataKind::Int32))
//!     .build()
//!     .unwrap();
//! let point = Message::new().with(1, 3).with(2, -4);
//!
//! let mut storage = [0u8; 16];
//! let mut cursor = WriteCursor::new(&mut storage);
//! let written = nanomon::encode(&point, &desc, &mut cursor).unwrap();
//! assert_eq!(written, 4);
//!
//! let decoded = nanomon::decode(&mut ReadCursor::new(&storage[..written]), &desc).unwrap();
//! assert_eq!(decoded, point);
//! ```

#![deny(clippy::as_conversions)]

pub mod buffer;
pub mod config;
pub mod decode;
pub mod descriptor;
pub mod encode;
pub mod error;
// Publically export `leb128` because the functions are useful on their own.
pub mod leb128;
pub mod value;
pub mod wire;

mod util;

pub use crate::buffer::{ReadCursor, WriteCursor};
pub use crate::config::{Config, DecodeOptions, DuplicatePolicy, EncodeOptions};
pub use crate::decode::Decoder;
pub use crate::descriptor::{
    Cardinality, DataKind, FieldDescriptor, MessageDescriptor, MessageDescriptorBuilder,
    SignedEncoding, WireKind,
};
pub use crate::encode::Encoder;
pub use crate::error::{DescriptorError, Error, Result};
pub use crate::value::{FieldValue, Message, Value};

/// Encode `message` with the default configuration.
///
/// See [`Encoder::encode`].
pub fn encode(
    message: &Message,
    descriptor: &MessageDescriptor,
    cursor: &mut WriteCursor<'_>,
) -> Result<usize> {
    Encoder::default().encode(message, descriptor, cursor)
}

/// Number of bytes [`encode`] would write for `message`.
pub fn encoded_len(message: &Message, descriptor: &MessageDescriptor) -> Result<usize> {
    Encoder::default().encoded_len(message, descriptor)
}

/// Encode `message` into a freshly allocated, exactly sized `Vec`.
///
/// See [`Encoder::encode_to_vec`].
pub fn encode_to_vec(message: &Message, descriptor: &MessageDescriptor) -> Result<Vec<u8>> {
    Encoder::default().encode_to_vec(message, descriptor)
}

/// Decode the remaining bytes of `cursor` with the default configuration.
///
/// See [`Decoder::decode`].
pub fn decode(cursor: &mut ReadCursor<'_>, descriptor: &MessageDescriptor) -> Result<Message> {
    Decoder::default().decode(cursor, descriptor)
}
