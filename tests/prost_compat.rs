//! Cross checks wire bytes against prost.

use std::sync::Arc;

use nanomon::{DataKind, FieldDescriptor, Message, MessageDescriptor, ReadCursor, Value};
use prost::Message as _;

#[derive(Clone, PartialEq, prost::Message)]
struct FooMessage {
    #[prost(bytes = "vec", optional, tag = "1")]
    thud: Option<Vec<u8>>,
}

#[derive(Clone, PartialEq, prost::Message)]
struct TopLevelMessage {
    #[prost(message, optional, tag = "1")]
    foo: Option<FooMessage>,
    #[prost(int32, required, tag = "2")]
    bar: i32,
    // Enums share the int32 wire representation.
    #[prost(int32, required, tag = "3")]
    baz: i32,
}

#[derive(Clone, PartialEq, prost::Message)]
struct Everything {
    #[prost(sint32, optional, tag = "1")]
    zigzag32: Option<i32>,
    #[prost(sint64, optional, tag = "2")]
    zigzag64: Option<i64>,
    #[prost(uint64, optional, tag = "3")]
    unsigned: Option<u64>,
    #[prost(bool, optional, tag = "4")]
    flag: Option<bool>,
    #[prost(sfixed32, optional, tag = "5")]
    sfixed: Option<i32>,
    #[prost(fixed64, optional, tag = "6")]
    fixed: Option<u64>,
    #[prost(double, optional, tag = "7")]
    ratio: Option<f64>,
    #[prost(string, optional, tag = "8")]
    label: Option<String>,
    #[prost(uint32, repeated, packed = "true", tag = "9")]
    packed: Vec<u32>,
    #[prost(int64, repeated, packed = "false", tag = "10")]
    unpacked: Vec<i64>,
}

fn top_level(protobuf_int32: bool) -> Arc<MessageDescriptor> {
    let foo = MessageDescriptor::builder("FooMessage")
        .field(FieldDescriptor::optional("thud", 1, DataKind::Bytes).max_size(32))
        .build()
        .unwrap();
    let mut bar = FieldDescriptor::required("bar", 2, DataKind::Int32);
    if protobuf_int32 {
        bar = bar.sign_extended();
    }
    MessageDescriptor::builder("TopLevelMessage")
        .field(FieldDescriptor::optional("foo", 1, DataKind::Message(foo)))
        .field(bar)
        .field(FieldDescriptor::required("baz", 3, DataKind::Enum))
        .build()
        .unwrap()
}

fn everything() -> Arc<MessageDescriptor> {
    MessageDescriptor::builder("Everything")
        .field(FieldDescriptor::optional("zigzag32", 1, DataKind::Int32))
        .field(FieldDescriptor::optional("zigzag64", 2, DataKind::Int64))
        .field(FieldDescriptor::optional("unsigned", 3, DataKind::Uint64))
        .field(FieldDescriptor::optional("flag", 4, DataKind::Bool))
        .field(FieldDescriptor::optional("sfixed", 5, DataKind::Int32).fixed())
        .field(FieldDescriptor::optional("fixed", 6, DataKind::Uint64).fixed())
        .field(FieldDescriptor::optional("ratio", 7, DataKind::Double))
        .field(FieldDescriptor::optional("label", 8, DataKind::String))
        .field(FieldDescriptor::repeated("packed", 9, DataKind::Uint32).packed())
        .field(FieldDescriptor::repeated("unpacked", 10, DataKind::Int64).sign_extended())
        .build()
        .unwrap()
}

#[test]
fn test_sample_matches_prost() {
    let thud = vec![0u8, 1, 2, 3, 4, 5, 6, 7, 6, 5, 4, 3, 2, 1, 0];
    let message = Message::new()
        .with(1, Message::new().with(1, thud.clone()))
        .with(2, -42)
        .with(3, Value::Enum(-1));
    let ours = nanomon::encode_to_vec(&message, &top_level(true)).unwrap();

    let theirs = TopLevelMessage {
        foo: Some(FooMessage { thud: Some(thud) }),
        bar: -42,
        baz: -1,
    };
    assert_eq!(ours, theirs.encode_to_vec());

    let decoded = TopLevelMessage::decode(&ours[..]).unwrap();
    assert_eq!(decoded, theirs);
}

#[test]
fn test_all_kinds_match_prost() {
    let mut message = Message::new()
        .with(1, -3)
        .with(2, i64::MIN)
        .with(3, u64::MAX)
        .with(4, true)
        .with(5, -7)
        .with(6, 0xdead_beefu64)
        .with(7, 0.25f64)
        .with(8, "prost");
    message.set_repeated(9, [0u32, 127, 128, u32::MAX]);
    message.set_repeated(10, [-1i64, 1]);
    let ours = nanomon::encode_to_vec(&message, &everything()).unwrap();

    let theirs = Everything {
        zigzag32: Some(-3),
        zigzag64: Some(i64::MIN),
        unsigned: Some(u64::MAX),
        flag: Some(true),
        sfixed: Some(-7),
        fixed: Some(0xdead_beef),
        ratio: Some(0.25),
        label: Some("prost".to_string()),
        packed: vec![0, 127, 128, u32::MAX],
        unpacked: vec![-1, 1],
    };
    assert_eq!(ours, theirs.encode_to_vec());

    let decoded = nanomon::decode(&mut ReadCursor::new(&theirs.encode_to_vec()), &everything())
        .unwrap();
    assert_eq!(decoded, message);
}

#[test]
fn test_decode_prost_unpacked_into_packed_field() {
    #[derive(Clone, PartialEq, prost::Message)]
    struct Unpacked {
        #[prost(uint32, repeated, packed = "false", tag = "9")]
        packed: Vec<u32>,
    }

    let data = Unpacked {
        packed: vec![5, 6, 7],
    }
    .encode_to_vec();
    let decoded = nanomon::decode(&mut ReadCursor::new(&data), &everything()).unwrap();
    let values: Vec<_> = decoded.get_repeated(9).iter().filter_map(Value::as_u64).collect();
    assert_eq!(values, [5, 6, 7]);
}
