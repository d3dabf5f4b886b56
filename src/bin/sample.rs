//! sample - encode and decode a small nested message.
//!
//! Builds the `TopLevelMessage` schema at runtime, encodes one instance into
//! a fixed-size stack buffer, prints the bytes, then decodes them again.

use std::sync::Arc;

use clap::Parser;
use nanomon::{
    DataKind, Decoder, Encoder, FieldDescriptor, Message, MessageDescriptor, ReadCursor, Value,
    WriteCursor,
};
use tracing_subscriber::EnvFilter;

const MAX_CAPACITY: usize = 4096;

/// Values of `SampleEnum`.
const ZEROTH: i32 = 0;

const THUD: [u8; 15] = [0, 1, 2, 3, 4, 5, 6, 7, 6, 5, 4, 3, 2, 1, 0];

#[derive(Parser)]
#[command(name = "sample")]
#[command(about = "Encode and decode a sample message into a fixed-size buffer")]
struct Cli {
    /// Size of the encode buffer in bytes
    #[arg(short, long, default_value_t = 128, value_parser = clap::value_parser!(u16).range(1..=4096))]
    capacity: u16,

    /// Print the serialized bytes as hex instead of a byte list
    #[arg(long)]
    hex: bool,

    /// Encode `bar` like protobuf's int32 (sign-extended) instead of zig-zag
    #[arg(long)]
    protobuf_int32: bool,
}

fn schema(protobuf_int32: bool) -> Result<Arc<MessageDescriptor>, nanomon::DescriptorError> {
    let foo = MessageDescriptor::builder("FooMessage")
        .field(FieldDescriptor::optional("thud", 1, DataKind::Bytes).max_size(32))
        .build()?;

    let mut bar = FieldDescriptor::required("bar", 2, DataKind::Int32);
    if protobuf_int32 {
        bar = bar.sign_extended();
    }

    MessageDescriptor::builder("TopLevelMessage")
        .field(FieldDescriptor::optional("foo", 1, DataKind::Message(foo)))
        .field(bar)
        .field(FieldDescriptor::required("baz", 3, DataKind::Enum))
        .build()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let desc = schema(cli.protobuf_int32)?;

    let message = Message::new()
        .with(1, Message::new().with(1, &THUD[..]))
        .with(2, 42)
        .with(3, Value::Enum(ZEROTH));

    println!("Encoding...");
    let mut storage = [0u8; MAX_CAPACITY];
    let mut cursor = WriteCursor::new(&mut storage[..usize::from(cli.capacity)]);
    let written = Encoder::default().encode(&message, &desc, &mut cursor)?;
    let data = cursor.written();

    if cli.hex {
        let hex: String = data.iter().map(|b| format!("{b:02x}")).collect();
        println!("Serialized data ({written} bytes): {hex}");
    } else {
        println!("Serialized data ({written} bytes): {data:?}");
    }

    println!("Decoding...");
    let decoded = Decoder::default().decode(&mut ReadCursor::new(data), &desc)?;

    let bar = decoded.get(2).and_then(Value::as_i64).unwrap_or_default();
    let baz = decoded.get(3).and_then(Value::as_i64).unwrap_or_default();
    let thud = decoded
        .get_message(1)
        .and_then(|foo| foo.get(1))
        .and_then(Value::as_bytes)
        .unwrap_or_default();
    println!("bar: {bar}");
    println!("baz: {baz}");
    println!("foo.thud: {thud:?}");
    println!();
    print!("{}", decoded.display(&desc));

    Ok(())
}
