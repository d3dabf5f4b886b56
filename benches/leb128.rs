use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use nanomon::buffer::{ReadCursor, WriteCursor};
use nanomon::leb128::{decode_varint, encode_varint};

// N.B. These are purposefully out of order to confuse branch predictors.
static LEB128_VALUES: [u64; 6] = [
    0x0000_0000_8000_0000,
    0x0000_0000_0000_8000,
    1,
    0x0000_0000_0000_0080,
    0x8000_0000_0000_0000,
    0x0000_0000_0080_0000,
];

fn encoded() -> Vec<([u8; 16], usize)> {
    LEB128_VALUES
        .into_iter()
        .map(|value| {
            let mut buffer = [0u8; 16];
            let mut cursor = WriteCursor::new(&mut buffer);
            let len = encode_varint(value, &mut cursor).unwrap();
            (buffer, len)
        })
        .collect()
}

fn leb128_decoding_single(c: &mut Criterion) {
    let values = encoded();

    let mut group = c.benchmark_group("decoding_single");
    for (data, len) in &values {
        group.bench_with_input(BenchmarkId::new("nanomon", len), data, |b, data| {
            b.iter(|| {
                let mut cursor = ReadCursor::new(&data[..]);
                std::hint::black_box(decode_varint(&mut cursor).unwrap())
            })
        });
        group.bench_with_input(BenchmarkId::new("leb128 crate", len), data, |b, data| {
            b.iter(|| {
                let mut read = &data[..];
                std::hint::black_box(leb128::read::unsigned(&mut read).unwrap())
            })
        });
    }
}

fn leb128_decoding_many(c: &mut Criterion) {
    let values = encoded();

    let mut group = c.benchmark_group("decoding_many");
    group.bench_with_input(
        BenchmarkId::new("nanomon", values.len()),
        &values,
        |b, data| {
            b.iter(|| {
                for (value, _len) in data {
                    let mut cursor = ReadCursor::new(&value[..]);
                    std::hint::black_box(decode_varint(&mut cursor).unwrap());
                }
            });
        },
    );
    group.bench_with_input(
        BenchmarkId::new("leb128 crate", values.len()),
        &values,
        |b, data| {
            b.iter(|| {
                for (value, _len) in data {
                    let mut read = &value[..];
                    std::hint::black_box(leb128::read::unsigned(&mut read).unwrap());
                }
            });
        },
    );
}

fn leb128_encoding(c: &mut Criterion) {
    let mut group = c.benchmark_group("encoding");
    for value in LEB128_VALUES {
        group.bench_with_input(BenchmarkId::new("nanomon", value), &value, |b, value| {
            let mut buffer = [0u8; 16];
            b.iter(|| {
                let mut cursor = WriteCursor::new(&mut buffer);
                std::hint::black_box(encode_varint(*value, &mut cursor).unwrap())
            })
        });
        group.bench_with_input(BenchmarkId::new("leb128 crate", value), &value, |b, value| {
            let mut buffer = [0u8; 16];
            b.iter(|| {
                let mut write = &mut buffer[..];
                std::hint::black_box(leb128::write::unsigned(&mut write, *value).unwrap())
            })
        });
    }
}

criterion_group!(
    benches,
    leb128_decoding_single,
    leb128_decoding_many,
    leb128_encoding
);
criterion_main!(benches);
