use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use relaymail::encoder::{
    Base64Codec, EightBitCodec, LineBuffer, QuotedPrintableCodec, TransferEncoder,
};

const CHUNK: usize = 4096;

fn payload() -> Vec<u8> {
    "Grüße aus Köln, .dotted lines and = signs\r\n"
        .repeat(2048)
        .into_bytes()
}

fn encode_chunked<E: TransferEncoder>(mut codec: E, mut out: LineBuffer, input: &[u8]) -> usize {
    let mut written = 0;
    for chunk in input.chunks(CHUNK) {
        written += codec.encode(chunk, &mut out);
        out.take();
    }
    written + codec.finish(&mut out)
}

fn bench_encoders(c: &mut Criterion) {
    let input = payload();
    let mut group = c.benchmark_group("encode");
    group.throughput(Throughput::Bytes(input.len() as u64));

    group.bench_function("base64", |b| {
        b.iter(|| encode_chunked(Base64Codec::new(), LineBuffer::new(), black_box(&input)))
    });
    group.bench_function("quoted-printable", |b| {
        b.iter(|| {
            encode_chunked(
                QuotedPrintableCodec::new(),
                LineBuffer::new(),
                black_box(&input),
            )
        })
    });
    group.bench_function("dot-stuffing", |b| {
        b.iter(|| {
            encode_chunked(
                EightBitCodec::dot_stuffing(),
                LineBuffer::unfolded(),
                black_box(&input),
            )
        })
    });
    group.finish();
}

criterion_group!(benches, bench_encoders);
criterion_main!(benches);
