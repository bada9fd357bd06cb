//! Benchmarks for frame assembly and checksum validation
//!
//! Measures the inbound hot path at the two read sizes seen in practice:
//! whole bursts and the short reads a 38400 baud line delivers.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use powermaster::protocol::{FrameAssembler, crc8, decode};
use powermaster::test_utils::report_stream;
use std::hint::black_box;

fn bench_crc8(c: &mut Criterion) {
    let payload = b"D,120.0,0.5,1.05,1;0;0;1;0";

    let mut group = c.benchmark_group("crc8");
    group.throughput(Throughput::Bytes(payload.len() as u64));
    group.bench_function("report_payload", |b| b.iter(|| crc8::compute(black_box(payload))));
    group.finish();
}

fn bench_assembly(c: &mut Criterion) {
    let bytes = report_stream(256);

    let mut group = c.benchmark_group("frame_assembly");
    group.throughput(Throughput::Bytes(bytes.len() as u64));

    for chunk in [7usize, 64, bytes.len()] {
        group.bench_with_input(BenchmarkId::new("chunk", chunk), &chunk, |b, &chunk| {
            b.iter(|| {
                let mut assembler = FrameAssembler::new();
                let mut frames = 0usize;
                for piece in bytes.chunks(chunk) {
                    frames += assembler.ingest(black_box(piece)).len();
                }
                black_box(frames)
            })
        });
    }

    group.finish();
}

fn bench_decode(c: &mut Criterion) {
    let frames = FrameAssembler::new().ingest(&report_stream(64));

    c.bench_function("decode_reports", |b| {
        b.iter(|| {
            for frame in &frames {
                let _ = black_box(decode(black_box(frame)));
            }
        })
    });
}

criterion_group!(benches, bench_crc8, bench_assembly, bench_decode);
criterion_main!(benches);
