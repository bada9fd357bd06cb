//! Benchmarks for the full inbound path and datagram formatting
//!
//! Includes a noisy stream with corrupt frames to check that discards
//! stay as cheap as the happy path.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use powermaster::test_utils::report_stream;
use powermaster::{Pipeline, format_record};
use std::hint::black_box;

fn noisy_stream(count: usize) -> Vec<u8> {
    let clean = report_stream(count);
    let mut bytes = Vec::with_capacity(clean.len() + count);
    for (i, byte) in clean.into_iter().enumerate() {
        bytes.push(byte);
        if i % 97 == 0 {
            bytes.push(0xFF);
        }
        // Flip a payload digit now and then so some checksums fail
        if i % 211 == 0 {
            if let Some(last) = bytes.last_mut() {
                if last.is_ascii_digit() {
                    *last = b'0' + (*last - b'0' + 1) % 10;
                }
            }
        }
    }
    bytes
}

fn bench_pipeline(c: &mut Criterion) {
    let clean = report_stream(512);
    let noisy = noisy_stream(512);

    let mut group = c.benchmark_group("pipeline");

    group.throughput(Throughput::Bytes(clean.len() as u64));
    group.bench_function("clean_stream", |b| {
        b.iter(|| {
            let mut pipeline = Pipeline::default();
            let mut records = 0usize;
            for chunk in clean.chunks(64) {
                records += pipeline.ingest(black_box(chunk)).len();
            }
            black_box(records)
        })
    });

    group.throughput(Throughput::Bytes(noisy.len() as u64));
    group.bench_function("noisy_stream", |b| {
        b.iter(|| {
            let mut pipeline = Pipeline::default();
            let mut records = 0usize;
            for chunk in noisy.chunks(64) {
                records += pipeline.ingest(black_box(chunk)).len();
            }
            black_box((records, pipeline.stats().discarded()))
        })
    });

    group.finish();
}

fn bench_format(c: &mut Criterion) {
    let records = Pipeline::default().ingest(&report_stream(64));

    c.bench_function("format_records", |b| {
        b.iter(|| {
            for record in &records {
                black_box(format_record(black_box(record)));
            }
        })
    });
}

criterion_group!(benches, bench_pipeline, bench_format);
criterion_main!(benches);
