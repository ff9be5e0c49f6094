//! Throughput benchmarks for the Adler-32 and CRC-32 accumulators.

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use oxizlib_core::adler::Adler32;
use oxizlib_core::crc::Crc32;
use std::hint::black_box;

/// Pseudo-random bytes from a fixed-seed LCG.
fn random_bytes(size: usize) -> Vec<u8> {
    let mut data = Vec::with_capacity(size);
    let mut seed: u64 = 0x1234_5678_9ABC_DEF0;
    for _ in 0..size {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1);
        data.push((seed >> 32) as u8);
    }
    data
}

const SIZES: [(&str, usize); 4] = [
    ("16B", 16),
    ("4KB", 4 * 1024),
    ("64KB", 64 * 1024),
    ("1MB", 1024 * 1024),
];

fn bench_adler32(c: &mut Criterion) {
    let mut group = c.benchmark_group("adler32");

    for (name, size) in SIZES {
        let data = random_bytes(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| black_box(Adler32::checksum(black_box(data))));
        });
    }

    group.finish();
}

fn bench_crc32(c: &mut Criterion) {
    let mut group = c.benchmark_group("crc32");

    for (name, size) in SIZES {
        let data = random_bytes(size);
        group.throughput(Throughput::Bytes(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(name), &data, |b, data| {
            b.iter(|| black_box(Crc32::compute(black_box(data))));
        });
    }

    group.finish();
}

/// Many small updates, the pattern the stream context sees during inflate.
fn bench_incremental(c: &mut Criterion) {
    let mut group = c.benchmark_group("checksum_incremental");
    let data = random_bytes(64 * 1024);
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("adler32_258B_chunks", |b| {
        b.iter(|| {
            let mut adler = Adler32::new();
            for chunk in data.chunks(258) {
                adler.update(black_box(chunk));
            }
            black_box(adler.value())
        });
    });

    group.bench_function("crc32_258B_chunks", |b| {
        b.iter(|| {
            let mut crc = Crc32::new();
            for chunk in data.chunks(258) {
                crc.update(black_box(chunk));
            }
            black_box(crc.value())
        });
    });

    group.finish();
}

criterion_group!(benches, bench_adler32, bench_crc32, bench_incremental);
criterion_main!(benches);
