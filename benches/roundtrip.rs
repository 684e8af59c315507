#![allow(missing_docs)]

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use serde::{Deserialize, Serialize};
use std::hint::black_box;
use tripack::{PooledAllocator, Serializable, SerializationHandler, SimpleHandler};

#[derive(Clone, Serialize, Deserialize, Serializable, Debug, PartialEq)]
struct BenchItem {
    id: u64,
    name: String,
    payload: Vec<u64>,
}

fn generate_data(count: usize) -> Vec<BenchItem> {
    (0..count)
        .map(|i| BenchItem {
            id: i as u64,
            name: format!("item-{i}"),
            payload: vec![i as u64; 128], // ~1KB
        })
        .collect()
}

// --- BENCHMARKS ---

fn bench_serialize(c: &mut Criterion) {
    let item_count = 10_000;
    let data = generate_data(item_count);
    let bytes = tripack::serialize(&data).expect("Tripack serialization failed").capacity();

    let mut group = c.benchmark_group("Serialize");
    group.throughput(Throughput::Bytes(bytes as u64));

    // 1. Baseline: Bincode
    group.bench_function("bincode_encode_to_vec", |b| {
        b.iter(|| {
            bincode::serde::encode_to_vec(black_box(&data), bincode::config::standard())
                .expect("Bincode serialization failed")
        });
    });

    // 2. Tripack on the global heap
    group.bench_function("tripack_serialize", |b| {
        b.iter(|| tripack::serialize(black_box(&data)).expect("Tripack serialization failed"));
    });

    // 3. Tripack with recycled buffers
    let pooled = SimpleHandler::with_allocator(PooledAllocator::new());
    group.bench_function("tripack_serialize_pooled", |b| {
        b.iter(|| pooled.serialize(black_box(&data)).expect("Tripack serialization failed"));
    });

    group.finish();
}

fn bench_deserialize(c: &mut Criterion) {
    let item_count = 10_000;
    let data = generate_data(item_count);

    let bincode_bytes = bincode::serde::encode_to_vec(&data, bincode::config::standard())
        .expect("Bincode serialization failed");
    let tripack_buffer = tripack::serialize(&data).expect("Tripack serialization failed");

    let mut group = c.benchmark_group("Deserialize");
    group.throughput(Throughput::Bytes(tripack_buffer.capacity() as u64));

    group.bench_function("bincode_decode_from_slice", |b| {
        b.iter(|| {
            let (decoded, _): (Vec<BenchItem>, usize) = bincode::serde::decode_from_slice(
                black_box(&bincode_bytes),
                bincode::config::standard(),
            )
            .expect("Bincode deserialization failed");
            decoded
        });
    });

    group.bench_function("tripack_deserialize", |b| {
        b.iter(|| {
            tripack::deserialize::<Vec<BenchItem>, _>(black_box(&tripack_buffer))
                .expect("Tripack deserialization failed")
        });
    });

    let handler = SimpleHandler::new();
    let mut reused: Vec<BenchItem> = Vec::new();
    group.bench_function("tripack_deserialize_into", |b| {
        b.iter(|| {
            handler
                .deserialize_into(black_box(&tripack_buffer), &mut reused)
                .expect("Tripack deserialization failed");
        });
    });

    group.finish();
}

criterion_group!(benches, bench_serialize, bench_deserialize);
criterion_main!(benches);
