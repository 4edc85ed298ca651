//! Dispatch benchmarks.

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use std::hint::black_box;
use storyhub_bench::{save_page_request, start_story_hub, story_table};
use storyhub_core::Envelope;

fn benchmark_envelope_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope");
    group.throughput(Throughput::Elements(1));

    let raw = save_page_request(42);
    group.bench_function("decode", |b| {
        b.iter(|| black_box(Envelope::decode(black_box(&raw)).unwrap()))
    });

    let envelope = Envelope::decode(&raw).unwrap();
    group.bench_function("encode", |b| b.iter(|| black_box(envelope.encode().unwrap())));

    group.finish();
}

fn benchmark_command_table(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (_store, table) = story_table().unwrap();
    let request = Envelope::decode(&save_page_request(1)).unwrap();
    let (table, request) = (&table, &request);

    let mut group = c.benchmark_group("command_table");
    group.throughput(Throughput::Elements(1));
    group.bench_function("save_page", |b| {
        b.to_async(&runtime)
            .iter(move || async move { black_box(table.dispatch(request.clone()).await) })
    });
    group.finish();
}

fn benchmark_hub_round_trip(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let (handle, id, mut outbound) = runtime.block_on(start_story_hub()).unwrap();
    let raw = save_page_request(1);

    let mut group = c.benchmark_group("hub");
    group.throughput(Throughput::Elements(1));
    group.bench_function("submit_and_receive", |b| {
        b.iter(|| {
            runtime.block_on(async {
                handle.submit(id, raw.clone()).await.unwrap();
                black_box(outbound.recv().await.unwrap())
            })
        })
    });
    group.finish();
}

criterion_group!(
    benches,
    benchmark_envelope_decode,
    benchmark_command_table,
    benchmark_hub_round_trip
);
criterion_main!(benches);
