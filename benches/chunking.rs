use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use ctp::{ChunkSlicer, Config, LoopbackLink};

fn bench_split(c: &mut Criterion) {
    let payload = Bytes::from(vec![0x5Au8; 64 * 1024]);
    let mut group = c.benchmark_group("split");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for chunk_size in [20usize, 244, 512] {
        group.bench_with_input(BenchmarkId::from_parameter(chunk_size), &chunk_size, |b, &size| {
            let slicer = ChunkSlicer::new(size);
            b.iter(|| black_box(slicer.split(black_box(&payload))));
        });
    }
    group.finish();
}

fn bench_loopback(c: &mut Criterion) {
    let payload = Bytes::from(vec![0xA5u8; 16 * 1024]);
    let mut group = c.benchmark_group("loopback");
    group.throughput(Throughput::Bytes(payload.len() as u64));

    for depth in [1usize, 8, 64] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            b.iter(|| {
                let config = Config {
                    link_queue_depth: depth,
                    ..Config::for_payload_len(payload.len())
                };
                let mut link = LoopbackLink::new(config, Vec::new()).unwrap();
                link.transfer(payload.clone()).unwrap();
                black_box(link.receiver().sink().len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_split, bench_loopback);
criterion_main!(benches);
