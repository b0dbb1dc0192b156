#![forbid(unsafe_code)]

use blockpat::PatternKind;
use criterion::{Criterion, Throughput, black_box, criterion_group, criterion_main};

const BLOCK_SIZE: usize = 1 << 20;

fn bench_generators(c: &mut Criterion) {
    let mut group = c.benchmark_group("pattern_throughput");
    group.throughput(Throughput::Bytes(BLOCK_SIZE as u64));

    for kind in [PatternKind::AesCbc, PatternKind::ChaCha20] {
        let mut generator = kind.build(BLOCK_SIZE, "bench-seed").expect("generator");
        group.bench_function(kind.name(), |b| {
            b.iter(|| black_box(generator.next_block()));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_generators);
criterion_main!(benches);
