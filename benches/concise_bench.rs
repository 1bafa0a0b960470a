use concise::ConciseSet;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn clustered(period: u32, width: u32, clusters: u32) -> ConciseSet {
    let mut set = ConciseSet::new();
    for i in 0..clusters {
        set.fill_range(i * period, i * period + width).unwrap();
    }
    set
}

fn bench_concise(c: &mut Criterion) {
    let mut group = c.benchmark_group("concise");
    let a = clustered(100, 40, 1000); // 41k elements over [0, 100k)
    let b = clustered(150, 20, 700);

    group.bench_function("contains", |bch| {
        bch.iter(|| {
            for e in (0..100_000).step_by(97) {
                black_box(a.contains(e));
            }
        })
    });

    group.bench_function("union", |bch| bch.iter(|| black_box(a.union(&b))));

    group.bench_function("intersection", |bch| {
        bch.iter(|| black_box(a.intersection(&b)))
    });

    group.bench_function("intersection_size", |bch| {
        bch.iter(|| black_box(a.intersection_size(&b)))
    });

    group.bench_function("iterate", |bch| {
        bch.iter(|| {
            let mut acc = 0u32;
            for e in &a {
                acc = acc.wrapping_add(e);
            }
            black_box(acc)
        })
    });

    group.bench_function("build_sparse", |bch| {
        bch.iter(|| {
            let mut set = ConciseSet::new();
            for i in 0..1_000u32 {
                set.add(i * 1_000).unwrap();
            }
            black_box(set)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_concise);
criterion_main!(benches);
