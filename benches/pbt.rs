//! Packed-tree benchmarks: bulk load, point reads, sequential scan, merge,
//! and skip-list staging.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tempfile::tempdir;

use leafdb::{Environment, Options, SkipList};

fn sorted_pairs(count: usize) -> Vec<(Vec<u8>, Vec<u8>)> {
    (0..count)
        .map(|i| {
            (
                format!("key_{:08}", i).into_bytes(),
                format!("value_{:08}", i).into_bytes(),
            )
        })
        .collect()
}

fn build(env: &Environment, pairs: &[(Vec<u8>, Vec<u8>)]) {
    let mut writer = env.writer().unwrap();
    for (key, value) in pairs {
        writer.add(key, value).unwrap();
    }
    writer.finish().unwrap();
}

fn bench_bulk_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("pbt_bulk_load");
    for count in [1_000usize, 100_000] {
        let pairs = sorted_pairs(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &pairs, |b, pairs| {
            b.iter(|| {
                let dir = tempdir().unwrap();
                let env = Environment::with_defaults(dir.path().join("bench.pbt"));
                build(&env, pairs);
            });
        });
    }
    group.finish();
}

fn bench_point_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("pbt_point_read");
    for branch_factor in [8u32, 32] {
        let pairs = sorted_pairs(100_000);
        let dir = tempdir().unwrap();
        let env = Environment::open(
            dir.path().join("bench.pbt"),
            Options {
                branch_factor,
                ..Options::default()
            },
        );
        build(&env, &pairs);
        let reader = env.reader().unwrap();

        group.throughput(Throughput::Elements(pairs.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(branch_factor),
            &pairs,
            |b, pairs| {
                b.iter(|| {
                    let mut total = 0usize;
                    for (key, _) in pairs {
                        total += reader.get(black_box(key)).unwrap().unwrap().len();
                    }
                    black_box(total)
                });
            },
        );
    }
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let pairs = sorted_pairs(100_000);
    let dir = tempdir().unwrap();
    let env = Environment::with_defaults(dir.path().join("bench.pbt"));
    build(&env, &pairs);
    let reader = env.reader().unwrap();
    reader.prefetch();

    let mut group = c.benchmark_group("pbt_scan");
    group.throughput(Throughput::Elements(pairs.len() as u64));
    group.bench_function("sequential", |b| {
        b.iter(|| {
            let mut total = 0usize;
            for item in reader.iter() {
                total += item.unwrap().value.len();
            }
            black_box(total)
        });
    });
    group.finish();
}

fn bench_merge(c: &mut Criterion) {
    let pairs_a: Vec<_> = sorted_pairs(200_000).into_iter().step_by(2).collect();
    let pairs_b: Vec<_> = sorted_pairs(200_000).into_iter().skip(1).step_by(2).collect();

    let dir = tempdir().unwrap();
    let env_a = Environment::with_defaults(dir.path().join("a.pbt"));
    let env_b = Environment::with_defaults(dir.path().join("b.pbt"));
    build(&env_a, &pairs_a);
    build(&env_b, &pairs_b);
    let reader_a = env_a.reader().unwrap();
    let reader_b = env_b.reader().unwrap();

    let mut group = c.benchmark_group("pbt_merge");
    group.throughput(Throughput::Elements(200_000));
    group.bench_function("two_way", |b| {
        b.iter(|| {
            let out = tempdir().unwrap();
            let env = Environment::with_defaults(out.path().join("merged.pbt"));
            let writer = env.writer().unwrap();
            writer.merge(&[&reader_a, &reader_b]).unwrap();
        });
    });
    group.finish();
}

fn bench_skiplist_put(c: &mut Criterion) {
    let pairs = sorted_pairs(100_000);

    let mut group = c.benchmark_group("skiplist_put");
    group.throughput(Throughput::Elements(pairs.len() as u64));
    group.bench_function("single_thread", |b| {
        b.iter(|| {
            let list = SkipList::new();
            for (key, value) in &pairs {
                list.put(key, value);
            }
            black_box(list.is_empty())
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_bulk_load,
    bench_point_read,
    bench_scan,
    bench_merge,
    bench_skiplist_put
);
criterion_main!(benches);
