//! Benchmarks for the B-tree engine over an in-memory store.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use diskbtree::{BTree, MemStore, DEFAULT_CAPACITY, MAGIC_LEN};

const MAGIC: [u8; MAGIC_LEN] = *b"bench-btree-ops\0";
const KEY_COUNT: u64 = 16_384;
const LOOKUP_SAMPLES: u64 = 2_048;
const SCAN_WIDTH: usize = 512;

/// Keys `0..n` in a scrambled but deterministic order.
fn scrambled(n: u64) -> Vec<u64> {
    // 7919 is prime and does not divide n, so this is a permutation.
    (0..n).map(|i| (i * 7919) % n).collect()
}

fn fresh(capacity: u32) -> BTree<MemStore, u64> {
    BTree::create(MemStore::in_memory(), MAGIC, &0u64, capacity).unwrap()
}

fn loaded(capacity: u32) -> BTree<MemStore, u64> {
    let mut tree = fresh(capacity);
    for k in scrambled(KEY_COUNT) {
        tree.insert(&k).unwrap();
    }
    tree
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree/insert");
    group.sample_size(20);
    group.throughput(Throughput::Elements(KEY_COUNT));

    for capacity in [8, DEFAULT_CAPACITY] {
        group.bench_with_input(BenchmarkId::new("sequential", capacity), &capacity, |b, &cap| {
            b.iter_batched(
                || fresh(cap),
                |mut tree| {
                    for k in 0..KEY_COUNT {
                        tree.insert(&k).unwrap();
                    }
                    black_box(tree.root());
                },
                BatchSize::SmallInput,
            );
        });

        let keys = scrambled(KEY_COUNT);
        group.bench_with_input(BenchmarkId::new("scrambled", capacity), &capacity, |b, &cap| {
            b.iter_batched(
                || fresh(cap),
                |mut tree| {
                    for k in &keys {
                        tree.insert(k).unwrap();
                    }
                    black_box(tree.root());
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_find(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree/find");
    group.throughput(Throughput::Elements(LOOKUP_SAMPLES));

    let mut tree = loaded(DEFAULT_CAPACITY);
    group.bench_function("point_lookup", |b| {
        b.iter(|| {
            for i in 0..LOOKUP_SAMPLES {
                let key = (i * 13) % KEY_COUNT;
                black_box(tree.find(&key).unwrap());
            }
        });
    });
    group.finish();
}

fn bench_delete(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree/delete");
    group.sample_size(20);
    group.throughput(Throughput::Elements(KEY_COUNT));

    let keys = scrambled(KEY_COUNT);
    group.bench_function("scrambled", |b| {
        b.iter_batched(
            || loaded(DEFAULT_CAPACITY),
            |mut tree| {
                for k in &keys {
                    tree.delete(k).unwrap();
                }
                black_box(tree.free_nodes());
            },
            BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_scan(c: &mut Criterion) {
    let mut group = c.benchmark_group("btree/scan");
    group.throughput(Throughput::Elements(SCAN_WIDTH as u64));

    let mut tree = loaded(DEFAULT_CAPACITY);
    let start = KEY_COUNT / 2;
    group.bench_function("ascending", |b| {
        b.iter(|| {
            let sum: u64 = tree
                .iter_from(Some(&start))
                .unwrap()
                .take(SCAN_WIDTH)
                .map(|k| k.unwrap())
                .sum();
            black_box(sum);
        });
    });
    group.bench_function("descending", |b| {
        b.iter(|| {
            let sum: u64 = tree
                .rev_iter_from(Some(&start))
                .unwrap()
                .take(SCAN_WIDTH)
                .map(|k| k.unwrap())
                .sum();
            black_box(sum);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_insert, bench_find, bench_delete, bench_scan);
criterion_main!(benches);
