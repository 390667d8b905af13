use core::hint::black_box;
use std::collections::BTreeMap;

use avl_tree::AvlTree;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

pub fn gen_random_ints(count: usize, key_max: i32, seed: u64) -> Vec<i32> {
    let mut vec = Vec::with_capacity(count);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    for _ in 0..count {
        vec.push(rng.gen_range(0..key_max))
    }
    assert_eq!(vec.len(), count);
    vec
}

fn insert(c: &mut Criterion) {
    let mut g = c.benchmark_group("insert");
    for count in [1000, 10_000, 100_000] {
        // few duplicates
        let keys = gen_random_ints(count, i32::MAX / 2, 1);
        g.bench_with_input(BenchmarkId::new("avl_unique", count), &keys, |b, keys| {
            b.iter(|| {
                let mut tree = AvlTree::new();
                for &k in keys {
                    tree.insert(k, k);
                }
                tree
            })
        });
        g.bench_with_input(BenchmarkId::new("std_btree", count), &keys, |b, keys| {
            b.iter(|| {
                let mut map = BTreeMap::new();
                for &k in keys {
                    map.insert(k, k);
                }
                map
            })
        });

        // every key repeated ~100 times
        let keys = gen_random_ints(count, (count / 100).max(1) as i32, 2);
        g.bench_with_input(BenchmarkId::new("avl_duplicates", count), &keys, |b, keys| {
            b.iter(|| {
                let mut tree = AvlTree::new();
                for &k in keys {
                    tree.insert(k, k);
                }
                tree
            })
        });
        g.bench_with_input(BenchmarkId::new("std_btree_vec", count), &keys, |b, keys| {
            b.iter(|| {
                let mut map = BTreeMap::<i32, Vec<i32>>::new();
                for &k in keys {
                    map.entry(k).or_default().push(k);
                }
                map
            })
        });
    }
    g.finish();
}

fn get(c: &mut Criterion) {
    let mut g = c.benchmark_group("get");
    for count in [1000, 10_000, 100_000] {
        let keys = gen_random_ints(count, i32::MAX / 2, 3);
        let tree: AvlTree<_, _> = keys.iter().map(|k| (*k, *k)).collect();
        let map: BTreeMap<_, _> = keys.iter().map(|k| (*k, *k)).collect();
        let mut access = keys.clone();
        access.shuffle(&mut ChaCha8Rng::seed_from_u64(4));

        g.bench_with_input(BenchmarkId::new("avl", count), &access, |b, access| {
            b.iter(|| {
                for k in access {
                    black_box(tree.get(k));
                }
            })
        });
        g.bench_with_input(BenchmarkId::new("std_btree", count), &access, |b, access| {
            b.iter(|| {
                for k in access {
                    black_box(map.get(k));
                }
            })
        });
    }
    g.finish();
}

fn delete(c: &mut Criterion) {
    let mut g = c.benchmark_group("delete");
    for count in [1000, 10_000] {
        let keys = gen_random_ints(count, (count / 4) as i32, 5);
        let mut order = keys.clone();
        order.shuffle(&mut ChaCha8Rng::seed_from_u64(6));

        g.bench_with_input(BenchmarkId::new("avl", count), &order, |b, order| {
            b.iter_batched(
                || keys.iter().map(|k| (*k, *k)).collect::<AvlTree<_, _>>(),
                |mut tree| {
                    for k in order {
                        black_box(tree.delete(k));
                    }
                    tree
                },
                criterion::BatchSize::LargeInput,
            )
        });
    }
    g.finish();
}

fn iterate(c: &mut Criterion) {
    let mut g = c.benchmark_group("iterate");
    for count in [1000, 100_000] {
        let keys = gen_random_ints(count, (count / 10) as i32, 7);
        let tree: AvlTree<_, _> = keys.iter().map(|k| (*k, *k)).collect();

        g.bench_function(BenchmarkId::new("avl_list", count), |b| {
            b.iter(|| tree.values().fold(0i64, |acc, v| acc + i64::from(*v)))
        });
        g.bench_function(BenchmarkId::new("avl_cursor_successor", count), |b| {
            b.iter(|| {
                let mut cursor = tree.front();
                let mut acc = 0i64;
                while let Some(c) = cursor {
                    acc += i64::from(*c.value());
                    cursor = c.successor();
                }
                acc
            })
        });
    }
    g.finish();
}

criterion_group!(benches, insert, get, delete, iterate);
criterion_main!(benches);
