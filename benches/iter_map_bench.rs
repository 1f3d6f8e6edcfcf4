use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use layout_hashmap::IterMap;
use std::collections::HashMap;
use std::time::Duration;

#[derive(Copy, Clone, Default)]
struct Data {
    f1: f32,
    f2: f32,
    f3: f32,
}

fn lcg(mut s: u64) -> impl Iterator<Item = u64> {
    std::iter::from_fn(move || {
        s = s.wrapping_mul(6364136223846793005).wrapping_add(1);
        Some(s)
    })
}

fn data(i: usize) -> Data {
    let x = i as f32;
    Data { f1: x, f2: x + 1.0, f3: x + 2.0 }
}

fn filled(seed: u64, n: usize) -> IterMap<u64, Data> {
    lcg(seed).take(n).enumerate().map(|(i, x)| (x, data(i))).collect()
}

fn bench_iter_100k(c: &mut Criterion) {
    let m = filled(999, 100_000);
    let s: HashMap<u64, Data> = m.iter().map(|(k, v)| (*k, *v)).collect();
    let h: hashbrown::HashMap<u64, Data> = m.iter().map(|(k, v)| (*k, *v)).collect();

    c.bench_function("iter_map::iter_all_100k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for (_k, v) in m.iter() {
                sum += v.f1 + v.f2 + v.f3;
            }
            black_box(sum)
        })
    });
    c.bench_function("std::iter_all_100k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for v in s.values() {
                sum += v.f1 + v.f2 + v.f3;
            }
            black_box(sum)
        })
    });
    c.bench_function("hashbrown::iter_all_100k", |b| {
        b.iter(|| {
            let mut sum = 0.0f32;
            for v in h.values() {
                sum += v.f1 + v.f2 + v.f3;
            }
            black_box(sum)
        })
    });
}

fn bench_iter_with_holes(c: &mut Criterion) {
    c.bench_function("iter_map::iter_after_erasing_half_100k", |b| {
        let mut m = filled(1234, 100_000);
        let mut cur = m.begin();
        let mut odd = false;
        while !m.is_end(cur) {
            cur = if odd { m.erase_at(cur).unwrap() } else { m.advance(cur).unwrap() };
            odd = !odd;
        }
        b.iter(|| {
            let mut sum = 0.0f32;
            for (_k, v) in m.iter() {
                sum += v.f1;
            }
            black_box(sum)
        })
    });
}

fn bench_iter_mut_increment(c: &mut Criterion) {
    c.bench_function("iter_map::iter_mut_increment_all_100k", |b| {
        b.iter_batched(
            || filled(1001, 100_000),
            |mut m| {
                for (_k, v) in m.iter_mut() {
                    v.f1 += 1.0;
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_fresh_100k(c: &mut Criterion) {
    c.bench_function("iter_map::insert_fresh_100k", |b| {
        b.iter_batched(
            IterMap::<u64, Data>::new,
            |mut m| {
                for (i, x) in lcg(1).take(100_000).enumerate() {
                    m.insert(x, data(i));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_insert_warm_100k(c: &mut Criterion) {
    c.bench_function("iter_map::insert_warm_100k", |b| {
        b.iter_batched(
            || {
                // Pre-grow and then drain so freed slots are reused.
                let mut m = filled(2, 110_000);
                let mut cur = m.begin();
                while !m.is_end(cur) {
                    cur = m.erase_at(cur).unwrap();
                }
                m
            },
            |mut m| {
                for (i, x) in lcg(3).take(100_000).enumerate() {
                    m.insert(x, data(i));
                }
                black_box(m)
            },
            BatchSize::SmallInput,
        )
    });
}

fn bench_find_hit_10k(c: &mut Criterion) {
    let m = filled(7, 100_000);
    let keys: Vec<u64> = m.keys().copied().collect();
    let n = keys.len();
    let mut s = 0x9e3779b97f4a7c15u64;
    let queries: Vec<u64> = (0..10_000)
        .map(|_| {
            s = s.wrapping_mul(2862933555777941757).wrapping_add(3037000493);
            keys[(s as usize) % n]
        })
        .collect();
    c.bench_function("iter_map::find_hit_10k_on_100k", |b| {
        b.iter(|| {
            for k in &queries {
                black_box(m.get(k));
            }
        })
    });
}

fn bench_config() -> Criterion {
    Criterion::default()
        .sample_size(12)
        .measurement_time(Duration::from_secs(5))
        .warm_up_time(Duration::from_secs(1))
}

criterion_group! {
    name = benches_iter;
    config = bench_config();
    targets = bench_iter_100k, bench_iter_with_holes, bench_iter_mut_increment
}
criterion_group! {
    name = benches_ops;
    config = bench_config();
    targets = bench_insert_fresh_100k, bench_insert_warm_100k, bench_find_hit_10k
}
criterion_main!(benches_iter, benches_ops);
