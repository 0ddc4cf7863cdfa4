// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use std::path::PathBuf;

use canopy_cache::{CacheData, PlyReader, build_with_cache, ply, read_all_parallel};
use criterion::{BatchSize, Criterion, Throughput, black_box, criterion_group, criterion_main};

#[derive(Clone)]
struct Rng(u64);

impl Rng {
    fn new(seed: u64) -> Self {
        Self(seed)
    }
    fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.0 = x;
        x
    }
    fn next_f64(&mut self) -> f64 {
        let v = self.next_u64() >> 11;
        (v as f64) / ((1u64 << 53) as f64)
    }
}

/// `files` clouds of `points` random vertices each.
fn gen_plot(files: usize, points: usize) -> (tempfile::TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let mut rng = Rng::new(0xFACE_FEED_CAFE_BABE);
    let paths = (0..files)
        .map(|i| {
            let (ox, oy) = (rng.next_f64() * 1000.0, rng.next_f64() * 1000.0);
            let cloud: Vec<[f64; 3]> = (0..points)
                .map(|_| {
                    [
                        ox + rng.next_f64() * 3.0,
                        oy + rng.next_f64() * 3.0,
                        rng.next_f64() * 20.0,
                    ]
                })
                .collect();
            let p = dir.path().join(format!("plot_segmented_{i}.ply"));
            ply::write_points(&p, &cloud, "bench").unwrap();
            p
        })
        .collect();
    (dir, paths)
}

fn bench_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("bbox_read");
    group.sample_size(20);
    let (dir, files) = gen_plot(64, 20_000);
    group.throughput(Throughput::Elements(files.len() as u64));

    for &threads in &[1usize, 4, 8] {
        group.bench_function(format!("uncached_t{threads}"), |b| {
            b.iter(|| black_box(read_all_parallel(&files, threads, &PlyReader).unwrap().len()))
        });
    }

    let cache_path = dir.path().join("bboxes_cache.bin");
    group.bench_function("cold_cache_t8", |b| {
        b.iter_batched(
            || {
                let _ = std::fs::remove_file(&cache_path);
            },
            |()| {
                let out = build_with_cache(dir.path(), &files, 8, &cache_path, &PlyReader).unwrap();
                black_box(out.misses);
            },
            BatchSize::PerIteration,
        )
    });

    build_with_cache(dir.path(), &files, 8, &cache_path, &PlyReader).unwrap();
    group.bench_function("warm_cache_t8", |b| {
        b.iter(|| {
            let out = build_with_cache(dir.path(), &files, 8, &cache_path, &PlyReader).unwrap();
            black_box(out.hits);
        })
    });
    group.bench_function("load_only", |b| {
        b.iter(|| black_box(CacheData::load(&cache_path).len()))
    });
    group.finish();
}

criterion_group!(benches, bench_read);
criterion_main!(benches);
