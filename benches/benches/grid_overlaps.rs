// Copyright 2025 the Canopy Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

use canopy_index::{
    Aabb3D, BBox, GridIndex, Proximity, expand_xy, find_all_overlaps, neighbors_of,
};
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

/// A plot of `n * n` trees on a jittered lattice, crowns 1.5 to 3 m wide, 4 to 20 m tall.
fn gen_forest(n: usize, spacing: f64) -> Vec<BBox> {
    let mut out = Vec::with_capacity(n * n);
    let mut rng = Rng::new(0xCAFE_F00D_DEAD_BEEF);
    for y in 0..n {
        for x in 0..n {
            let cx = x as f64 * spacing + (rng.next_f64() - 0.5) * spacing;
            let cy = y as f64 * spacing + (rng.next_f64() - 0.5) * spacing;
            let r = 0.75 + rng.next_f64() * 0.75;
            let base = rng.next_f64() * 0.5;
            let top = base + 4.0 + rng.next_f64() * 16.0;
            let id = out.len() as u32;
            out.push(BBox::new(
                id,
                Aabb3D::new(cx - r, cx + r, cy - r, cy + r, base, top),
                format!("plot_segmented_{id}.ply"),
            ));
        }
    }
    out
}

/// Trees packed into a few dense stands, the worst case for per-cell pair scans.
fn gen_stands(n_stands: usize, per_stand: usize, spread: f64) -> Vec<BBox> {
    let mut out = Vec::with_capacity(n_stands * per_stand);
    let mut rng = Rng::new(0xC1A5_7E55_9999_ABCD);
    for _ in 0..n_stands {
        let (sx, sy) = (rng.next_f64() * 500.0, rng.next_f64() * 500.0);
        for _ in 0..per_stand {
            let cx = sx + (rng.next_f64() - 0.5) * spread;
            let cy = sy + (rng.next_f64() - 0.5) * spread;
            let id = out.len() as u32;
            out.push(BBox::new(
                id,
                Aabb3D::new(cx - 1.0, cx + 1.0, cy - 1.0, cy + 1.0, 0.0, 12.0),
                format!("stand_segmented_{id}.ply"),
            ));
        }
    }
    out
}

fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_build");
    for &n in &[32usize, 64, 128] {
        let boxes = gen_forest(n, 3.0);
        group.throughput(Throughput::Elements((n * n) as u64));
        for &cell in &[1.0, 4.0] {
            group.bench_function(format!("n{n}_cell{cell}"), |b| {
                b.iter_batched(
                    || GridIndex::new(cell),
                    |mut grid| {
                        grid.build(&boxes);
                        black_box(grid.occupied_cells());
                    },
                    BatchSize::SmallInput,
                )
            });
        }
    }
    group.finish();
}

fn bench_queries(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_query");
    let boxes = gen_forest(128, 3.0);
    let mut grid = GridIndex::new(2.0);
    grid.build(&boxes);
    let near = Proximity::default();

    let mut out = Vec::new();
    group.bench_function("candidates_buffer1", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let q = expand_xy(&boxes[i % boxes.len()].bounds, 1.0);
            out.clear();
            grid.query_candidates_into(&q, &mut out);
            i = i.wrapping_add(7919);
            black_box(out.len());
        })
    });
    group.bench_function("neighbors_of", |b| {
        let mut i = 0u32;
        b.iter(|| {
            let hits = neighbors_of(&mut grid, &boxes, i % boxes.len() as u32, near, 1.0);
            i = i.wrapping_add(7919);
            black_box(hits.ids.len());
        })
    });
    group.finish();
}

fn bench_overlaps(c: &mut Criterion) {
    let mut group = c.benchmark_group("all_pairs");
    let scenes = [
        ("forest_128", gen_forest(128, 3.0), 2.0),
        ("stands_20x400", gen_stands(20, 400, 40.0), 2.0),
    ];
    let near = Proximity::default();
    for (name, boxes, cell) in &scenes {
        let mut grid = GridIndex::new(*cell);
        grid.build(boxes);
        group.throughput(Throughput::Elements(boxes.len() as u64));
        for &threads in &[1usize, 2, 4, 8] {
            group.bench_function(format!("{name}_t{threads}"), |b| {
                b.iter(|| black_box(find_all_overlaps(boxes, &grid, threads, near).len()))
            });
        }
    }
    group.finish();
}

criterion_group!(benches, bench_build, bench_queries, bench_overlaps);
criterion_main!(benches);
