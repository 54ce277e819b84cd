//! Pathfinding and grid refresh benchmarks.
//!
//! A search runs once per agent per tick, so at 60 Hz a few hundred agents
//! leave only a handful of microseconds per call. The obstacle fields are
//! generated from a fixed seed so runs are comparable.
//!
//! Run with: `cargo bench --bench pathfind_benchmarks`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use glam::{IVec2, Vec2};
use rand::Rng;
use rand::SeedableRng;
use rand_pcg::Pcg64;

use lumen_nav::prelude::*;

const DT: f32 = 1.0 / 60.0;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Scatter `count` colliders over a `size` x `size` unit grid. Roughly a third
/// of them are moving bodies, the rest are static walls.
fn random_colliders(size: i32, count: usize, seed: u64) -> Vec<ColliderSample> {
    let mut rng = Pcg64::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let min = Vec2::new(
                rng.gen_range(0..size) as f32,
                rng.gen_range(0..size) as f32,
            );
            let extent = Vec2::new(rng.gen_range(0.5..2.5), rng.gen_range(0.5..2.5));
            let bounds = Bounds2D::new(min, min + extent);
            if rng.gen_bool(0.33) {
                let delta = Vec2::new(rng.gen_range(-0.3..0.3), rng.gen_range(-0.3..0.3));
                ColliderSample::moving(bounds, rng.gen_range(0.5..4.0), delta)
            } else {
                ColliderSample::fixed(bounds)
            }
        })
        .collect()
}

fn grid(size: i32) -> NavGrid {
    NavGrid::new(
        Bounds2D::new(Vec2::ZERO, Vec2::splat(size as f32)),
        Vec2::ONE,
    )
    .unwrap()
}

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

fn bench_refresh(c: &mut Criterion) {
    let mut group = c.benchmark_group("grid_refresh");
    for &count in &[100usize, 1_000] {
        let colliders = random_colliders(64, count, 7);
        let mut g = grid(64);
        group.bench_with_input(BenchmarkId::from_parameter(count), &colliders, |b, colliders| {
            b.iter(|| g.refresh(black_box(colliders), DT));
        });
    }
    group.finish();
}

fn bench_find_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("find_path");
    for &density in &[0usize, 200, 600] {
        let mut g = grid(64);
        g.refresh(&random_colliders(64, density, 11), DT);

        let mut pathfinder = Pathfinder::new();
        let mut path: Vec<IVec2> = Vec::with_capacity(128);
        let start = Vec2::new(0.5, 0.5);
        let goal = Vec2::new(40.5, 33.5);

        group.bench_with_input(BenchmarkId::new("colliders", density), &g, |b, g| {
            b.iter(|| {
                pathfinder.find_path(g, black_box(1.5), start, goal, &mut path);
                black_box(path.len())
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_refresh, bench_find_path);
criterion_main!(benches);
