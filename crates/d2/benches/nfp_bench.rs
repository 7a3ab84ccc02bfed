//! Benchmarks for 2D nesting operations.
//!
//! Measures NFP computation by each method and a small packing run.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use orbitnest_d2::{compute_nfp, Bin, Config, Packer, Part, ShapeKind, Solver};

fn bench_nfp(c: &mut Criterion) {
    let mut group = c.benchmark_group("nfp");

    let l_shape = Part::l_shape("l", 40.0, 30.0, 15.0, 15.0).shape();
    let square = Part::rectangle("s", 10.0, 10.0).shape();
    let bin = Bin::new("sheet", 200.0, 200.0);

    group.bench_function("rectangle_inner", |b| {
        b.iter(|| {
            compute_nfp(
                black_box(bin.polygon()),
                ShapeKind::Bin,
                black_box(&l_shape),
                true,
                false,
            )
        })
    });

    for (name, explore) in [("minkowski", false), ("orbiting", true)] {
        group.bench_with_input(BenchmarkId::new("l_shape_square", name), &explore, |b, &explore| {
            b.iter(|| {
                compute_nfp(
                    black_box(&l_shape),
                    ShapeKind::Part,
                    black_box(&square),
                    false,
                    explore,
                )
            })
        });
    }

    group.finish();
}

fn bench_packing(c: &mut Criterion) {
    let mut group = c.benchmark_group("packer");
    group.sample_size(10);

    for &n in &[4, 8] {
        let parts: Vec<Part> = (0..n)
            .map(|i| {
                let w = 20.0 + (i as f64 * 3.0) % 30.0;
                let h = 15.0 + (i as f64 * 7.0) % 25.0;
                Part::rectangle(format!("R{}", i), w, h)
            })
            .collect();
        let bins = vec![Bin::new("sheet", 200.0, 200.0)];
        let packer = Packer::new(
            Config::new()
                .with_population_size(6)
                .with_generations(2)
                .with_rotation_steps(4),
        );

        group.bench_with_input(BenchmarkId::new("rectangles", n), &(bins, parts), |b, (bins, parts)| {
            b.iter(|| black_box(packer.solve(black_box(bins), black_box(parts))))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_nfp, bench_packing);
criterion_main!(benches);
