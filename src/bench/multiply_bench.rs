//! Criterion benchmarks for distributed multiply and elimination.
//!
//! Each iteration spins up a fresh in-process group, so the numbers include
//! thread start-up and every collective, the same costs the driver times.

use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use distmat::matrix::transpose::transpose;
use distmat::{Collective, LocalGroup, Variant, eliminate, multiply};

fn make_matrix(width: usize, seed: usize) -> Vec<f64> {
    (0..width * width)
        .map(|i| ((i * 7 + seed) % 13) as f64 - 6.0)
        .collect()
}

fn dominant(width: usize) -> Vec<f64> {
    let mut m = make_matrix(width, 3);
    for i in 0..width {
        m[i * width + i] = 20.0 * width as f64;
    }
    m
}

// ---------------------------------------------------------------------------
// Multiply
// ---------------------------------------------------------------------------

fn bench_multiply(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiply");
    group.sample_size(10);

    for width in [64, 256] {
        let a = make_matrix(width, 1);
        let b = make_matrix(width, 2);
        let mut bt = vec![0.0; width * width];
        transpose(&b, &mut bt, width, usize::MAX);

        for variant in Variant::ALL {
            let right = if variant == Variant::Pretranspose { &bt } else { &b };
            for workers in [1, 2, 4] {
                let id = BenchmarkId::new(format!("{variant}_{workers}w"), width);
                group.bench_with_input(id, &width, |bench, &width| {
                    bench.iter(|| {
                        LocalGroup::run(workers, |comm| {
                            let root = comm.is_root();
                            let (a, b) = if root { (&a[..], &right[..]) } else { (&[][..], &[][..]) };
                            let mut out = if root { vec![0.0; width * width] } else { Vec::new() };
                            multiply(comm, black_box(a), black_box(b), &mut out, width, variant)
                                .unwrap();
                            out
                        })
                    })
                });
            }
        }
    }

    group.finish();
}

// ---------------------------------------------------------------------------
// Elimination
// ---------------------------------------------------------------------------

fn bench_eliminate(c: &mut Criterion) {
    let mut group = c.benchmark_group("eliminate");
    group.sample_size(10);

    for width in [64, 256] {
        let m = dominant(width);
        for workers in [1, 2, 4] {
            group.bench_with_input(BenchmarkId::new(format!("{workers}w"), width), &width, |bench, &width| {
                bench.iter(|| {
                    LocalGroup::run(workers, |comm| {
                        let mut local = if comm.is_root() { m.clone() } else { Vec::new() };
                        eliminate(comm, black_box(&mut local), width).unwrap();
                        local
                    })
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_multiply, bench_eliminate);
criterion_main!(benches);
