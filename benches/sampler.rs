use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use parlay_engine::cholesky::factor;
use parlay_engine::correlation::AssembledCorrelation;
use parlay_engine::sampler::simulate;

/// Dense n-leg correlation with a flat 0.3 off-diagonal.
fn test_factor(n: usize) -> parlay_engine::cholesky::CorrelationFactor {
    let mut matrix = vec![0.3; n * n];
    for i in 0..n {
        matrix[i * n + i] = 1.0;
    }
    factor(&AssembledCorrelation {
        matrix,
        n,
        imputed_pairs: vec![],
    })
    .expect("flat 0.3 matrix is PSD")
}

/// The latency budget is <=150 ms for 10k samples at n <= 6 after warmup;
/// this tracks the kernel across the supported leg counts.
fn bench_kernel(c: &mut Criterion) {
    let mut group = c.benchmark_group("copula_kernel_10k");
    for n in 2..=6_usize {
        let f = test_factor(n);
        let thresholds: Vec<f64> = (0..n).map(|i| -0.2 + 0.1 * i as f64).collect();
        group.bench_function(format!("n{n}"), |b| {
            b.iter(|| {
                let counts = simulate(
                    black_box(&f),
                    black_box(&thresholds),
                    black_box(4.0),
                    10_000,
                    42,
                )
                .unwrap();
                black_box(counts.joint_hits);
            })
        });
    }
    group.finish();
}

fn bench_repair(c: &mut Criterion) {
    c.bench_function("psd_repair_indefinite_3", |b| {
        let corr = AssembledCorrelation {
            matrix: vec![1.0, 0.9, 0.9, 0.9, 1.0, -0.9, 0.9, -0.9, 1.0],
            n: 3,
            imputed_pairs: vec![],
        };
        b.iter(|| {
            let f = factor(black_box(&corr)).unwrap();
            black_box(f.lower[0]);
        })
    });
}

criterion_group!(benches, bench_kernel, bench_repair);
criterion_main!(benches);
