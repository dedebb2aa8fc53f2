//! Differentiation, Evaluation and Solver Benchmarks
//!
//! Three groups are measured:
//!
//! - **Differentiation**: building first and second derivatives of parsed formulas,
//!   including the simplification applied to every new node
//! - **Evaluation**: evaluating a first derivative by walking the tree, through a prepared
//!   [`DerivativeBundle`] and, with the `jit` feature, through native code
//! - **Least squares**: a full parabola fit and a three-equation system from a fixed start
//!
//! Run with: `cargo bench --bench solver` (add `--features jit` for the native backend)

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use exprfit::prelude::*;

const FORMULAS: [&str; 4] = [
    "a*x^2 + b*x + c",
    "(a^3 + 2*a^2 - 5*a + 1) / (b^2 + 3*b + 2)",
    "sqrt(a*a + b*b) * sin(a - b) / cos(b)",
    "(a^3 + b^2*c - 2*a*b + c) / ((a+b)*(b+c)*(a+c) + 1) + sqrt(a*b*c)",
];

fn benchmark_differentiation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Differentiation");

    for (i, formula) in FORMULAS.iter().enumerate() {
        let (expr, names) = parse_with_symbols(formula).unwrap();
        group.bench_with_input(
            BenchmarkId::new("First", format!("expr_{}", i)),
            &expr,
            |b, expr| b.iter(|| black_box(expr.pdiff_index(0))),
        );
        group.bench_with_input(
            BenchmarkId::new("Bundle", format!("expr_{}", i)),
            &expr,
            |b, expr| {
                b.iter(|| black_box(DerivativeBundle::new(expr.clone(), names.len()).unwrap()))
            },
        );
    }

    group.finish();
}

fn benchmark_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("Evaluation");
    let input = [2.5, 1.8, 0.7, 1.1, 0.3];

    for (i, formula) in FORMULAS.iter().enumerate() {
        let (expr, _) = parse_with_symbols(formula).unwrap();
        let derivative = expr.pdiff_index(0);

        group.bench_with_input(
            BenchmarkId::new("Tree", format!("expr_{}", i)),
            &derivative,
            |b, e| b.iter(|| black_box(e.eval(black_box(&input[..])).unwrap())),
        );

        let interpreted =
            DerivativeBundle::with_backend(expr.clone(), 1, Backend::Interpreter).unwrap();
        group.bench_with_input(
            BenchmarkId::new("Interpreter", format!("expr_{}", i)),
            &interpreted,
            |b, bundle| {
                b.iter(|| black_box(bundle.eval_c1(0, black_box(&input[..])).unwrap()))
            },
        );

        #[cfg(feature = "jit")]
        {
            let compiled = DerivativeBundle::with_backend(expr.clone(), 1, Backend::Jit).unwrap();
            group.bench_with_input(
                BenchmarkId::new("JIT", format!("expr_{}", i)),
                &compiled,
                |b, bundle| {
                    b.iter(|| black_box(bundle.eval_c1(0, black_box(&input[..])).unwrap()))
                },
            );
        }
    }

    group.finish();
}

fn benchmark_least_squares(c: &mut Criterion) {
    let a = Expr::var(0, "a");
    let b = Expr::var(1, "b");
    let cc = Expr::var(2, "c");
    let x = Expr::var(3, "x");
    let y = Expr::var(4, "y");

    let fit = LeastSquares::new(&y - (&a * &x * &x + &b * &x + &cc), 3, 2).unwrap();
    let points = [[-2.0, 4.0], [-1.0, 1.0], [0.0, 0.0], [1.0, 1.0], [2.0, 4.0]];

    let mut system = LeastSquaresSystem::new(3, 0);
    system
        .push(&a * &a + &b + &cc - 18)
        .unwrap()
        .push(&a - &b * &b + &cc + 8)
        .unwrap()
        .push(&a + &b - &cc * &cc + 18)
        .unwrap();

    let mut group = c.benchmark_group("Least Squares");

    group.bench_function("Curve fit", |bench| {
        bench.iter(|| {
            let mut params = [10.0, 10.0, 10.0];
            let report = fit
                .optimize(&mut params, &points, |_, r| r.norm() > 1e-12)
                .unwrap();
            black_box((params, report))
        })
    });

    group.bench_function("System", |bench| {
        bench.iter(|| {
            let mut values = [10.0, 10.0, 10.0];
            let mut count = 0;
            let report = system
                .optimize(&mut values, |_, r| {
                    count += 1;
                    count <= 20 && r.norm() > 1e-12
                })
                .unwrap();
            black_box((values, report))
        })
    });

    group.finish();
}

criterion_group!(
    benches,
    benchmark_differentiation,
    benchmark_evaluation,
    benchmark_least_squares
);
criterion_main!(benches);
