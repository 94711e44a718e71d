//! Every distributed task agrees with its sequential counterpart on one to four ranks
use approx::relative_eq;
use paste::paste;
use ppc::{
    config::Settings,
    harness::{run_process_counts, FuncTestCase},
    run_pipeline,
    tasks::{
        hull::{ConvexHullDistributed, ConvexHullSeq},
        image::{GaussianBlurDistributed, GaussianBlurSeq},
        integrate::{QuadratureDistributed, QuadratureInput, QuadratureRule, QuadratureSeq},
        linear::{
            GaussJordanDistributed, GaussJordanSeq, IterativeInput, JacobiDistributed, JacobiSeq,
            LinearSystem,
        },
        matmul::{
            CannonDistributed, CannonSeq, CrsMultiplyDistributed, CrsMultiplySeq,
            DenseMultiplyDistributed, DenseMultiplySeq, MatrixPair,
        },
        reduction::{ReduceInput, VectorReduceDistributed, VectorReduceSeq},
        sort::{LocalSort, MergeStrategy, SortDistributed, SortSeq},
    },
    types::{CrsMatrix, DenseMatrix, Image, Point, ReduceOp},
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

fn settings() -> Settings {
    Settings {
        num_proc: 4,
        ..Settings::default()
    }
}

fn close(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| relative_eq!(x, y, max_relative = 1e-9))
}

fn system(n: usize) -> LinearSystem {
    let matrix = DenseMatrix::from_fn(n, n, |i, j| {
        if i == j {
            2.0 * n as f64
        } else {
            1.0 / (1 + i + j) as f64
        }
    });
    let rhs = (0..n).map(|i| i as f64 - 1.5).collect();
    LinearSystem::new(matrix, rhs)
}

macro_rules! sort_tests {
    ($($strategy:ident),*) => {
        $(
            paste! {
                #[test]
                fn [<test_sort_ $strategy:snake>]() {
                    let mut rng = ChaCha8Rng::seed_from_u64(7);
                    let input = (0..257).map(|_| rng.gen_range(-1e6..1e6)).collect::<Vec<f64>>();
                    let case = FuncTestCase::new(stringify!($strategy), input)
                        .with_check(|input, output: &Vec<f64>| {
                            output.len() == input.len() && output.windows(2).all(|w| w[0] <= w[1])
                        });
                    run_process_counts(
                        &case,
                        &settings(),
                        |input| run_pipeline(SortSeq::new(input, LocalSort::Quick)),
                        |comm, input| {
                            run_pipeline(SortDistributed::new(
                                comm,
                                input,
                                LocalSort::Radix,
                                MergeStrategy::$strategy,
                            ))
                        },
                        |a, b| a == b,
                    )
                    .unwrap();
                }
            }
        )*
    };
}

sort_tests!(OddEvenTransposition, BatcherNetwork, HypercubeTree);

#[test]
fn test_dense_matmul() {
    let a = DenseMatrix::from_fn(7, 5, |i, j| (i as f64 - j as f64) * 3.0 + 1.0);
    let b = DenseMatrix::from_fn(5, 6, |i, j| ((i * j) % 4) as f64 - 1.0);
    let case = FuncTestCase::new("dense", MatrixPair::new(a, b));
    run_process_counts(
        &case,
        &settings(),
        |input| run_pipeline(DenseMultiplySeq::new(input)),
        |comm, input| run_pipeline(DenseMultiplyDistributed::new(comm, input)),
        |a, b| a == b,
    )
    .unwrap();
}

#[test]
fn test_cannon() {
    let a = DenseMatrix::from_fn(6, 6, |i, j| (i + 2 * j) as f64 - 5.0);
    let b = DenseMatrix::from_fn(6, 6, |i, j| ((3 * i + j) % 7) as f64);
    let case = FuncTestCase::new("cannon", MatrixPair::new(a, b));
    run_process_counts(
        &case,
        &settings(),
        |input| run_pipeline(CannonSeq::new(input, 2)),
        |comm, input| run_pipeline(CannonDistributed::new(comm, input)),
        |a, b| a == b,
    )
    .unwrap();
}

#[test]
fn test_crs_matmul() {
    let a = DenseMatrix::from_fn(8, 6, |i, j| if (i + j) % 3 == 0 { (i + 1) as f64 } else { 0.0 });
    let b = DenseMatrix::from_fn(6, 5, |i, j| if i == j || j == 0 { 0.5 } else { 0.0 });
    let case = FuncTestCase::new(
        "crs",
        MatrixPair::new(CrsMatrix::from_dense(&a), CrsMatrix::from_dense(&b)),
    );
    run_process_counts(
        &case,
        &settings(),
        |input| run_pipeline(CrsMultiplySeq::new(input)),
        |comm, input| run_pipeline(CrsMultiplyDistributed::new(comm, input)),
        |a, b| a == b,
    )
    .unwrap();
}

#[test]
fn test_quadrature() {
    let input = QuadratureInput {
        bounds: vec![(0.0, 1.0), (-1.0, 2.0)],
        steps: 20,
        integrand: |p| p[0] * p[0] + p[1],
    };
    let case = FuncTestCase::new("simpson", input).with_check(|_, value: &f64| {
        relative_eq!(*value, 2.5, max_relative = 1e-12)
    });
    run_process_counts(
        &case,
        &settings(),
        |input| run_pipeline(QuadratureSeq::new(input, QuadratureRule::Simpson)),
        |comm, input| {
            run_pipeline(QuadratureDistributed::new(
                comm,
                input,
                QuadratureRule::Simpson,
            ))
        },
        |a, b| relative_eq!(a, b, max_relative = 1e-12),
    )
    .unwrap();
}

#[test]
fn test_jacobi() {
    let case = FuncTestCase::new("jacobi", IterativeInput::new(system(9), 1e-12, 500))
        .with_check(|input, x: &Vec<f64>| input.system.residual(x) < 1e-9);
    run_process_counts(
        &case,
        &settings(),
        |input| run_pipeline(JacobiSeq::new(input)),
        |comm, input| run_pipeline(JacobiDistributed::new(comm, input)),
        |a, b| a == b,
    )
    .unwrap();
}

#[test]
fn test_gauss_jordan() {
    let case = FuncTestCase::new("gauss_jordan", system(7))
        .with_check(|system, x: &Vec<f64>| system.residual(x) < 1e-10);
    run_process_counts(
        &case,
        &settings(),
        |input| run_pipeline(GaussJordanSeq::new(input)),
        |comm, input| run_pipeline(GaussJordanDistributed::new(comm, input)),
        |a, b| close(a, b),
    )
    .unwrap();
}

#[test]
fn test_convex_hull() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let points = (0..200)
        .map(|_| Point::new(rng.gen_range(-50..50) as f64, rng.gen_range(-50..50) as f64))
        .collect::<Vec<_>>();
    let case = FuncTestCase::new("hull", points);
    run_process_counts(
        &case,
        &settings(),
        |input| run_pipeline(ConvexHullSeq::new(input)),
        |comm, input| run_pipeline(ConvexHullDistributed::new(comm, input)),
        |a, b| a == b,
    )
    .unwrap();
}

#[test]
fn test_gaussian_blur() {
    let (width, height, channels) = (9, 7, 3);
    let pixels = (0..width * height * channels)
        .map(|i| ((i * 37) % 256) as u8)
        .collect();
    let image = Image::new(width, height, channels, pixels).unwrap();
    let case = FuncTestCase::new("blur", image).with_check(|input, output: &Option<Image>| {
        output
            .as_ref()
            .is_some_and(|o| o.width() == input.width() && o.height() == input.height())
    });
    run_process_counts(
        &case,
        &settings(),
        |input| run_pipeline(GaussianBlurSeq::new(input)),
        |comm, input| run_pipeline(GaussianBlurDistributed::new(comm, input)),
        |a, b| a == b,
    )
    .unwrap();
}

#[test]
fn test_vector_reduce() {
    let case = FuncTestCase::new(
        "max",
        ReduceInput::new((0..30).map(|i| (i * 17) % 23 - 11).collect::<Vec<i32>>(), ReduceOp::Max),
    );
    let max = run_process_counts(
        &case,
        &settings(),
        |input| run_pipeline(VectorReduceSeq::new(input)),
        |comm, input| run_pipeline(VectorReduceDistributed::new(comm, input)),
        |a, b| a == b,
    )
    .unwrap();
    assert_eq!(max, 11);
}
