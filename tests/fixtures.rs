//! Tasks fed from the fixture files under `data/`
use approx::assert_abs_diff_eq;
use ppc::{
    config::Settings,
    fixtures::{read_matrix, read_system, read_vector, task_data_path},
    run_pipeline,
    tasks::{
        linear::{GaussJordanSeq, GaussSeidelDistributed, IterativeInput},
        matmul::{DenseMultiplySeq, MatrixPair},
        sort::{LocalSort, MergeStrategy, SortDistributed},
    },
    LocalUniverse,
};

fn path(task: &str, file: &str) -> std::path::PathBuf {
    task_data_path(&Settings::default(), task, file)
}

#[test]
fn test_sort_fixture() {
    let input: Vec<f64> = read_vector(path("sort", "input.txt")).unwrap();
    assert_eq!(input.len(), 12);
    let outputs = LocalUniverse::new(3)
        .run(|comm| {
            run_pipeline(SortDistributed::new(
                comm,
                input.clone(),
                LocalSort::Radix,
                MergeStrategy::BatcherNetwork,
            ))
        })
        .unwrap();
    let sorted = &outputs[0];
    assert_eq!(sorted[0], -17.0);
    assert_eq!(sorted[11], 1e3);
    // Negative zero orders before positive zero.
    let zeros = sorted.iter().filter(|v| **v == 0.0).collect::<Vec<_>>();
    assert!(zeros[0].is_sign_negative() && zeros[1].is_sign_positive());
}

#[test]
fn test_system_fixture() {
    let system = read_system(path("linear", "system.txt")).unwrap();
    let direct = run_pipeline(GaussJordanSeq::new(system.clone())).unwrap();
    for (x, e) in direct.iter().zip([1.0, 2.0, -1.0, 1.0]) {
        assert_abs_diff_eq!(*x, e, epsilon = 1e-12);
    }

    let input = IterativeInput::new(system, 1e-10, 200);
    let outputs = LocalUniverse::new(2)
        .run(|comm| run_pipeline(GaussSeidelDistributed::new(comm, input.clone())))
        .unwrap();
    for (x, e) in outputs[1].iter().zip(&direct) {
        assert_abs_diff_eq!(x, e, epsilon = 1e-9);
    }
}

#[test]
fn test_matrix_fixture() {
    let a = read_matrix::<f64>(path("matmul", "a.txt")).unwrap();
    let b = read_matrix::<f64>(path("matmul", "b.txt")).unwrap();
    let c = run_pipeline(DenseMultiplySeq::new(MatrixPair::new(a, b))).unwrap();
    assert_eq!(c.data(), &[7.0, -3.0, 0.0, 6.0, -2.0, 6.0]);
}

#[test]
fn test_missing_fixture() {
    assert!(matches!(
        read_vector::<f64>(path("sort", "does_not_exist.txt")),
        Err(ppc::Error::Io(_))
    ));
}
