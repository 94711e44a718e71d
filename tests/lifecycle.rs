//! Driving tasks stage by stage through the public API
use ppc::{
    tasks::{
        linear::{GaussJordanSeq, IterativeInput, JacobiDistributed, LinearSystem},
        optimize::{OptimizeInput, StronginDistributed, StronginSeq},
        reduction::{DotProductDistributed, VectorPair},
    },
    traits::Communicator,
    types::{DenseMatrix, Stage},
    Error, LocalUniverse, SingleProcess, TaskRunner,
};

fn system() -> LinearSystem {
    let matrix = DenseMatrix::new(3, 3, vec![4.0, 1.0, 0.0, 1.0, 5.0, 2.0, 0.0, 2.0, 6.0]).unwrap();
    LinearSystem::new(matrix, vec![5.0, 8.0, 8.0])
}

#[test]
fn test_stages_in_order() {
    let mut runner = TaskRunner::named(GaussJordanSeq::new(system()), "gauss_jordan");
    assert_eq!(runner.stage(), Stage::Created);
    runner.validation().unwrap();
    runner.pre_processing().unwrap();
    assert!(matches!(
        runner.post_processing(),
        Err(Error::StageOrder {
            current: Stage::PreProcessed,
            attempted: Stage::PostProcessed
        })
    ));
    runner.run().unwrap();
    runner.post_processing().unwrap();
    assert_eq!(runner.stage(), Stage::PostProcessed);
    let x = runner.output();
    assert!((x[0] - 1.0).abs() < 1e-12);
    assert!((x[1] - 1.0).abs() < 1e-12);
    assert!((x[2] - 1.0).abs() < 1e-12);
}

#[test]
fn test_failed_validation_stops_the_pipeline() {
    let mismatched = LinearSystem::new(DenseMatrix::new(2, 2, vec![1.0; 4]).unwrap(), vec![1.0]);
    let mut runner = TaskRunner::new(GaussJordanSeq::new(mismatched));
    assert!(matches!(runner.validation(), Err(Error::ValidationFailed)));
    assert_eq!(runner.stage(), Stage::Failed);
    assert!(matches!(runner.pre_processing(), Err(Error::StageOrder { .. })));
}

#[test]
fn test_distributed_runner_per_rank() {
    let input = IterativeInput::new(system(), 1e-12, 200);
    let outputs = LocalUniverse::new(3)
        .run(|comm| {
            let mut runner = TaskRunner::new(JacobiDistributed::new(comm, input.clone()));
            runner.run_pipeline()?;
            Ok((comm.rank(), runner.output().clone()))
        })
        .unwrap();
    for (rank, (r, x)) in outputs.iter().enumerate() {
        assert_eq!(*r, rank);
        assert_eq!(x, &outputs[0].1);
    }
}

#[test]
fn test_rank_local_input_is_ignored() {
    // Only the root's vectors count; the other ranks pass mismatched data.
    let outputs = LocalUniverse::new(2)
        .run(|comm| {
            let pair = if comm.rank() == 0 {
                VectorPair::new(vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0])
            } else {
                VectorPair::new(vec![], vec![1.0])
            };
            let mut runner = TaskRunner::new(DotProductDistributed::new(comm, pair));
            Ok(*runner.run_pipeline()?)
        })
        .unwrap();
    assert_eq!(outputs, vec![32.0, 32.0]);
}

#[test]
fn test_single_process_matches_sequential() {
    let input = OptimizeInput::new(-2.0, 3.0, |x| (x - 0.5) * (x - 0.5) + 1.0);
    let seq = ppc::run_pipeline(StronginSeq::new(input)).unwrap();
    let comm = SingleProcess::new();
    let single = ppc::run_pipeline(StronginDistributed::new(&comm, input)).unwrap();
    assert_eq!(seq, single);
    assert!((seq.x - 0.5).abs() < 1e-3);
}
