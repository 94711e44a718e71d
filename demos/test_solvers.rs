use mpi::{environment::Universe, traits::Communicator as _};
use ppc::{
    run_pipeline,
    tasks::linear::{
        GaussJordanDistributed, GaussSeidelDistributed, IterativeInput, JacobiDistributed,
        LinearSystem, SimpleIterationDistributed, SimpleIterationInput,
    },
    types::DenseMatrix,
    MpiComm,
};

/// Solve one diagonally dominant system with every solver
fn main() {
    let universe: Universe = mpi::initialize().unwrap();
    let world = universe.world();
    let comm = MpiComm::new(&world);

    let n = 50;
    let matrix = DenseMatrix::from_fn(n, n, |i, j| {
        if i == j {
            4.0 * n as f64
        } else {
            1.0 / (1.0 + i.abs_diff(j) as f64)
        }
    });
    let rhs = (0..n).map(|i| (i % 5) as f64 - 2.0).collect();
    let system = LinearSystem::new(matrix, rhs);
    let tolerance = 1e-10;

    let solutions = [
        run_pipeline(JacobiDistributed::new(
            &comm,
            IterativeInput::new(system.clone(), tolerance, 1000),
        ))
        .unwrap(),
        run_pipeline(GaussSeidelDistributed::new(
            &comm,
            IterativeInput::new(system.clone(), tolerance, 1000),
        ))
        .unwrap(),
        run_pipeline(SimpleIterationDistributed::new(
            &comm,
            SimpleIterationInput::new(system.clone(), tolerance, 1000),
        ))
        .unwrap(),
        run_pipeline(GaussJordanDistributed::new(&comm, system.clone())).unwrap(),
    ];
    for x in &solutions {
        assert!(system.residual(x) < 1e-8);
    }

    if world.rank() == 0 {
        println!("All solvers converged on {} processes", world.size());
    }
}
