use mpi::{environment::Universe, traits::Communicator as _};
use ppc::{
    run_pipeline,
    tasks::matmul::{
        grid_side, CannonDistributed, CrsMultiplyDistributed, DenseMultiplyDistributed,
        MatrixPair,
    },
    types::{CrsMatrix, DenseMatrix},
    MpiComm,
};

/// Multiply matrices with the row striped, Cannon and sparse algorithms
fn main() {
    let universe: Universe = mpi::initialize().unwrap();
    let world = universe.world();
    let comm = MpiComm::new(&world);
    let rank = world.rank();

    let a = DenseMatrix::from_fn(40, 30, |i, j| ((i * 3 + j * 5) % 7) as f64 - 3.0);
    let b = DenseMatrix::from_fn(30, 20, |i, j| if (i + j) % 4 == 0 { 1.5 } else { 0.0 });
    let expected = a.matmul(&b).unwrap();

    let dense =
        run_pipeline(DenseMultiplyDistributed::new(&comm, MatrixPair::new(a.clone(), b.clone())))
            .unwrap();
    let cannon =
        run_pipeline(CannonDistributed::new(&comm, MatrixPair::new(a.clone(), b.clone())))
            .unwrap();
    let sparse = run_pipeline(CrsMultiplyDistributed::new(
        &comm,
        MatrixPair::new(CrsMatrix::from_dense(&a), CrsMatrix::from_dense(&b)),
    ))
    .unwrap();

    for (x, y) in expected.data().iter().zip(dense.data()) {
        assert!((x - y).abs() < 1e-9);
    }
    for (x, y) in expected.data().iter().zip(cannon.data()) {
        assert!((x - y).abs() < 1e-9);
    }
    for (x, y) in expected.data().iter().zip(sparse.to_dense().data()) {
        assert!((x - y).abs() < 1e-9);
    }

    if rank == 0 {
        let q = grid_side(world.size() as usize);
        println!("Products agree; Cannon used a {q}x{q} process grid");
    }
}
