use mpi::environment::Universe;
use ppc::{
    collectives, run_pipeline,
    tasks::collective::{BroadcastTask, CollectiveInput, GatherTask, ScatterTask},
    traits::Communicator,
    types::ReduceOp,
    MpiComm,
};

/// Check the tree collectives against the native MPI collectives
fn main() {
    let universe: Universe = mpi::initialize().unwrap();
    let world = universe.world();
    let comm = MpiComm::new(&world);
    let size = comm.size();
    let rank = comm.rank();

    for root in 0..size {
        // Scatter three values to every rank
        let data = (0..3 * size as i64).collect::<Vec<_>>();
        let input = CollectiveInput::new(data.clone(), 3, root);
        let custom = run_pipeline(ScatterTask::new(&comm, input)).unwrap();
        let native = comm.scatterv(&data, &vec![3; size], root).unwrap();
        assert_eq!(custom, native);

        // Gather two values from every rank
        let local = vec![rank as f64, -(rank as f64)];
        let input = CollectiveInput::new(local.clone(), 2, root);
        let gathered = run_pipeline(GatherTask::new(&comm, input)).unwrap();
        let native = comm.gatherv(&local, &vec![2; size], root).unwrap();
        if rank == root {
            assert_eq!(gathered, native);
        }

        // Broadcast the root's buffer
        let buffer = if rank == root { vec![root as u32; 5] } else { vec![] };
        let input = CollectiveInput::new(buffer, 5, root);
        let received = run_pipeline(BroadcastTask::new(&comm, input)).unwrap();
        assert_eq!(received, vec![root as u32; 5]);
    }

    // The raw tree reductions agree with MPI_Allreduce
    let local = [rank as i32 + 1];
    let tree = collectives::all_reduce(&comm, &local, ReduceOp::Product).unwrap();
    let native = comm.all_reduce(&local, ReduceOp::Product).unwrap();
    assert_eq!(tree, native);

    if rank == 0 {
        println!("Collectives agree on {size} processes");
    }
}
