use mpi::{environment::Universe, traits::Communicator as _};
use ppc::{
    run_pipeline,
    tasks::sort::{LocalSort, MergeStrategy, SortDistributed, SortSeq},
    MpiComm,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Sort with every combination of local sort and merge strategy
fn main() {
    let universe: Universe = mpi::initialize().unwrap();
    let world = universe.world();
    let comm = MpiComm::new(&world);

    // The input is only read on rank 0
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let input = (0..10_000)
        .map(|_| rng.gen_range(-1e6..1e6))
        .collect::<Vec<f64>>();
    let expected = run_pipeline(SortSeq::new(input.clone(), LocalSort::Quick)).unwrap();

    for local_sort in LocalSort::ALL {
        for strategy in MergeStrategy::ALL {
            let sorted =
                run_pipeline(SortDistributed::new(&comm, input.clone(), local_sort, strategy))
                    .unwrap();
            assert_eq!(sorted, expected, "{local_sort:?} with {strategy:?}");
        }
    }

    if world.rank() == 0 {
        println!("All sorts agree on {} processes", world.size());
    }
}
