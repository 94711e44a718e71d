//! Convex hull of a planar point set
//!
//! Hulls are listed counter-clockwise starting from the lowest point (the leftmost one among
//! equally low points). Points on an edge are not hull vertices and duplicates collapse.
use crate::{
    error::{Error, Result},
    partition::BlockDistribution,
    tasks::{root_decides, ROOT},
    traits::{Communicator, Task},
    types::{Point, TaskKind},
};

/// Andrew's monotone chain
pub fn monotone_chain(points: &[Point]) -> Vec<Point> {
    let mut sorted = points.to_vec();
    sorted.sort_by(Point::lex_cmp);
    sorted.dedup();
    if sorted.len() < 3 {
        return start_at_lowest(sorted);
    }

    let mut hull: Vec<Point> = Vec::with_capacity(sorted.len() + 1);
    for p in &sorted {
        while hull.len() >= 2 && hull[hull.len() - 2].cross(&hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    let lower = hull.len() + 1;
    for p in sorted.iter().rev().skip(1) {
        while hull.len() >= lower && hull[hull.len() - 2].cross(&hull[hull.len() - 1], p) <= 0.0 {
            hull.pop();
        }
        hull.push(*p);
    }
    hull.pop();
    start_at_lowest(hull)
}

fn start_at_lowest(mut hull: Vec<Point>) -> Vec<Point> {
    if let Some((first, _)) = hull
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| a.y.total_cmp(&b.y).then_with(|| a.x.total_cmp(&b.x)))
    {
        hull.rotate_left(first);
    }
    hull
}

fn all_finite(points: &[Point]) -> bool {
    points.iter().all(|p| p.x.is_finite() && p.y.is_finite())
}

fn check_hull(hull: &[Point]) -> Result<()> {
    let n = hull.len();
    if n < 3 {
        return Ok(());
    }
    let convex = (0..n).all(|i| hull[i].cross(&hull[(i + 1) % n], &hull[(i + 2) % n]) > 0.0);
    if convex {
        Ok(())
    } else {
        Err(Error::InvalidInput("hull is not strictly convex".into()))
    }
}

/// Convex hull on a single process
#[derive(Debug)]
pub struct ConvexHullSeq {
    input: Vec<Point>,
    output: Vec<Point>,
}

impl ConvexHullSeq {
    /// Create the task
    pub fn new(input: Vec<Point>) -> Self {
        Self {
            input,
            output: vec![],
        }
    }
}

impl Task for ConvexHullSeq {
    type Input = Vec<Point>;
    type Output = Vec<Point>;

    fn kind(&self) -> TaskKind {
        TaskKind::Sequential
    }
    fn input(&self) -> &Vec<Point> {
        &self.input
    }
    fn output(&self) -> &Vec<Point> {
        &self.output
    }

    fn validation(&mut self) -> bool {
        all_finite(&self.input)
    }

    fn pre_processing(&mut self) -> Result<()> {
        self.output.clear();
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        self.output = monotone_chain(&self.input);
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_hull(&self.output)
    }
}

/// Convex hull with the points distributed in blocks
///
/// Every rank computes the hull of its block. The root computes the hull of the local hull
/// vertices and broadcasts it.
#[derive(Debug)]
pub struct ConvexHullDistributed<'a, C: Communicator> {
    comm: &'a C,
    input: Vec<Point>,
    output: Vec<Point>,
    dist: Option<BlockDistribution>,
}

impl<'a, C: Communicator> ConvexHullDistributed<'a, C> {
    /// Create the task
    pub fn new(comm: &'a C, input: Vec<Point>) -> Self {
        Self {
            comm,
            input,
            output: vec![],
            dist: None,
        }
    }
}

impl<C: Communicator> Task for ConvexHullDistributed<'_, C> {
    type Input = Vec<Point>;
    type Output = Vec<Point>;

    fn kind(&self) -> TaskKind {
        TaskKind::Distributed
    }
    fn input(&self) -> &Vec<Point> {
        &self.input
    }
    fn output(&self) -> &Vec<Point> {
        &self.output
    }

    fn validation(&mut self) -> bool {
        root_decides(self.comm, || all_finite(&self.input))
    }

    fn pre_processing(&mut self) -> Result<()> {
        let n = self.comm.broadcast_value(self.input.len(), ROOT)?;
        self.dist = Some(BlockDistribution::new(n, self.comm.size()));
        self.output.clear();
        Ok(())
    }

    fn run(&mut self) -> Result<()> {
        let comm = self.comm;
        let dist = self.dist.as_ref().ok_or(Error::NotPreProcessed)?;
        let coords = if comm.is_root(ROOT) {
            Point::flatten(&self.input)
        } else {
            vec![]
        };
        let local = Point::unflatten(&comm.scatterv(&coords, dist.scaled(2).counts(), ROOT)?);
        let local_hull = Point::flatten(&monotone_chain(&local));
        tracing::trace!(
            rank = comm.rank(),
            points = local.len(),
            vertices = local_hull.len() / 2,
            "local hull"
        );

        let counts = comm.gatherv(&[local_hull.len()], &vec![1; comm.size()], ROOT)?;
        let gathered = comm.gatherv(&local_hull, &counts, ROOT)?;
        let mut hull = if comm.is_root(ROOT) {
            Point::flatten(&monotone_chain(&Point::unflatten(&gathered)))
        } else {
            vec![]
        };
        comm.broadcast(&mut hull, ROOT)?;
        self.output = Point::unflatten(&hull);
        Ok(())
    }

    fn post_processing(&mut self) -> Result<()> {
        check_hull(&self.output)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::comm::LocalUniverse;
    use crate::runner::run_pipeline;
    use itertools::Itertools;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    fn vertex_pairs(hull: &[Point]) -> Vec<(f64, f64)> {
        hull.iter().map(|p| (p.x, p.y)).collect_vec()
    }

    fn points(coords: &[(f64, f64)]) -> Vec<Point> {
        coords.iter().map(|&(x, y)| Point::new(x, y)).collect()
    }

    #[test]
    fn test_square_with_interior_and_edge_points() {
        let input = points(&[
            (1.0, 1.0),
            (0.0, 0.0),
            (2.0, 0.0),
            (1.0, 0.0),
            (2.0, 2.0),
            (0.0, 2.0),
            (0.0, 1.0),
            (2.0, 2.0),
        ]);
        let hull = run_pipeline(ConvexHullSeq::new(input)).unwrap();
        assert_eq!(
            vertex_pairs(&hull),
            vec![(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)]
        );
    }

    #[test]
    fn test_starts_at_lowest_point() {
        let input = points(&[(0.0, 1.0), (1.0, -1.0), (2.0, 1.0), (1.0, 3.0)]);
        let hull = monotone_chain(&input);
        assert_eq!(
            vertex_pairs(&hull),
            vec![(1.0, -1.0), (2.0, 1.0), (1.0, 3.0), (0.0, 1.0)]
        );
    }

    #[test]
    fn test_degenerate() {
        assert!(monotone_chain(&[]).is_empty());
        assert_eq!(
            vertex_pairs(&monotone_chain(&points(&[(1.0, 1.0), (1.0, 1.0)]))),
            vec![(1.0, 1.0)]
        );
        let collinear = points(&[(2.0, 2.0), (0.0, 0.0), (1.0, 1.0), (3.0, 3.0)]);
        assert_eq!(
            vertex_pairs(&monotone_chain(&collinear)),
            vec![(0.0, 0.0), (3.0, 3.0)]
        );
    }

    #[test]
    fn test_nan_fails_validation() {
        let mut task = ConvexHullSeq::new(points(&[(f64::NAN, 0.0)]));
        assert!(!task.validation());
    }

    #[test]
    fn test_distributed_matches_seq() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let input = (0..200)
            .map(|_| Point::new(rng.gen_range(-50..50) as f64, rng.gen_range(-50..50) as f64))
            .collect_vec();
        let expected = run_pipeline(ConvexHullSeq::new(input.clone())).unwrap();
        for size in 1..=4 {
            let outputs = LocalUniverse::new(size)
                .run(|comm| run_pipeline(ConvexHullDistributed::new(comm, input.clone())))
                .unwrap();
            for hull in outputs {
                assert_eq!(hull, expected, "{size} ranks");
            }
        }
    }

    #[test]
    fn test_distributed_fewer_points_than_ranks() {
        let input = points(&[(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]);
        let outputs = LocalUniverse::new(4)
            .run(|comm| run_pipeline(ConvexHullDistributed::new(comm, input.clone())))
            .unwrap();
        for hull in outputs {
            assert_eq!(
                vertex_pairs(&hull),
                vec![(0.0, 0.0), (1.0, 0.0), (0.0, 1.0)]
            );
        }
    }
}
