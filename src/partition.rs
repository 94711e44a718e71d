//! Block distribution of contiguous index ranges over ranks
use itertools::Itertools;
use std::ops::Range;

/// Counts and displacements describing which contiguous slice each part owns
///
/// `counts[p]` elements starting at `displacements[p]` belong to part `p`. The counts sum to the
/// total and the displacements are their exclusive prefix sums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockDistribution {
    counts: Vec<usize>,
    // One longer than `counts`; the last entry is the total.
    idx_bounds: Vec<usize>,
}

impl BlockDistribution {
    /// Split `total` elements into `parts` blocks whose sizes differ by at most one
    ///
    /// The first `total % parts` blocks receive the extra element. When `total < parts`
    /// the trailing parts are empty.
    ///
    /// # Panics
    /// If `parts` is zero.
    pub fn new(total: usize, parts: usize) -> Self {
        assert!(parts > 0, "a distribution needs at least one part");
        let base = total / parts;
        let extra = total % parts;
        Self::from_counts((0..parts).map(|p| base + usize::from(p < extra)).collect())
    }

    /// Distribution with the given counts
    pub fn from_counts(counts: Vec<usize>) -> Self {
        let mut idx_bounds = Vec::with_capacity(counts.len() + 1);
        idx_bounds.push(0);
        idx_bounds.extend(counts.iter().scan(0, |acc, &c| {
            *acc += c;
            Some(*acc)
        }));
        Self { counts, idx_bounds }
    }

    /// The same distribution with every count multiplied by `factor`
    ///
    /// Turns a distribution of rows into a distribution of row-major matrix entries.
    pub fn scaled(&self, factor: usize) -> Self {
        Self::from_counts(self.counts.iter().map(|c| c * factor).collect())
    }

    /// Number of elements per part
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    /// Offset of the first element of every part
    pub fn displacements(&self) -> &[usize] {
        &self.idx_bounds[..self.counts.len()]
    }

    /// Number of elements of part `p`
    pub fn count(&self, p: usize) -> usize {
        self.counts[p]
    }

    /// Offset of part `p`
    pub fn displacement(&self, p: usize) -> usize {
        self.idx_bounds[p]
    }

    /// Index range of part `p`
    pub fn range(&self, p: usize) -> Range<usize> {
        self.idx_bounds[p]..self.idx_bounds[p + 1]
    }

    /// Total number of elements
    pub fn total(&self) -> usize {
        *self.idx_bounds.last().unwrap_or(&0)
    }

    /// Number of parts
    pub fn parts(&self) -> usize {
        self.counts.len()
    }

    /// Largest count
    pub fn max_count(&self) -> usize {
        self.counts.iter().copied().max().unwrap_or(0)
    }

    /// The part owning element `index`, or `None` if `index >= total`
    pub fn owner(&self, index: usize) -> Option<usize> {
        if index >= self.total() {
            return None;
        }
        // Empty parts share their bound with the next part; take the last part starting at or
        // before `index`.
        Some(self.idx_bounds.partition_point(|&b| b <= index) - 1)
    }

    /// The slice of `data` owned by part `p`
    pub fn chunk<'a, T>(&self, data: &'a [T], p: usize) -> &'a [T] {
        &data[self.range(p)]
    }

    /// Iterate over `(part, range)` pairs
    pub fn ranges(&self) -> impl Iterator<Item = (usize, Range<usize>)> + '_ {
        self.idx_bounds
            .iter()
            .tuple_windows()
            .enumerate()
            .map(|(p, (&a, &b))| (p, a..b))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_even_split() {
        let d = BlockDistribution::new(12, 4);
        assert_eq!(d.counts(), &[3, 3, 3, 3]);
        assert_eq!(d.displacements(), &[0, 3, 6, 9]);
        assert_eq!(d.total(), 12);
    }

    #[test]
    fn test_uneven_split() {
        let d = BlockDistribution::new(10, 4);
        assert_eq!(d.counts(), &[3, 3, 2, 2]);
        assert_eq!(d.displacements(), &[0, 3, 6, 8]);
        assert_eq!(d.range(2), 6..8);
        assert_eq!(d.max_count(), 3);
    }

    #[test]
    fn test_fewer_elements_than_parts() {
        let d = BlockDistribution::new(2, 5);
        assert_eq!(d.counts(), &[1, 1, 0, 0, 0]);
        assert_eq!(d.displacements(), &[0, 1, 2, 2, 2]);
        assert_eq!(d.owner(1), Some(1));
        assert_eq!(d.owner(2), None);
    }

    #[test]
    fn test_empty() {
        let d = BlockDistribution::new(0, 3);
        assert_eq!(d.counts(), &[0, 0, 0]);
        assert_eq!(d.total(), 0);
        assert_eq!(d.max_count(), 0);
    }

    #[test]
    fn test_invariants() {
        for total in 0..40 {
            for parts in 1..9 {
                let d = BlockDistribution::new(total, parts);
                assert_eq!(d.counts().iter().sum::<usize>(), total);
                for p in 0..parts {
                    assert_eq!(d.displacement(p), d.counts()[..p].iter().sum::<usize>());
                }
                assert!(d.max_count() - d.counts().iter().min().unwrap() <= 1);
                for i in 0..total {
                    let owner = d.owner(i).unwrap();
                    assert!(d.range(owner).contains(&i));
                }
            }
        }
    }

    #[test]
    fn test_scaled() {
        let d = BlockDistribution::new(5, 2).scaled(3);
        assert_eq!(d.counts(), &[9, 6]);
        assert_eq!(d.displacements(), &[0, 9]);
    }

    #[test]
    fn test_chunk_and_ranges() {
        let data = [1, 2, 3, 4, 5];
        let d = BlockDistribution::new(data.len(), 2);
        assert_eq!(d.chunk(&data, 0), &[1, 2, 3]);
        assert_eq!(d.chunk(&data, 1), &[4, 5]);
        assert_eq!(d.ranges().collect::<Vec<_>>(), vec![(0, 0..3), (1, 3..5)]);
    }

    #[test]
    #[should_panic]
    fn test_zero_parts() {
        let _ = BlockDistribution::new(3, 0);
    }
}
