//! Message elements and reduction operators
use num::{Float, Num};
use std::fmt::Debug;
use std::ops::AddAssign;

/// Message tag
pub type Tag = i32;

#[cfg(feature = "mpi")]
/// A value that can be sent between ranks
pub trait Element: mpi::traits::Equivalence + Copy + Default + Send + Sync + Debug + 'static {}
#[cfg(feature = "mpi")]
impl<T: mpi::traits::Equivalence + Copy + Default + Send + Sync + Debug + 'static> Element for T {}

#[cfg(not(feature = "mpi"))]
/// A value that can be sent between ranks
pub trait Element: Copy + Default + Send + Sync + Debug + 'static {}
#[cfg(not(feature = "mpi"))]
impl<T: Copy + Default + Send + Sync + Debug + 'static> Element for T {}

/// An element that can be combined by a [ReduceOp]
pub trait Reducible: Element + Num + PartialOrd {}
impl<T: Element + Num + PartialOrd> Reducible for T {}

/// A floating point element
pub trait Scalar: Reducible + Float + AddAssign + std::iter::Sum {}
impl<T: Reducible + Float + AddAssign + std::iter::Sum> Scalar for T {}

/// Reduction operator
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ReduceOp {
    /// Sum
    Sum,
    /// Product
    Product,
    /// Maximum
    Max,
    /// Minimum
    Min,
}

impl ReduceOp {
    /// Combine two values
    pub fn apply<T: Reducible>(self, a: T, b: T) -> T {
        match self {
            ReduceOp::Sum => a + b,
            ReduceOp::Product => a * b,
            ReduceOp::Max => {
                if b > a {
                    b
                } else {
                    a
                }
            }
            ReduceOp::Min => {
                if b < a {
                    b
                } else {
                    a
                }
            }
        }
    }

    /// Combine `other` into `acc` element by element
    pub fn apply_into<T: Reducible>(self, acc: &mut [T], other: &[T]) {
        for (a, b) in acc.iter_mut().zip(other) {
            *a = self.apply(*a, *b);
        }
    }

    /// Fold a non-empty slice. Returns `None` for an empty slice.
    pub fn fold<T: Reducible>(self, values: &[T]) -> Option<T> {
        let (first, rest) = values.split_first()?;
        Some(rest.iter().fold(*first, |acc, v| self.apply(acc, *v)))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_apply() {
        assert_eq!(ReduceOp::Sum.apply(2, 3), 5);
        assert_eq!(ReduceOp::Product.apply(2, 3), 6);
        assert_eq!(ReduceOp::Max.apply(2.0, -3.0), 2.0);
        assert_eq!(ReduceOp::Min.apply(2.0, -3.0), -3.0);
    }

    #[test]
    fn test_fold() {
        assert_eq!(ReduceOp::Sum.fold(&[1, 2, 3, 4]), Some(10));
        assert_eq!(ReduceOp::Max.fold(&[1, 7, 3]), Some(7));
        assert_eq!(ReduceOp::Min.fold::<i64>(&[]), None);
    }

    #[test]
    fn test_apply_into() {
        let mut acc = vec![1.0, 5.0, -2.0];
        ReduceOp::Max.apply_into(&mut acc, &[3.0, 4.0, -1.0]);
        assert_eq!(acc, vec![3.0, 5.0, -1.0]);
    }
}
