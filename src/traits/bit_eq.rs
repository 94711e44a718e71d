//! Bitwise equality

/// Equality of the in-memory representation
///
/// Unlike [PartialEq], `0.0` and `-0.0` differ and a NaN equals a NaN with the same bits.
/// Used to check that every rank of a distributed run holds the same output.
pub trait BitEq {
    /// Do `self` and `other` have the same bits?
    fn bit_eq(&self, other: &Self) -> bool;
}

macro_rules! bit_eq_by_value {
    ($($t:ty),*) => {
        $(
            impl BitEq for $t {
                fn bit_eq(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

bit_eq_by_value!((), bool, u8, u16, u32, u64, usize, i8, i16, i32, i64, isize);

impl BitEq for f32 {
    fn bit_eq(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl BitEq for f64 {
    fn bit_eq(&self, other: &Self) -> bool {
        self.to_bits() == other.to_bits()
    }
}

impl<T: BitEq> BitEq for [T] {
    fn bit_eq(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.bit_eq(b))
    }
}

impl<T: BitEq> BitEq for Vec<T> {
    fn bit_eq(&self, other: &Self) -> bool {
        self.as_slice().bit_eq(other.as_slice())
    }
}

impl<T: BitEq> BitEq for Option<T> {
    fn bit_eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.bit_eq(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<A: BitEq, B: BitEq> BitEq for (A, B) {
    fn bit_eq(&self, other: &Self) -> bool {
        self.0.bit_eq(&other.0) && self.1.bit_eq(&other.1)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_floats() {
        assert!(1.5f64.bit_eq(&1.5));
        assert!(!0.0f64.bit_eq(&-0.0));
        assert!(f64::NAN.bit_eq(&f64::NAN));
        assert!(!0.0f32.bit_eq(&-0.0));
    }

    #[test]
    fn test_containers() {
        assert!(vec![1.0, -2.0].bit_eq(&vec![1.0, -2.0]));
        assert!(!vec![1.0, 0.0].bit_eq(&vec![1.0, -0.0]));
        assert!(!vec![1.0].bit_eq(&vec![1.0, 2.0]));
        assert!(Some(vec![3u8]).bit_eq(&Some(vec![3])));
        assert!(!Some(1i32).bit_eq(&None));
        assert!((2usize, f64::NAN).bit_eq(&(2, f64::NAN)));
    }
}
