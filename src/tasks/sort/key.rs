//! Order-preserving integer keys
use crate::types::Element;

/// A value with a monotonic bijection onto unsigned integers
///
/// `a.key() < b.key()` defines the sort order. For floats this is the IEEE-754 total order, so
/// `-0.0` sorts before `0.0`.
pub trait SortKey: Element {
    /// Number of significant bytes of the key
    const KEY_BYTES: usize;

    /// The key of this value
    fn key(self) -> u64;

    /// The value with the given key
    fn from_key(key: u64) -> Self;

    /// Can this value take part in a sort? `false` for NaN.
    fn is_sortable(self) -> bool {
        true
    }

    /// The value with the largest key, used to pad blocks
    fn sentinel() -> Self {
        Self::from_key(max_key(Self::KEY_BYTES))
    }
}

fn max_key(bytes: usize) -> u64 {
    if bytes >= 8 {
        u64::MAX
    } else {
        (1 << (8 * bytes)) - 1
    }
}

macro_rules! float_key {
    ($float:ty, $bits:ty) => {
        impl SortKey for $float {
            const KEY_BYTES: usize = std::mem::size_of::<$bits>();

            fn key(self) -> u64 {
                const SIGN: $bits = 1 << (<$bits>::BITS - 1);
                let bits = self.to_bits();
                let key = if bits & SIGN != 0 { !bits } else { bits ^ SIGN };
                key as u64
            }

            fn from_key(key: u64) -> Self {
                const SIGN: $bits = 1 << (<$bits>::BITS - 1);
                let key = key as $bits;
                let bits = if key & SIGN != 0 { key ^ SIGN } else { !key };
                <$float>::from_bits(bits)
            }

            fn is_sortable(self) -> bool {
                !self.is_nan()
            }

            fn sentinel() -> Self {
                <$float>::INFINITY
            }
        }
    };
}

float_key!(f32, u32);
float_key!(f64, u64);

macro_rules! signed_key {
    ($int:ty, $uint:ty) => {
        impl SortKey for $int {
            const KEY_BYTES: usize = std::mem::size_of::<$int>();

            fn key(self) -> u64 {
                ((self as $uint) ^ (1 << (<$uint>::BITS - 1))) as u64
            }

            fn from_key(key: u64) -> Self {
                ((key as $uint) ^ (1 << (<$uint>::BITS - 1))) as $int
            }
        }
    };
}

signed_key!(i32, u32);
signed_key!(i64, u64);

macro_rules! unsigned_key {
    ($uint:ty) => {
        impl SortKey for $uint {
            const KEY_BYTES: usize = std::mem::size_of::<$uint>();

            fn key(self) -> u64 {
                self as u64
            }

            fn from_key(key: u64) -> Self {
                key as $uint
            }
        }
    };
}

unsigned_key!(u32);
unsigned_key!(u64);
unsigned_key!(usize);

/// Is `data` non-decreasing in key order?
pub fn is_sorted_by_key<T: SortKey>(data: &[T]) -> bool {
    data.windows(2).all(|w| w[0].key() <= w[1].key())
}
