//! Sequential sorts and block merges
use super::key::SortKey;

/// Algorithm used to sort a rank's own block
#[derive(Debug, PartialEq, Eq, Clone, Copy, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LocalSort {
    /// LSD radix sort on key bytes
    Radix,
    /// Iterative quicksort with median-of-three pivots
    Quick,
    /// Shell sort with Ciura's gaps
    Shell,
}

impl LocalSort {
    /// Every local sort
    pub const ALL: [LocalSort; 3] = [LocalSort::Radix, LocalSort::Quick, LocalSort::Shell];

    /// Sort `data` in key order
    pub fn sort<T: SortKey>(self, data: &mut [T]) {
        match self {
            LocalSort::Radix => radix_sort(data),
            LocalSort::Quick => quick_sort(data),
            LocalSort::Shell => shell_sort(data),
        }
    }
}

/// LSD radix sort, one byte per pass
pub fn radix_sort<T: SortKey>(data: &mut [T]) {
    if data.len() < 2 {
        return;
    }
    let mut keys = data.iter().map(|v| v.key()).collect::<Vec<_>>();
    let mut scratch = vec![0_u64; keys.len()];
    for byte in 0..T::KEY_BYTES {
        let shift = 8 * byte;
        let mut counts = [0_usize; 256];
        for k in &keys {
            counts[((k >> shift) & 0xff) as usize] += 1;
        }
        // A pass where every key has the same byte changes nothing.
        if counts.iter().any(|&c| c == keys.len()) {
            continue;
        }
        let mut offsets = [0_usize; 256];
        let mut total = 0;
        for (offset, count) in offsets.iter_mut().zip(counts) {
            *offset = total;
            total += count;
        }
        for &k in &keys {
            let bucket = ((k >> shift) & 0xff) as usize;
            scratch[offsets[bucket]] = k;
            offsets[bucket] += 1;
        }
        std::mem::swap(&mut keys, &mut scratch);
    }
    for (v, k) in data.iter_mut().zip(keys) {
        *v = T::from_key(k);
    }
}

const INSERTION_THRESHOLD: usize = 16;

fn insertion_sort<T: SortKey>(data: &mut [T]) {
    for i in 1..data.len() {
        let value = data[i];
        let key = value.key();
        let mut j = i;
        while j > 0 && data[j - 1].key() > key {
            data[j] = data[j - 1];
            j -= 1;
        }
        data[j] = value;
    }
}

fn median_of_three<T: SortKey>(data: &mut [T], lo: usize, hi: usize) -> u64 {
    let mid = lo + (hi - lo) / 2;
    if data[mid].key() < data[lo].key() {
        data.swap(mid, lo);
    }
    if data[hi].key() < data[lo].key() {
        data.swap(hi, lo);
    }
    if data[hi].key() < data[mid].key() {
        data.swap(hi, mid);
    }
    data[mid].key()
}

/// Quicksort with an explicit stack; the smaller side is always pushed last
pub fn quick_sort<T: SortKey>(data: &mut [T]) {
    if data.len() < 2 {
        return;
    }
    let mut stack = vec![(0, data.len() - 1)];
    while let Some((lo, hi)) = stack.pop() {
        if hi - lo < INSERTION_THRESHOLD {
            insertion_sort(&mut data[lo..=hi]);
            continue;
        }
        let pivot = median_of_three(data, lo, hi);
        // Hoare partition
        let mut i = lo;
        let mut j = hi;
        loop {
            while data[i].key() < pivot {
                i += 1;
            }
            while data[j].key() > pivot {
                j -= 1;
            }
            if i >= j {
                break;
            }
            data.swap(i, j);
            i += 1;
            j -= 1;
        }
        let (left, right) = ((lo, j), (j + 1, hi));
        if left.1 - left.0 < right.1 - right.0 {
            stack.push(right);
            stack.push(left);
        } else {
            stack.push(left);
            stack.push(right);
        }
    }
}

fn ciura_gaps(len: usize) -> Vec<usize> {
    let mut gaps = vec![1, 4, 10, 23, 57, 132, 301, 701];
    while let Some(&last) = gaps.last() {
        let next = (last as f64 * 2.25) as usize;
        if next >= len {
            break;
        }
        gaps.push(next);
    }
    gaps.retain(|&g| g < len.max(2));
    gaps.reverse();
    gaps
}

/// Shell sort
pub fn shell_sort<T: SortKey>(data: &mut [T]) {
    for gap in ciura_gaps(data.len()) {
        for i in gap..data.len() {
            let value = data[i];
            let key = value.key();
            let mut j = i;
            while j >= gap && data[j - gap].key() > key {
                data[j] = data[j - gap];
                j -= gap;
            }
            data[j] = value;
        }
    }
}

/// Merge two sorted slices
pub fn merge<T: SortKey>(a: &[T], b: &[T]) -> Vec<T> {
    let mut out = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        if b[j].key() < a[i].key() {
            out.push(b[j]);
            j += 1;
        } else {
            out.push(a[i]);
            i += 1;
        }
    }
    out.extend_from_slice(&a[i..]);
    out.extend_from_slice(&b[j..]);
    out
}

/// Keep the `own.len()` smallest elements of two sorted blocks
pub fn keep_low<T: SortKey>(own: &[T], other: &[T]) -> Vec<T> {
    let mut merged = merge(own, other);
    merged.truncate(own.len());
    merged
}

/// Keep the `own.len()` largest elements of two sorted blocks
pub fn keep_high<T: SortKey>(own: &[T], other: &[T]) -> Vec<T> {
    let merged = merge(own, other);
    merged[merged.len() - own.len()..].to_vec()
}
