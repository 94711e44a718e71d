//! Distributed sorting
//!
//! Every rank sorts its block with a [LocalSort], then the blocks are combined with a
//! [MergeStrategy]. Values are ordered by their [SortKey].
mod key;
mod local;
mod merge;
mod task;

pub use key::{is_sorted_by_key, SortKey};
pub use local::{merge, quick_sort, radix_sort, shell_sort, LocalSort};
pub use merge::{
    batcher_comparators, batcher_network, hypercube_tree, merge_blocks, odd_even_transposition,
    MergeStrategy,
};
pub use task::{SortDistributed, SortSeq};
