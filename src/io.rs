//! Input/output
#[cfg(feature = "serde")]
mod ron;
