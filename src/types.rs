//! Types

mod element;
mod image;
mod kind;
mod matrix;
mod point;
mod sparse;

pub use element::{Element, ReduceOp, Reducible, Scalar, Tag};
pub use image::Image;
pub use kind::{Stage, TaskKind};
pub use matrix::DenseMatrix;
pub use point::Point;
pub use sparse::{CcsMatrix, CrsMatrix};
