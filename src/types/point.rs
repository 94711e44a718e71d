//! Points in the plane
use crate::traits::BitEq;

/// Point in two dimensions
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Point {
    /// x coordinate
    pub x: f64,
    /// y coordinate
    pub y: f64,
}

impl BitEq for Point {
    fn bit_eq(&self, other: &Self) -> bool {
        self.x.bit_eq(&other.x) && self.y.bit_eq(&other.y)
    }
}

impl Point {
    /// Create a point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Cross product of `a - self` and `b - self`
    ///
    /// Positive for a counter-clockwise turn `self -> a -> b`.
    pub fn cross(&self, a: &Point, b: &Point) -> f64 {
        (a.x - self.x) * (b.y - self.y) - (a.y - self.y) * (b.x - self.x)
    }

    /// Lexicographic (x, then y) total order
    pub fn lex_cmp(&self, other: &Point) -> std::cmp::Ordering {
        self.x
            .total_cmp(&other.x)
            .then_with(|| self.y.total_cmp(&other.y))
    }

    /// Flatten points into `[x0, y0, x1, y1, ...]`
    pub fn flatten(points: &[Point]) -> Vec<f64> {
        let mut coords = Vec::with_capacity(2 * points.len());
        for p in points {
            coords.push(p.x);
            coords.push(p.y);
        }
        coords
    }

    /// Inverse of [Point::flatten]; a trailing odd coordinate is ignored
    pub fn unflatten(coords: &[f64]) -> Vec<Point> {
        coords
            .chunks_exact(2)
            .map(|c| Point::new(c[0], c[1]))
            .collect()
    }
}
