//! Basic 2D line type used throughout the crate.

use super::{distance, Point};

/// Representation of a 2D line segment between two points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Line {
    pub start: Point,
    pub end: Point,
}

impl Line {
    /// Creates a new line segment.
    pub fn new(start: Point, end: Point) -> Self {
        Self { start, end }
    }

    /// Returns the length of the line segment.
    pub fn length(&self) -> f64 {
        distance(self.start, self.end)
    }

    /// Returns `true` when both endpoints coincide.
    pub fn is_degenerate(&self) -> bool {
        self.start == self.end
    }

    /// Perpendicular distance from `p` to the infinite line through the
    /// segment endpoints.
    ///
    /// The result is not clamped to the segment, so a short segment whose
    /// extension passes near `p` reports a small distance. A degenerate line
    /// falls back to the distance to its single point.
    pub fn distance_to_supporting_line(&self, p: Point) -> f64 {
        if self.is_degenerate() {
            return distance(self.start, p);
        }
        let dir = self.end.sub(self.start);
        dir.cross(p.sub(self.start)).abs() / self.length()
    }

    /// Returns the point on the segment nearest to `p`.
    pub fn nearest_point(&self, p: Point) -> Point {
        let dir = self.end.sub(self.start);
        let len_sq = dir.dot(dir);
        if len_sq == 0.0 {
            return self.start;
        }
        let t = (p.sub(self.start).dot(dir) / len_sq).clamp(0.0, 1.0);
        Point::new(self.start.x + dir.x * t, self.start.y + dir.y * t)
    }

    /// Distance from `p` to the closest point of the segment itself.
    pub fn distance_to_segment(&self, p: Point) -> f64 {
        distance(self.nearest_point(p), p)
    }
}
