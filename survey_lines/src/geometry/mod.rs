//! Basic geometry primitives for line reconciliation.

pub mod line;
pub mod point;

pub use line::Line;
pub use point::Point;

/// Calculates the Euclidean distance between two points.
pub fn distance(a: Point, b: Point) -> f64 {
    ((b.x - a.x).powi(2) + (b.y - a.y).powi(2)).sqrt()
}

/// Returns `true` if point `p` is inside the polygon defined by `poly` using
/// the ray casting (even-odd) rule.
///
/// Polygons with fewer than three vertices enclose nothing.
pub fn point_in_polygon(p: Point, poly: &[Point]) -> bool {
    let mut inside = false;
    if poly.len() < 3 {
        return inside;
    }
    let mut j = poly.len() - 1;
    for i in 0..poly.len() {
        let pi = poly[i];
        let pj = poly[j];
        if ((pi.y > p.y) != (pj.y > p.y))
            && (p.x < (pj.x - pi.x) * (p.y - pi.y) / (pj.y - pi.y) + pi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}
