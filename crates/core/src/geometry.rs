//! Page-space geometry primitives
//!
//! All coordinates are page-local pixels of the rendered page:
//! - Origin (0, 0) at the top-left of the page
//! - X increases to the right
//! - Y increases downward

use serde::{Deserialize, Serialize};

/// A point in page-local pixel coordinates (or screen pixels, where noted)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    /// Create a new point
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Point halfway between this point and another
    pub fn midpoint(&self, other: &Point) -> Point {
        Point::new((self.x + other.x) / 2.0, (self.y + other.y) / 2.0)
    }
}

/// Axis-aligned bounds as (min_x, min_y, max_x, max_y)
pub type Bounds = (f64, f64, f64, f64);

/// Bounds of two opposite corners, in either order
pub fn corner_bounds(a: &Point, b: &Point) -> Bounds {
    (a.x.min(b.x), a.y.min(b.y), a.x.max(b.x), a.y.max(b.y))
}

/// Bounds of a point set; `None` when empty
pub fn points_bounds(points: &[Point]) -> Option<Bounds> {
    let first = points.first()?;
    let mut bounds = (first.x, first.y, first.x, first.y);
    for point in &points[1..] {
        bounds.0 = bounds.0.min(point.x);
        bounds.1 = bounds.1.min(point.y);
        bounds.2 = bounds.2.max(point.x);
        bounds.3 = bounds.3.max(point.y);
    }
    Some(bounds)
}

/// Distance from a point to a line segment
///
/// Projects the point onto the infinite line, clamps the projection
/// parameter to `[0, 1]` and measures to the clamped point.
pub fn distance_to_segment(point: &Point, start: &Point, end: &Point) -> f64 {
    let dx = end.x - start.x;
    let dy = end.y - start.y;
    let length_sq = dx * dx + dy * dy;

    if length_sq < 1e-12 {
        return point.distance_to(start);
    }

    let t = ((point.x - start.x) * dx + (point.y - start.y) * dy) / length_sq;
    let t = t.clamp(0.0, 1.0);

    let closest = Point::new(start.x + t * dx, start.y + t * dy);
    point.distance_to(&closest)
}

/// Whether a point lies within `tolerance` of a line segment
pub fn point_near_segment(point: &Point, start: &Point, end: &Point, tolerance: f64) -> bool {
    distance_to_segment(point, start, end) <= tolerance
}

/// Whether a point lies inside (or on the edge of) the rectangle spanned by two corners
pub fn point_in_rect(point: &Point, a: &Point, b: &Point) -> bool {
    let (min_x, min_y, max_x, max_y) = corner_bounds(a, b);
    point.x >= min_x && point.x <= max_x && point.y >= min_y && point.y <= max_y
}

/// Even-odd ray casting point-in-polygon test
///
/// Casts a horizontal ray to +x and counts edge crossings. Correct for
/// concave polygons. Fewer than 3 vertices never contain anything.
pub fn point_in_polygon(point: &Point, vertices: &[Point]) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let (xi, yi) = (vertices[i].x, vertices[i].y);
        let (xj, yj) = (vertices[j].x, vertices[j].y);

        // yi != yj whenever the first clause holds, so the division is safe
        let crosses = (yi > point.y) != (yj > point.y)
            && point.x < (xj - xi) * (point.y - yi) / (yj - yi) + xi;
        if crosses {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Polygon area by the shoelace formula
///
/// Winding order does not matter. Returns 0 for fewer than 3 vertices.
pub fn shoelace_area(vertices: &[Point]) -> f64 {
    let n = vertices.len();
    if n < 3 {
        return 0.0;
    }
    let mut twice_area = 0.0;
    for i in 0..n {
        let j = (i + 1) % n;
        twice_area += vertices[i].x * vertices[j].y;
        twice_area -= vertices[j].x * vertices[i].y;
    }
    (twice_area / 2.0).abs()
}

/// Area of the rectangle spanned by two corners
pub fn rect_area(a: &Point, b: &Point) -> f64 {
    (b.x - a.x).abs() * (b.y - a.y).abs()
}

/// Vertex average, used as the label anchor for polygons
pub fn centroid(vertices: &[Point]) -> Option<Point> {
    if vertices.is_empty() {
        return None;
    }
    let n = vertices.len() as f64;
    let sum_x: f64 = vertices.iter().map(|p| p.x).sum();
    let sum_y: f64 = vertices.iter().map(|p| p.y).sum();
    Some(Point::new(sum_x / n, sum_y / n))
}

/// Rotate `position` around `reference` onto the nearest `increment_degrees` angle
///
/// Keeps the distance from the reference. Positions within 1px of the
/// reference are returned unchanged.
pub fn snap_to_angle(reference: &Point, position: &Point, increment_degrees: f64) -> Point {
    let dx = position.x - reference.x;
    let dy = position.y - reference.y;
    let distance = (dx * dx + dy * dy).sqrt();

    if distance < 1.0 || increment_degrees <= 0.0 {
        return *position;
    }

    let current_angle = dy.atan2(dx).to_degrees();
    let snapped_rad = ((current_angle / increment_degrees).round() * increment_degrees).to_radians();

    Point::new(
        reference.x + distance * snapped_rad.cos(),
        reference.y + distance * snapped_rad.sin(),
    )
}
