//! Measurement records and the ordered measurement collection
//!
//! Geometry is stored in page-local pixels. The real-world value is derived
//! from that geometry and the page scale, and is recomputed whenever the
//! scale changes.

use crate::geometry::{self, Bounds, Point};
use serde::{Deserialize, Serialize};

/// Unique identifier for measurements
pub type MeasurementId = uuid::Uuid;

/// Kind of a measurement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasurementKind {
    Line,
    Area,
    Polygon,
}

impl MeasurementKind {
    /// Whether the value is a square quantity
    pub fn is_areal(&self) -> bool {
        !matches!(self, MeasurementKind::Line)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MeasurementKind::Line => "line",
            MeasurementKind::Area => "area",
            MeasurementKind::Polygon => "polygon",
        }
    }
}

/// Pixel geometry of a measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MeasurementGeometry {
    /// Straight line between two points
    Line { start: Point, end: Point },
    /// Axis-aligned rectangle, corners normalized so top_left <= bottom_right
    Area { top_left: Point, bottom_right: Point },
    /// Closed polygon with at least 3 vertices
    Polygon { vertices: Vec<Point> },
}

impl MeasurementGeometry {
    /// Line geometry; `None` when the endpoints coincide
    pub fn line(start: Point, end: Point) -> Option<Self> {
        if start.distance_to(&end) > 0.0 {
            Some(MeasurementGeometry::Line { start, end })
        } else {
            None
        }
    }

    /// Rectangle from two opposite corners in any order; `None` for zero width or height
    pub fn area(corner_a: Point, corner_b: Point) -> Option<Self> {
        let (min_x, min_y, max_x, max_y) = geometry::corner_bounds(&corner_a, &corner_b);
        if max_x - min_x > 0.0 && max_y - min_y > 0.0 {
            Some(MeasurementGeometry::Area {
                top_left: Point::new(min_x, min_y),
                bottom_right: Point::new(max_x, max_y),
            })
        } else {
            None
        }
    }

    /// Polygon; `None` for fewer than 3 vertices or zero enclosed area
    pub fn polygon(vertices: Vec<Point>) -> Option<Self> {
        if vertices.len() >= 3 && geometry::shoelace_area(&vertices) > 0.0 {
            Some(MeasurementGeometry::Polygon { vertices })
        } else {
            None
        }
    }

    pub fn kind(&self) -> MeasurementKind {
        match self {
            MeasurementGeometry::Line { .. } => MeasurementKind::Line,
            MeasurementGeometry::Area { .. } => MeasurementKind::Area,
            MeasurementGeometry::Polygon { .. } => MeasurementKind::Polygon,
        }
    }

    /// Length in pixels for lines, area in square pixels otherwise
    pub fn pixel_quantity(&self) -> f64 {
        match self {
            MeasurementGeometry::Line { start, end } => start.distance_to(end),
            MeasurementGeometry::Area {
                top_left,
                bottom_right,
            } => geometry::rect_area(top_left, bottom_right),
            MeasurementGeometry::Polygon { vertices } => geometry::shoelace_area(vertices),
        }
    }

    /// Real-world value for a given units-per-pixel scale
    pub fn real_value(&self, scale: f64) -> f64 {
        let quantity = self.pixel_quantity();
        if self.kind().is_areal() {
            quantity * scale * scale
        } else {
            quantity * scale
        }
    }

    /// Hit test in page pixels
    ///
    /// Lines use a distance tolerance. Rectangles and polygons test containment.
    pub fn hit(&self, point: &Point, tolerance: f64) -> bool {
        match self {
            MeasurementGeometry::Line { start, end } => {
                geometry::point_near_segment(point, start, end, tolerance)
            }
            MeasurementGeometry::Area {
                top_left,
                bottom_right,
            } => geometry::point_in_rect(point, top_left, bottom_right),
            MeasurementGeometry::Polygon { vertices } => geometry::point_in_polygon(point, vertices),
        }
    }

    /// Where the value label is drawn
    pub fn label_anchor(&self) -> Point {
        match self {
            MeasurementGeometry::Line { start, end } => start.midpoint(end),
            MeasurementGeometry::Area {
                top_left,
                bottom_right,
            } => top_left.midpoint(bottom_right),
            MeasurementGeometry::Polygon { vertices } => {
                geometry::centroid(vertices).unwrap_or_default()
            }
        }
    }

    pub fn bounds(&self) -> Bounds {
        match self {
            MeasurementGeometry::Line { start, end } => geometry::corner_bounds(start, end),
            MeasurementGeometry::Area {
                top_left,
                bottom_right,
            } => geometry::corner_bounds(top_left, bottom_right),
            MeasurementGeometry::Polygon { vertices } => {
                geometry::points_bounds(vertices).unwrap_or_default()
            }
        }
    }
}

/// Format a value with its unit, squared for area kinds
pub fn format_value(kind: MeasurementKind, value: f64, unit: &str) -> String {
    if kind.is_areal() {
        format!("{value:.2} {unit}²")
    } else {
        format!("{value:.2} {unit}")
    }
}

/// A committed measurement on a page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Unique identifier
    pub id: MeasurementId,
    /// Page this measurement belongs to (0-based)
    pub page_index: u32,
    /// Pixel geometry
    pub geometry: MeasurementGeometry,
    /// Real-world value at the current page scale
    pub value: f64,
    /// Creation timestamp (Unix seconds)
    pub created_at: i64,
}

impl Measurement {
    /// Create a measurement and compute its value at `scale`
    pub fn new(page_index: u32, geometry: MeasurementGeometry, scale: f64) -> Self {
        let created_at = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as i64;

        let value = geometry.real_value(scale);
        Self {
            id: MeasurementId::new_v4(),
            page_index,
            geometry,
            value,
            created_at,
        }
    }

    pub fn kind(&self) -> MeasurementKind {
        self.geometry.kind()
    }

    /// Recompute the real-world value from the pixel geometry
    pub fn recompute(&mut self, scale: f64) {
        self.value = self.geometry.real_value(scale);
    }

    /// Value label such as `20.00 ft` or `50.00 ft²`
    pub fn formatted(&self, unit: &str) -> String {
        format_value(self.kind(), self.value, unit)
    }
}

/// Measurements of a document session, kept in creation order
#[derive(Debug, Clone, Default)]
pub struct MeasurementCollection {
    measurements: Vec<Measurement>,
}

impl MeasurementCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a measurement, returning its id
    pub fn add(&mut self, measurement: Measurement) -> MeasurementId {
        let id = measurement.id;
        self.measurements.push(measurement);
        id
    }

    /// Remove a measurement; `None` if it is not present
    pub fn remove(&mut self, id: MeasurementId) -> Option<Measurement> {
        let index = self.measurements.iter().position(|m| m.id == id)?;
        Some(self.measurements.remove(index))
    }

    pub fn get(&self, id: MeasurementId) -> Option<&Measurement> {
        self.measurements.iter().find(|m| m.id == id)
    }

    /// All measurements in creation order
    pub fn iter(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.iter()
    }

    /// Measurements on one page in creation order
    pub fn for_page(&self, page_index: u32) -> impl Iterator<Item = &Measurement> {
        self.measurements
            .iter()
            .filter(move |m| m.page_index == page_index)
    }

    /// Recompute every measurement on `page_index` at a new scale
    pub fn recompute_page(&mut self, page_index: u32, scale: f64) -> usize {
        let mut count = 0;
        for measurement in self
            .measurements
            .iter_mut()
            .filter(|m| m.page_index == page_index)
        {
            measurement.recompute(scale);
            count += 1;
        }
        count
    }

    /// Topmost measurement on `page_index` under `point`
    ///
    /// Searches newest first so the last drawn shape wins on overlap.
    pub fn hit_test(&self, page_index: u32, point: &Point, tolerance: f64) -> Option<MeasurementId> {
        self.measurements
            .iter()
            .rev()
            .filter(|m| m.page_index == page_index)
            .find(|m| m.geometry.hit(point, tolerance))
            .map(|m| m.id)
    }
}
