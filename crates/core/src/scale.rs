//! Page scale calibration
//!
//! A scale is the number of real-world length units represented by one
//! page pixel. Lengths multiply by the scale, areas by its square.

use crate::error::{EngineError, EngineResult};
use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// How a page scale was established
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ScaleSource {
    /// Entered directly as units per pixel
    Manual,
    /// Two points on the page with a known real distance between them
    TwoPoint {
        p1: Point,
        p2: Point,
        real_distance: f64,
    },
}

/// Request to set the scale of the current page
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ScaleInput {
    /// Units per page pixel
    Manual(f64),
    /// Derive from two page points and the real distance between them
    Calibration {
        p1: Point,
        p2: Point,
        real_distance: f64,
    },
}

/// Scale attached to a single page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageScale {
    /// Page this scale applies to (0-based)
    page_index: u32,
    /// Real units per page pixel, always finite and > 0
    units_per_pixel: f64,
    /// How the value was obtained
    source: ScaleSource,
}

impl PageScale {
    /// Manual scale; fails unless `value` is finite and positive
    pub fn manual(page_index: u32, value: f64) -> EngineResult<Self> {
        validate_positive(value, "scale")?;
        Ok(Self {
            page_index,
            units_per_pixel: value,
            source: ScaleSource::Manual,
        })
    }

    /// Two-point calibration: `real_distance / pixel_distance(p1, p2)`
    pub fn two_point(page_index: u32, p1: Point, p2: Point, real_distance: f64) -> EngineResult<Self> {
        validate_positive(real_distance, "real distance")?;
        let pixel_distance = p1.distance_to(&p2);
        if pixel_distance <= 0.0 {
            return Err(EngineError::InvalidScale(
                "calibration points must be distinct".to_string(),
            ));
        }

        let units_per_pixel = real_distance / pixel_distance;
        validate_positive(units_per_pixel, "scale")?;

        Ok(Self {
            page_index,
            units_per_pixel,
            source: ScaleSource::TwoPoint {
                p1,
                p2,
                real_distance,
            },
        })
    }

    /// Build a scale for `page_index` from a [`ScaleInput`]
    pub fn from_input(page_index: u32, input: ScaleInput) -> EngineResult<Self> {
        match input {
            ScaleInput::Manual(value) => Self::manual(page_index, value),
            ScaleInput::Calibration {
                p1,
                p2,
                real_distance,
            } => Self::two_point(page_index, p1, p2, real_distance),
        }
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    /// Real units per page pixel
    pub fn value(&self) -> f64 {
        self.units_per_pixel
    }

    pub fn source(&self) -> &ScaleSource {
        &self.source
    }

    /// Convert a page-pixel length to real units
    pub fn to_real_length(&self, pixels: f64) -> f64 {
        pixels * self.units_per_pixel
    }

    /// Convert a page-pixel area to real square units
    pub fn to_real_area(&self, square_pixels: f64) -> f64 {
        square_pixels * self.units_per_pixel * self.units_per_pixel
    }
}

fn validate_positive(value: f64, what: &str) -> EngineResult<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(EngineError::InvalidScale(format!(
            "{what} must be a positive finite number, got {value}"
        )))
    }
}
