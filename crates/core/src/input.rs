//! Input model: tools, modifier keys, keys, cursors and the gesture state machine
//!
//! `Tool` decides how pointer events are interpreted. `Gesture` is the
//! in-progress interaction between events, carrying the page-space points
//! needed to preview and finally commit a measurement.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Interaction mode of the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Tool {
    /// Drag to move the view
    #[default]
    Pan,
    /// Click to select a measurement
    Select,
    /// Drag to measure a length
    Line,
    /// Drag a rectangle to measure an area
    Area,
    /// Click vertices to measure a polygon area
    Polygon,
    /// Click two points of known distance to set the page scale
    ScaleCalibration,
}

impl Tool {
    pub const ALL: [Tool; 6] = [
        Tool::Pan,
        Tool::Select,
        Tool::Line,
        Tool::Area,
        Tool::Polygon,
        Tool::ScaleCalibration,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Pan => "pan",
            Tool::Select => "select",
            Tool::Line => "line",
            Tool::Area => "area",
            Tool::Polygon => "polygon",
            Tool::ScaleCalibration => "scale-calibration",
        }
    }

    /// Cursor shown while the tool is idle
    pub fn cursor(self) -> Cursor {
        match self {
            Tool::Pan => Cursor::Grab,
            Tool::Select => Cursor::Pointer,
            Tool::Line | Tool::Area | Tool::Polygon | Tool::ScaleCalibration => Cursor::Crosshair,
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error for unknown tool names
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown tool '{0}'")]
pub struct UnknownTool(pub String);

impl FromStr for Tool {
    type Err = UnknownTool;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Tool::ALL
            .into_iter()
            .find(|tool| tool.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| UnknownTool(s.to_string()))
    }
}

/// Modifier keys held during a pointer event
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        ctrl: false,
        alt: false,
        meta: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }
}

/// Keys the engine reacts to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    Escape,
    Delete,
    Backspace,
    Enter,
    Other(String),
}

impl Key {
    /// Map a host key name (`"Escape"`, `"Delete"`, ...) onto a key
    pub fn from_name(name: &str) -> Self {
        match name {
            "Escape" | "Esc" => Key::Escape,
            "Delete" | "Del" => Key::Delete,
            "Backspace" => Key::Backspace,
            "Enter" | "Return" => Key::Enter,
            other => Key::Other(other.to_string()),
        }
    }
}

/// Cursor the host should display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Cursor {
    Default,
    Grab,
    Grabbing,
    Pointer,
    Crosshair,
}

/// In-progress interaction, all points in page pixels except where noted
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Gesture {
    /// Waiting for the next pointer-down
    #[default]
    Idle,
    /// Dragging the view
    Panning {
        /// Screen position of the previous pointer event
        last_screen: Point,
    },
    /// Dragging out a line
    DrawingLine { start: Point, current: Point },
    /// Dragging out a rectangle
    DrawingArea { anchor: Point, current: Point },
    /// Collecting polygon vertices
    Polygon {
        vertices: Vec<Point>,
        /// Latest pointer position, for the preview edge
        cursor: Option<Point>,
    },
    /// First calibration point placed
    Calibrating { first: Point, cursor: Option<Point> },
    /// Both calibration points placed, waiting for the real distance
    AwaitingDistance { first: Point, second: Point },
}

impl Gesture {
    pub fn is_idle(&self) -> bool {
        matches!(self, Gesture::Idle)
    }

    /// Whether the gesture holds uncommitted page geometry
    pub fn is_drawing(&self) -> bool {
        !matches!(self, Gesture::Idle | Gesture::Panning { .. })
    }

    /// Whether a calibration is in progress
    pub fn is_calibrating(&self) -> bool {
        matches!(
            self,
            Gesture::Calibrating { .. } | Gesture::AwaitingDistance { .. }
        )
    }

    /// Number of placed polygon vertices, 0 for other gestures
    pub fn polygon_vertex_count(&self) -> usize {
        match self {
            Gesture::Polygon { vertices, .. } => vertices.len(),
            _ => 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_round_trip_through_from_str() {
        for tool in Tool::ALL {
            assert_eq!(tool.as_str().parse::<Tool>(), Ok(tool));
        }
        assert_eq!("Scale-Calibration".parse::<Tool>(), Ok(Tool::ScaleCalibration));
        assert!("lasso".parse::<Tool>().is_err());
    }

    #[test]
    fn tool_serializes_kebab_case() {
        let json = serde_json::to_string(&Tool::ScaleCalibration).unwrap();
        assert_eq!(json, "\"scale-calibration\"");
    }

    #[test]
    fn default_tool_is_pan() {
        assert_eq!(Tool::default(), Tool::Pan);
        assert_eq!(Tool::Pan.cursor(), Cursor::Grab);
        assert_eq!(Tool::Polygon.cursor(), Cursor::Crosshair);
    }

    #[test]
    fn key_names() {
        assert_eq!(Key::from_name("Escape"), Key::Escape);
        assert_eq!(Key::from_name("Backspace"), Key::Backspace);
        assert_eq!(Key::from_name("a"), Key::Other("a".to_string()));
    }

    #[test]
    fn gesture_classification() {
        assert!(Gesture::Idle.is_idle());
        assert!(!Gesture::Panning {
            last_screen: Point::default()
        }
        .is_drawing());

        let polygon = Gesture::Polygon {
            vertices: vec![Point::new(0.0, 0.0), Point::new(1.0, 0.0)],
            cursor: None,
        };
        assert!(polygon.is_drawing());
        assert_eq!(polygon.polygon_vertex_count(), 2);

        let awaiting = Gesture::AwaitingDistance {
            first: Point::new(0.0, 0.0),
            second: Point::new(0.0, 10.0),
        };
        assert!(awaiting.is_calibrating());
    }
}
