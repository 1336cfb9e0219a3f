//! Overlay display list
//!
//! The overlay is rebuilt from engine state for every frame: committed
//! measurements, the live preview of the gesture in progress, and
//! calibration markers. All shapes are in screen pixels, already run through
//! the viewport, so the host only has to paint them.

use crate::geometry::{self, Point};
use crate::input::Gesture;
use crate::measurement::{
    format_value, Measurement, MeasurementGeometry, MeasurementId, MeasurementKind,
};
use crate::session::DocumentSession;
use crate::viewport::Viewport;

/// Shape in screen pixels
#[derive(Debug, Clone, PartialEq)]
pub enum OverlayShape {
    Segment { from: Point, to: Point },
    Rectangle { top_left: Point, bottom_right: Point },
    Polygon { vertices: Vec<Point>, closed: bool },
    /// Small point marker (vertices, calibration points)
    Marker { at: Point },
}

/// Paint style of an overlay item
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayStyle {
    Committed,
    Selected,
    Preview,
    Calibration,
}

/// Text drawn next to a shape
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayLabel {
    pub text: String,
    pub at: Point,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayItem {
    pub shape: OverlayShape,
    pub style: OverlayStyle,
    pub label: Option<OverlayLabel>,
    /// Source measurement, `None` for previews and markers
    pub measurement_id: Option<MeasurementId>,
}

/// Everything to paint over the page for one frame
#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverlayFrame {
    pub page_index: u32,
    pub zoom: f64,
    pub pan: Point,
    pub items: Vec<OverlayItem>,
}

impl OverlayFrame {
    /// Items drawn for committed measurements
    pub fn measurement_items(&self) -> impl Iterator<Item = &OverlayItem> {
        self.items.iter().filter(|item| item.measurement_id.is_some())
    }

    pub fn previews(&self) -> impl Iterator<Item = &OverlayItem> {
        self.items
            .iter()
            .filter(|item| item.style == OverlayStyle::Preview)
    }
}

/// Build the frame for the current page of `session`
pub fn build_frame(
    session: &DocumentSession,
    gesture: &Gesture,
    selection: Option<MeasurementId>,
) -> OverlayFrame {
    let viewport = session.viewport();
    let unit = session.current_unit();
    let scale = session.effective_scale(session.page_index());

    let mut items: Vec<OverlayItem> = session
        .current_measurements()
        .map(|measurement| measurement_item(measurement, viewport, unit, selection))
        .collect();

    push_gesture_items(&mut items, gesture, viewport, unit, scale);

    OverlayFrame {
        page_index: session.page_index(),
        zoom: viewport.zoom,
        pan: viewport.pan_offset(),
        items,
    }
}

fn measurement_item(
    measurement: &Measurement,
    viewport: &Viewport,
    unit: &str,
    selection: Option<MeasurementId>,
) -> OverlayItem {
    let style = if selection == Some(measurement.id) {
        OverlayStyle::Selected
    } else {
        OverlayStyle::Committed
    };

    OverlayItem {
        shape: geometry_shape(&measurement.geometry, viewport),
        style,
        label: Some(OverlayLabel {
            text: measurement.formatted(unit),
            at: viewport.page_to_screen(measurement.geometry.label_anchor()),
        }),
        measurement_id: Some(measurement.id),
    }
}

fn geometry_shape(geometry: &MeasurementGeometry, viewport: &Viewport) -> OverlayShape {
    match geometry {
        MeasurementGeometry::Line { start, end } => OverlayShape::Segment {
            from: viewport.page_to_screen(*start),
            to: viewport.page_to_screen(*end),
        },
        MeasurementGeometry::Area {
            top_left,
            bottom_right,
        } => OverlayShape::Rectangle {
            top_left: viewport.page_to_screen(*top_left),
            bottom_right: viewport.page_to_screen(*bottom_right),
        },
        MeasurementGeometry::Polygon { vertices } => OverlayShape::Polygon {
            vertices: vertices.iter().map(|v| viewport.page_to_screen(*v)).collect(),
            closed: true,
        },
    }
}

fn preview(shape: OverlayShape, label: Option<OverlayLabel>) -> OverlayItem {
    OverlayItem {
        shape,
        style: OverlayStyle::Preview,
        label,
        measurement_id: None,
    }
}

fn marker(at: Point) -> OverlayItem {
    OverlayItem {
        shape: OverlayShape::Marker { at },
        style: OverlayStyle::Calibration,
        label: None,
        measurement_id: None,
    }
}

fn push_gesture_items(
    items: &mut Vec<OverlayItem>,
    gesture: &Gesture,
    viewport: &Viewport,
    unit: &str,
    scale: f64,
) {
    match gesture {
        Gesture::Idle | Gesture::Panning { .. } => {}
        Gesture::DrawingLine { start, current } => {
            let value = start.distance_to(current) * scale;
            items.push(preview(
                OverlayShape::Segment {
                    from: viewport.page_to_screen(*start),
                    to: viewport.page_to_screen(*current),
                },
                Some(OverlayLabel {
                    text: format_value(MeasurementKind::Line, value, unit),
                    at: viewport.page_to_screen(start.midpoint(current)),
                }),
            ));
        }
        Gesture::DrawingArea { anchor, current } => {
            let (min_x, min_y, max_x, max_y) = geometry::corner_bounds(anchor, current);
            let value = geometry::rect_area(anchor, current) * scale * scale;
            items.push(preview(
                OverlayShape::Rectangle {
                    top_left: viewport.page_to_screen(Point::new(min_x, min_y)),
                    bottom_right: viewport.page_to_screen(Point::new(max_x, max_y)),
                },
                Some(OverlayLabel {
                    text: format_value(MeasurementKind::Area, value, unit),
                    at: viewport.page_to_screen(anchor.midpoint(current)),
                }),
            ));
        }
        Gesture::Polygon { vertices, cursor } => {
            let mut outline: Vec<Point> = vertices.clone();
            outline.extend(cursor.iter().copied());

            let label = (outline.len() >= 3).then(|| {
                let value = geometry::shoelace_area(&outline) * scale * scale;
                OverlayLabel {
                    text: format_value(MeasurementKind::Polygon, value, unit),
                    at: viewport.page_to_screen(geometry::centroid(&outline).unwrap_or_default()),
                }
            });

            items.push(preview(
                OverlayShape::Polygon {
                    vertices: outline.iter().map(|v| viewport.page_to_screen(*v)).collect(),
                    closed: false,
                },
                label,
            ));
            items.extend(vertices.iter().map(|v| OverlayItem {
                style: OverlayStyle::Preview,
                ..marker(viewport.page_to_screen(*v))
            }));
        }
        Gesture::Calibrating { first, cursor } => {
            items.push(marker(viewport.page_to_screen(*first)));
            if let Some(cursor) = cursor {
                items.push(OverlayItem {
                    style: OverlayStyle::Calibration,
                    ..preview(
                        OverlayShape::Segment {
                            from: viewport.page_to_screen(*first),
                            to: viewport.page_to_screen(*cursor),
                        },
                        Some(OverlayLabel {
                            text: format!("{:.1} px", first.distance_to(cursor)),
                            at: viewport.page_to_screen(first.midpoint(cursor)),
                        }),
                    )
                });
            }
        }
        Gesture::AwaitingDistance { first, second } => {
            items.push(marker(viewport.page_to_screen(*first)));
            items.push(marker(viewport.page_to_screen(*second)));
            items.push(OverlayItem {
                shape: OverlayShape::Segment {
                    from: viewport.page_to_screen(*first),
                    to: viewport.page_to_screen(*second),
                },
                style: OverlayStyle::Calibration,
                label: Some(OverlayLabel {
                    text: format!("{:.1} px", first.distance_to(second)),
                    at: viewport.page_to_screen(first.midpoint(second)),
                }),
                measurement_id: None,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scale::ScaleInput;
    use takeoff_render::{DocumentHandle, RasterSurface, SourceRef};

    fn session() -> DocumentSession {
        DocumentSession::new(
            SourceRef::bytes("plan.png", Vec::new()),
            DocumentHandle::from_raw(7),
            1,
            RasterSurface::new(1000, 800),
            "ft",
        )
    }

    fn add(session: &mut DocumentSession, geometry: MeasurementGeometry) -> MeasurementId {
        let scale = session.effective_scale(0);
        session
            .measurements_mut()
            .add(Measurement::new(0, geometry, scale))
    }

    #[test]
    fn committed_measurements_are_labelled_in_screen_space() {
        let mut session = session();
        session.apply_scale(ScaleInput::Manual(0.1)).unwrap();
        let id = add(
            &mut session,
            MeasurementGeometry::line(Point::new(100.0, 100.0), Point::new(100.0, 300.0)).unwrap(),
        );
        *session.viewport_mut() = Viewport {
            zoom: 2.0,
            pan_x: 10.0,
            pan_y: 0.0,
        };

        let frame = build_frame(&session, &Gesture::Idle, None);
        assert_eq!(frame.items.len(), 1);
        let item = &frame.items[0];
        assert_eq!(item.measurement_id, Some(id));
        assert_eq!(item.style, OverlayStyle::Committed);
        assert_eq!(
            item.shape,
            OverlayShape::Segment {
                from: Point::new(210.0, 200.0),
                to: Point::new(210.0, 600.0),
            }
        );
        let label = item.label.as_ref().unwrap();
        assert_eq!(label.text, "20.00 ft");
        assert_eq!(label.at, Point::new(210.0, 400.0));
    }

    #[test]
    fn selection_is_highlighted() {
        let mut session = session();
        let id = add(
            &mut session,
            MeasurementGeometry::area(Point::new(0.0, 0.0), Point::new(10.0, 10.0)).unwrap(),
        );
        let frame = build_frame(&session, &Gesture::Idle, Some(id));
        assert_eq!(frame.items[0].style, OverlayStyle::Selected);
    }

    #[test]
    fn line_preview_has_live_label() {
        let session = session();
        let gesture = Gesture::DrawingLine {
            start: Point::new(0.0, 0.0),
            current: Point::new(30.0, 40.0),
        };
        let frame = build_frame(&session, &gesture, None);
        let previews: Vec<_> = frame.previews().collect();
        assert_eq!(previews.len(), 1);
        assert_eq!(previews[0].label.as_ref().unwrap().text, "50.00 ft");
        assert_eq!(frame.measurement_items().count(), 0);
    }

    #[test]
    fn area_preview_normalizes_corners() {
        let session = session();
        let gesture = Gesture::DrawingArea {
            anchor: Point::new(100.0, 50.0),
            current: Point::new(0.0, 0.0),
        };
        let frame = build_frame(&session, &gesture, None);
        let item = frame.previews().next().unwrap();
        assert_eq!(
            item.shape,
            OverlayShape::Rectangle {
                top_left: Point::new(0.0, 0.0),
                bottom_right: Point::new(100.0, 50.0),
            }
        );
        assert_eq!(item.label.as_ref().unwrap().text, "5000.00 ft²");
    }

    #[test]
    fn polygon_preview_includes_cursor_edge() {
        let session = session();
        let gesture = Gesture::Polygon {
            vertices: vec![Point::new(0.0, 0.0), Point::new(10.0, 0.0)],
            cursor: Some(Point::new(10.0, 10.0)),
        };
        let frame = build_frame(&session, &gesture, None);
        let outline = frame
            .items
            .iter()
            .find(|item| matches!(item.shape, OverlayShape::Polygon { .. }))
            .unwrap();
        match &outline.shape {
            OverlayShape::Polygon { vertices, closed } => {
                assert_eq!(vertices.len(), 3);
                assert!(!closed);
            }
            other => panic!("unexpected shape {other:?}"),
        }
        assert_eq!(outline.label.as_ref().unwrap().text, "50.00 ft²");
    }

    #[test]
    fn calibration_markers() {
        let session = session();
        let gesture = Gesture::AwaitingDistance {
            first: Point::new(100.0, 100.0),
            second: Point::new(100.0, 200.0),
        };
        let frame = build_frame(&session, &gesture, None);
        let markers = frame
            .items
            .iter()
            .filter(|item| matches!(item.shape, OverlayShape::Marker { .. }))
            .count();
        assert_eq!(markers, 2);
        assert!(frame
            .items
            .iter()
            .any(|item| item.label.as_ref().is_some_and(|l| l.text == "100.0 px")));
    }
}
