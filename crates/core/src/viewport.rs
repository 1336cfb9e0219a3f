//! View transform between screen pixels and page pixels
//!
//! `pan` is in screen pixels, `zoom` is a scale factor (1.0 = page pixels
//! map 1:1 to screen pixels). Measurements never move when the view does.

use crate::geometry::Point;
use serde::{Deserialize, Serialize};

/// Pan/zoom state of a document session
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub zoom: f64,
    pub pan_x: f64,
    pub pan_y: f64,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            zoom: 1.0,
            pan_x: 0.0,
            pan_y: 0.0,
        }
    }
}

impl Viewport {
    /// Screen position to page position
    pub fn screen_to_page(&self, screen: Point) -> Point {
        Point::new(
            (screen.x - self.pan_x) / self.zoom,
            (screen.y - self.pan_y) / self.zoom,
        )
    }

    /// Page position to screen position
    pub fn page_to_screen(&self, page: Point) -> Point {
        Point::new(page.x * self.zoom + self.pan_x, page.y * self.zoom + self.pan_y)
    }

    /// Screen distance to page distance
    pub fn screen_dist_to_page(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }

    pub fn pan_offset(&self) -> Point {
        Point::new(self.pan_x, self.pan_y)
    }

    /// Translate the view by a screen-space delta
    pub fn pan_by(&mut self, dx: f64, dy: f64) {
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Multiply the zoom by `factor`, clamped to `[min_zoom, max_zoom]`
    ///
    /// When an anchor is given, the page point under it stays under it.
    /// Returns whether the zoom changed.
    pub fn zoom_by(&mut self, factor: f64, anchor: Option<Point>, min_zoom: f64, max_zoom: f64) -> bool {
        let new_zoom = (self.zoom * factor).clamp(min_zoom, max_zoom);
        if (new_zoom - self.zoom).abs() < f64::EPSILON {
            return false;
        }

        if let Some(anchor) = anchor {
            let page = self.screen_to_page(anchor);
            self.pan_x = anchor.x - page.x * new_zoom;
            self.pan_y = anchor.y - page.y * new_zoom;
        }
        self.zoom = new_zoom;
        true
    }

    /// Back to zoom 1.0 with no pan
    pub fn reset(&mut self) -> bool {
        let changed = *self != Self::default();
        *self = Self::default();
        changed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_by_default() {
        let viewport = Viewport::default();
        let p = Point::new(12.5, 40.0);
        assert_eq!(viewport.screen_to_page(p), p);
        assert_eq!(viewport.page_to_screen(p), p);
    }

    #[test]
    fn test_screen_page_inverse() {
        let viewport = Viewport {
            zoom: 2.0,
            pan_x: 30.0,
            pan_y: -10.0,
        };
        let page = Point::new(100.0, 50.0);
        let screen = viewport.page_to_screen(page);
        assert_eq!(screen, Point::new(230.0, 90.0));
        assert_eq!(viewport.screen_to_page(screen), page);
        assert_eq!(viewport.screen_dist_to_page(10.0), 5.0);
    }

    #[test]
    fn test_zoom_clamps() {
        let mut viewport = Viewport::default();
        assert!(viewport.zoom_by(10.0, None, 0.5, 5.0));
        assert_eq!(viewport.zoom, 5.0);
        assert!(!viewport.zoom_by(1.2, None, 0.5, 5.0));

        assert!(viewport.zoom_by(0.01, None, 0.5, 5.0));
        assert_eq!(viewport.zoom, 0.5);
    }

    #[test]
    fn test_zoom_keeps_anchor_fixed() {
        let mut viewport = Viewport {
            zoom: 1.0,
            pan_x: 20.0,
            pan_y: 20.0,
        };
        let anchor = Point::new(220.0, 120.0);
        let before = viewport.screen_to_page(anchor);
        viewport.zoom_by(2.0, Some(anchor), 0.5, 5.0);
        let after = viewport.screen_to_page(anchor);
        assert!((before.x - after.x).abs() < 1e-9);
        assert!((before.y - after.y).abs() < 1e-9);
    }

    #[test]
    fn test_pan_and_reset() {
        let mut viewport = Viewport::default();
        viewport.pan_by(15.0, -5.0);
        assert_eq!(viewport.pan_offset(), Point::new(15.0, -5.0));
        assert!(viewport.reset());
        assert!(!viewport.reset());
    }
}
