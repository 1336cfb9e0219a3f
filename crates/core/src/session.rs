//! Document session state
//!
//! A session exists from a successful load until the next successful load
//! or until the engine is closed. It owns the measurements and the per-page
//! scales of the loaded document.

use crate::error::EngineResult;
use crate::geometry::Point;
use crate::measurement::{Measurement, MeasurementCollection};
use crate::scale::{PageScale, ScaleInput};
use crate::viewport::Viewport;
use std::collections::HashMap;
use takeoff_render::{DocumentHandle, RasterSurface, SourceRef};

/// A loaded document and everything drawn on it
#[derive(Debug)]
pub struct DocumentSession {
    source: SourceRef,
    handle: DocumentHandle,
    page_index: u32,
    page_count: u32,
    surface: RasterSurface,
    viewport: Viewport,
    default_unit: String,
    page_units: HashMap<u32, String>,
    scales: HashMap<u32, PageScale>,
    measurements: MeasurementCollection,
}

impl DocumentSession {
    /// New session showing page 0
    pub fn new(
        source: SourceRef,
        handle: DocumentHandle,
        page_count: u32,
        surface: RasterSurface,
        default_unit: impl Into<String>,
    ) -> Self {
        Self {
            source,
            handle,
            page_index: 0,
            page_count,
            surface,
            viewport: Viewport::default(),
            default_unit: default_unit.into(),
            page_units: HashMap::new(),
            scales: HashMap::new(),
            measurements: MeasurementCollection::new(),
        }
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn handle(&self) -> DocumentHandle {
        self.handle
    }

    pub fn page_index(&self) -> u32 {
        self.page_index
    }

    pub fn page_count(&self) -> u32 {
        self.page_count
    }

    /// Size of the rendered current page
    pub fn surface(&self) -> RasterSurface {
        self.surface
    }

    pub fn viewport(&self) -> &Viewport {
        &self.viewport
    }

    pub fn viewport_mut(&mut self) -> &mut Viewport {
        &mut self.viewport
    }

    pub fn zoom_level(&self) -> f64 {
        self.viewport.zoom
    }

    pub fn pan_offset(&self) -> Point {
        self.viewport.pan_offset()
    }

    pub fn measurements(&self) -> &MeasurementCollection {
        &self.measurements
    }

    /// Measurements of the current page in creation order
    pub fn current_measurements(&self) -> impl Iterator<Item = &Measurement> {
        self.measurements.for_page(self.page_index)
    }

    pub(crate) fn measurements_mut(&mut self) -> &mut MeasurementCollection {
        &mut self.measurements
    }

    /// Show another page with its freshly rendered surface
    pub(crate) fn show_page(&mut self, page_index: u32, surface: RasterSurface) {
        self.page_index = page_index;
        self.surface = surface;
    }

    pub fn scale_for(&self, page_index: u32) -> Option<&PageScale> {
        self.scales.get(&page_index)
    }

    /// Scale of the current page, if one was set
    pub fn current_scale(&self) -> Option<&PageScale> {
        self.scale_for(self.page_index)
    }

    /// Units per pixel used for values on `page_index` (1.0 when unset)
    pub fn effective_scale(&self, page_index: u32) -> f64 {
        self.scale_for(page_index).map_or(1.0, PageScale::value)
    }

    /// Set the scale of the current page and recompute its measurements
    ///
    /// Nothing changes when the input is invalid.
    pub(crate) fn apply_scale(&mut self, input: ScaleInput) -> EngineResult<&PageScale> {
        let page_index = self.page_index;
        let scale = PageScale::from_input(page_index, input)?;
        let value = scale.value();
        let recomputed = self.measurements.recompute_page(page_index, value);
        tracing::debug!(page_index, scale = value, recomputed, "Page scale applied");

        self.scales.insert(page_index, scale);
        Ok(&self.scales[&page_index])
    }

    /// Unit label of `page_index`
    pub fn unit_for(&self, page_index: u32) -> &str {
        self.page_units
            .get(&page_index)
            .map_or(self.default_unit.as_str(), String::as_str)
    }

    pub fn current_unit(&self) -> &str {
        self.unit_for(self.page_index)
    }

    pub(crate) fn set_current_unit(&mut self, unit: impl Into<String>) {
        self.page_units.insert(self.page_index, unit.into());
    }
}
