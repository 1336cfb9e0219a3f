//! Takeoff canvas engine
//!
//! [`TakeoffEngine`] owns the document session, the active tool and the
//! gesture in progress. Hosts feed it pointer and key events and act on the
//! returned [`Action`]s; painting is left to the host through [`OverlayFrame`].
//!
//! Loads and page renders follow a request/complete protocol. `begin_*`
//! issues a ticket that supersedes any request still in flight, the render
//! runs whenever the host gets to it, and `complete_*` applies the result
//! only if its ticket is still current. `load_document` and `set_page` run
//! the whole protocol inline.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::export::TakeoffSnapshot;
use crate::geometry::{self, Point};
use crate::input::{Cursor, Gesture, Key, Modifiers, Tool};
use crate::measurement::{Measurement, MeasurementGeometry, MeasurementId};
use crate::observer::{EngineObserver, StatusLevel};
use crate::overlay::{self, OverlayFrame};
use crate::pending::{CancellationToken, RequestKind, RequestTracker, Ticket};
use crate::redraw::RedrawScheduler;
use crate::scale::ScaleInput;
use crate::session::DocumentSession;
use crate::viewport::Viewport;
use std::cmp::Ordering;
use std::time::{Duration, Instant};
use takeoff_render::{DocumentHandle, PageRenderer, RasterSurface, RenderError, SourceRef};

/// Actions returned from engine handlers for the host to process
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// A redraw burst started; poll [`TakeoffEngine::take_frame`]
    RedrawNeeded,
    MeasurementAdded(MeasurementId),
    MeasurementRemoved(MeasurementId),
    SelectionChanged(Option<MeasurementId>),
    /// Both calibration points are placed; ask the user for the real distance
    CalibrationRequested { pixel_distance: f64 },
    ScaleChanged { page_index: u32, value: f64 },
    /// Zoom or pan changed
    ViewChanged,
    SetCursor(Cursor),
}

/// Pending document load
#[derive(Debug, Clone)]
pub struct LoadRequest {
    pub ticket: Ticket,
    pub source: SourceRef,
    pub token: CancellationToken,
}

/// Pending page render
#[derive(Debug, Clone)]
pub struct PageRequest {
    pub ticket: Ticket,
    pub handle: DocumentHandle,
    pub page_index: u32,
    pub target_scale: f32,
    pub token: CancellationToken,
}

/// Renderer output for a load
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadedDocument {
    pub handle: DocumentHandle,
    pub page_count: u32,
    /// First page surface
    pub surface: RasterSurface,
}

pub struct TakeoffEngine {
    config: EngineConfig,
    renderer: Box<dyn PageRenderer>,
    observer: Box<dyn EngineObserver>,
    session: Option<DocumentSession>,
    tool: Tool,
    gesture: Gesture,
    selection: Option<MeasurementId>,
    requests: RequestTracker,
    redraw: RedrawScheduler,
}

impl TakeoffEngine {
    /// Create an engine; fails if `config` does not validate
    pub fn new(
        renderer: Box<dyn PageRenderer>,
        config: EngineConfig,
        observer: Box<dyn EngineObserver>,
    ) -> EngineResult<Self> {
        config.validate()?;
        let redraw = RedrawScheduler::new(config.redraw_quiet_period(), config.redraw_max_latency());
        Ok(Self {
            config,
            renderer,
            observer,
            session: None,
            tool: Tool::default(),
            gesture: Gesture::Idle,
            selection: None,
            requests: RequestTracker::new(),
            redraw,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn session(&self) -> Option<&DocumentSession> {
        self.session.as_ref()
    }

    pub fn tool(&self) -> Tool {
        self.tool
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn selection(&self) -> Option<MeasurementId> {
        self.selection
    }

    /// Scale of the current page, `None` when not calibrated
    pub fn scale(&self) -> Option<f64> {
        self.session
            .as_ref()
            .and_then(|session| session.current_scale())
            .map(|scale| scale.value())
    }

    pub fn has_pending_request(&self) -> bool {
        self.requests.has_pending()
    }

    fn report(&self, level: StatusLevel, message: &str) {
        self.observer.status(level, message);
    }

    /// Mark the overlay dirty; pushes `RedrawNeeded` when a new burst starts
    fn request_redraw(&mut self, actions: &mut Vec<Action>) {
        if self.redraw.request_at(Instant::now()) {
            actions.push(Action::RedrawNeeded);
        }
    }

    fn close_handle(&mut self, handle: DocumentHandle) {
        if let Err(err) = self.renderer.close(handle) {
            tracing::warn!(handle = handle.raw(), error = %err, "Failed to close document");
        }
    }

    // ------------------------------------------------------------------
    // Document loading
    // ------------------------------------------------------------------

    /// Load a document, replacing the current session on success
    ///
    /// On failure the previous session stays active and unchanged.
    pub fn load_document(&mut self, source: impl Into<SourceRef>) -> EngineResult<Vec<Action>> {
        let request = self.begin_load(source.into());
        let outcome = self.render_load(&request);
        self.complete_load(request, outcome)
    }

    /// Issue a load request, superseding any request in flight
    pub fn begin_load(&mut self, source: SourceRef) -> LoadRequest {
        let (ticket, token) = self.requests.issue(RequestKind::Load);
        tracing::debug!(generation = ticket.generation(), source = %source, "Load requested");
        LoadRequest {
            ticket,
            source,
            token,
        }
    }

    /// Open the source and render its first page with the owned renderer
    ///
    /// A request that was already superseded is not rendered.
    pub fn render_load(&mut self, request: &LoadRequest) -> Result<LoadedDocument, RenderError> {
        if request.token.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        let handle = self.renderer.open(&request.source)?;
        let render_scale = self.config.render_scale;

        let loaded = self.renderer.page_count(handle).and_then(|page_count| {
            if page_count == 0 {
                return Err(RenderError::NoPages);
            }
            let surface = self.renderer.render(handle, 0, render_scale)?;
            Ok(LoadedDocument {
                handle,
                page_count,
                surface,
            })
        });

        if loaded.is_err() {
            self.close_handle(handle);
        }
        loaded
    }

    /// Apply the outcome of a load request
    ///
    /// Returns [`EngineError::RenderStale`] without touching state when a
    /// newer request superseded this one.
    pub fn complete_load(
        &mut self,
        request: LoadRequest,
        outcome: Result<LoadedDocument, RenderError>,
    ) -> EngineResult<Vec<Action>> {
        if let Err(stale) = self.requests.resolve(&request.ticket) {
            if let Ok(loaded) = outcome {
                self.close_handle(loaded.handle);
            }
            tracing::debug!(
                generation = request.ticket.generation(),
                "Discarded stale load result"
            );
            return Err(stale);
        }

        let name = request.source.display_name();
        let loaded = match outcome {
            Ok(loaded) => loaded,
            Err(err) => {
                let err = EngineError::from_render(name, err);
                tracing::warn!(error = %err, "Document load failed");
                self.report(StatusLevel::Error, &err.to_string());
                return Err(err);
            }
        };

        if let Some(previous) = self.session.take() {
            self.close_handle(previous.handle());
        }

        let mut actions = Vec::new();
        if self.tool != Tool::Pan {
            self.tool = Tool::Pan;
            actions.push(Action::SetCursor(Tool::Pan.cursor()));
        }
        self.gesture = Gesture::Idle;
        if self.selection.take().is_some() {
            actions.push(Action::SelectionChanged(None));
        }
        actions.push(Action::ViewChanged);
        self.request_redraw(&mut actions);

        tracing::info!(
            source = %name,
            page_count = loaded.page_count,
            width = loaded.surface.width,
            height = loaded.surface.height,
            "Document loaded"
        );
        let pages = if loaded.page_count == 1 { "page" } else { "pages" };
        self.report(
            StatusLevel::Success,
            &format!("Loaded {name} ({} {pages})", loaded.page_count),
        );

        let session = DocumentSession::new(
            request.source,
            loaded.handle,
            loaded.page_count,
            loaded.surface,
            self.config.default_unit.clone(),
        );
        self.session = Some(session);
        Ok(actions)
    }

    /// Tear down the session and cancel anything in flight
    pub fn close(&mut self) {
        self.requests.cancel();
        if let Some(session) = self.session.take() {
            self.close_handle(session.handle());
        }
        self.tool = Tool::Pan;
        self.gesture = Gesture::Idle;
        self.selection = None;
        self.redraw.flush();
    }

    // ------------------------------------------------------------------
    // Page navigation
    // ------------------------------------------------------------------

    /// Switch to page `index`
    ///
    /// Fails with [`EngineError::PageOutOfRange`] outside `[0, page_count)`.
    /// Selecting the page already shown is a no-op.
    pub fn set_page(&mut self, index: u32) -> EngineResult<Vec<Action>> {
        match self.begin_page(index)? {
            Some(request) => {
                let outcome = self.render_page(&request);
                self.complete_page(request, outcome)
            }
            None => Ok(Vec::new()),
        }
    }

    /// Issue a page render request
    ///
    /// Returns `None` when `index` is already the current page; any page
    /// request still in flight is cancelled in that case.
    pub fn begin_page(&mut self, index: u32) -> EngineResult<Option<PageRequest>> {
        let session = self.session.as_ref().ok_or(EngineError::NoDocument)?;
        let page_count = session.page_count();
        let current = session.page_index();
        let handle = session.handle();

        if index >= page_count {
            let err = EngineError::PageOutOfRange {
                page: index,
                page_count,
            };
            self.report(StatusLevel::Error, &err.to_string());
            return Err(err);
        }

        if index == current {
            if matches!(
                self.requests.pending().map(|ticket| ticket.kind()),
                Some(RequestKind::Page { .. })
            ) {
                self.requests.cancel();
            }
            return Ok(None);
        }

        let (ticket, token) = self.requests.issue(RequestKind::Page { page_index: index });
        tracing::debug!(generation = ticket.generation(), page_index = index, "Page requested");
        Ok(Some(PageRequest {
            ticket,
            handle,
            page_index: index,
            target_scale: self.config.render_scale,
            token,
        }))
    }

    /// Render the requested page with the owned renderer
    ///
    /// A request that was already superseded is not rendered.
    pub fn render_page(&self, request: &PageRequest) -> Result<RasterSurface, RenderError> {
        if request.token.is_cancelled() {
            return Err(RenderError::Cancelled);
        }
        self.renderer
            .render(request.handle, request.page_index, request.target_scale)
    }

    /// Apply the outcome of a page request
    ///
    /// Drawing gestures started on the previous page are discarded; a pan in
    /// progress carries on.
    pub fn complete_page(
        &mut self,
        request: PageRequest,
        outcome: Result<RasterSurface, RenderError>,
    ) -> EngineResult<Vec<Action>> {
        let generation = request.ticket.generation();
        if let Err(stale) = self.requests.resolve(&request.ticket) {
            tracing::debug!(generation, "Discarded stale page result");
            return Err(stale);
        }

        let session = self.session.as_mut().ok_or(EngineError::NoDocument)?;
        if session.handle() != request.handle {
            return Err(EngineError::RenderStale { generation });
        }

        let surface = match outcome {
            Ok(surface) => surface,
            Err(err) => {
                let err = EngineError::from_render(session.source().display_name(), err);
                tracing::warn!(page_index = request.page_index, error = %err, "Page render failed");
                self.observer.status(StatusLevel::Error, &err.to_string());
                return Err(err);
            }
        };

        session.show_page(request.page_index, surface);
        let message = format!("Page {} of {}", request.page_index + 1, session.page_count());

        let mut actions = Vec::new();
        if self.gesture.is_drawing() {
            let discarded = std::mem::take(&mut self.gesture);
            tracing::debug!(?discarded, "Discarded gesture on page change");
        }
        if self.selection.take().is_some() {
            actions.push(Action::SelectionChanged(None));
        }
        self.request_redraw(&mut actions);
        self.report(StatusLevel::Info, &message);
        Ok(actions)
    }

    /// Advance one page; no-op on the last page
    pub fn next_page(&mut self) -> EngineResult<Vec<Action>> {
        let session = self.session.as_ref().ok_or(EngineError::NoDocument)?;
        let next = session.page_index() + 1;
        if next < session.page_count() {
            self.set_page(next)
        } else {
            Ok(Vec::new())
        }
    }

    /// Go back one page; no-op on the first page
    pub fn previous_page(&mut self) -> EngineResult<Vec<Action>> {
        let session = self.session.as_ref().ok_or(EngineError::NoDocument)?;
        match session.page_index().checked_sub(1) {
            Some(previous) => self.set_page(previous),
            None => Ok(Vec::new()),
        }
    }

    // ------------------------------------------------------------------
    // Tools and scale
    // ------------------------------------------------------------------

    /// Switch the active tool, discarding any uncommitted gesture
    pub fn set_tool(&mut self, tool: Tool) -> Vec<Action> {
        let mut actions = Vec::new();
        if tool == self.tool {
            return actions;
        }

        if !self.gesture.is_idle() {
            let discarded = std::mem::take(&mut self.gesture);
            tracing::debug!(?discarded, "Discarded gesture on tool switch");
            self.request_redraw(&mut actions);
        }

        self.tool = tool;
        actions.push(Action::SetCursor(tool.cursor()));
        self.report(StatusLevel::Info, &format!("Tool: {tool}"));
        actions
    }

    /// Set the scale of the current page and recompute its measurements
    pub fn set_scale(&mut self, input: ScaleInput) -> EngineResult<Vec<Action>> {
        let session = self.session.as_mut().ok_or(EngineError::NoDocument)?;
        let page_index = session.page_index();

        let value = match session.apply_scale(input) {
            Ok(scale) => scale.value(),
            Err(err) => {
                self.observer.status(StatusLevel::Error, &err.to_string());
                return Err(err);
            }
        };
        let unit = session.current_unit().to_string();

        tracing::info!(page_index, scale = value, %unit, "Scale set");
        self.report(
            StatusLevel::Success,
            &format!("Scale set: 1 px = {value:.4} {unit}"),
        );

        let mut actions = vec![Action::ScaleChanged { page_index, value }];
        self.request_redraw(&mut actions);
        Ok(actions)
    }

    /// Set the unit label of the current page
    pub fn set_unit(&mut self, unit: impl Into<String>) -> EngineResult<Vec<Action>> {
        let session = self.session.as_mut().ok_or(EngineError::NoDocument)?;
        session.set_current_unit(unit);
        let mut actions = Vec::new();
        self.request_redraw(&mut actions);
        Ok(actions)
    }

    /// Answer the calibration prompt with the real distance between the points
    ///
    /// The calibration points are consumed whether or not the distance is valid.
    pub fn confirm_calibration(&mut self, real_distance: f64) -> EngineResult<Vec<Action>> {
        if self.session.is_none() {
            return Err(EngineError::NoDocument);
        }
        let Gesture::AwaitingDistance { first, second } = self.gesture else {
            return Err(EngineError::InvalidScale(
                "no calibration is waiting for a distance".to_string(),
            ));
        };
        self.gesture = Gesture::Idle;

        self.set_scale(ScaleInput::Calibration {
            p1: first,
            p2: second,
            real_distance,
        })
    }

    /// Abandon the calibration in progress; the scale is left unchanged
    pub fn cancel_calibration(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.gesture.is_calibrating() {
            self.gesture = Gesture::Idle;
            self.report(StatusLevel::Info, "Calibration cancelled");
            self.request_redraw(&mut actions);
        }
        actions
    }

    // ------------------------------------------------------------------
    // Pointer and keyboard input
    // ------------------------------------------------------------------

    fn viewport(&self) -> Option<Viewport> {
        self.session.as_ref().map(|session| *session.viewport())
    }

    /// Pointer pressed at a screen position
    pub fn on_pointer_down(&mut self, screen: Point, _modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some(viewport) = self.viewport() else {
            return actions;
        };
        let point = viewport.screen_to_page(screen);

        match self.tool {
            Tool::Pan => {
                self.gesture = Gesture::Panning {
                    last_screen: screen,
                };
                actions.push(Action::SetCursor(Cursor::Grabbing));
            }
            Tool::Select => self.select_at(point, &viewport, &mut actions),
            Tool::Line => {
                self.gesture = Gesture::DrawingLine {
                    start: point,
                    current: point,
                };
                self.request_redraw(&mut actions);
            }
            Tool::Area => {
                self.gesture = Gesture::DrawingArea {
                    anchor: point,
                    current: point,
                };
                self.request_redraw(&mut actions);
            }
            Tool::Polygon => self.polygon_click(point, &viewport, &mut actions),
            Tool::ScaleCalibration => self.calibration_click(point, &mut actions),
        }
        actions
    }

    /// Pointer moved to a screen position
    pub fn on_pointer_move(&mut self, screen: Point, modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some(session) = self.session.as_mut() else {
            return actions;
        };
        let point = session.viewport().screen_to_page(screen);
        let angle_snap = self.config.angle_snap_degrees;

        let mut view_changed = false;
        let mut dirty = true;
        match &mut self.gesture {
            Gesture::Panning { last_screen } => {
                let (dx, dy) = (screen.x - last_screen.x, screen.y - last_screen.y);
                *last_screen = screen;
                session.viewport_mut().pan_by(dx, dy);
                view_changed = true;
            }
            Gesture::DrawingLine { start, current } => {
                *current = if modifiers.shift {
                    geometry::snap_to_angle(start, &point, angle_snap)
                } else {
                    point
                };
            }
            Gesture::DrawingArea { current, .. } => *current = point,
            Gesture::Polygon { cursor, .. } | Gesture::Calibrating { cursor, .. } => {
                *cursor = Some(point);
            }
            Gesture::Idle | Gesture::AwaitingDistance { .. } => dirty = false,
        }

        if view_changed {
            actions.push(Action::ViewChanged);
        }
        if dirty {
            self.request_redraw(&mut actions);
        }
        actions
    }

    /// Pointer released at a screen position
    pub fn on_pointer_up(&mut self, screen: Point, modifiers: Modifiers) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some(viewport) = self.viewport() else {
            return actions;
        };
        let point = viewport.screen_to_page(screen);

        match std::mem::take(&mut self.gesture) {
            Gesture::Panning { .. } => {
                actions.push(Action::SetCursor(self.tool.cursor()));
            }
            Gesture::DrawingLine { start, .. } => {
                let end = if modifiers.shift {
                    geometry::snap_to_angle(&start, &point, self.config.angle_snap_degrees)
                } else {
                    point
                };
                self.request_redraw(&mut actions);
                match MeasurementGeometry::line(start, end) {
                    Some(line) => self.commit(line, &mut actions),
                    None => tracing::debug!("Discarded zero-length line"),
                }
            }
            Gesture::DrawingArea { anchor, .. } => {
                self.request_redraw(&mut actions);
                match MeasurementGeometry::area(anchor, point) {
                    Some(area) => self.commit(area, &mut actions),
                    None => tracing::debug!("Discarded zero-area rectangle"),
                }
            }
            other => self.gesture = other,
        }
        actions
    }

    /// Zoom with the wheel, keeping the page point under the cursor fixed
    ///
    /// Negative `delta_y` zooms in and positive zooms out. Zero is ignored.
    pub fn on_wheel(&mut self, screen: Point, delta_y: f64) -> Vec<Action> {
        let factor = match delta_y.partial_cmp(&0.0) {
            Some(Ordering::Less) => self.config.wheel_zoom_in_step,
            Some(Ordering::Greater) => self.config.wheel_zoom_out_step,
            _ => return Vec::new(),
        };
        self.zoom_by(factor, Some(screen))
    }

    /// Key pressed
    pub fn on_key_down(&mut self, key: Key) -> Vec<Action> {
        match key {
            Key::Escape => self.cancel_gesture(),
            Key::Delete | Key::Backspace => match self.selection {
                Some(id) => self.delete_measurement(id),
                None => Vec::new(),
            },
            Key::Enter => self.finish_polygon(),
            Key::Other(_) => Vec::new(),
        }
    }

    /// Close the polygon in progress, as a double click would
    ///
    /// Needs at least 3 vertices; otherwise nothing changes.
    pub fn finish_polygon(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if !matches!(self.gesture, Gesture::Polygon { .. }) {
            return actions;
        }
        if self.gesture.polygon_vertex_count() < 3 {
            self.report(StatusLevel::Info, "A polygon needs at least 3 points");
            return actions;
        }
        self.close_polygon(&mut actions);
        actions
    }

    fn cancel_gesture(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        if self.gesture.is_calibrating() {
            return self.cancel_calibration();
        }
        if self.gesture.is_drawing() {
            self.gesture = Gesture::Idle;
            self.report(StatusLevel::Info, "Drawing cancelled");
            self.request_redraw(&mut actions);
        }
        actions
    }

    fn select_at(&mut self, point: Point, viewport: &Viewport, actions: &mut Vec<Action>) {
        let tolerance = viewport.screen_dist_to_page(self.config.hit_tolerance_px);
        let hit = self.session.as_ref().and_then(|session| {
            session
                .measurements()
                .hit_test(session.page_index(), &point, tolerance)
        });

        if hit != self.selection {
            self.selection = hit;
            actions.push(Action::SelectionChanged(hit));
            self.request_redraw(actions);
        }
    }

    fn polygon_click(&mut self, point: Point, viewport: &Viewport, actions: &mut Vec<Action>) {
        let close_radius = viewport.screen_dist_to_page(self.config.close_radius_px);
        let closes = matches!(
            &self.gesture,
            Gesture::Polygon { vertices, .. }
                if vertices.len() >= 3 && point.distance_to(&vertices[0]) <= close_radius
        );

        if closes {
            self.close_polygon(actions);
            return;
        }

        match &mut self.gesture {
            Gesture::Polygon { vertices, cursor } => {
                vertices.push(point);
                *cursor = Some(point);
            }
            _ => {
                self.gesture = Gesture::Polygon {
                    vertices: vec![point],
                    cursor: Some(point),
                };
            }
        }
        self.request_redraw(actions);
    }

    fn close_polygon(&mut self, actions: &mut Vec<Action>) {
        let Gesture::Polygon { vertices, .. } = std::mem::take(&mut self.gesture) else {
            return;
        };
        self.request_redraw(actions);
        match MeasurementGeometry::polygon(vertices) {
            Some(polygon) => self.commit(polygon, actions),
            None => self.report(StatusLevel::Info, "Polygon discarded: it encloses no area"),
        }
    }

    fn calibration_click(&mut self, point: Point, actions: &mut Vec<Action>) {
        match self.gesture {
            Gesture::Calibrating { first, .. } => {
                let pixel_distance = first.distance_to(&point);
                self.gesture = Gesture::AwaitingDistance {
                    first,
                    second: point,
                };
                actions.push(Action::CalibrationRequested { pixel_distance });
                self.report(
                    StatusLevel::Info,
                    &format!("Enter the real distance for {pixel_distance:.1} px"),
                );
            }
            // The prompt is open; further clicks wait for its answer
            Gesture::AwaitingDistance { .. } => return,
            _ => {
                self.gesture = Gesture::Calibrating {
                    first: point,
                    cursor: None,
                };
                self.report(StatusLevel::Info, "Click the second calibration point");
            }
        }
        self.request_redraw(actions);
    }

    fn commit(&mut self, geometry: MeasurementGeometry, actions: &mut Vec<Action>) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        let page_index = session.page_index();
        let measurement = Measurement::new(page_index, geometry, session.effective_scale(page_index));
        let kind = measurement.kind();
        let message = format!(
            "Added {} measurement: {}",
            kind.as_str(),
            measurement.formatted(session.current_unit())
        );
        let id = session.measurements_mut().add(measurement);

        tracing::info!(%id, page_index, kind = kind.as_str(), "Measurement committed");
        self.observer.status(StatusLevel::Success, &message);
        actions.push(Action::MeasurementAdded(id));
        self.request_redraw(actions);
    }

    // ------------------------------------------------------------------
    // Measurements
    // ------------------------------------------------------------------

    /// Delete a measurement
    ///
    /// Unknown ids are ignored and return no actions, so repeated calls are
    /// harmless.
    pub fn delete_measurement(&mut self, id: MeasurementId) -> Vec<Action> {
        let mut actions = Vec::new();
        self.remove_measurement(id, &mut actions);
        actions
    }

    fn remove_measurement(&mut self, id: MeasurementId, actions: &mut Vec<Action>) {
        let removed = self
            .session
            .as_mut()
            .and_then(|session| session.measurements_mut().remove(id));
        let Some(removed) = removed else {
            return;
        };

        tracing::info!(%id, page_index = removed.page_index, "Measurement deleted");
        actions.push(Action::MeasurementRemoved(id));
        if self.selection == Some(id) {
            self.selection = None;
            actions.push(Action::SelectionChanged(None));
        }
        self.report(StatusLevel::Info, "Measurement deleted");
        self.request_redraw(actions);
    }

    /// Select a measurement on the current page, or clear the selection
    ///
    /// Ids that are unknown or belong to another page leave the selection
    /// unchanged.
    pub fn select_measurement(&mut self, id: Option<MeasurementId>) -> Vec<Action> {
        let mut actions = Vec::new();
        let Some(session) = self.session.as_ref() else {
            return actions;
        };
        if let Some(id) = id {
            let on_page = session
                .measurements()
                .get(id)
                .is_some_and(|measurement| measurement.page_index == session.page_index());
            if !on_page {
                return actions;
            }
        }

        if id != self.selection {
            self.selection = id;
            actions.push(Action::SelectionChanged(id));
            self.request_redraw(&mut actions);
        }
        actions
    }

    /// Measurements of the current page in creation order
    pub fn list_measurements(&self) -> Vec<&Measurement> {
        self.session
            .as_ref()
            .map(|session| session.current_measurements().collect())
            .unwrap_or_default()
    }

    pub fn measurement(&self, id: MeasurementId) -> Option<&Measurement> {
        self.session
            .as_ref()
            .and_then(|session| session.measurements().get(id))
    }

    /// Immutable copy of the current page for an export sink
    pub fn export_snapshot(&self) -> EngineResult<TakeoffSnapshot> {
        self.session
            .as_ref()
            .map(TakeoffSnapshot::capture)
            .ok_or(EngineError::NoDocument)
    }

    // ------------------------------------------------------------------
    // View
    // ------------------------------------------------------------------

    pub fn zoom_in(&mut self) -> Vec<Action> {
        self.zoom_by(self.config.zoom_in_step, None)
    }

    pub fn zoom_out(&mut self) -> Vec<Action> {
        self.zoom_by(self.config.zoom_out_step, None)
    }

    /// Zoom 1.0, no pan
    pub fn reset_view(&mut self) -> Vec<Action> {
        let mut actions = Vec::new();
        let changed = self
            .session
            .as_mut()
            .is_some_and(|session| session.viewport_mut().reset());
        if changed {
            actions.push(Action::ViewChanged);
            self.request_redraw(&mut actions);
        }
        actions
    }

    fn zoom_by(&mut self, factor: f64, anchor: Option<Point>) -> Vec<Action> {
        let mut actions = Vec::new();
        let (min_zoom, max_zoom) = (self.config.min_zoom, self.config.max_zoom);
        let changed = self.session.as_mut().is_some_and(|session| {
            session
                .viewport_mut()
                .zoom_by(factor, anchor, min_zoom, max_zoom)
        });
        if changed {
            actions.push(Action::ViewChanged);
            self.request_redraw(&mut actions);
        }
        actions
    }

    // ------------------------------------------------------------------
    // Overlay frames
    // ------------------------------------------------------------------

    /// Current overlay, regardless of redraw timing
    pub fn overlay(&self) -> Option<OverlayFrame> {
        self.session
            .as_ref()
            .map(|session| overlay::build_frame(session, &self.gesture, self.selection))
    }

    /// Overlay frame if a coalesced redraw is due at `now`
    pub fn take_frame(&mut self, now: Instant) -> Option<OverlayFrame> {
        if self.redraw.take_due_at(now) {
            self.overlay()
        } else {
            None
        }
    }

    /// Overlay frame for any pending redraw, ignoring the debounce
    pub fn flush_frame(&mut self) -> Option<OverlayFrame> {
        if self.redraw.flush() {
            self.overlay()
        } else {
            None
        }
    }

    /// How long the host may wait before polling `take_frame`
    pub fn redraw_due_in(&self, now: Instant) -> Option<Duration> {
        self.redraw.time_until_due(now)
    }
}
