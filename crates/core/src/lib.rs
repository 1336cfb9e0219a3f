//! Takeoff Core Library
//!
//! Measurement engine for construction takeoff: calibrate a drawing's scale,
//! draw length and area measurements over rendered pages, and export them.
//!
//! The engine is host agnostic. Hosts feed pointer and key events into
//! [`TakeoffEngine`], act on the returned [`Action`]s, and paint the
//! [`OverlayFrame`] it produces on top of the page raster.

pub mod config;
pub mod engine;
pub mod error;
pub mod export;
pub mod geometry;
pub mod input;
pub mod measurement;
pub mod observer;
pub mod overlay;
pub mod pending;
pub mod redraw;
pub mod scale;
pub mod session;
pub mod viewport;

pub use config::{ConfigError, ConfigResult, EngineConfig};
pub use engine::{Action, LoadRequest, LoadedDocument, PageRequest, TakeoffEngine};
pub use error::{EngineError, EngineResult};
pub use export::{
    CsvExportConfig, CsvSink, ExportError, ExportResult, ExportSink, JsonSink, MeasurementRecord,
    TakeoffSnapshot, Totals,
};
pub use geometry::Point;
pub use input::{Cursor, Gesture, Key, Modifiers, Tool, UnknownTool};
pub use measurement::{
    Measurement, MeasurementCollection, MeasurementGeometry, MeasurementId, MeasurementKind,
};
pub use observer::{EngineObserver, NullObserver, StatusLevel, TracingObserver};
pub use overlay::{OverlayFrame, OverlayItem, OverlayLabel, OverlayShape, OverlayStyle};
pub use pending::{CancellationToken, RequestKind, RequestTracker, Ticket};
pub use redraw::RedrawScheduler;
pub use scale::{PageScale, ScaleInput, ScaleSource};
pub use session::DocumentSession;
pub use viewport::Viewport;

pub use takeoff_render::{
    default_renderer, DocumentHandle, DocumentRenderer, PageRenderer, RasterSurface, RenderError,
    SourceRef,
};
