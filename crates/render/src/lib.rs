//! Takeoff Render Library
//!
//! Page renderer contract for the takeoff engine, with a default backend that
//! reads paginated PDFs through lopdf and raster drawings through `image`.

pub mod renderer;
pub mod source;

pub use renderer::{
    DocumentHandle, DocumentRenderer, PageRenderer, PageSize, RasterSurface, RenderError,
};
pub use source::{SourceKind, SourceRef};

/// Create the default renderer
pub fn default_renderer() -> DocumentRenderer {
    DocumentRenderer::new()
}
