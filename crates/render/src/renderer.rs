//! Page renderer contract and the default lopdf/image backend
//!
//! The engine only needs pixel dimensions that are stable across repeated
//! calls for the same page and scale; it never inspects page content.

use crate::source::{SourceKind, SourceRef};
use image::ImageReader;
use lopdf::Document;
use std::collections::HashMap;
use std::io::Cursor;

/// Page size used when a PDF page has no usable MediaBox (US Letter, points)
const FALLBACK_PAGE_SIZE: PageSize = PageSize {
    width: 612.0,
    height: 792.0,
};

/// Opaque handle to a document opened by a renderer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DocumentHandle(u64);

impl DocumentHandle {
    /// Build a handle from a renderer-assigned number
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}

/// Native page size (points for PDFs, pixels for rasters)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageSize {
    pub width: f32,
    pub height: f32,
}

/// Rendered drawing surface
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RasterSurface {
    pub width: u32,
    pub height: u32,
}

impl RasterSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("PDF parse error: {0}")]
    Parse(#[from] lopdf::Error),
    #[error("image decode error: {0}")]
    Image(#[from] image::ImageError),
    #[error("source is neither a PDF nor a supported raster image")]
    UnsupportedFormat,
    #[error("invalid handle {0}")]
    InvalidHandle(u64),
    #[error("page {page} out of range (page_count={page_count})")]
    PageOutOfRange { page: u32, page_count: u32 },
    #[error("document has no pages")]
    NoPages,
    #[error("encrypted PDFs are not supported")]
    EncryptedUnsupported,
    #[error("render request was cancelled")]
    Cancelled,
}

impl RenderError {
    /// Whether this error means the source format itself is not renderable
    pub fn is_unsupported_format(&self) -> bool {
        matches!(self, RenderError::UnsupportedFormat)
    }
}

/// Renders pages of a drawing to a raster surface
///
/// Implementations may be backed by a PDF rasteriser or a plain image
/// loader. The trait is object safe so the engine can own a boxed renderer.
pub trait PageRenderer {
    fn open(&mut self, source: &SourceRef) -> Result<DocumentHandle, RenderError>;
    fn page_count(&self, handle: DocumentHandle) -> Result<u32, RenderError>;
    fn render(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        target_scale: f32,
    ) -> Result<RasterSurface, RenderError>;
    fn close(&mut self, handle: DocumentHandle) -> Result<(), RenderError>;
}

#[derive(Debug, Clone)]
struct DocumentRecord {
    kind: SourceKind,
    page_sizes: Vec<PageSize>,
}

/// Default renderer: lopdf for PDFs, the `image` crate for raster drawings
#[derive(Debug, Default)]
pub struct DocumentRenderer {
    next_handle: u64,
    docs: HashMap<DocumentHandle, DocumentRecord>,
}

impl DocumentRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kind of an open document
    pub fn kind(&self, handle: DocumentHandle) -> Result<SourceKind, RenderError> {
        Ok(self.record(handle)?.kind)
    }

    /// Native size of a page
    pub fn page_size(&self, handle: DocumentHandle, page_index: u32) -> Result<PageSize, RenderError> {
        let record = self.record(handle)?;
        record
            .page_sizes
            .get(page_index as usize)
            .copied()
            .ok_or(RenderError::PageOutOfRange {
                page: page_index,
                page_count: record.page_sizes.len() as u32,
            })
    }

    fn pdf_page_sizes(bytes: &[u8]) -> Result<Vec<PageSize>, RenderError> {
        if bytes
            .windows("/Encrypt".len())
            .any(|window| window == b"/Encrypt")
        {
            return Err(RenderError::EncryptedUnsupported);
        }

        let doc = Document::load_mem(bytes)?;
        let pages = doc.get_pages();
        let mut sizes = Vec::with_capacity(pages.len());

        for (_, object_id) in pages {
            let dict = doc.get_dictionary(object_id)?;
            let size = dict
                .get(b"MediaBox")
                .ok()
                .and_then(|obj| obj.as_array().ok())
                .and_then(|array| {
                    if array.len() != 4 {
                        return None;
                    }
                    let x0 = array[0].as_float().ok()?;
                    let y0 = array[1].as_float().ok()?;
                    let x1 = array[2].as_float().ok()?;
                    let y1 = array[3].as_float().ok()?;
                    Some(PageSize {
                        width: (x1 - x0).abs(),
                        height: (y1 - y0).abs(),
                    })
                })
                .unwrap_or(FALLBACK_PAGE_SIZE);

            sizes.push(size);
        }

        if sizes.is_empty() {
            return Err(RenderError::NoPages);
        }

        Ok(sizes)
    }

    fn raster_page_size(bytes: &[u8]) -> Result<PageSize, RenderError> {
        let (width, height) = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .into_dimensions()?;
        Ok(PageSize {
            width: width as f32,
            height: height as f32,
        })
    }

    fn record(&self, handle: DocumentHandle) -> Result<&DocumentRecord, RenderError> {
        self.docs
            .get(&handle)
            .ok_or(RenderError::InvalidHandle(handle.raw()))
    }
}

impl PageRenderer for DocumentRenderer {
    fn open(&mut self, source: &SourceRef) -> Result<DocumentHandle, RenderError> {
        let bytes = source.read()?;
        let kind = SourceKind::detect(&bytes)?;

        let page_sizes = match kind {
            SourceKind::Pdf => Self::pdf_page_sizes(&bytes)?,
            SourceKind::Raster(_) => vec![Self::raster_page_size(&bytes)?],
        };

        self.next_handle += 1;
        let handle = DocumentHandle(self.next_handle);
        tracing::debug!(
            source = %source,
            ?kind,
            pages = page_sizes.len(),
            handle = handle.raw(),
            "opened drawing"
        );
        self.docs.insert(handle, DocumentRecord { kind, page_sizes });

        Ok(handle)
    }

    fn page_count(&self, handle: DocumentHandle) -> Result<u32, RenderError> {
        Ok(self.record(handle)?.page_sizes.len() as u32)
    }

    fn render(
        &self,
        handle: DocumentHandle,
        page_index: u32,
        target_scale: f32,
    ) -> Result<RasterSurface, RenderError> {
        let page_size = self.page_size(handle, page_index)?;
        let scale = if target_scale <= 0.0 { 1.0 } else { target_scale };

        let width = (page_size.width * scale).round().max(1.0) as u32;
        let height = (page_size.height * scale).round().max(1.0) as u32;

        Ok(RasterSurface::new(width, height))
    }

    fn close(&mut self, handle: DocumentHandle) -> Result<(), RenderError> {
        self.docs
            .remove(&handle)
            .map(|_| ())
            .ok_or(RenderError::InvalidHandle(handle.raw()))
    }
}
