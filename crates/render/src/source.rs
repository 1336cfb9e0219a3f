//! Document sources and format detection
//!
//! A drawing is either a paginated PDF or a single raster image. The kind is
//! decided from the bytes, never from the file extension.

use crate::renderer::RenderError;
use std::fmt;
use std::path::{Path, PathBuf};

/// PDF magic header
const PDF_MAGIC: &[u8] = b"%PDF-";

/// How far into the file a PDF header may start (some writers emit junk first)
const PDF_HEADER_SEARCH_WINDOW: usize = 1024;

/// Reference to a drawing that can be opened by a [`crate::PageRenderer`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRef {
    /// File on disk
    Path(PathBuf),
    /// In-memory upload, with a display name
    Bytes { name: String, bytes: Vec<u8> },
}

impl SourceRef {
    /// Create an in-memory source
    pub fn bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Bytes {
            name: name.into(),
            bytes,
        }
    }

    /// Human readable name used in snapshots and log lines
    ///
    /// Paths are reduced to their file name.
    pub fn display_name(&self) -> String {
        match self {
            SourceRef::Path(path) => path
                .file_name()
                .map_or_else(|| path.display().to_string(), |name| name.to_string_lossy().into_owned()),
            SourceRef::Bytes { name, .. } => name.clone(),
        }
    }

    /// Read the full contents of the source
    pub fn read(&self) -> Result<Vec<u8>, RenderError> {
        match self {
            SourceRef::Path(path) => Ok(std::fs::read(path)?),
            SourceRef::Bytes { bytes, .. } => Ok(bytes.clone()),
        }
    }
}

impl From<PathBuf> for SourceRef {
    fn from(value: PathBuf) -> Self {
        Self::Path(value)
    }
}

impl From<&Path> for SourceRef {
    fn from(value: &Path) -> Self {
        Self::Path(value.to_path_buf())
    }
}

impl fmt::Display for SourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}

/// Detected content kind of a source
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    /// Paginated PDF document
    Pdf,
    /// Single-page raster image
    Raster(image::ImageFormat),
}

impl SourceKind {
    /// Sniff the kind from the leading bytes
    ///
    /// Returns [`RenderError::UnsupportedFormat`] when the bytes are neither a
    /// PDF nor an image format the `image` crate recognises.
    pub fn detect(bytes: &[u8]) -> Result<Self, RenderError> {
        let window = &bytes[..bytes.len().min(PDF_HEADER_SEARCH_WINDOW)];
        if window
            .windows(PDF_MAGIC.len())
            .any(|candidate| candidate == PDF_MAGIC)
        {
            return Ok(SourceKind::Pdf);
        }

        image::guess_format(bytes)
            .map(SourceKind::Raster)
            .map_err(|_| RenderError::UnsupportedFormat)
    }

    /// Whether the kind can have more than one page
    pub fn is_paginated(&self) -> bool {
        matches!(self, SourceKind::Pdf)
    }
}
