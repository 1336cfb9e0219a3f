//! Engine error types

use crate::config::ConfigError;
use takeoff_render::RenderError;

/// Errors surfaced by [`crate::TakeoffEngine`] operations
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error("Unsupported document format: {source_ref}")]
    UnsupportedFormat { source_ref: String },

    #[error("Page {page} out of range (document has {page_count} pages)")]
    PageOutOfRange { page: u32, page_count: u32 },

    #[error("Invalid scale: {0}")]
    InvalidScale(String),

    #[error("Failed to load {source_ref}: {source}")]
    LoadFailed {
        source_ref: String,
        #[source]
        source: RenderError,
    },

    #[error("Render request {generation} was superseded by a newer request")]
    RenderStale { generation: u64 },

    #[error("No document loaded")]
    NoDocument,

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Map a renderer failure for `source_ref` onto the engine's error kinds
    pub(crate) fn from_render(source_ref: impl Into<String>, err: RenderError) -> Self {
        let source_ref = source_ref.into();
        if err.is_unsupported_format() {
            EngineError::UnsupportedFormat { source_ref }
        } else {
            EngineError::LoadFailed {
                source_ref,
                source: err,
            }
        }
    }

    /// Whether this error only means a newer request replaced the one that failed
    pub fn is_stale(&self) -> bool {
        matches!(self, EngineError::RenderStale { .. })
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_render_error_maps_to_unsupported_format() {
        let err = EngineError::from_render("notes.txt", RenderError::UnsupportedFormat);
        assert!(matches!(
            err,
            EngineError::UnsupportedFormat { ref source_ref } if source_ref == "notes.txt"
        ));
    }

    #[test]
    fn other_render_errors_map_to_load_failed() {
        let err = EngineError::from_render("plan.pdf", RenderError::NoPages);
        assert!(matches!(err, EngineError::LoadFailed { .. }));
        assert!(err.to_string().starts_with("Failed to load plan.pdf"));
    }

    #[test]
    fn stale_is_recognised() {
        assert!(EngineError::RenderStale { generation: 3 }.is_stale());
        assert!(!EngineError::NoDocument.is_stale());
    }
}
