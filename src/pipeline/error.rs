//! Error types for the compositing pipeline.
//!
//! Every variant is fatal to its run. Cleanup failures are deliberately
//! absent: workspace cleanup is advisory and only ever logged, so it cannot
//! change a run's reported outcome.

use crate::coord::{CoordError, MAX_ZOOM, MIN_ZOOM};
use crate::coverage::CoverageError;
use crate::encode::{EncodeError, ParseFormatError};
use crate::fetch::FetchError;
use crate::raster::ToolError;
use thiserror::Error;

/// Errors that can occur during a pipeline run.
#[derive(Debug, Error)]
pub enum RenderError {
    /// The extent was malformed (non-finite or out of range)
    #[error("invalid extent: {0}")]
    InvalidExtent(#[from] CoordError),

    /// The zoom level is outside the supported range
    #[error("invalid zoom {zoom}: must be between {} and {}", MIN_ZOOM, MAX_ZOOM)]
    InvalidZoom { zoom: u8 },

    /// The format name did not parse
    #[error(transparent)]
    InvalidFormat(#[from] ParseFormatError),

    /// The extent covers zero tiles
    #[error("the provided extent covers no tiles")]
    DegenerateExtent,

    /// The extent needs more tiles than one run may cover
    #[error("too many tiles ({count}) needed to cover this area; choose a smaller extent or a lower zoom")]
    AreaTooLarge { count: usize },

    /// A tile download failed
    #[error("tile fetch failed: {0}")]
    FetchFailure(#[source] FetchError),

    /// The external warp tool failed during merge or clip
    #[error("raster composition failed: {0}")]
    CompositionFailure(#[source] ToolError),

    /// The external hillshade tool failed
    #[error("hillshade generation failed: {0}")]
    ShadingFailure(#[source] ToolError),

    /// The shaded raster could not be re-encoded
    #[error("encoding failed: {0}")]
    EncodingFailure(#[from] EncodeError),

    /// The run was cancelled before completing
    #[error("run cancelled")]
    Cancelled,

    /// Workspace creation or other run-scoped I/O failed
    #[error("workspace I/O error: {0}")]
    Workspace(#[from] std::io::Error),
}

impl From<CoverageError> for RenderError {
    fn from(err: CoverageError) -> Self {
        match err {
            CoverageError::DegenerateExtent => RenderError::DegenerateExtent,
            CoverageError::AreaTooLarge { count } => RenderError::AreaTooLarge { count },
        }
    }
}

impl From<FetchError> for RenderError {
    fn from(err: FetchError) -> Self {
        match err {
            FetchError::Cancelled => RenderError::Cancelled,
            other => RenderError::FetchFailure(other),
        }
    }
}

impl RenderError {
    /// Returns diagnostic output captured from an external tool, if any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            RenderError::CompositionFailure(err) | RenderError::ShadingFailure(err) => {
                err.diagnostics()
            }
            _ => None,
        }
    }
}
