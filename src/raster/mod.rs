//! External raster tool collaborators.
//!
//! Merging, clipping, and hillshading are delegated to external command-line
//! tools invoked as subprocesses. This crate owns argument construction,
//! invocation, and result/error interpretation; the raster math itself is an
//! intentional boundary. The trait seams let tests substitute mock tools.

mod command;
mod hillshade;
mod warp;

pub use hillshade::{GdalHillshader, Hillshader, LIGHT_AZIMUTH, VERTICAL_SCALE, Z_FACTOR};
pub use warp::{GdalWarper, Warper, DEFAULT_WARP_MEMORY_MB, TARGET_SRS};

use thiserror::Error;

/// Errors from external tool invocation.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The tool binary could not be started
    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// The tool ran and reported failure
    #[error("{program} failed ({status}): {stderr}")]
    Failed {
        program: String,
        status: String,
        stderr: String,
    },
}

impl ToolError {
    /// Returns the captured diagnostic output, if the tool produced any.
    pub fn diagnostics(&self) -> Option<&str> {
        match self {
            ToolError::Failed { stderr, .. } => Some(stderr),
            ToolError::Launch { .. } => None,
        }
    }
}
