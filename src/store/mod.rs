//! Remote elevation tile store abstraction
//!
//! This module provides the trait and production implementation for
//! retrieving elevation rasters from a remote tile store addressed by
//! `{zoom}/{x}/{y}`. The trait seam allows tests to substitute mock stores
//! without network access.

mod terrain;

pub use terrain::{TerrainTileStore, DEFAULT_TILE_ENDPOINT};

use crate::coord::TileCoord;
use std::future::Future;
use std::path::Path;
use thiserror::Error;

/// Errors from tile store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The HTTP request could not be sent or its body could not be read
    #[error("request failed: {0}")]
    Request(String),

    /// The store answered with a non-success status
    #[error("HTTP {status} from {url}")]
    Status { status: u16, url: String },

    /// Writing the tile to the workspace failed
    #[error("I/O error writing tile: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for remote elevation tile stores.
///
/// Implementors retrieve one raster tile and persist it at the destination
/// path. The production implementation streams the response body to disk;
/// mock implementations in tests write canned bytes.
pub trait TileStore: Send + Sync + 'static {
    /// Fetches one tile and writes it to `dest`.
    ///
    /// # Arguments
    ///
    /// * `tile` - Tile coordinate addressing the remote raster
    /// * `dest` - Workspace-local path to write the raster to
    fn fetch_tile(
        &self,
        tile: TileCoord,
        dest: &Path,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Returns the store's name for logging.
    fn name(&self) -> &str;
}
