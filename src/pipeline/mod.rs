//! Pipeline orchestration.
//!
//! Sequences the compositing stages for one run and owns the run's
//! workspace and error propagation:
//!
//! ```text
//! Validating → ComputingCoverage → Fetching → Compositing → Shading
//!     → Encoding → CleaningUp → {Done | Failed}
//! ```
//!
//! Stages are strictly sequential for a single run; only the fetch stage
//! parallelizes internally. The first stage error short-circuits the
//! remaining processing stages, but cleanup runs on every terminal path
//! (success, failure, or cancellation), so a failed run never leaves its
//! workspace behind. Validation failures return before any workspace,
//! network, or subprocess side effect.
//!
//! Independent runs execute concurrently with no shared mutable state; each
//! run's workspace is namespaced by a UUID, so two runs requesting
//! overlapping tiles never write the same path.

mod error;

pub use error::RenderError;

use crate::coord::{self, Extent, MAX_ZOOM};
use crate::coverage;
use crate::encode::{self, OutputFormat};
use crate::fetch::{self, MAX_CONCURRENT_FETCHES};
use crate::raster::{GdalHillshader, GdalWarper, Hillshader, Warper};
use crate::store::{StoreError, TerrainTileStore, TileStore};
use crate::workspace::Workspace;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

/// Zoom level used by the point-radius entry point.
pub const POINT_ZOOM: u8 = 12;

/// Inner buffer ring radius around the requested point, in kilometres.
const INNER_RADIUS_KM: f64 = 5.0;

/// Outer buffer ring radius around the requested point, in kilometres.
const OUTER_RADIUS_KM: f64 = 10.0;

/// Options for an extent render.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Output image format
    pub format: OutputFormat,
    /// Tile zoom level (0-15)
    pub zoom: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            format: OutputFormat::Jpeg,
            zoom: 0,
        }
    }
}

/// Configuration for the pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory under which per-run workspaces are created
    pub workspace_root: PathBuf,

    /// Maximum simultaneous tile transfers per run
    pub max_concurrent_fetches: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            workspace_root: std::env::temp_dir(),
            max_concurrent_fetches: MAX_CONCURRENT_FETCHES,
        }
    }
}

/// The request-scoped compositing pipeline.
///
/// Holds the external collaborators behind their trait seams so tests can
/// substitute mocks. Cheap to share behind an `Arc` across concurrent runs;
/// each run's mutable state lives in its own workspace.
pub struct Pipeline<S, W, H>
where
    S: TileStore,
    W: Warper,
    H: Hillshader,
{
    store: Arc<S>,
    warper: Arc<W>,
    hillshader: Arc<H>,
    config: PipelineConfig,
}

impl Pipeline<TerrainTileStore, GdalWarper, GdalHillshader> {
    /// Creates a pipeline wired to the production collaborators: the public
    /// elevation tile endpoint and the warp/hillshade tools from `PATH`.
    pub fn new() -> Result<Self, StoreError> {
        Ok(Self::with_collaborators(
            TerrainTileStore::new()?,
            GdalWarper::new(),
            GdalHillshader::new(),
            PipelineConfig::default(),
        ))
    }
}

impl<S, W, H> Pipeline<S, W, H>
where
    S: TileStore,
    W: Warper,
    H: Hillshader,
{
    /// Creates a pipeline from explicit collaborators and configuration.
    pub fn with_collaborators(store: S, warper: W, hillshader: H, config: PipelineConfig) -> Self {
        Self {
            store: Arc::new(store),
            warper: Arc::new(warper),
            hillshader: Arc::new(hillshader),
            config,
        }
    }

    /// Renders a shaded-relief image of `extent`.
    ///
    /// # Returns
    ///
    /// The encoded image bytes in the requested format.
    pub async fn render(
        &self,
        extent: Extent,
        options: RenderOptions,
    ) -> Result<Vec<u8>, RenderError> {
        self.render_cancellable(extent, options, CancellationToken::new())
            .await
    }

    /// Renders a shaded-relief image of `extent`, abandoning the run when
    /// `cancel` fires. Cancellation still cleans up the workspace.
    pub async fn render_cancellable(
        &self,
        extent: Extent,
        options: RenderOptions,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, RenderError> {
        if options.zoom > MAX_ZOOM {
            return Err(RenderError::InvalidZoom { zoom: options.zoom });
        }

        let tiles = coverage::tiles_covering(&extent, options.zoom)?;
        info!(
            zoom = options.zoom,
            format = %options.format,
            tiles = tiles.len(),
            "starting extent render"
        );

        let mut workspace = Workspace::create(&self.config.workspace_root).await?;
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(RenderError::Cancelled),
            result = self.run_stages(&workspace, &tiles, Some(&extent), None, options.format, &cancel) => result,
        };
        workspace.cleanup().await;
        result
    }

    /// Renders a shaded-relief image around a point at a fixed zoom of
    /// [`POINT_ZOOM`].
    ///
    /// The download extent is the point buffered by the outer radius. The
    /// merge step omits the clip box; a separate clip pass afterwards uses
    /// the wide-aspect box (latitude span from the inner buffer ring,
    /// longitude span from the outer ring).
    pub async fn render_around_point(
        &self,
        lng: f64,
        lat: f64,
        format: OutputFormat,
    ) -> Result<Vec<u8>, RenderError> {
        self.render_around_point_cancellable(lng, lat, format, CancellationToken::new())
            .await
    }

    /// Point-radius render with cancellation support.
    pub async fn render_around_point_cancellable(
        &self,
        lng: f64,
        lat: f64,
        format: OutputFormat,
        cancel: CancellationToken,
    ) -> Result<Vec<u8>, RenderError> {
        let outer = coord::buffer_around_point(lng, lat, OUTER_RADIUS_KM)?;
        let inner = coord::buffer_around_point(lng, lat, INNER_RADIUS_KM)?;
        let clip = point_clip_box(&outer, &inner);

        let tiles = coverage::tiles_covering(&outer, POINT_ZOOM)?;
        info!(
            lng,
            lat,
            format = %format,
            tiles = tiles.len(),
            "starting point render"
        );

        let mut workspace = Workspace::create(&self.config.workspace_root).await?;
        let result = tokio::select! {
            _ = cancel.cancelled() => Err(RenderError::Cancelled),
            result = self.run_stages(&workspace, &tiles, None, Some(&clip), format, &cancel) => result,
        };
        workspace.cleanup().await;
        result
    }

    /// Runs the processing stages against an already-created workspace.
    ///
    /// `merge_clip` clips during the merge (extent entry point); `post_clip`
    /// clips in a separate warp pass after merging (point entry point).
    #[instrument(skip_all, fields(run_id = %workspace.run_id()))]
    async fn run_stages(
        &self,
        workspace: &Workspace,
        tiles: &BTreeSet<coord::TileCoord>,
        merge_clip: Option<&Extent>,
        post_clip: Option<&Extent>,
        format: OutputFormat,
        cancel: &CancellationToken,
    ) -> Result<Vec<u8>, RenderError> {
        let fetched = fetch::fetch_tiles(
            Arc::clone(&self.store),
            tiles,
            workspace,
            self.config.max_concurrent_fetches,
            cancel,
        )
        .await?;
        let inputs: Vec<PathBuf> = fetched.into_values().collect();

        let merged = workspace.merged_path();
        self.warper
            .warp(&inputs, merge_clip, &merged)
            .await
            .map_err(RenderError::CompositionFailure)?;
        debug!(inputs = inputs.len(), "merge complete");

        let composed = match post_clip {
            Some(clip) => {
                let clipped = workspace.clipped_path();
                self.warper
                    .warp(&[merged], Some(clip), &clipped)
                    .await
                    .map_err(RenderError::CompositionFailure)?;
                debug!("clip complete");
                clipped
            }
            None => merged,
        };

        let shaded = workspace.shaded_path();
        self.hillshader
            .shade(&composed, &shaded)
            .await
            .map_err(RenderError::ShadingFailure)?;
        debug!("shading complete");

        let buffer = encode::encode_raster(&shaded, format).await?;
        info!(bytes = buffer.len(), "render complete");
        Ok(buffer)
    }
}

/// Wide-aspect clip box for the point-radius entry point.
///
/// Takes the latitude span from the inner buffer ring and the longitude span
/// from the outer ring, producing a frame wider than it is tall. The
/// asymmetry is intentional; keep it when touching this code.
fn point_clip_box(outer: &Extent, inner: &Extent) -> Extent {
    Extent {
        min_lng: outer.min_lng,
        min_lat: inner.min_lat,
        max_lng: outer.max_lng,
        max_lat: inner.max_lat,
    }
}
