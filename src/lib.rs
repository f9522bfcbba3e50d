//! reliefshade - Shaded-relief image compositing from remote elevation tiles
//!
//! This library turns a geographic bounding box (or a point plus radius) into
//! a shaded-relief image buffer. It enumerates the elevation tiles covering
//! the requested area, downloads them with bounded concurrency into an
//! isolated per-run workspace, merges and clips them with an external warp
//! tool, derives a hillshade, and re-encodes the result in memory.
//!
//! # Pipeline
//!
//! ```text
//! Extent → Coverage → Fetch (≤10 concurrent) → Merge/Clip → Hillshade → Encode → Cleanup
//! ```
//!
//! # Example
//!
//! ```ignore
//! use reliefshade::{Extent, OutputFormat, Pipeline, RenderOptions};
//!
//! let pipeline = Pipeline::new()?;
//! let extent = Extent::new(-1.0, 50.0, 0.0, 51.0)?;
//! let options = RenderOptions {
//!     format: OutputFormat::Png,
//!     zoom: 5,
//! };
//!
//! let buffer = pipeline.render(extent, options).await?;
//! ```
//!
//! The raster math itself is delegated to external warp and hillshade tools
//! invoked as subprocesses; this crate owns argument construction, bounded
//! fetching, workspace lifecycle, and error interpretation. The warp and
//! hillshade seams ([`raster::Warper`], [`raster::Hillshader`]) and the tile
//! store seam ([`store::TileStore`]) are traits so tests can substitute mock
//! collaborators.

pub mod coord;
pub mod coverage;
pub mod encode;
pub mod fetch;
pub mod logging;
pub mod pipeline;
pub mod raster;
pub mod store;
pub mod workspace;

pub use coord::{Extent, TileCoord};
pub use encode::OutputFormat;
pub use pipeline::{Pipeline, PipelineConfig, RenderError, RenderOptions};
pub use workspace::Workspace;

/// Version of the reliefshade library.
///
/// Defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
