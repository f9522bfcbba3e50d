//! Raster merge and clip via the external warp tool.

use super::command::run_tool;
use super::ToolError;
use crate::coord::Extent;
use std::future::Future;
use std::path::{Path, PathBuf};

/// Working-memory hint passed to the warp tool, in megabytes.
pub const DEFAULT_WARP_MEMORY_MB: u32 = 4000;

/// Target CRS for merged rasters (geographic, WGS84).
pub const TARGET_SRS: &str = "EPSG:4326";

/// Trait for the merge/clip collaborator.
///
/// One invocation mosaics the input rasters into a single output raster,
/// optionally clipped to a geographic bounding box. The point-radius entry
/// point calls this twice: once to merge without a clip box and once to clip
/// the merged raster.
pub trait Warper: Send + Sync + 'static {
    /// Merges `inputs` into `output`, clipping to `clip` when given.
    fn warp(
        &self,
        inputs: &[PathBuf],
        clip: Option<&Extent>,
        output: &Path,
    ) -> impl Future<Output = Result<(), ToolError>> + Send;
}

/// Production warp collaborator invoking `gdalwarp` as a subprocess.
#[derive(Debug, Clone)]
pub struct GdalWarper {
    program: String,
    memory_mb: u32,
}

impl GdalWarper {
    /// Creates a warper using `gdalwarp` from `PATH` and the default
    /// working-memory hint.
    pub fn new() -> Self {
        Self {
            program: "gdalwarp".to_string(),
            memory_mb: DEFAULT_WARP_MEMORY_MB,
        }
    }

    /// Overrides the tool binary, e.g. an absolute path.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    /// Overrides the working-memory hint.
    pub fn with_memory_mb(mut self, memory_mb: u32) -> Self {
        self.memory_mb = memory_mb;
        self
    }
}

impl Default for GdalWarper {
    fn default() -> Self {
        Self::new()
    }
}

impl Warper for GdalWarper {
    async fn warp(
        &self,
        inputs: &[PathBuf],
        clip: Option<&Extent>,
        output: &Path,
    ) -> Result<(), ToolError> {
        let args = warp_args(self.memory_mb, inputs, clip, output);
        run_tool(&self.program, &args).await
    }
}

/// Builds the warp tool argument list.
///
/// Contract: `-wm <mem> <inputs...> [-te_srs EPSG:4326 -te <min_lng>
/// <min_lat> <max_lng> <max_lat>] <output>`.
fn warp_args(
    memory_mb: u32,
    inputs: &[PathBuf],
    clip: Option<&Extent>,
    output: &Path,
) -> Vec<String> {
    let mut args = vec!["-wm".to_string(), memory_mb.to_string()];

    for input in inputs {
        args.push(input.display().to_string());
    }

    if let Some(extent) = clip {
        args.push("-te_srs".to_string());
        args.push(TARGET_SRS.to_string());
        args.push("-te".to_string());
        for value in extent.to_array() {
            args.push(value.to_string());
        }
    }

    args.push(output.display().to_string());
    args
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_warp_args_with_clip() {
        let inputs = vec![PathBuf::from("/ws/5_15_10.tif"), PathBuf::from("/ws/5_16_10.tif")];
        let extent = Extent::new(-1.0, 50.0, 0.0, 51.0).unwrap();

        let args = warp_args(4000, &inputs, Some(&extent), Path::new("/ws/merged.tif"));

        assert_eq!(
            args,
            vec![
                "-wm",
                "4000",
                "/ws/5_15_10.tif",
                "/ws/5_16_10.tif",
                "-te_srs",
                "EPSG:4326",
                "-te",
                "-1",
                "50",
                "0",
                "51",
                "/ws/merged.tif",
            ]
        );
    }

    #[test]
    fn test_warp_args_merge_only() {
        let inputs = vec![PathBuf::from("/ws/12_2044_1362.tif")];

        let args = warp_args(4000, &inputs, None, Path::new("/ws/merged.tif"));

        assert_eq!(
            args,
            vec!["-wm", "4000", "/ws/12_2044_1362.tif", "/ws/merged.tif"]
        );
    }

    #[test]
    fn test_memory_hint_override() {
        let warper = GdalWarper::new().with_memory_mb(512);
        assert_eq!(warper.memory_mb, 512);

        let args = warp_args(512, &[], None, Path::new("/out.tif"));
        assert_eq!(args[1], "512");
    }
}
