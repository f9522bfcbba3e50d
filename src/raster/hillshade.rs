//! Shaded relief via the external hillshade tool.

use super::command::run_tool;
use super::ToolError;
use std::future::Future;
use std::path::Path;

/// Vertical scale factor (`-s`).
pub const VERTICAL_SCALE: u32 = 3;

/// Light azimuth in degrees (`-az`).
pub const LIGHT_AZIMUTH: u32 = 315;

/// Vertical exaggeration (`-z`).
pub const Z_FACTOR: u32 = 4;

/// Trait for the hillshade collaborator.
///
/// Derives a shaded-relief raster from a merged elevation raster using the
/// fixed illumination parameters above.
pub trait Hillshader: Send + Sync + 'static {
    /// Shades `input` into `output`.
    fn shade(
        &self,
        input: &Path,
        output: &Path,
    ) -> impl Future<Output = Result<(), ToolError>> + Send;
}

/// Production hillshade collaborator invoking `gdaldem` as a subprocess.
#[derive(Debug, Clone)]
pub struct GdalHillshader {
    program: String,
}

impl GdalHillshader {
    /// Creates a hillshader using `gdaldem` from `PATH`.
    pub fn new() -> Self {
        Self {
            program: "gdaldem".to_string(),
        }
    }

    /// Overrides the tool binary, e.g. an absolute path.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }
}

impl Default for GdalHillshader {
    fn default() -> Self {
        Self::new()
    }
}

impl Hillshader for GdalHillshader {
    async fn shade(&self, input: &Path, output: &Path) -> Result<(), ToolError> {
        let args = hillshade_args(input, output);
        run_tool(&self.program, &args).await
    }
}

/// Builds the hillshade tool argument list.
///
/// Contract: `hillshade -s 3 -az 315 -z 4 <input> <output>`.
fn hillshade_args(input: &Path, output: &Path) -> Vec<String> {
    vec![
        "hillshade".to_string(),
        "-s".to_string(),
        VERTICAL_SCALE.to_string(),
        "-az".to_string(),
        LIGHT_AZIMUTH.to_string(),
        "-z".to_string(),
        Z_FACTOR.to_string(),
        input.display().to_string(),
        output.display().to_string(),
    ]
}
