//! In-memory raster encoding.
//!
//! Loads the shaded-relief raster from the workspace and re-encodes it to
//! the requested output format entirely in memory. Encoding is CPU-bound, so
//! it runs on the blocking pool rather than the async runtime.

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use thiserror::Error;
use tracing::debug;

/// Supported output image formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// JPEG (the default)
    #[default]
    Jpeg,
    /// TIFF
    Tiff,
    /// PNG
    Png,
}

impl OutputFormat {
    /// Returns the canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Jpeg => "jpeg",
            OutputFormat::Tiff => "tiff",
            OutputFormat::Png => "png",
        }
    }

    fn image_format(&self) -> image::ImageFormat {
        match self {
            OutputFormat::Jpeg => image::ImageFormat::Jpeg,
            OutputFormat::Tiff => image::ImageFormat::Tiff,
            OutputFormat::Png => image::ImageFormat::Png,
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error parsing an output format name.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid format '{0}': choose one of jpeg, tiff, png")]
pub struct ParseFormatError(pub String);

impl FromStr for OutputFormat {
    type Err = ParseFormatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "jpeg" => Ok(OutputFormat::Jpeg),
            "tiff" => Ok(OutputFormat::Tiff),
            "png" => Ok(OutputFormat::Png),
            other => Err(ParseFormatError(other.to_string())),
        }
    }
}

/// Errors from raster encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    /// The raster file could not be read or decoded
    #[error("failed to load raster {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Re-encoding to the target format failed
    #[error("failed to encode image: {0}")]
    Encode(#[source] image::ImageError),

    /// The blocking encode task terminated abnormally
    #[error("encode task failed: {0}")]
    Task(String),
}

/// Loads the raster at `path` and re-encodes it to `format`.
///
/// # Returns
///
/// The encoded bytes. Unreadable or corrupt input yields
/// [`EncodeError::Load`].
pub async fn encode_raster(path: &Path, format: OutputFormat) -> Result<Vec<u8>, EncodeError> {
    let path = path.to_path_buf();

    let buffer = tokio::task::spawn_blocking(move || {
        let img = image::open(&path).map_err(|source| EncodeError::Load {
            path: path.clone(),
            source,
        })?;

        // JPEG cannot represent every decoded layout (notably 16-bit
        // grayscale elevation output); normalize to 8-bit RGB for it.
        let img = match format {
            OutputFormat::Jpeg => image::DynamicImage::ImageRgb8(img.to_rgb8()),
            OutputFormat::Tiff | OutputFormat::Png => img,
        };

        let mut cursor = Cursor::new(Vec::new());
        img.write_to(&mut cursor, format.image_format())
            .map_err(EncodeError::Encode)?;
        Ok(cursor.into_inner())
    })
    .await
    .map_err(|e| EncodeError::Task(e.to_string()))??;

    debug!(format = %format, bytes = buffer.len(), "raster encoded");
    Ok(buffer)
}
