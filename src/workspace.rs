//! Per-run ephemeral workspace.
//!
//! Every pipeline run owns one workspace directory, namespaced by a UUID so
//! concurrent runs requesting overlapping tiles never write the same path.
//! The workspace holds downloaded tiles and intermediate rasters and is
//! removed (best-effort) when the run ends, on every exit path: [`cleanup`]
//! covers normal and error returns, and a `Drop` backstop covers a run
//! future dropped mid-stage.
//!
//! [`cleanup`]: Workspace::cleanup

use crate::coord::TileCoord;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// An isolated directory holding one run's intermediate artifacts.
pub struct Workspace {
    run_id: Uuid,
    dir: PathBuf,
    cleaned: bool,
}

impl Workspace {
    /// Creates a fresh workspace directory under `root`.
    ///
    /// The directory name embeds a freshly generated UUID, so collisions
    /// between concurrent runs are not a practical concern.
    pub async fn create(root: &Path) -> std::io::Result<Self> {
        let run_id = Uuid::new_v4();
        let dir = root.join(format!("relief-{}", run_id));
        tokio::fs::create_dir_all(&dir).await?;
        debug!(run_id = %run_id, dir = %dir.display(), "workspace created");

        Ok(Self {
            run_id,
            dir,
            cleaned: false,
        })
    }

    /// Returns the run identifier this workspace belongs to.
    #[inline]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the workspace directory.
    #[inline]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the local path a downloaded tile is written to.
    pub fn tile_path(&self, tile: TileCoord) -> PathBuf {
        self.dir
            .join(format!("{}_{}_{}.tif", tile.zoom, tile.x, tile.y))
    }

    /// Path of the merged (and, in the extent entry point, clipped) raster.
    pub fn merged_path(&self) -> PathBuf {
        self.dir.join("merged.tif")
    }

    /// Path of the separately clipped raster (point-radius entry point only).
    pub fn clipped_path(&self) -> PathBuf {
        self.dir.join("clipped.tif")
    }

    /// Path of the shaded-relief raster.
    pub fn shaded_path(&self) -> PathBuf {
        self.dir.join("shaded.tif")
    }

    /// Removes every artifact in the workspace, then the directory itself.
    ///
    /// Deletion is advisory: per-file failures are logged and swallowed, and
    /// never change the run's reported outcome. Listing the directory rather
    /// than replaying a recorded path list also sweeps up files written by
    /// fetches that were still in flight when the run failed. Calling this
    /// more than once is a no-op.
    pub async fn cleanup(&mut self) {
        if self.cleaned {
            return;
        }
        self.cleaned = true;

        match tokio::fs::read_dir(&self.dir).await {
            Ok(mut entries) => loop {
                match entries.next_entry().await {
                    Ok(Some(entry)) => {
                        let path = entry.path();
                        if let Err(e) = tokio::fs::remove_file(&path).await {
                            warn!(path = %path.display(), error = %e, "failed to remove artifact");
                        }
                    }
                    Ok(None) => break,
                    Err(e) => {
                        warn!(dir = %self.dir.display(), error = %e, "failed to list workspace");
                        break;
                    }
                }
            },
            Err(e) => {
                warn!(dir = %self.dir.display(), error = %e, "failed to open workspace for cleanup");
            }
        }

        if let Err(e) = tokio::fs::remove_dir(&self.dir).await {
            warn!(dir = %self.dir.display(), error = %e, "failed to remove workspace directory");
        }

        debug!(run_id = %self.run_id, "workspace cleaned");
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        // Backstop for cancelled runs whose future was dropped before
        // cleanup() could be awaited.
        if !self.cleaned {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_create_makes_unique_directories() {
        let root = TempDir::new().unwrap();

        let a = Workspace::create(root.path()).await.unwrap();
        let b = Workspace::create(root.path()).await.unwrap();

        assert_ne!(a.run_id(), b.run_id());
        assert_ne!(a.dir(), b.dir());
        assert!(a.dir().is_dir());
        assert!(b.dir().is_dir());
    }

    #[tokio::test]
    async fn test_tile_path_naming() {
        let root = TempDir::new().unwrap();
        let ws = Workspace::create(root.path()).await.unwrap();

        let tile = TileCoord {
            zoom: 5,
            x: 15,
            y: 10,
        };
        let path = ws.tile_path(tile);

        assert_eq!(path.file_name().unwrap(), "5_15_10.tif");
        assert!(path.starts_with(ws.dir()));
    }

    #[tokio::test]
    async fn test_cleanup_removes_artifacts_and_directory() {
        let root = TempDir::new().unwrap();
        let mut ws = Workspace::create(root.path()).await.unwrap();

        tokio::fs::write(ws.merged_path(), b"raster").await.unwrap();
        tokio::fs::write(ws.shaded_path(), b"raster").await.unwrap();
        let dir = ws.dir().to_path_buf();

        ws.cleanup().await;

        assert!(!dir.exists());
        // Root itself must survive; only the run directory goes away.
        assert!(root.path().is_dir());
    }

    #[tokio::test]
    async fn test_cleanup_is_idempotent() {
        let root = TempDir::new().unwrap();
        let mut ws = Workspace::create(root.path()).await.unwrap();

        ws.cleanup().await;
        ws.cleanup().await;

        assert!(!ws.dir().exists());
    }

    #[tokio::test]
    async fn test_drop_backstop_removes_directory() {
        let root = TempDir::new().unwrap();
        let dir;
        {
            let ws = Workspace::create(root.path()).await.unwrap();
            tokio::fs::write(ws.merged_path(), b"raster").await.unwrap();
            dir = ws.dir().to_path_buf();
        }
        assert!(!dir.exists());
    }
}
