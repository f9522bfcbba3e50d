//! Tile fetch stage.
//!
//! Downloads every tile in a run's coverage set into the run's workspace.
//! At most [`MAX_CONCURRENT_FETCHES`] transfers run simultaneously; the
//! remaining tiles queue behind the active window. The first failed fetch
//! decides the stage outcome. Transfers already in flight are not actively
//! cancelled; whatever they write lands inside the workspace, where cleanup
//! sweeps it up.

mod limiter;

pub use limiter::{FetchLimiter, FetchPermit};

use crate::coord::TileCoord;
use crate::store::{StoreError, TileStore};
use crate::workspace::Workspace;
use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

/// Upper bound on simultaneous tile transfers.
pub const MAX_CONCURRENT_FETCHES: usize = 10;

/// Errors from the fetch stage.
#[derive(Debug, Error)]
pub enum FetchError {
    /// A tile download failed; first failure decides the stage
    #[error("tile {tile} fetch failed: {source}")]
    Tile {
        tile: TileCoord,
        #[source]
        source: StoreError,
    },

    /// The run was cancelled while fetches were queued or in flight
    #[error("fetch cancelled")]
    Cancelled,

    /// A download task terminated abnormally
    #[error("fetch task failed: {0}")]
    Task(String),
}

/// Downloads all tiles into the workspace with bounded concurrency.
///
/// # Arguments
///
/// * `store` - Remote tile store
/// * `tiles` - The run's coverage set (distinct by construction)
/// * `workspace` - Destination for the downloaded rasters
/// * `max_concurrent` - Transfer window size
/// * `cancel` - Cancellation signal for the run
///
/// # Returns
///
/// Mapping from each tile to its local path. On the first failure the stage
/// returns that error; transfers still in flight are left to finish on their
/// own and their output is removed by workspace cleanup.
#[instrument(skip(store, tiles, workspace, cancel), fields(run_id = %workspace.run_id(), tiles = tiles.len()))]
pub async fn fetch_tiles<S: TileStore>(
    store: Arc<S>,
    tiles: &BTreeSet<TileCoord>,
    workspace: &Workspace,
    max_concurrent: usize,
    cancel: &CancellationToken,
) -> Result<BTreeMap<TileCoord, PathBuf>, FetchError> {
    let limiter = Arc::new(FetchLimiter::new(max_concurrent));
    let mut downloads = JoinSet::new();

    for &tile in tiles {
        let store = Arc::clone(&store);
        let limiter = Arc::clone(&limiter);
        let cancel = cancel.clone();
        let dest = workspace.tile_path(tile);

        downloads.spawn(async move {
            let _permit = limiter.acquire().await;
            if cancel.is_cancelled() {
                return Err(FetchError::Cancelled);
            }

            store
                .fetch_tile(tile, &dest)
                .await
                .map(|()| (tile, dest))
                .map_err(|source| FetchError::Tile { tile, source })
        });
    }

    let mut fetched = BTreeMap::new();
    while let Some(joined) = downloads.join_next().await {
        match joined {
            Ok(Ok((tile, path))) => {
                fetched.insert(tile, path);
            }
            Ok(Err(err)) => {
                warn!(error = %err, "tile fetch failed, aborting stage");
                // In-flight transfers continue on their own; their files stay
                // inside the workspace for cleanup.
                downloads.detach_all();
                return Err(err);
            }
            Err(join_err) => {
                warn!(error = %join_err, "fetch task terminated abnormally");
                downloads.detach_all();
                return Err(FetchError::Task(join_err.to_string()));
            }
        }
    }

    debug!(fetched = fetched.len(), "fetch stage complete");
    Ok(fetched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tempfile::TempDir;

    /// Mock store writing canned bytes, with optional per-tile failures and
    /// a gauge tracking concurrent fetches.
    struct MockStore {
        payload: Vec<u8>,
        fail_for: Option<TileCoord>,
        delay: Option<Duration>,
        active: AtomicUsize,
        peak_active: AtomicUsize,
        calls: AtomicUsize,
    }

    impl MockStore {
        fn succeeding(payload: Vec<u8>) -> Self {
            Self {
                payload,
                fail_for: None,
                delay: None,
                active: AtomicUsize::new(0),
                peak_active: AtomicUsize::new(0),
                calls: AtomicUsize::new(0),
            }
        }

        fn failing_for(tile: TileCoord) -> Self {
            Self {
                fail_for: Some(tile),
                ..Self::succeeding(b"raster".to_vec())
            }
        }

        fn slow(payload: Vec<u8>, delay: Duration) -> Self {
            Self {
                delay: Some(delay),
                ..Self::succeeding(payload)
            }
        }
    }

    impl TileStore for MockStore {
        async fn fetch_tile(&self, tile: TileCoord, dest: &Path) -> Result<(), StoreError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak_active.fetch_max(active, Ordering::SeqCst);

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }

            let result = if self.fail_for == Some(tile) {
                Err(StoreError::Status {
                    status: 404,
                    url: format!("mock://{}", tile),
                })
            } else {
                std::fs::write(dest, &self.payload).map_err(StoreError::Io)
            };

            self.active.fetch_sub(1, Ordering::SeqCst);
            result
        }

        fn name(&self) -> &str {
            "mock"
        }
    }

    fn tile_set(zoom: u8, count: u32) -> BTreeSet<TileCoord> {
        (0..count).map(|x| TileCoord { zoom, x, y: 0 }).collect()
    }

    #[tokio::test]
    async fn test_fetch_all_tiles_success() {
        let root = TempDir::new().unwrap();
        let ws = Workspace::create(root.path()).await.unwrap();
        let store = Arc::new(MockStore::succeeding(b"elevation".to_vec()));
        let tiles = tile_set(3, 4);

        let fetched = fetch_tiles(
            Arc::clone(&store),
            &tiles,
            &ws,
            MAX_CONCURRENT_FETCHES,
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(fetched.len(), 4);
        for (tile, path) in &fetched {
            assert_eq!(*path, ws.tile_path(*tile));
            assert_eq!(std::fs::read(path).unwrap(), b"elevation");
        }
        assert_eq!(store.calls.load(Ordering::SeqCst), 4);
    }

    #[tokio::test]
    async fn test_first_failure_decides_the_stage() {
        let root = TempDir::new().unwrap();
        let ws = Workspace::create(root.path()).await.unwrap();
        let bad = TileCoord { zoom: 3, x: 2, y: 0 };
        let store = Arc::new(MockStore::failing_for(bad));
        let tiles = tile_set(3, 5);

        let result = fetch_tiles(
            store,
            &tiles,
            &ws,
            MAX_CONCURRENT_FETCHES,
            &CancellationToken::new(),
        )
        .await;

        match result {
            Err(FetchError::Tile { tile, source }) => {
                assert_eq!(tile, bad);
                assert!(matches!(source, StoreError::Status { status: 404, .. }));
            }
            other => panic!("expected tile failure, got {:?}", other.map(|m| m.len())),
        }
    }

    #[tokio::test]
    async fn test_transfer_window_is_bounded() {
        let root = TempDir::new().unwrap();
        let ws = Workspace::create(root.path()).await.unwrap();
        let store = Arc::new(MockStore::slow(
            b"elevation".to_vec(),
            Duration::from_millis(10),
        ));
        let tiles = tile_set(5, 30);

        fetch_tiles(Arc::clone(&store), &tiles, &ws, 10, &CancellationToken::new())
            .await
            .unwrap();

        assert!(store.peak_active.load(Ordering::SeqCst) <= 10);
    }

    #[tokio::test]
    async fn test_cancelled_token_stops_queued_fetches() {
        let root = TempDir::new().unwrap();
        let ws = Workspace::create(root.path()).await.unwrap();
        let store = Arc::new(MockStore::succeeding(b"elevation".to_vec()));
        let tiles = tile_set(3, 3);

        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = fetch_tiles(store, &tiles, &ws, MAX_CONCURRENT_FETCHES, &cancel).await;
        assert!(matches!(result, Err(FetchError::Cancelled)));
    }
}
