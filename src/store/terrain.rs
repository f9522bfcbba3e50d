//! Production tile store over HTTPS.

use super::{StoreError, TileStore};
use crate::coord::TileCoord;
use futures::StreamExt;
use std::path::Path;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, trace, warn};

/// Default endpoint serving worldwide elevation rasters as GeoTIFF tiles.
pub const DEFAULT_TILE_ENDPOINT: &str = "https://s3.amazonaws.com/elevation-tiles-prod/geotiff";

/// Default request timeout for tile downloads.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Elevation tile store backed by an HTTPS endpoint.
///
/// Tiles are addressed as `{endpoint}/{zoom}/{x}/{y}.tif` and streamed
/// directly to their workspace destination rather than buffered in memory.
#[derive(Clone)]
pub struct TerrainTileStore {
    client: reqwest::Client,
    endpoint: String,
}

impl TerrainTileStore {
    /// Creates a store against the default elevation tile endpoint.
    pub fn new() -> Result<Self, StoreError> {
        Self::with_endpoint(DEFAULT_TILE_ENDPOINT)
    }

    /// Creates a store against a custom endpoint.
    ///
    /// Useful for pointing at a mirror or a local fixture server in tests.
    pub fn with_endpoint(endpoint: impl Into<String>) -> Result<Self, StoreError> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .pool_max_idle_per_host(16)
            .tcp_keepalive(Duration::from_secs(30))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| StoreError::Request(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }

    /// Returns the URL for a tile.
    pub fn tile_url(&self, tile: TileCoord) -> String {
        format!("{}/{}/{}/{}.tif", self.endpoint, tile.zoom, tile.x, tile.y)
    }
}

impl TileStore for TerrainTileStore {
    async fn fetch_tile(&self, tile: TileCoord, dest: &Path) -> Result<(), StoreError> {
        let url = self.tile_url(tile);
        trace!(url = %url, "tile request starting");

        let response = self
            .client
            .get(url.as_str())
            .send()
            .await
            .map_err(|e| StoreError::Request(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            warn!(url = %url, status = response.status().as_u16(), "tile request failed");
            return Err(StoreError::Status {
                status: response.status().as_u16(),
                url,
            });
        }

        let mut file = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut written = 0usize;

        while let Some(chunk) = stream.next().await {
            let chunk =
                chunk.map_err(|e| StoreError::Request(format!("failed to read response: {}", e)))?;
            file.write_all(&chunk).await?;
            written += chunk.len();
        }
        file.flush().await?;

        debug!(tile = %tile, bytes = written, "tile downloaded");
        Ok(())
    }

    fn name(&self) -> &str {
        "terrain-geotiff"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tile_url_layout() {
        let store = TerrainTileStore::new().unwrap();
        let tile = TileCoord {
            zoom: 5,
            x: 15,
            y: 10,
        };
        assert_eq!(
            store.tile_url(tile),
            "https://s3.amazonaws.com/elevation-tiles-prod/geotiff/5/15/10.tif"
        );
    }

    #[test]
    fn test_custom_endpoint() {
        let store = TerrainTileStore::with_endpoint("http://localhost:9000/tiles").unwrap();
        let tile = TileCoord { zoom: 0, x: 0, y: 0 };
        assert_eq!(store.tile_url(tile), "http://localhost:9000/tiles/0/0/0.tif");
    }
}
