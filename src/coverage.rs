//! Tile coverage computation.
//!
//! Computes the set of slippy-map tiles at a single zoom level whose
//! footprint intersects a geographic extent. The pipeline treats the result
//! as the run's download work list, so the policy limits live here too: a
//! collapsed extent covers nothing and is rejected, and an extent needing
//! more than [`MAX_TILES`] tiles is too large to composite in one run.

use crate::coord::{lat_to_tile_y, lng_to_tile_x, Extent, TileCoord};
use std::collections::BTreeSet;
use thiserror::Error;

/// Maximum number of tiles a single run may cover.
pub const MAX_TILES: usize = 50;

/// Errors from coverage computation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoverageError {
    /// The extent collapses to a point or line and covers no tiles
    #[error("the provided extent covers no tiles")]
    DegenerateExtent,

    /// More than [`MAX_TILES`] tiles would be needed
    #[error("too many tiles ({count}) needed to cover this area; choose a smaller extent or a lower zoom")]
    AreaTooLarge { count: usize },
}

/// Computes the tiles at `zoom` covering `extent`.
///
/// The extent is treated as a closed rectangle; every tile whose footprint
/// intersects it is included. A max edge landing exactly on a tile boundary
/// does not pull in the tile beyond it. The result is duplicate-free and
/// deterministic for a given extent and zoom.
///
/// `zoom` is expected to be within [`crate::coord::MAX_ZOOM`]; the
/// orchestrator validates it before computing coverage.
///
/// # Errors
///
/// [`CoverageError::DegenerateExtent`] if the extent has no area, or
/// [`CoverageError::AreaTooLarge`] if the covering set would exceed
/// [`MAX_TILES`].
pub fn tiles_covering(extent: &Extent, zoom: u8) -> Result<BTreeSet<TileCoord>, CoverageError> {
    if extent.max_lng <= extent.min_lng || extent.max_lat <= extent.min_lat {
        return Err(CoverageError::DegenerateExtent);
    }

    let n = 1u32 << zoom;

    let x_min = floor_index(lng_to_tile_x(extent.min_lng, zoom), n);
    let x_max = last_index(lng_to_tile_x(extent.max_lng, zoom), n);
    // Y grows southward, so the north edge gives the smallest index.
    let y_min = floor_index(lat_to_tile_y(extent.max_lat, zoom), n);
    let y_max = last_index(lat_to_tile_y(extent.min_lat, zoom), n);

    let count = (x_max - x_min + 1) as usize * (y_max - y_min + 1) as usize;
    if count > MAX_TILES {
        return Err(CoverageError::AreaTooLarge { count });
    }

    let mut tiles = BTreeSet::new();
    for x in x_min..=x_max {
        for y in y_min..=y_max {
            tiles.insert(TileCoord { zoom, x, y });
        }
    }

    Ok(tiles)
}

/// Index of the tile containing a fractional grid coordinate.
fn floor_index(value: f64, n: u32) -> u32 {
    (value.floor() as i64).clamp(0, n as i64 - 1) as u32
}

/// Index of the last tile touched by a max edge.
///
/// An edge sitting exactly on a tile boundary belongs to the tile before it.
fn last_index(value: f64, n: u32) -> u32 {
    let index = if value.fract() == 0.0 {
        value as i64 - 1
    } else {
        value.floor() as i64
    };
    index.clamp(0, n as i64 - 1) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extent(min_lng: f64, min_lat: f64, max_lng: f64, max_lat: f64) -> Extent {
        Extent::new(min_lng, min_lat, max_lng, max_lat).unwrap()
    }

    #[test]
    fn test_single_tile_cover() {
        let tiles = tiles_covering(&extent(-1.0, 50.0, 0.0, 51.0), 5).unwrap();

        let expected: BTreeSet<_> = [TileCoord {
            zoom: 5,
            x: 15,
            y: 10,
        }]
        .into_iter()
        .collect();
        assert_eq!(tiles, expected);
    }

    #[test]
    fn test_multi_tile_cover_set_equality() {
        let tiles = tiles_covering(&extent(-1.0, 48.0, 2.0, 51.0), 5).unwrap();

        let expected: BTreeSet<_> = [
            TileCoord { zoom: 5, x: 15, y: 10 },
            TileCoord { zoom: 5, x: 15, y: 11 },
            TileCoord { zoom: 5, x: 16, y: 10 },
            TileCoord { zoom: 5, x: 16, y: 11 },
        ]
        .into_iter()
        .collect();
        assert_eq!(tiles, expected);
    }

    #[test]
    fn test_cover_is_deterministic() {
        let e = extent(-10.0, 40.0, 10.0, 55.0);
        let first = tiles_covering(&e, 4).unwrap();
        let second = tiles_covering(&e, 4).unwrap();
        assert_eq!(first, second);
        assert!(!first.is_empty());
    }

    #[test]
    fn test_boundary_edges_do_not_leak_into_next_tile() {
        // Both max edges sit exactly on tile boundaries at zoom 1; the
        // cover must stay a single tile.
        let tiles = tiles_covering(&extent(-180.0, 0.0, 0.0, 85.0), 1).unwrap();

        let expected: BTreeSet<_> = [TileCoord { zoom: 1, x: 0, y: 0 }].into_iter().collect();
        assert_eq!(tiles, expected);
    }

    #[test]
    fn test_world_extent_at_zoom_zero_is_one_tile() {
        let tiles = tiles_covering(&extent(-180.0, -85.0, 180.0, 85.0), 0).unwrap();
        assert_eq!(tiles.len(), 1);
    }

    #[test]
    fn test_point_extent_is_degenerate() {
        let result = tiles_covering(&extent(9.0, 45.0, 9.0, 45.0), 8);
        assert_eq!(result, Err(CoverageError::DegenerateExtent));
    }

    #[test]
    fn test_inverted_extent_is_degenerate() {
        let result = tiles_covering(&extent(10.0, 45.0, 9.0, 46.0), 8);
        assert_eq!(result, Err(CoverageError::DegenerateExtent));
    }

    #[test]
    fn test_world_extent_at_zoom_ten_is_too_large() {
        let result = tiles_covering(&extent(-180.0, -85.0, 180.0, 85.0), 10);
        assert!(matches!(result, Err(CoverageError::AreaTooLarge { count }) if count > MAX_TILES));
    }

    #[test]
    fn test_all_tiles_share_requested_zoom() {
        let tiles = tiles_covering(&extent(-10.0, 40.0, 10.0, 55.0), 4).unwrap();
        assert!(tiles.iter().all(|t| t.zoom == 4));
    }
}
