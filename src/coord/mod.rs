//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (longitude/latitude)
//! and Web Mercator tile coordinates used by the elevation tile store, plus
//! buffer-box construction around a point for the point-radius entry point.

mod types;

pub use types::{CoordError, Extent, TileCoord, MAX_LAT, MAX_LNG, MAX_ZOOM, MIN_LAT, MIN_LNG, MIN_ZOOM};

use std::f64::consts::PI;

/// Kilometres per degree of latitude (constant on a spherical model).
const KM_PER_DEG_LAT: f64 = 110.574;

/// Kilometres per degree of longitude at the equator.
const KM_PER_DEG_LNG_EQUATOR: f64 = 111.320;

/// Converts a longitude to a fractional tile X coordinate at the given zoom.
#[inline]
pub fn lng_to_tile_x(lng: f64, zoom: u8) -> f64 {
    let n = 2.0_f64.powi(zoom as i32);
    (lng + 180.0) / 360.0 * n
}

/// Converts a latitude to a fractional tile Y coordinate at the given zoom.
///
/// Uses the Web Mercator projection; Y grows southward from the north edge.
#[inline]
pub fn lat_to_tile_y(lat: f64, zoom: u8) -> f64 {
    let n = 2.0_f64.powi(zoom as i32);
    let lat_rad = lat * PI / 180.0;
    (1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n
}

/// Builds a geographic box buffered `radius_km` in every direction from a
/// point.
///
/// The conversion from kilometres to degrees uses a spherical approximation:
/// one degree of latitude is treated as a constant distance, one degree of
/// longitude shrinks with the cosine of the latitude. The resulting box is
/// clamped to the supported longitude/latitude ranges.
///
/// # Errors
///
/// Returns [`CoordError`] if the point itself is non-finite or outside the
/// supported ranges.
pub fn buffer_around_point(lng: f64, lat: f64, radius_km: f64) -> Result<Extent, CoordError> {
    if !lng.is_finite() {
        return Err(CoordError::NonFinite(lng));
    }
    if !lat.is_finite() {
        return Err(CoordError::NonFinite(lat));
    }
    if !(MIN_LNG..=MAX_LNG).contains(&lng) {
        return Err(CoordError::LongitudeOutOfRange(lng));
    }
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::LatitudeOutOfRange(lat));
    }

    let d_lat = radius_km / KM_PER_DEG_LAT;
    let d_lng = radius_km / (KM_PER_DEG_LNG_EQUATOR * (lat * PI / 180.0).cos());

    Extent::new(
        (lng - d_lng).max(MIN_LNG),
        (lat - d_lat).max(MIN_LAT),
        (lng + d_lng).min(MAX_LNG),
        (lat + d_lat).min(MAX_LAT),
    )
}
