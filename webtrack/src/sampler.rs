//! Height sampling on elevation tiles.
//!
//! Samples outside `-500..=9000` m are voids or fill values (-32768, -9999)
//! and are reported as `None`. Elevation is frequently missing near tile
//! seams and over water, so this is not an error.

use crate::error::Result;
use crate::tile::ElevationTile;

/// Lowest height accepted as real data.
pub const MIN_ELEVATION: i16 = -500;

/// Highest height accepted as real data.
pub const MAX_ELEVATION: i16 = 9000;

/// Meters per degree of latitude.
pub const ONE_DEGREE: f64 = 1000.0 * 10000.8 / 90.0;

/// Anything that can tell the terrain height at a coordinate.
pub trait ElevationSource {
    /// Height in meters, or `None` where the source has no data.
    fn elevation(&self, lat: f64, lon: f64) -> Result<Option<f64>>;
}

impl<F> ElevationSource for F
where
    F: Fn(f64, f64) -> Result<Option<f64>>,
{
    fn elevation(&self, lat: f64, lon: f64) -> Result<Option<f64>> {
        self(lat, lon)
    }
}

/// Whether a stored value is a real height.
pub fn is_valid(value: i16) -> bool {
    (MIN_ELEVATION..=MAX_ELEVATION).contains(&value)
}

/// Height of the grid cell containing `(lat, lon)`.
///
/// # Errors
///
/// Returns [`CoordinateOutOfTile`](crate::WebTrackError::CoordinateOutOfTile)
/// if the coordinates are not inside `tile`.
pub fn sample(tile: &ElevationTile, lat: f64, lon: f64) -> Result<Option<i16>> {
    let (row, col) = tile.lat_lon_to_row_col(lat, lon)?;
    let value = tile.raw(row, col);
    Ok(is_valid(value).then_some(value))
}

/// Weighted average of the four grid neighbours at ±`resolution` degrees.
///
/// `sample_at` resolves any coordinate, since neighbours may lie in adjacent
/// tiles. A missing neighbour is replaced by the direct sample; when that is
/// missing too the result is `None`. Weights are `resolution * ONE_DEGREE -
/// distance`, normalised.
pub fn approximate<F>(lat: f64, lon: f64, resolution: f64, mut sample_at: F) -> Result<Option<f64>>
where
    F: FnMut(f64, f64) -> Result<Option<i16>>,
{
    let direct = sample_at(lat, lon)?;
    let max_distance = resolution * ONE_DEGREE;

    let neighbours = [
        (lat + resolution, lon),
        (lat - resolution, lon),
        (lat, lon + resolution),
        (lat, lon - resolution),
    ];

    let mut weighted = 0.0;
    let mut total_weight = 0.0;
    for (nlat, nlon) in neighbours {
        let Some(value) = sample_at(nlat, nlon)?.or(direct) else {
            return Ok(None);
        };
        let weight = (max_distance - local_distance(lat, lon, nlat, nlon)).max(0.0);
        weighted += weight * value as f64;
        total_weight += weight;
    }

    if total_weight <= 0.0 {
        return Ok(direct.map(f64::from));
    }
    Ok(Some(weighted / total_weight))
}

/// Flat-earth distance in meters, good enough across a few grid cells.
pub fn local_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let coef = lat1.to_radians().cos();
    let x = lat1 - lat2;
    let y = (lon1 - lon2) * coef;
    (x * x + y * y).sqrt() * ONE_DEGREE
}
