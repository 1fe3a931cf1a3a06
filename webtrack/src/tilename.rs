//! Tile naming and cache keys.
//!
//! Every elevation tile covers one 1° × 1° cell and is named after its
//! **southwest corner**: `{N|S}{lat}{E|W}{lon}`
//!
//! - Latitude: 2 digits with N/S prefix (e.g., N35, S12)
//! - Longitude: 3 digits with E/W prefix (e.g., E138, W077)
//!
//! The same cell exists once per dataset, so the cache key pairs the name
//! with the dataset version and the on-disk file is `{name}_{version}.hgt`.

use std::fmt;

/// Compute the tile name containing the given coordinates.
///
/// Values on a boundary belong to the tile to their north/east.
///
/// # Examples
///
/// ```
/// use webtrack::tilename::tile_name;
///
/// assert_eq!(tile_name(1.5, 1.5), "N01E001");
/// assert_eq!(tile_name(1.5, -1.5), "N01W002");
/// assert_eq!(tile_name(-1.5, 1.5), "S02E001");
/// assert_eq!(tile_name(0.0, 0.0), "N00E000");
/// ```
pub fn tile_name(lat: f64, lon: f64) -> String {
    let lat_int = lat.floor() as i32;
    let lon_int = lon.floor() as i32;

    let lat_prefix = if lat >= 0.0 { 'N' } else { 'S' };
    let lon_prefix = if lon >= 0.0 { 'E' } else { 'W' };

    format!(
        "{}{:02}{}{:03}",
        lat_prefix,
        lat_int.abs(),
        lon_prefix,
        lon_int.abs()
    )
}

/// Parse a tile name to extract the southwest corner.
///
/// Accepts a bare name, a cache file name (`N35E138_SRTMGL1v3.hgt`) or a path
/// ending in either.
///
/// # Returns
///
/// The (latitude, longitude) of the southwest corner, or `None` if parsing fails.
///
/// # Examples
///
/// ```
/// use webtrack::tilename::parse_tile_name;
///
/// assert_eq!(parse_tile_name("N35E138"), Some((35, 138)));
/// assert_eq!(parse_tile_name("S12W077_SRTMGL1v3.hgt"), Some((-12, -77)));
/// assert_eq!(parse_tile_name("/cache/N00E000.hgt"), Some((0, 0)));
/// assert_eq!(parse_tile_name("invalid"), None);
/// ```
pub fn parse_tile_name(name: &str) -> Option<(i32, i32)> {
    let name = name.rsplit(['/', '\\']).next().unwrap_or(name);
    let name = name.get(..7)?;

    let bytes = name.as_bytes();
    let lat_sign = match bytes[0].to_ascii_uppercase() {
        b'N' => 1,
        b'S' => -1,
        _ => return None,
    };
    let lon_sign = match bytes[3].to_ascii_uppercase() {
        b'E' => 1,
        b'W' => -1,
        _ => return None,
    };
    if !bytes[1..3]
        .iter()
        .chain(&bytes[4..7])
        .all(u8::is_ascii_digit)
    {
        return None;
    }

    let lat: i32 = name[1..3].parse().ok()?;
    let lon: i32 = name[4..7].parse().ok()?;

    Some((lat * lat_sign, lon * lon_sign))
}

/// Identity of a tile within a dataset.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TileKey {
    name: String,
    version: String,
}

impl TileKey {
    /// Key of the tile containing `(lat, lon)` in dataset `version`.
    pub fn new(lat: f64, lon: f64, version: &str) -> Self {
        Self {
            name: tile_name(lat, lon),
            version: version.to_string(),
        }
    }

    /// Tile name, e.g. `N45E006`.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Dataset version, e.g. `SRTMGL1v3`.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Southwest corner of the tile.
    pub fn origin(&self) -> Option<(i32, i32)> {
        parse_tile_name(&self.name)
    }

    /// File name used by the local disk cache.
    pub fn file_name(&self) -> String {
        format!("{}_{}.hgt", self.name, self.version)
    }
}

impl fmt::Display for TileKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.name, self.version)
    }
}
