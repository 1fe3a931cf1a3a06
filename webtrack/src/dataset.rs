//! Catalog of the supported DEM datasets.
//!
//! Each dataset has a one-letter code written into WebTrack files so that a
//! reader knows where elevations came from. `F` is reserved for "no
//! elevation" and never names a dataset.

use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WebTrackError};

/// Wire code for segments and waypoints without elevation.
pub const NO_ELEVATION_CODE: u8 = b'F';

/// Encoding of a tile payload as delivered by a remote server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RasterFormat {
    /// Raw big-endian signed 16-bit grid, usable as is.
    Hgt,
    /// GeoTIFF that must be converted to a raw grid first.
    GeoTiff,
}

/// A DEM dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dataset {
    /// NASA SRTM Global 1 arc second, version 3.
    SrtmGl1V3,
    /// ASTER Global DEM, version 3.
    AstGtmV3,
    /// Jonathan de Ferranti 1 arc second, staged by hand.
    JdF1,
    /// Jonathan de Ferranti 3 arc second, staged by hand.
    JdF3,
}

impl Dataset {
    /// All datasets in catalog order.
    pub const ALL: [Dataset; 4] = [
        Dataset::SrtmGl1V3,
        Dataset::AstGtmV3,
        Dataset::JdF1,
        Dataset::JdF3,
    ];

    /// Version string used in tile keys and cache file names.
    pub fn name(&self) -> &'static str {
        match self {
            Dataset::SrtmGl1V3 => "SRTMGL1v3",
            Dataset::AstGtmV3 => "ASTGTMv3",
            Dataset::JdF1 => "JdF1",
            Dataset::JdF3 => "JdF3",
        }
    }

    /// Elevation-source byte written into WebTrack files.
    pub fn code(&self) -> u8 {
        match self {
            Dataset::SrtmGl1V3 => b'E',
            Dataset::AstGtmV3 => b'G',
            Dataset::JdF1 => b'J',
            Dataset::JdF3 => b'K',
        }
    }

    /// Whether tiles can be fetched from Earthdata with user credentials.
    ///
    /// Datasets returning `false` must be placed in the cache directory by hand.
    pub fn requires_credentials(&self) -> bool {
        matches!(self, Dataset::SrtmGl1V3 | Dataset::AstGtmV3)
    }

    /// Format of the payload inside the remote archive.
    pub fn raster_format(&self) -> RasterFormat {
        match self {
            Dataset::AstGtmV3 => RasterFormat::GeoTiff,
            _ => RasterFormat::Hgt,
        }
    }

    /// Download URL for a tile, if the dataset is served remotely.
    pub fn url(&self, tile_name: &str) -> Option<String> {
        match self {
            Dataset::SrtmGl1V3 => Some(format!(
                "https://e4ftl01.cr.usgs.gov/MEASURES/SRTMGL1.003/2000.02.11/{tile_name}.SRTMGL1.hgt.zip"
            )),
            Dataset::AstGtmV3 => Some(format!(
                "https://e4ftl01.cr.usgs.gov/ASTT/ASTGTM.003/2000.03.01/ASTGTMV003_{tile_name}.zip"
            )),
            Dataset::JdF1 | Dataset::JdF3 => None,
        }
    }

    /// Look a dataset up by its wire code.
    pub fn from_code(code: u8) -> Option<Dataset> {
        Self::ALL.into_iter().find(|d| d.code() == code)
    }
}

impl fmt::Display for Dataset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Dataset {
    type Err = WebTrackError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|d| d.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| WebTrackError::UnknownDataset {
                name: s.to_string(),
            })
    }
}
