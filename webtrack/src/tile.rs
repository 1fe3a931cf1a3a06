//! Decoded elevation tiles.
//!
//! This module provides the [`ElevationTile`] struct: an immutable square grid
//! of big-endian signed 16-bit heights covering one 1° × 1° cell. The grid is
//! stored north to south, west to east, and its side length is derived from the
//! byte length, so SRTM1 (3601²), SRTM3 (1201²) and any other square grid work.

use std::fmt;
use std::fs::File;
use std::ops::Deref;
use std::path::Path;

use memmap2::Mmap;

use crate::error::{Result, WebTrackError};

/// Raw sample bytes, either owned or memory-mapped from the disk cache.
pub enum TileBytes {
    Owned(Vec<u8>),
    Mapped(Mmap),
}

impl TileBytes {
    /// Memory-map a file read-only.
    pub fn map<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;

        // SAFETY: Cache files are written once under a temporary name and
        // renamed into place, so a mapped file is never modified.
        let mmap = unsafe { Mmap::map(&file)? };
        Ok(TileBytes::Mapped(mmap))
    }
}

impl Deref for TileBytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        match self {
            TileBytes::Owned(bytes) => bytes,
            TileBytes::Mapped(mmap) => mmap,
        }
    }
}

impl fmt::Debug for TileBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match self {
            TileBytes::Owned(_) => "Owned",
            TileBytes::Mapped(_) => "Mapped",
        };
        write!(f, "{kind}({} bytes)", self.len())
    }
}

/// An immutable height grid for one 1° × 1° cell.
///
/// # Example
///
/// ```ignore
/// use webtrack::{sampler, ElevationTile};
///
/// let tile = ElevationTile::from_file("N45E006_SRTMGL1v3.hgt", 45, 6)?;
/// let elevation = sampler::sample(&tile, 45.5, 6.5)?;
/// ```
#[derive(Debug)]
pub struct ElevationTile {
    data: TileBytes,
    /// Number of samples per row/column
    side: usize,
    /// Southwest corner latitude (integer)
    origin_lat: i32,
    /// Southwest corner longitude (integer)
    origin_lon: i32,
}

impl ElevationTile {
    /// Build a tile from raw grid bytes.
    ///
    /// # Errors
    ///
    /// Returns [`WebTrackError::InvalidTileSize`] unless `bytes.len()` is
    /// `2 * N * N` for a whole `N >= 2`.
    pub fn from_bytes(bytes: Vec<u8>, origin_lat: i32, origin_lon: i32) -> Result<Self> {
        Self::from_tile_bytes(TileBytes::Owned(bytes), origin_lat, origin_lon)
    }

    /// Memory-map a tile from a cached `.hgt` file.
    pub fn from_file<P: AsRef<Path>>(path: P, origin_lat: i32, origin_lon: i32) -> Result<Self> {
        Self::from_tile_bytes(TileBytes::map(path)?, origin_lat, origin_lon)
    }

    /// Build a tile from bytes handed out by a [`DiskCache`](crate::disk::DiskCache).
    pub fn from_tile_bytes(data: TileBytes, origin_lat: i32, origin_lon: i32) -> Result<Self> {
        let size = data.len();
        let side = side_length(size).ok_or(WebTrackError::InvalidTileSize { size })?;

        Ok(Self {
            data,
            side,
            origin_lat,
            origin_lon,
        })
    }

    /// Returns the number of samples per row/column.
    pub fn side(&self) -> usize {
        self.side
    }

    /// Grid spacing in degrees.
    pub fn resolution(&self) -> f64 {
        1.0 / (self.side - 1) as f64
    }

    /// Returns the southwest corner as `(lat, lon)`.
    pub fn origin(&self) -> (i32, i32) {
        (self.origin_lat, self.origin_lon)
    }

    /// Whether `origin.lat <= lat < origin.lat + 1` and likewise for `lon`.
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        let olat = self.origin_lat as f64;
        let olon = self.origin_lon as f64;
        (olat..olat + 1.0).contains(&lat) && (olon..olon + 1.0).contains(&lon)
    }

    /// Grid cell containing the coordinates.
    ///
    /// Row 0 is the north edge.
    pub fn lat_lon_to_row_col(&self, lat: f64, lon: f64) -> Result<(usize, usize)> {
        if !self.contains(lat, lon) {
            return Err(WebTrackError::CoordinateOutOfTile {
                lat,
                lon,
                origin_lat: self.origin_lat,
                origin_lon: self.origin_lon,
            });
        }

        let cells = (self.side - 1) as f64;
        let row = ((self.origin_lat as f64 + 1.0 - lat) * cells).floor() as usize;
        let col = ((lon - self.origin_lon as f64) * cells).floor() as usize;

        Ok((row.min(self.side - 1), col.min(self.side - 1)))
    }

    /// Coordinates of the north-west corner of a grid cell.
    pub fn row_col_to_lat_lon(&self, row: usize, col: usize) -> (f64, f64) {
        let res = self.resolution();
        (
            self.origin_lat as f64 + 1.0 - row as f64 * res,
            self.origin_lon as f64 + col as f64 * res,
        )
    }

    /// Raw stored value at a grid position.
    ///
    /// # Panics
    ///
    /// Panics if `row` or `col` is not smaller than [`side`](Self::side).
    pub fn raw(&self, row: usize, col: usize) -> i16 {
        assert!(row < self.side && col < self.side, "grid index out of range");
        let offset = (row * self.side + col) * 2;
        i16::from_be_bytes([self.data[offset], self.data[offset + 1]])
    }
}

/// Side length of a square grid stored in `len` bytes, if there is one.
pub fn side_length(len: usize) -> Option<usize> {
    if len % 2 != 0 {
        return None;
    }
    let side = ((len / 2) as f64).sqrt().round() as usize;
    (side >= 2 && side * side * 2 == len).then_some(side)
}
