//! Error types for the WebTrack library.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while sampling elevation, analyzing tracks or
/// reading and writing WebTrack files.
#[derive(Error, Debug)]
pub enum WebTrackError {
    /// IO error when reading or writing files.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Tile byte length is not `2 * N * N` for a whole N >= 2.
    #[error("Invalid tile size: {size} bytes (expected 2*N*N for a square grid)")]
    InvalidTileSize { size: usize },

    /// A tile name could not be parsed.
    #[error("Invalid tile name: {name}")]
    InvalidTileName { name: String },

    /// No dataset with that name or wire code exists.
    #[error("Unknown elevation dataset: {name}")]
    UnknownDataset { name: String },

    /// A sample was requested outside of the tile it was sent to.
    #[error("Coordinates lat={lat}, lon={lon} are outside tile with origin ({origin_lat}, {origin_lon})")]
    CoordinateOutOfTile {
        lat: f64,
        lon: f64,
        origin_lat: i32,
        origin_lon: i32,
    },

    /// The dataset cannot be fetched automatically and the tile is not staged.
    #[error("Please download `{file_name}' to {} and retry.", dir.display())]
    ManualDatasetMissing { file_name: String, dir: PathBuf },

    /// The tile is not on disk and no provider is configured.
    #[error("Tile {file_name} is not cached locally and no tile provider is configured")]
    TileNotAvailable { file_name: String },

    /// The provider definitively does not have this tile.
    #[error("Tile not found on remote server: {file_name}")]
    TileNotFound { file_name: String },

    /// Network failure while fetching a tile.
    #[error("Failed to download {file_name}: {reason}")]
    DownloadFailed { file_name: String, reason: String },

    /// HTTP client error.
    #[cfg(feature = "download")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Zip archive could not be read.
    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    /// A payload needs raster conversion but no converter is configured.
    #[error("Tile {file_name} needs raster conversion but no converter is configured")]
    ConversionUnavailable { file_name: String },

    /// Elevation was required for a track point but could not be sampled.
    #[error("Missing elevation for point {point} of segment {segment}")]
    MissingElevation { segment: usize, point: usize },

    /// A value does not fit its field in the WebTrack layout.
    #[error("Cannot encode point {index}: {reason}")]
    EncodingOverflow { index: usize, reason: &'static str },

    /// A track or waypoint field does not fit the WebTrack layout.
    #[error("Cannot encode {field}: {value} is out of range")]
    ValueOutOfRange { field: &'static str, value: f64 },

    /// More segments or waypoints than the header count fields allow.
    #[error("Too many {what}: {count} (max {max})")]
    TooManyEntries {
        what: &'static str,
        count: usize,
        max: usize,
    },

    /// Waypoint text cannot be stored because it contains a line feed.
    #[error("Waypoint text must not contain line feeds: {text:?}")]
    InvalidText { text: String },

    /// Header format name or version is not the one this library reads.
    #[error("Unsupported format {name}:{version}")]
    UnsupportedFormat { name: String, version: String },

    /// The byte stream is truncated or structurally invalid.
    #[error("Malformed WebTrack data: {0}")]
    MalformedWebTrack(String),

    /// GPX document could not be read or written.
    #[cfg(feature = "gpx")]
    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
}

/// Result type alias using [`WebTrackError`].
pub type Result<T> = std::result::Result<T, WebTrackError>;
