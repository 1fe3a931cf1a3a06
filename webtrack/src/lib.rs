//! # WebTrack
//!
//! Turn GPS tracks into compact binary WebTrack files, with terrain
//! elevation taken from 1° × 1° DEM tiles.
//!
//! ## Features
//!
//! - **Tile store**: locate, cache and memory-map `.hgt` tiles of the SRTM,
//!   ASTER and de Ferranti datasets, with optional Earthdata download
//! - **Track analysis**: lengths per activity, smoothed DEM elevation,
//!   altitude statistics and waypoint snapping
//! - **WebTrack codec**: the delta-compressed `webtrack-bin:2.0.0` format
//!
//! ## Quick Start
//!
//! ```ignore
//! use webtrack::{analyzer, codec, gpx, Dataset, Dem, TileStore};
//!
//! let store = TileStore::new(Dataset::SrtmGl1V3, "/data/srtm");
//! let parsed = gpx::read_gpx(std::fs::File::open("hike.gpx")?)?;
//!
//! let profile = analyzer::analyze(
//!     &parsed,
//!     Some(Dem::new(&store, store.dataset())),
//!     &Default::default(),
//! )?;
//! codec::write_file("hike.webtrack", &profile)?;
//! ```
//!
//! ## Tile Format
//!
//! Tiles are square grids of big-endian signed 16-bit heights, stored north
//! to south. Values outside `-500..=9000` m are treated as voids.
//!
//! ## Optional Features
//!
//! - `download`: fetch tiles from NASA Earthdata
//! - `gpx`: read GPX documents and embellish them with DEM elevations
//! - `geojson`: export profiles as GeoJSON

pub mod activity;
pub mod analyzer;
pub mod cache;
pub mod codec;
pub mod dataset;
pub mod disk;
pub mod error;
pub mod profile;
pub mod provider;
pub mod sampler;
pub mod store;
pub mod tile;
pub mod tilename;
pub mod track;

#[cfg(feature = "geojson")]
pub mod geojson;

#[cfg(feature = "gpx")]
pub mod gpx;

// Re-export main types at crate root for convenience
pub use activity::Activity;
pub use analyzer::{analyze, AnalyzerOptions, Dem, ElevationMode};
pub use cache::{CacheStats, EvictionPolicy, TileCache};
pub use dataset::Dataset;
pub use error::{Result, WebTrackError};
pub use profile::{AltitudeStats, Segment, TrackPoint, TrackProfile, Waypoint};
pub use sampler::ElevationSource;
pub use store::{TileStore, TileStoreBuilder};
pub use tile::ElevationTile;
pub use tilename::{tile_name, TileKey};
pub use track::{InputPoint, InputTrack, InputWaypoint, ParsedTrack};

#[cfg(feature = "download")]
pub use provider::{DownloadConfig, HttpTileProvider};
