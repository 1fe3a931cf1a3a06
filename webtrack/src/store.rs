//! Tile resolution with shared caching.
//!
//! This module provides [`TileStore`], which maps a coordinate to the
//! elevation tile of one dataset. Tiles are looked up in order:
//!
//! 1. the shared [`TileCache`],
//! 2. the local [`DiskCache`],
//! 3. the configured [`TileProvider`] (GeoTIFF payloads are converted by the
//!    [`RasterConverter`]); the result is written to the disk cache.
//!
//! Datasets that cannot be downloaded fail with
//! [`WebTrackError::ManualDatasetMissing`] naming the file to stage.
//!
//! ```ignore
//! use webtrack::{Dataset, EvictionPolicy, TileCache, TileStore};
//! use webtrack::provider::DownloadConfig;
//!
//! let cache = TileCache::shared(EvictionPolicy::KeepAll);
//! let store = TileStore::builder(Dataset::SrtmGl1V3)
//!     .cache(cache.clone())
//!     .cache_dir("/data/srtm")
//!     .auto_download(DownloadConfig::earthdata("user", "password"))
//!     .build()?;
//!
//! let elevation = store.get_elevation(45.83, 6.86)?;
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info};

use crate::cache::{CacheStats, EvictionPolicy, TileCache};
use crate::dataset::{Dataset, RasterFormat};
use crate::disk::{DirectoryCache, DiskCache};
use crate::error::{Result, WebTrackError};
use crate::provider::{RasterConverter, TileProvider};
use crate::sampler::{self, ElevationSource};
use crate::tile::{self, ElevationTile};
use crate::tilename::TileKey;

#[cfg(feature = "download")]
use crate::provider::{DownloadConfig, HttpTileProvider};

/// Environment variable overriding the cache directory.
pub const CACHE_DIR_ENV: &str = "WEBTRACK_CACHE_DIR";

/// Default cache directory: `$HOME/.cache/srtm`.
pub fn default_cache_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .unwrap_or_default()
        .join(".cache")
        .join("srtm")
}

/// Elevation lookups against one dataset.
///
/// # Example
///
/// ```ignore
/// use webtrack::{Dataset, TileStore};
///
/// let store = TileStore::new(Dataset::JdF1, "/data/srtm");
/// if let Some(elevation) = store.get_elevation(45.83, 6.86)? {
///     println!("Elevation: {}m", elevation);
/// }
///
/// let stats = store.cache_stats();
/// println!("Cache hit rate: {:.1}%", stats.hit_rate() * 100.0);
/// ```
pub struct TileStore {
    dataset: Dataset,
    cache: Arc<TileCache>,
    disk: Box<dyn DiskCache>,
    provider: Option<Box<dyn TileProvider>>,
    converter: Option<Box<dyn RasterConverter>>,
}

impl TileStore {
    /// Create a store reading tiles from `cache_dir`, with a private
    /// unbounded cache and no provider.
    pub fn new<P: AsRef<Path>>(dataset: Dataset, cache_dir: P) -> Self {
        Self {
            dataset,
            cache: TileCache::shared(EvictionPolicy::KeepAll),
            disk: Box::new(DirectoryCache::new(cache_dir)),
            provider: None,
            converter: None,
        }
    }

    /// Create a builder for more configuration options.
    pub fn builder(dataset: Dataset) -> TileStoreBuilder {
        TileStoreBuilder::new(dataset)
    }

    /// Dataset served by this store.
    pub fn dataset(&self) -> Dataset {
        self.dataset
    }

    /// Tile containing `(lat, lon)`.
    pub fn get_tile(&self, lat: f64, lon: f64) -> Result<Arc<ElevationTile>> {
        let key = TileKey::new(lat, lon, self.dataset.name());
        if let Some(tile) = self.cache.get(&key) {
            return Ok(tile);
        }

        let tile = Arc::new(self.load_tile(&key)?);
        self.cache.insert(key, tile.clone());
        Ok(tile)
    }

    /// Height at `(lat, lon)`, `None` where the dataset has no data.
    pub fn get_elevation(&self, lat: f64, lon: f64) -> Result<Option<i16>> {
        let tile = self.get_tile(lat, lon)?;
        sampler::sample(&tile, lat, lon)
    }

    /// Height averaged over the four grid neighbours of `(lat, lon)`.
    ///
    /// See [`sampler::approximate`].
    pub fn get_elevation_approximated(&self, lat: f64, lon: f64) -> Result<Option<f64>> {
        let resolution = self.get_tile(lat, lon)?.resolution();
        sampler::approximate(lat, lon, resolution, |lat, lon| {
            self.get_elevation(lat, lon)
        })
    }

    /// Shared cache used by this store.
    pub fn cache(&self) -> &Arc<TileCache> {
        &self.cache
    }

    /// Get cache statistics.
    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    fn load_tile(&self, key: &TileKey) -> Result<ElevationTile> {
        let (origin_lat, origin_lon) = key
            .origin()
            .ok_or_else(|| WebTrackError::InvalidTileName {
                name: key.name().to_string(),
            })?;
        let file_name = key.file_name();

        if self.disk.exists(&file_name) {
            debug!(tile = %key, "loading tile from disk cache");
            let bytes = self.disk.read(&file_name)?;
            return ElevationTile::from_tile_bytes(bytes, origin_lat, origin_lon);
        }

        if !self.dataset.requires_credentials() {
            return Err(WebTrackError::ManualDatasetMissing {
                file_name,
                dir: self
                    .disk
                    .location()
                    .map(Path::to_path_buf)
                    .unwrap_or_default(),
            });
        }

        let provider = self
            .provider
            .as_ref()
            .ok_or_else(|| WebTrackError::TileNotAvailable {
                file_name: file_name.clone(),
            })?;

        let fetched = provider.fetch(key, self.dataset)?;
        let bytes = match fetched.format {
            RasterFormat::Hgt => fetched.bytes,
            RasterFormat::GeoTiff => {
                let converter = self.converter.as_ref().ok_or_else(|| {
                    WebTrackError::ConversionUnavailable {
                        file_name: file_name.clone(),
                    }
                })?;
                info!(tile = %key, "converting GeoTIFF tile");
                converter.convert(key, &fetched.bytes)?
            }
        };

        if tile::side_length(bytes.len()).is_none() {
            return Err(WebTrackError::InvalidTileSize { size: bytes.len() });
        }

        let bytes = self.disk.write(&file_name, bytes)?;
        ElevationTile::from_tile_bytes(bytes, origin_lat, origin_lon)
    }
}

impl ElevationSource for TileStore {
    fn elevation(&self, lat: f64, lon: f64) -> Result<Option<f64>> {
        Ok(self.get_elevation(lat, lon)?.map(f64::from))
    }
}

/// Builder for creating [`TileStore`] with custom configuration.
///
/// # Example
///
/// ```ignore
/// use webtrack::{Dataset, EvictionPolicy, TileStoreBuilder};
///
/// let store = TileStoreBuilder::new(Dataset::JdF3)
///     .cache_dir("/data/srtm")
///     .eviction(EvictionPolicy::SingleSlot)
///     .build()?;
/// ```
pub struct TileStoreBuilder {
    dataset: Dataset,
    cache: Option<Arc<TileCache>>,
    eviction: EvictionPolicy,
    cache_dir: PathBuf,
    disk: Option<Box<dyn DiskCache>>,
    provider: Option<Box<dyn TileProvider>>,
    converter: Option<Box<dyn RasterConverter>>,
    #[cfg(feature = "download")]
    download_config: Option<DownloadConfig>,
}

impl TileStoreBuilder {
    /// Create a new builder using [`default_cache_dir`].
    pub fn new(dataset: Dataset) -> Self {
        Self {
            dataset,
            cache: None,
            eviction: EvictionPolicy::KeepAll,
            cache_dir: default_cache_dir(),
            disk: None,
            provider: None,
            converter: None,
            #[cfg(feature = "download")]
            download_config: None,
        }
    }

    /// Create a builder configured from environment variables.
    ///
    /// # Environment Variables
    ///
    /// | Variable | Description | Default |
    /// |----------|-------------|---------|
    /// | `WEBTRACK_CACHE_DIR` | Directory of cached tiles | `$HOME/.cache/srtm` |
    /// | `NASA_USERNAME` | Earthdata user name* | None |
    /// | `NASA_PASSWORD` | Earthdata password* | None |
    ///
    /// *Only used when the `download` feature is enabled. Downloads are
    /// enabled when both are set.
    pub fn from_env(dataset: Dataset) -> Self {
        let mut builder = Self::new(dataset);

        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV) {
            builder.cache_dir = PathBuf::from(dir);
        }

        #[cfg(feature = "download")]
        {
            if let (Ok(username), Ok(password)) = (
                std::env::var("NASA_USERNAME"),
                std::env::var("NASA_PASSWORD"),
            ) {
                builder.download_config = Some(DownloadConfig::earthdata(username, password));
            }
        }

        builder
    }

    /// Share an existing cache. Overrides [`eviction`](Self::eviction).
    pub fn cache(mut self, cache: Arc<TileCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Eviction policy of a private cache.
    pub fn eviction(mut self, policy: EvictionPolicy) -> Self {
        self.eviction = policy;
        self
    }

    /// Set the cache directory.
    pub fn cache_dir<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.cache_dir = path.as_ref().to_path_buf();
        self
    }

    /// Use a custom disk cache instead of a [`DirectoryCache`].
    pub fn disk_cache(mut self, disk: impl DiskCache + 'static) -> Self {
        self.disk = Some(Box::new(disk));
        self
    }

    /// Use a custom tile provider.
    pub fn provider(mut self, provider: impl TileProvider + 'static) -> Self {
        self.provider = Some(Box::new(provider));
        self
    }

    /// Converter for GeoTIFF payloads.
    pub fn converter(mut self, converter: impl RasterConverter + 'static) -> Self {
        self.converter = Some(Box::new(converter));
        self
    }

    /// Download missing tiles over HTTP.
    #[cfg(feature = "download")]
    pub fn auto_download(mut self, config: DownloadConfig) -> Self {
        self.download_config = Some(config);
        self
    }

    /// Build the [`TileStore`].
    ///
    /// # Errors
    ///
    /// Returns an error if auto-download is enabled but the HTTP client
    /// cannot be created.
    pub fn build(self) -> Result<TileStore> {
        let provider = self.provider;

        #[cfg(feature = "download")]
        let provider = match (provider, self.download_config) {
            (None, Some(config)) => {
                Some(Box::new(HttpTileProvider::new(config)?) as Box<dyn TileProvider>)
            }
            (provider, _) => provider,
        };

        Ok(TileStore {
            dataset: self.dataset,
            cache: self
                .cache
                .unwrap_or_else(|| TileCache::shared(self.eviction)),
            disk: self
                .disk
                .unwrap_or_else(|| Box::new(DirectoryCache::new(&self.cache_dir))),
            provider,
            converter: self.converter,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::FetchedTile;
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    const SIDE: usize = 1201;

    /// Grid with `center` at row 600, col 600 and zero elsewhere.
    fn grid(center: i16) -> Vec<u8> {
        let mut data = vec![0u8; SIDE * SIDE * 2];
        let offset = (600 * SIDE + 600) * 2;
        data[offset..offset + 2].copy_from_slice(&center.to_be_bytes());
        data
    }

    fn create_test_tile(dir: &Path, file_name: &str, center: i16) {
        fs::write(dir.join(file_name), grid(center)).unwrap();
    }

    struct FakeProvider {
        calls: Arc<AtomicUsize>,
        format: RasterFormat,
    }

    impl TileProvider for FakeProvider {
        fn fetch(&self, key: &TileKey, _dataset: Dataset) -> Result<FetchedTile> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if key.name() == "N00W140" {
                return Err(WebTrackError::TileNotFound {
                    file_name: key.file_name(),
                });
            }
            Ok(FetchedTile {
                bytes: grid(321),
                format: self.format,
            })
        }
    }

    struct FakeConverter;

    impl RasterConverter for FakeConverter {
        fn convert(&self, _key: &TileKey, geotiff: &[u8]) -> Result<Vec<u8>> {
            Ok(geotiff.to_vec())
        }
    }

    fn fake_provider(format: RasterFormat) -> (FakeProvider, Arc<AtomicUsize>) {
        let calls = Arc::new(AtomicUsize::new(0));
        (
            FakeProvider {
                calls: calls.clone(),
                format,
            },
            calls,
        )
    }

    #[test]
    fn test_disk_cache_hit() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N45E006_JdF1.hgt", 500);

        let store = TileStore::new(Dataset::JdF1, temp_dir.path());
        assert_eq!(store.get_elevation(45.5, 6.5).unwrap(), Some(500));
        assert_eq!(store.get_elevation(45.1, 6.1).unwrap(), Some(0));

        let stats = store.cache_stats();
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_count, 1);
        assert_eq!(stats.entry_count, 1);
    }

    #[test]
    fn test_void_data_returns_none() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N45E006_JdF1.hgt", -32768);

        let store = TileStore::new(Dataset::JdF1, temp_dir.path());
        assert_eq!(store.get_elevation(45.5, 6.5).unwrap(), None);
    }

    #[test]
    fn test_manual_dataset_missing() {
        let temp_dir = TempDir::new().unwrap();
        let store = TileStore::new(Dataset::JdF1, temp_dir.path());

        match store.get_elevation(45.5, 6.5) {
            Err(WebTrackError::ManualDatasetMissing { file_name, dir }) => {
                assert_eq!(file_name, "N45E006_JdF1.hgt");
                assert_eq!(dir, temp_dir.path());
            }
            other => panic!("Expected ManualDatasetMissing, got {:?}", other),
        }
    }

    #[test]
    fn test_no_provider() {
        let temp_dir = TempDir::new().unwrap();
        let store = TileStore::new(Dataset::SrtmGl1V3, temp_dir.path());
        assert!(matches!(
            store.get_elevation(45.5, 6.5),
            Err(WebTrackError::TileNotAvailable { .. })
        ));
    }

    #[test]
    fn test_provider_fills_disk_cache() {
        let temp_dir = TempDir::new().unwrap();
        let (provider, calls) = fake_provider(RasterFormat::Hgt);
        let store = TileStore::builder(Dataset::SrtmGl1V3)
            .cache_dir(temp_dir.path())
            .provider(provider)
            .build()
            .unwrap();

        assert_eq!(store.get_elevation(45.5, 6.5).unwrap(), Some(321));
        assert_eq!(store.get_elevation(45.5, 6.5).unwrap(), Some(321));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(temp_dir.path().join("N45E006_SRTMGL1v3.hgt").exists());

        // A store with a fresh cache reads the downloaded file
        let (provider, calls) = fake_provider(RasterFormat::Hgt);
        let store = TileStore::builder(Dataset::SrtmGl1V3)
            .cache_dir(temp_dir.path())
            .provider(provider)
            .build()
            .unwrap();
        assert_eq!(store.get_elevation(45.5, 6.5).unwrap(), Some(321));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_provider_not_found_propagates() {
        let temp_dir = TempDir::new().unwrap();
        let (provider, _) = fake_provider(RasterFormat::Hgt);
        let store = TileStore::builder(Dataset::SrtmGl1V3)
            .cache_dir(temp_dir.path())
            .provider(provider)
            .build()
            .unwrap();

        assert!(matches!(
            store.get_elevation(0.5, -139.5),
            Err(WebTrackError::TileNotFound { .. })
        ));
        assert!(store.cache().is_empty());
    }

    #[test]
    fn test_geotiff_needs_converter() {
        let temp_dir = TempDir::new().unwrap();
        let (provider, _) = fake_provider(RasterFormat::GeoTiff);
        let store = TileStore::builder(Dataset::AstGtmV3)
            .cache_dir(temp_dir.path())
            .provider(provider)
            .build()
            .unwrap();
        assert!(matches!(
            store.get_elevation(45.5, 6.5),
            Err(WebTrackError::ConversionUnavailable { .. })
        ));

        let (provider, _) = fake_provider(RasterFormat::GeoTiff);
        let store = TileStore::builder(Dataset::AstGtmV3)
            .cache_dir(temp_dir.path())
            .provider(provider)
            .converter(FakeConverter)
            .build()
            .unwrap();
        assert_eq!(store.get_elevation(45.5, 6.5).unwrap(), Some(321));
        assert!(temp_dir.path().join("N45E006_ASTGTMv3.hgt").exists());
    }

    #[test]
    fn test_shared_cache() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N45E006_JdF1.hgt", 500);

        let cache = TileCache::shared(EvictionPolicy::KeepAll);
        let first = TileStore::builder(Dataset::JdF1)
            .cache(cache.clone())
            .cache_dir(temp_dir.path())
            .build()
            .unwrap();
        let second = TileStore::builder(Dataset::JdF1)
            .cache(cache.clone())
            .cache_dir(temp_dir.path())
            .build()
            .unwrap();

        first.get_elevation(45.5, 6.5).unwrap();
        second.get_elevation(45.5, 6.5).unwrap();

        let stats = cache.stats();
        assert_eq!(stats.miss_count, 1);
        assert_eq!(stats.hit_count, 1);
    }

    #[test]
    fn test_single_slot_store() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N45E006_JdF1.hgt", 500);
        create_test_tile(temp_dir.path(), "N46E006_JdF1.hgt", 1000);

        let store = TileStore::builder(Dataset::JdF1)
            .cache_dir(temp_dir.path())
            .eviction(EvictionPolicy::SingleSlot)
            .build()
            .unwrap();

        assert_eq!(store.get_elevation(45.5, 6.5).unwrap(), Some(500));
        assert_eq!(store.get_elevation(46.5, 6.5).unwrap(), Some(1000));
        assert_eq!(store.cache().len(), 1);
        assert_eq!(store.get_elevation(45.5, 6.5).unwrap(), Some(500));
        assert_eq!(store.cache_stats().miss_count, 3);
    }

    #[test]
    fn test_approximated_on_flat_ground() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("N45E006_JdF3.hgt"),
            [0x00u8, 0x64].repeat(SIDE * SIDE),
        )
        .unwrap();

        let store = TileStore::new(Dataset::JdF3, temp_dir.path());
        let value = store.get_elevation_approximated(45.5, 6.5).unwrap().unwrap();
        assert!((value - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_elevation_source() {
        let temp_dir = TempDir::new().unwrap();
        create_test_tile(temp_dir.path(), "N45E006_JdF1.hgt", 500);

        let store = TileStore::new(Dataset::JdF1, temp_dir.path());
        let source: &dyn ElevationSource = &store;
        assert_eq!(source.elevation(45.5, 6.5).unwrap(), Some(500.0));
    }

    #[test]
    fn test_from_env() {
        let temp_dir = TempDir::new().unwrap();
        let original = std::env::var_os(CACHE_DIR_ENV);

        std::env::set_var(CACHE_DIR_ENV, temp_dir.path());
        let builder = TileStoreBuilder::from_env(Dataset::JdF1);
        assert_eq!(builder.cache_dir, temp_dir.path());

        match original {
            Some(v) => std::env::set_var(CACHE_DIR_ENV, v),
            None => std::env::remove_var(CACHE_DIR_ENV),
        }
    }

    #[test]
    fn test_default_cache_dir() {
        assert!(default_cache_dir().ends_with(".cache/srtm"));
    }
}
