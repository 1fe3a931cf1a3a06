//! Local disk cache of tiles.
//!
//! Tiles are stored as raw grids named `{tile}_{dataset}.hgt`. Datasets that
//! cannot be downloaded are staged here by hand, either as the `.hgt` file or
//! zipped as `{tile}_{dataset}.hgt.zip`.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;
use zip::ZipArchive;

use crate::error::{Result, WebTrackError};
use crate::tile::TileBytes;

/// Persistent store of raw tile grids, keyed by cache file name.
pub trait DiskCache: Send + Sync {
    /// Whether `file_name` can be read.
    fn exists(&self, file_name: &str) -> bool;

    /// Read the grid stored under `file_name`.
    fn read(&self, file_name: &str) -> Result<TileBytes>;

    /// Store a grid and return the bytes callers should decode.
    fn write(&self, file_name: &str, bytes: Vec<u8>) -> Result<TileBytes>;

    /// Where files are expected, for error messages.
    fn location(&self) -> Option<&Path> {
        None
    }
}

/// [`DiskCache`] backed by a directory.
#[derive(Debug, Clone)]
pub struct DirectoryCache {
    dir: PathBuf,
}

impl DirectoryCache {
    /// Use `dir` as cache directory. It is created on first write.
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
        }
    }

    /// Cache directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Scan the directory for cached tiles.
    ///
    /// Returns a sorted, deduplicated list of `.hgt` file names; staged
    /// `.hgt.zip` archives are listed under the name they extract to.
    pub fn scan(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.dir) else {
            return Vec::new();
        };

        let mut names: Vec<String> = entries
            .flatten()
            .filter_map(|entry| {
                let name = entry.file_name().to_string_lossy().into_owned();
                let hgt = name.strip_suffix(".zip").unwrap_or(&name);
                hgt.ends_with(".hgt").then(|| hgt.to_string())
            })
            .collect();
        names.sort();
        names.dedup();
        names
    }

    fn zip_path(&self, file_name: &str) -> PathBuf {
        self.dir.join(format!("{}.zip", file_name))
    }

    /// Extract the `.hgt` entry of a staged archive next to it.
    fn extract_staged(&self, file_name: &str) -> Result<()> {
        let zip_path = self.zip_path(file_name);
        let mut archive = ZipArchive::new(File::open(&zip_path)?)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;
            if !entry.name().to_ascii_lowercase().ends_with(".hgt") {
                continue;
            }

            debug!(archive = %zip_path.display(), entry = entry.name(), "extracting staged tile");
            let partial = self.dir.join(format!("{}.part", file_name));
            io::copy(&mut entry, &mut File::create(&partial)?)?;
            fs::rename(&partial, self.dir.join(file_name))?;
            return Ok(());
        }

        Err(WebTrackError::Io(io::Error::new(
            io::ErrorKind::NotFound,
            format!("No .hgt file found in {}", zip_path.display()),
        )))
    }
}

impl DiskCache for DirectoryCache {
    fn exists(&self, file_name: &str) -> bool {
        self.dir.join(file_name).is_file() || self.zip_path(file_name).is_file()
    }

    fn read(&self, file_name: &str) -> Result<TileBytes> {
        let path = self.dir.join(file_name);
        if !path.is_file() {
            self.extract_staged(file_name)?;
        }
        TileBytes::map(&path)
    }

    fn write(&self, file_name: &str, bytes: Vec<u8>) -> Result<TileBytes> {
        fs::create_dir_all(&self.dir)?;

        // Write under a temporary name so a crash never leaves a short tile.
        let path = self.dir.join(file_name);
        let partial = self.dir.join(format!("{}.part", file_name));
        fs::write(&partial, &bytes)?;
        fs::rename(&partial, &path)?;

        debug!(path = %path.display(), size = bytes.len(), "cached tile");
        Ok(TileBytes::Owned(bytes))
    }

    fn location(&self) -> Option<&Path> {
        Some(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::ElevationTile;
    use std::io::Write;
    use tempfile::TempDir;

    const GRID: usize = 2 * 11 * 11;

    #[test]
    fn test_write_then_read() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DirectoryCache::new(temp_dir.path().join("nested"));

        assert!(!cache.exists("N45E006_SRTMGL1v3.hgt"));
        let bytes = cache
            .write("N45E006_SRTMGL1v3.hgt", vec![7u8; GRID])
            .unwrap();
        assert_eq!(bytes.len(), GRID);

        assert!(cache.exists("N45E006_SRTMGL1v3.hgt"));
        assert!(!temp_dir
            .path()
            .join("nested/N45E006_SRTMGL1v3.hgt.part")
            .exists());
        let read = cache.read("N45E006_SRTMGL1v3.hgt").unwrap();
        assert_eq!(&read[..], &vec![7u8; GRID][..]);
    }

    #[test]
    fn test_read_invalid_size() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("N45E006_JdF1.hgt"), [0u8; 10]).unwrap();

        let cache = DirectoryCache::new(temp_dir.path());
        let bytes = cache.read("N45E006_JdF1.hgt").unwrap();
        assert!(matches!(
            ElevationTile::from_tile_bytes(bytes, 45, 6),
            Err(WebTrackError::InvalidTileSize { size: 10 })
        ));
    }

    #[test]
    fn test_staged_zip() {
        let temp_dir = TempDir::new().unwrap();
        let zip_path = temp_dir.path().join("N45E006_JdF1.hgt.zip");
        let mut zip = zip::ZipWriter::new(File::create(&zip_path).unwrap());
        let options = zip::write::SimpleFileOptions::default()
            .compression_method(zip::CompressionMethod::Stored);
        zip.start_file("readme.txt", options).unwrap();
        zip.write_all(b"Jonathan de Ferranti").unwrap();
        zip.start_file("N45E006.hgt", options).unwrap();
        zip.write_all(&[1u8; GRID]).unwrap();
        zip.finish().unwrap();

        let cache = DirectoryCache::new(temp_dir.path());
        assert!(cache.exists("N45E006_JdF1.hgt"));

        let bytes = cache.read("N45E006_JdF1.hgt").unwrap();
        assert_eq!(bytes.len(), GRID);
        assert!(temp_dir.path().join("N45E006_JdF1.hgt").exists());
    }

    #[test]
    fn test_scan() {
        let temp_dir = TempDir::new().unwrap();
        for name in [
            "N45E006_JdF1.hgt",
            "N45E006_JdF1.hgt.zip",
            "S12W077_SRTMGL1v3.hgt",
            "notes.txt",
        ] {
            fs::write(temp_dir.path().join(name), b"").unwrap();
        }

        let cache = DirectoryCache::new(temp_dir.path());
        assert_eq!(
            cache.scan(),
            vec!["N45E006_JdF1.hgt", "S12W077_SRTMGL1v3.hgt"]
        );
    }

    #[test]
    fn test_missing_file() {
        let temp_dir = TempDir::new().unwrap();
        let cache = DirectoryCache::new(temp_dir.path());
        assert!(matches!(
            cache.read("N45E006_JdF1.hgt"),
            Err(WebTrackError::Io(_))
        ));
    }

    #[test]
    fn test_scan_missing_dir() {
        let cache = DirectoryCache::new("/nonexistent/webtrack/cache");
        assert!(cache.scan().is_empty());
        assert_eq!(
            cache.location(),
            Some(Path::new("/nonexistent/webtrack/cache"))
        );
    }
}
