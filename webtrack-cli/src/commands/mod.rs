pub mod convert;
pub mod embellish;
pub mod geojson;
pub mod info;
pub mod query;
pub mod tiles;

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use webtrack::{Dataset, DownloadConfig, EvictionPolicy, TileStore, TileStoreBuilder};

/// Global options shared by the commands that sample a DEM.
pub struct StoreArgs {
    pub cache_dir: Option<PathBuf>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub batch_mode: bool,
}

impl StoreArgs {
    pub fn build_store(&self, dataset: Dataset) -> Result<TileStore> {
        let mut builder = TileStoreBuilder::new(dataset);

        if let Some(dir) = &self.cache_dir {
            builder = builder.cache_dir(dir);
        }
        if self.batch_mode {
            builder = builder.eviction(EvictionPolicy::SingleSlot);
        }
        if let (Some(username), Some(password)) = (&self.username, &self.password) {
            builder = builder.auto_download(DownloadConfig::earthdata(username, password));
        }

        builder.build().context("Failed to create tile store")
    }
}

pub fn parse_dataset(name: &str) -> Result<Dataset> {
    name.parse::<Dataset>().with_context(|| {
        let names: Vec<&str> = Dataset::ALL.iter().map(|d| d.name()).collect();
        format!("Choose a DEM among {}", names.join(", "))
    })
}

/// `<stem>.<extension>` in `dir`, or next to `input` when `dir` is `None`.
pub fn sibling_path(input: &Path, dir: Option<&Path>, extension: &str) -> PathBuf {
    let stem = input.file_stem().unwrap_or(input.as_os_str());
    let mut file_name = stem.to_os_string();
    file_name.push(".");
    file_name.push(extension);

    match dir {
        Some(dir) => dir.join(file_name),
        None => input.with_file_name(file_name),
    }
}

pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;

    if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} bytes", bytes)
    }
}

/// Human name of an elevation source byte.
pub fn source_name(code: u8) -> String {
    match Dataset::from_code(code) {
        Some(dataset) => dataset.name().to_string(),
        None => char::from(code).to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sibling_path() {
        let input = Path::new("/tracks/hike.gpx");
        assert_eq!(
            sibling_path(input, None, "webtrack"),
            PathBuf::from("/tracks/hike.webtrack")
        );
        assert_eq!(
            sibling_path(input, Some(Path::new("/out")), "JdF1.gpx"),
            PathBuf::from("/out/hike.JdF1.gpx")
        );
    }

    #[test]
    fn test_parse_dataset() {
        assert_eq!(parse_dataset("jdf3").unwrap(), Dataset::JdF3);
        let err = parse_dataset("gtopo30").unwrap_err();
        assert!(format!("{err:#}").contains("SRTMGL1v3"));
    }

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(512), "512 bytes");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(3 * 1024 * 1024), "3.00 MB");
    }
}
