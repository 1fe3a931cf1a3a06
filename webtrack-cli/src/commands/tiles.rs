use anyhow::{bail, Result};
use std::path::PathBuf;
use webtrack::disk::DirectoryCache;
use webtrack::store::default_cache_dir;
use webtrack::tilename::parse_tile_name;

use super::parse_dataset;

pub fn run(cache_dir: Option<PathBuf>, dem: Option<&str>) -> Result<()> {
    let dir = cache_dir.unwrap_or_else(default_cache_dir);
    if !dir.exists() {
        bail!("Cache directory does not exist: {}", dir.display());
    }

    let suffix = match dem {
        Some(name) => Some(format!("_{}.hgt", parse_dataset(name)?.name())),
        None => None,
    };

    let tiles: Vec<String> = DirectoryCache::new(&dir)
        .scan()
        .into_iter()
        .filter(|name| suffix.as_ref().map_or(true, |s| name.ends_with(s.as_str())))
        .collect();

    if tiles.is_empty() {
        println!("No tiles found in: {}", dir.display());
        return Ok(());
    }

    println!("{:<24} {:>20}", "TILE", "COVERAGE");
    println!("{}", "-".repeat(45));
    for name in &tiles {
        let coverage = match parse_tile_name(name) {
            Some((lat, lon)) => format!("{}..{}, {}..{}", lat, lat + 1, lon, lon + 1),
            None => "?".to_string(),
        };
        println!("{:<24} {:>20}", name, coverage);
    }
    println!();
    println!("{} tiles in {}", tiles.len(), dir.display());

    Ok(())
}
