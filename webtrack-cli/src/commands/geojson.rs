use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use webtrack::{codec, geojson::to_feature_collection};

pub fn run(file: PathBuf, output: Option<PathBuf>) -> Result<()> {
    let profile = codec::read_file(&file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let collection = to_feature_collection(&profile);
    let json = serde_json::to_string_pretty(&collection)?;

    match output {
        Some(path) => {
            fs::write(&path, json)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!(
                "Wrote {} features to {}",
                collection.features.len(),
                path.display()
            );
        }
        None => println!("{}", json),
    }

    Ok(())
}
