use anyhow::{Context, Result};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::PathBuf;
use webtrack::gpx::{embellish, write_gpx};

use super::{parse_dataset, sibling_path, StoreArgs};

pub fn run(
    store_args: &StoreArgs,
    input: PathBuf,
    dem: &str,
    output_dir: Option<PathBuf>,
) -> Result<()> {
    let dataset = parse_dataset(dem)?;
    let store = store_args.build_store(dataset)?;

    let reader = BufReader::new(
        File::open(&input).with_context(|| format!("Failed to open {}", input.display()))?,
    );
    let mut document =
        gpx::read(reader).with_context(|| format!("Failed to parse {}", input.display()))?;

    embellish(&mut document, &store, dataset)
        .with_context(|| format!("Failed to embellish {}", input.display()))?;

    if let Some(dir) = &output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    let output = sibling_path(
        &input,
        output_dir.as_deref(),
        &format!("{}.gpx", dataset.name()),
    );

    let writer = BufWriter::new(
        File::create(&output).with_context(|| format!("Failed to create {}", output.display()))?,
    );
    write_gpx(&mut document, writer)
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("Generated `{}'", output.display());
    Ok(())
}
