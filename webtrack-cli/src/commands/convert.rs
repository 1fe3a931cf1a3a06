use anyhow::{bail, Context, Result};
use indicatif::{ProgressBar, ProgressStyle};
use std::fmt;
use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::warn;
use webtrack::{
    analyze, codec, gpx, AnalyzerOptions, Dem, ElevationMode, ParsedTrack, TileStore,
    TrackProfile,
};

use super::{format_size, parse_dataset, sibling_path, source_name, StoreArgs};

/// Per-run switches of the `convert` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConvertOptions {
    pub fallback: bool,
    pub not_flat: bool,
    pub direct: bool,
    /// Simplification tolerance in meters.
    pub simplify: Option<f64>,
}

impl ConvertOptions {
    fn analyzer_options(&self) -> AnalyzerOptions {
        AnalyzerOptions {
            mode: if self.direct {
                ElevationMode::Direct
            } else {
                ElevationMode::Smoothed
            },
            force_elevation: self.not_flat,
            simplify: self.simplify,
            ..Default::default()
        }
    }
}

pub fn run(
    store_args: &StoreArgs,
    input: PathBuf,
    recursive: bool,
    dem: &str,
    convert: ConvertOptions,
) -> Result<()> {
    let store = if dem.eq_ignore_ascii_case("none") {
        None
    } else {
        Some(store_args.build_store(parse_dataset(dem)?)?)
    };

    let options = convert.analyzer_options();
    let fallback = convert.fallback;

    if input.is_dir() {
        let files = find_gpx_files(&input, recursive)?;
        if files.is_empty() {
            println!("No GPX file found in {}", input.display());
            return Ok(());
        }

        let pb = ProgressBar::new(files.len() as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template(
                    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})",
                )?
                .progress_chars("#>-"),
        );

        let mut failed = 0;
        for file in &files {
            match convert_file(file, store.as_ref(), &options, fallback) {
                Ok(conversion) => pb.println(conversion.to_string()),
                Err(err) => {
                    failed += 1;
                    pb.println(format!("Error: {err:#}"));
                }
            }
            pb.inc(1);
        }
        pb.finish_with_message("done");

        if let Some(store) = &store {
            let stats = store.cache_stats();
            println!(
                "Tile cache: {} hits, {} misses ({:.1}% hit rate)",
                stats.hit_count,
                stats.miss_count,
                stats.hit_rate() * 100.0
            );
        }
        if failed > 0 {
            bail!("{} of {} files could not be converted", failed, files.len());
        }
    } else if recursive {
        bail!("Recursive mode and input file are incompatible");
    } else {
        let conversion = convert_file(&input, store.as_ref(), &options, fallback)?;
        println!("{}", conversion);
    }

    Ok(())
}

/// `.gpx` files directly in `dir`, or anywhere below it when `recursive`.
fn find_gpx_files(dir: &Path, recursive: bool) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending = vec![dir.to_path_buf()];

    while let Some(dir) = pending.pop() {
        let entries =
            fs::read_dir(&dir).with_context(|| format!("Failed to read {}", dir.display()))?;
        for entry in entries {
            let path = entry?.path();
            if path.is_dir() {
                if recursive {
                    pending.push(path);
                }
            } else if is_gpx(&path) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn is_gpx(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("gpx"))
        .unwrap_or(false)
}

/// Outcome of one conversion, printed as a one-file summary.
struct Conversion {
    input: PathBuf,
    output: PathBuf,
    input_size: u64,
    output_size: u64,
    profile: TrackProfile,
}

impl fmt::Display for Conversion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Generated `{}' from `{}'",
            self.output.display(),
            self.input.display()
        )?;
        writeln!(
            f,
            "  {} segments, {} points, {} waypoints, {:.2} km",
            self.profile.segments.len(),
            self.profile.point_count(),
            self.profile.waypoints.len(),
            self.profile.total_length / 1000.0
        )?;
        for (activity, length) in &self.profile.activities {
            writeln!(f, "  {}: {:.2} km", activity.name(), length / 1000.0)?;
        }
        match self.profile.segments.iter().find_map(|s| s.elevation_source) {
            Some(code) => writeln!(f, "  Elevation: {}", source_name(code))?,
            None => writeln!(f, "  Elevation: none")?,
        }

        let ratio = if self.input_size > 0 {
            100.0 * (1.0 - self.output_size as f64 / self.input_size as f64)
        } else {
            0.0
        };
        write!(
            f,
            "  {} -> {} ({:.0}% smaller)",
            format_size(self.input_size),
            format_size(self.output_size),
            ratio
        )
    }
}

fn convert_file(
    path: &Path,
    store: Option<&TileStore>,
    options: &AnalyzerOptions,
    fallback: bool,
) -> Result<Conversion> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let parsed = gpx::read_gpx(BufReader::new(file))
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let output = sibling_path(path, None, "webtrack");

    let dem = store.map(|store| Dem::new(store, store.dataset()));
    let (profile, output_size) = match write_webtrack(&parsed, dem, options, &output) {
        Ok(written) => written,
        Err(err) if fallback && dem.is_some() => {
            warn!(
                file = %path.display(),
                error = %format!("{err:#}"),
                "Falling back with no elevation"
            );
            write_webtrack(&parsed, None, options, &output)?
        }
        Err(err) => return Err(err.context(format!("Failed to convert {}", path.display()))),
    };

    Ok(Conversion {
        input: path.to_path_buf(),
        output,
        input_size: fs::metadata(path)?.len(),
        output_size: output_size as u64,
        profile,
    })
}

fn write_webtrack(
    parsed: &ParsedTrack,
    dem: Option<Dem<'_>>,
    options: &AnalyzerOptions,
    output: &Path,
) -> Result<(TrackProfile, usize)> {
    let profile = analyze(parsed, dem, options)?;
    let size = codec::write_file(output, &profile)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    Ok((profile, size))
}
