use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod commands;

use commands::StoreArgs;

/// Convert GPX tracks to WebTrack files
#[derive(Parser)]
#[command(name = "webtrack")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Directory of cached DEM tiles
    #[arg(long, env = "WEBTRACK_CACHE_DIR", global = true)]
    cache_dir: Option<PathBuf>,

    /// NASA Earthdata user name
    #[arg(long, env = "NASA_USERNAME", hide_env_values = true, global = true)]
    username: Option<String>,

    /// NASA Earthdata password
    #[arg(long, env = "NASA_PASSWORD", hide_env_values = true, global = true)]
    password: Option<String>,

    /// Keep a single tile in memory, for many tracks far apart
    #[arg(long, global = true)]
    batch_mode: bool,

    /// More logging (-v info, -vv debug). RUST_LOG takes precedence
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a GPX file, or a directory of GPX files, to WebTrack
    Convert {
        /// Path to the GPX file or directory containing GPX files
        #[arg(long)]
        gpx: PathBuf,

        /// Search for GPX files recursively
        #[arg(short = 'R', long)]
        recursive: bool,

        /// Digital Elevation Model (SRTMGL1v3, ASTGTMv3, JdF1, JdF3 or none)
        #[arg(long, default_value = "none")]
        dem: String,

        /// Generate the WebTrack file without elevation if the DEM fails
        #[arg(long)]
        fallback: bool,

        /// Keep elevation data even if the track is considered very flat
        #[arg(long)]
        not_flat: bool,

        /// Sample the DEM at each point instead of smoothing
        #[arg(long)]
        direct: bool,

        /// Simplify with the Ramer-Douglas-Peucker algorithm (tolerance in meters)
        #[arg(long, value_name = "METERS", num_args = 0..=1, default_missing_value = "10")]
        simplify: Option<f64>,
    },

    /// Display information about a WebTrack file
    Info {
        /// Path to the .webtrack file
        file: PathBuf,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Export a WebTrack file as GeoJSON
    Geojson {
        /// Path to the .webtrack file
        file: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Query elevation for a single coordinate
    Query {
        /// Latitude in decimal degrees
        #[arg(long)]
        lat: f64,

        /// Longitude in decimal degrees
        #[arg(long)]
        lon: f64,

        /// Digital Elevation Model
        #[arg(long)]
        dem: String,

        /// Weight the four surrounding samples
        #[arg(short, long)]
        approximate: bool,

        /// Output result as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Replace GPX elevations by DEM elevations
    Embellish {
        /// Path to the GPX file
        #[arg(long)]
        gpx: PathBuf,

        /// Digital Elevation Model
        #[arg(long)]
        dem: String,

        /// Output directory (next to the input if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// List tiles in the cache directory
    Tiles {
        /// Only tiles of this Digital Elevation Model
        #[arg(long)]
        dem: Option<String>,
    },
}

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| default_level.into()))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let store_args = StoreArgs {
        cache_dir: cli.cache_dir,
        username: cli.username,
        password: cli.password,
        batch_mode: cli.batch_mode,
    };

    match cli.command {
        Commands::Convert {
            gpx,
            recursive,
            dem,
            fallback,
            not_flat,
            direct,
            simplify,
        } => commands::convert::run(
            &store_args,
            gpx,
            recursive,
            &dem,
            commands::convert::ConvertOptions {
                fallback,
                not_flat,
                direct,
                simplify,
            },
        ),
        Commands::Info { file, json } => commands::info::run(file, json),
        Commands::Geojson { file, output } => commands::geojson::run(file, output),
        Commands::Query {
            lat,
            lon,
            dem,
            approximate,
            json,
        } => commands::query::run(&store_args, lat, lon, &dem, approximate, json),
        Commands::Embellish { gpx, dem, output } => {
            commands::embellish::run(&store_args, gpx, &dem, output)
        }
        Commands::Tiles { dem } => commands::tiles::run(store_args.cache_dir, dem.as_deref()),
    }
}
