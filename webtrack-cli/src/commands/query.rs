use anyhow::{Context, Result};
use serde::Serialize;

use super::{parse_dataset, StoreArgs};

#[derive(Serialize)]
struct ElevationResponse {
    lat: f64,
    lon: f64,
    dem: &'static str,
    elevation: Option<f64>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    approximated: bool,
}

pub fn run(
    store_args: &StoreArgs,
    lat: f64,
    lon: f64,
    dem: &str,
    approximate: bool,
    json: bool,
) -> Result<()> {
    let dataset = parse_dataset(dem)?;
    let store = store_args.build_store(dataset)?;

    let elevation = if approximate {
        store
            .get_elevation_approximated(lat, lon)
            .context("Failed to get elevation")?
    } else {
        store
            .get_elevation(lat, lon)
            .context("Failed to get elevation")?
            .map(f64::from)
    };

    if json {
        let response = ElevationResponse {
            lat,
            lon,
            dem: dataset.name(),
            elevation,
            approximated: approximate,
        };
        println!("{}", serde_json::to_string(&response)?);
    } else {
        match elevation {
            None => println!("void"),
            Some(elev) if approximate => println!("{:.2}", elev),
            Some(elev) => println!("{}", elev),
        }
    }

    Ok(())
}
