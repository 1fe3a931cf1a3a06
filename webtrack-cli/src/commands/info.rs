use anyhow::{Context, Result};
use serde::Serialize;
use std::fs::File;
use std::io::BufReader;
use std::path::PathBuf;
use webtrack::codec::{self, FORMAT_NAME, FORMAT_VERSION};
use webtrack::TrackProfile;

use super::{format_size, source_name};

#[derive(Serialize)]
struct InfoResponse {
    file: String,
    size: u64,
    format: String,
    version: String,
    supported: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    track: Option<TrackInfo>,
}

#[derive(Serialize)]
struct TrackInfo {
    segments: usize,
    points: usize,
    waypoints: usize,
    total_length: f64,
    activities: Vec<ActivityLength>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    elevation_sources: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    altitude: Option<AltitudeInfo>,
}

#[derive(Serialize)]
struct ActivityLength {
    activity: &'static str,
    length: f64,
}

#[derive(Serialize)]
struct AltitudeInfo {
    min: f64,
    max: f64,
    gain: f64,
    loss: f64,
}

impl From<&TrackProfile> for TrackInfo {
    fn from(profile: &TrackProfile) -> Self {
        let mut elevation_sources = Vec::new();
        for code in profile.segments.iter().filter_map(|s| s.elevation_source) {
            let name = source_name(code);
            if !elevation_sources.contains(&name) {
                elevation_sources.push(name);
            }
        }

        TrackInfo {
            segments: profile.segments.len(),
            points: profile.point_count(),
            waypoints: profile.waypoints.len(),
            total_length: profile.total_length,
            activities: profile
                .activities
                .iter()
                .map(|(activity, length)| ActivityLength {
                    activity: activity.name(),
                    length: *length,
                })
                .collect(),
            elevation_sources,
            altitude: profile.altitude.map(|stats| AltitudeInfo {
                min: stats.min,
                max: stats.max,
                gain: stats.gain,
                loss: stats.loss,
            }),
        }
    }
}

pub fn run(file: PathBuf, json: bool) -> Result<()> {
    let reader = BufReader::new(
        File::open(&file).with_context(|| format!("Failed to open {}", file.display()))?,
    );
    let header = codec::read_format_info(reader).context("Not a WebTrack file")?;
    let supported = header.is_supported();

    let track = if supported {
        let profile = codec::read_file(&file).context("Failed to decode WebTrack file")?;
        Some(TrackInfo::from(&profile))
    } else {
        None
    };

    let response = InfoResponse {
        file: file.display().to_string(),
        size: std::fs::metadata(&file)?.len(),
        format: header.name,
        version: header.version,
        supported,
        track,
    };

    if json {
        println!("{}", serde_json::to_string(&response)?);
        return Ok(());
    }

    println!("File: {}", response.file);
    println!("Size: {}", format_size(response.size));
    println!("Format: {} {}", response.format, response.version);
    let Some(track) = response.track else {
        println!("Unsupported, expected {} {}", FORMAT_NAME, FORMAT_VERSION);
        return Ok(());
    };

    println!();
    println!("Segments: {}", track.segments);
    println!("Points: {}", track.points);
    println!("Waypoints: {}", track.waypoints);
    println!("Length: {:.2} km", track.total_length / 1000.0);
    for activity in &track.activities {
        println!("  {}: {:.2} km", activity.activity, activity.length / 1000.0);
    }

    if track.elevation_sources.is_empty() {
        println!("Elevation: none");
    } else {
        println!("Elevation: {}", track.elevation_sources.join(", "));
    }
    if let Some(altitude) = track.altitude {
        println!("Min elevation: {}m", altitude.min);
        println!("Max elevation: {}m", altitude.max);
        println!("Gain: {}m", altitude.gain);
        println!("Loss: {}m", altitude.loss);
    }

    Ok(())
}
