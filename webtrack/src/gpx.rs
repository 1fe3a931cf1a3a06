//! GPX input and elevation embellishment.
//!
//! Enable the `gpx` feature to use this module.

use std::io::{Read, Write};

use gpx::{Gpx, GpxVersion, Metadata, Waypoint as GpxPoint};
use tracing::debug;

use crate::analyzer::smoothed_elevations;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::sampler::ElevationSource;
use crate::track::{InputPoint, InputTrack, InputWaypoint, ParsedTrack};

/// Creator written into embellished documents.
pub const CREATOR: &str = concat!("webtrack ", env!("CARGO_PKG_VERSION"));

fn input_point(point: &GpxPoint) -> InputPoint {
    let position = point.point();
    InputPoint {
        lat: position.y(),
        lon: position.x(),
        elevation: point.elevation,
    }
}

impl From<&Gpx> for ParsedTrack {
    fn from(document: &Gpx) -> Self {
        let tracks = document
            .tracks
            .iter()
            .map(|track| InputTrack {
                name: track.name.clone(),
                description: track.description.clone(),
                segments: track
                    .segments
                    .iter()
                    .map(|segment| segment.points.iter().map(input_point).collect())
                    .collect(),
            })
            .collect();

        let waypoints = document
            .waypoints
            .iter()
            .map(|waypoint| {
                let point = input_point(waypoint);
                InputWaypoint {
                    lat: point.lat,
                    lon: point.lon,
                    elevation: point.elevation,
                    symbol: waypoint.symbol.clone(),
                    name: waypoint.name.clone(),
                }
            })
            .collect();

        ParsedTrack { tracks, waypoints }
    }
}

/// Parse a GPX document into analyzer input.
pub fn read_gpx<R: Read>(reader: R) -> Result<ParsedTrack> {
    let document = gpx::read(reader)?;
    Ok(ParsedTrack::from(&document))
}

/// Write a document as GPX 1.1.
pub fn write_gpx<W: Write>(document: &mut Gpx, writer: W) -> Result<()> {
    document.version = GpxVersion::Gpx11;
    gpx::write(document, writer)?;
    Ok(())
}

/// Remove every elevation from track, route and waypoint positions.
pub fn strip_elevations(document: &mut Gpx) {
    for track in &mut document.tracks {
        for segment in &mut track.segments {
            for point in &mut segment.points {
                point.elevation = None;
            }
        }
    }
    for route in &mut document.routes {
        for point in &mut route.points {
            point.elevation = None;
        }
    }
    for waypoint in &mut document.waypoints {
        waypoint.elevation = None;
    }
}

fn smooth_in_place(points: &mut [GpxPoint], source: &dyn ElevationSource) -> Result<()> {
    let input: Vec<InputPoint> = points.iter().map(input_point).collect();
    let elevations = smoothed_elevations(&input, source)?;
    for (point, elevation) in points.iter_mut().zip(elevations) {
        point.elevation = elevation;
    }
    Ok(())
}

/// Set the creator and record where elevations came from.
pub fn describe(document: &mut Gpx, dataset: Option<Dataset>) {
    document.creator = Some(CREATOR.to_string());
    if let Some(dataset) = dataset {
        let metadata = document.metadata.get_or_insert_with(Metadata::default);
        metadata.description = Some(format!(
            "Elevation data source of tracks and routes is {dataset}."
        ));
    }
}

/// Replace device elevations by DEM elevations.
///
/// Track segments and routes get smoothed elevations; points where smoothing
/// finds nothing are left without elevation. Waypoints get one direct sample.
pub fn embellish(document: &mut Gpx, source: &dyn ElevationSource, dataset: Dataset) -> Result<()> {
    strip_elevations(document);

    for track in &mut document.tracks {
        for segment in &mut track.segments {
            smooth_in_place(&mut segment.points, source)?;
        }
    }
    for route in &mut document.routes {
        smooth_in_place(&mut route.points, source)?;
    }
    for waypoint in &mut document.waypoints {
        let position = waypoint.point();
        waypoint.elevation = source.elevation(position.y(), position.x())?;
    }

    describe(document, Some(dataset));
    debug!(
        tracks = document.tracks.len(),
        routes = document.routes.len(),
        waypoints = document.waypoints.len(),
        %dataset,
        "embellished GPX"
    );
    Ok(())
}
