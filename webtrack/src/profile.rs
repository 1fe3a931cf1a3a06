//! Analysis result, as stored in a WebTrack file.

use crate::activity::Activity;

/// A track point ready for encoding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TrackPoint {
    pub lon: f64,
    pub lat: f64,
    /// Meters from the start of the segment.
    pub distance: f64,
    pub elevation: Option<f64>,
}

/// One logical track.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Segment {
    pub activity: Activity,
    /// Dataset code of the elevations, `None` when the segment has none.
    pub elevation_source: Option<u8>,
    pub points: Vec<TrackPoint>,
}

impl Segment {
    pub fn has_elevation(&self) -> bool {
        self.elevation_source.is_some()
    }

    /// Length of the segment in meters.
    pub fn length(&self) -> f64 {
        self.points.last().map_or(0.0, |p| p.distance)
    }
}

/// A point of interest attached to the track.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Waypoint {
    pub lon: f64,
    pub lat: f64,
    pub elevation: Option<f64>,
    pub elevation_source: Option<u8>,
    pub symbol: Option<String>,
    pub name: Option<String>,
    /// Index of the closest track point, counted over all segments.
    pub index: usize,
}

/// Altitude summary over all segments.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct AltitudeStats {
    pub min: f64,
    pub max: f64,
    /// Sum of positive elevation deltas.
    pub gain: f64,
    /// Sum of negative elevation deltas, as a positive number.
    pub loss: f64,
}

/// Everything a WebTrack file holds.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TrackProfile {
    pub segments: Vec<Segment>,
    pub waypoints: Vec<Waypoint>,
    /// Length of all segments in meters.
    pub total_length: f64,
    /// Length per activity, in order of first appearance.
    pub activities: Vec<(Activity, f64)>,
    /// Present iff some segment has elevation.
    pub altitude: Option<AltitudeStats>,
}

impl TrackProfile {
    /// Whether any segment carries elevation.
    pub fn has_elevation(&self) -> bool {
        self.segments.iter().any(Segment::has_elevation)
    }

    /// Number of points over all segments.
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(|s| s.points.len()).sum()
    }

    /// Every point in run order.
    pub fn points(&self) -> impl Iterator<Item = &TrackPoint> {
        self.segments.iter().flat_map(|s| s.points.iter())
    }

    /// Distinct activities in order of first appearance.
    pub fn distinct_activities(&self) -> Vec<Activity> {
        let mut seen = Vec::new();
        for segment in &self.segments {
            if !seen.contains(&segment.activity) {
                seen.push(segment.activity);
            }
        }
        seen
    }

    /// Drop all elevation data, giving the shape of a track analyzed
    /// without a DEM.
    pub fn strip_elevation(&mut self) {
        for segment in &mut self.segments {
            segment.elevation_source = None;
            for point in &mut segment.points {
                point.elevation = None;
            }
        }
        for waypoint in &mut self.waypoints {
            waypoint.elevation = None;
            waypoint.elevation_source = None;
        }
        self.altitude = None;
    }
}
