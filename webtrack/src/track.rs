//! Parsed GPS input.
//!
//! A [`ParsedTrack`] is the format-neutral view of a GPX document the
//! analyzer works on. The [`gpx`](crate::gpx) module builds one from a GPX
//! file; tests and other front ends can build one by hand.

/// One recorded position.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputPoint {
    pub lat: f64,
    pub lon: f64,
    /// Elevation recorded by the device, if any.
    pub elevation: Option<f64>,
}

impl InputPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            elevation: None,
        }
    }
}

/// One logical track made of raw sub-segments.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputTrack {
    pub name: Option<String>,
    /// Free text, possibly carrying an activity tag.
    pub description: Option<String>,
    pub segments: Vec<Vec<InputPoint>>,
}

impl InputTrack {
    /// Iterate over all points of all sub-segments in order.
    pub fn points(&self) -> impl Iterator<Item = &InputPoint> {
        self.segments.iter().flatten()
    }

    /// Number of points over all sub-segments.
    pub fn point_count(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }
}

/// A point of interest.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct InputWaypoint {
    pub lat: f64,
    pub lon: f64,
    pub elevation: Option<f64>,
    pub symbol: Option<String>,
    pub name: Option<String>,
}

/// Tracks and waypoints of one input document.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ParsedTrack {
    pub tracks: Vec<InputTrack>,
    pub waypoints: Vec<InputWaypoint>,
}

impl ParsedTrack {
    /// Iterate over every track point in run order.
    pub fn points(&self) -> impl Iterator<Item = &InputPoint> {
        self.tracks.iter().flat_map(InputTrack::points)
    }

    /// Total number of track points.
    pub fn point_count(&self) -> usize {
        self.tracks.iter().map(InputTrack::point_count).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.tracks.is_empty() && self.waypoints.is_empty()
    }
}
