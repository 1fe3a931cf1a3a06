//! Track analysis.
//!
//! [`analyze`] turns a [`ParsedTrack`] into a [`TrackProfile`]: every track
//! becomes one segment with cumulative distances, an activity and, when a DEM
//! is given, terrain elevations. Waypoints are snapped to the closest track
//! point and flat tracks lose their elevation profile.
//!
//! Elevations recorded by the GPS device are ignored; only DEM heights are
//! used.

use std::borrow::Cow;

use geo::{Coord, LineString, SimplifyIdx};
use tracing::{debug, info};

use crate::activity::Activity;
use crate::dataset::Dataset;
use crate::error::{Result, WebTrackError};
use crate::profile::{AltitudeStats, Segment, TrackPoint, TrackProfile, Waypoint};
use crate::sampler::ElevationSource;
use crate::track::{InputPoint, InputTrack, ParsedTrack};

/// Mean Earth radius in meters.
pub const EARTH_RADIUS: f64 = 6_371_000.0;

/// Minimum spacings of the smoothing passes, in meters. They share no common
/// period so grid steps do not line up between passes.
pub const SMOOTHING_SPACINGS: [f64; 3] = [35.0, 141.0, 241.0];

/// Percent of climb per distance below which a track counts as flat.
pub const DEFAULT_FLATNESS_THRESHOLD: f64 = 2.0;

/// Distance in meters under which a waypoint is close to the track.
pub const DEFAULT_CLOSE_ENOUGH: f64 = 500.0;

/// Simplification tolerance in meters used when none is given.
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 10.0;

/// How track point elevations are taken from the DEM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ElevationMode {
    /// One sample per point.
    Direct,
    /// Average of three interpolated passes at different spacings.
    #[default]
    Smoothed,
}

/// Knobs for [`analyze`].
#[derive(Debug, Clone, PartialEq)]
pub struct AnalyzerOptions {
    /// How DEM elevations are assigned to track points.
    pub mode: ElevationMode,
    /// Flatness in percent below which elevation is dropped; see [`is_flat`].
    pub flatness_threshold: f64,
    /// Keep elevation even when the track is flat.
    pub force_elevation: bool,
    /// Waypoint snapping distance in meters. Leaving the track means going twice as far.
    pub close_enough: f64,
    /// Ramer-Douglas-Peucker tolerance in meters applied to each raw sub-segment.
    pub simplify: Option<f64>,
}

impl Default for AnalyzerOptions {
    fn default() -> Self {
        Self {
            mode: ElevationMode::default(),
            flatness_threshold: DEFAULT_FLATNESS_THRESHOLD,
            force_elevation: false,
            close_enough: DEFAULT_CLOSE_ENOUGH,
            simplify: None,
        }
    }
}

impl AnalyzerOptions {
    /// Distance in meters that ends a waypoint's snapping scan.
    pub fn far_enough(&self) -> f64 {
        2.0 * self.close_enough
    }
}

/// A terrain model and the code identifying it in WebTrack files.
#[derive(Clone, Copy)]
pub struct Dem<'a> {
    pub source: &'a dyn ElevationSource,
    pub code: u8,
}

impl<'a> Dem<'a> {
    pub fn new(source: &'a dyn ElevationSource, dataset: Dataset) -> Self {
        Self {
            source,
            code: dataset.code(),
        }
    }
}

/// Great-circle distance in meters.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lon = (lon2 - lon1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS * a.sqrt().asin()
}

fn point_distance(a: &InputPoint, b: &InputPoint) -> f64 {
    haversine_distance(a.lat, a.lon, b.lat, b.lon)
}

/// Cumulative distance of every point from the first one.
fn cumulative_distances(points: &[InputPoint]) -> Vec<f64> {
    let mut total = 0.0;
    let mut distances = Vec::with_capacity(points.len());
    for (i, point) in points.iter().enumerate() {
        if i > 0 {
            total += point_distance(&points[i - 1], point);
        }
        distances.push(total);
    }
    distances
}

/// Linearly interpolate gaps between known values by distance.
///
/// Values before the first or after the last known one stay missing.
fn interpolate_missing(distances: &[f64], values: &mut [Option<f64>]) {
    let mut previous: Option<usize> = None;
    for i in 0..values.len() {
        let Some(end_value) = values[i] else {
            continue;
        };
        if let Some(start) = previous {
            if let Some(start_value) = values[start] {
                let span = distances[i] - distances[start];
                for j in start + 1..i {
                    let t = if span > 0.0 {
                        (distances[j] - distances[start]) / span
                    } else {
                        0.0
                    };
                    values[j] = Some(start_value + t * (end_value - start_value));
                }
            }
        }
        previous = Some(i);
    }
}

/// One smoothing pass over a raw sub-segment.
fn sample_at_spacing(
    points: &[InputPoint],
    distances: &[f64],
    spacing: f64,
    source: &dyn ElevationSource,
) -> Result<Vec<Option<f64>>> {
    let last = points.len().saturating_sub(1);
    let mut threshold = 0.0;
    let mut values = Vec::with_capacity(points.len());

    for (i, (point, &distance)) in points.iter().zip(distances).enumerate() {
        if i == 0 || i == last || distance > threshold {
            threshold += spacing;
            values.push(source.elevation(point.lat, point.lon)?);
        } else {
            values.push(None);
        }
    }

    interpolate_missing(distances, &mut values);
    Ok(values)
}

/// Smoothed elevations for one raw sub-segment.
///
/// A point is `None` only if no pass produced a value for it.
pub fn smoothed_elevations(
    points: &[InputPoint],
    source: &dyn ElevationSource,
) -> Result<Vec<Option<f64>>> {
    let distances = cumulative_distances(points);
    let passes = SMOOTHING_SPACINGS
        .iter()
        .map(|&spacing| sample_at_spacing(points, &distances, spacing, source))
        .collect::<Result<Vec<_>>>()?;

    Ok((0..points.len())
        .map(|i| {
            let (sum, count) = passes
                .iter()
                .filter_map(|pass| pass[i])
                .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
            (count > 0).then(|| sum / count as f64)
        })
        .collect())
}

/// Elevations for one raw sub-segment in the given mode.
pub fn elevations(
    points: &[InputPoint],
    source: &dyn ElevationSource,
    mode: ElevationMode,
) -> Result<Vec<Option<f64>>> {
    match mode {
        ElevationMode::Direct => points
            .iter()
            .map(|p| source.elevation(p.lat, p.lon))
            .collect(),
        ElevationMode::Smoothed => smoothed_elevations(points, source),
    }
}

/// Ramer-Douglas-Peucker simplification of one raw sub-segment.
///
/// Points are projected to local meters around the first point, so
/// `tolerance` is a distance in meters. The first and last points are kept.
pub fn simplify(points: &[InputPoint], tolerance: f64) -> Vec<InputPoint> {
    if points.len() < 3 {
        return points.to_vec();
    }

    let meters_per_degree = EARTH_RADIUS * std::f64::consts::PI / 180.0;
    let x_scale = meters_per_degree * points[0].lat.to_radians().cos();
    let line: LineString<f64> = points
        .iter()
        .map(|p| Coord {
            x: p.lon * x_scale,
            y: p.lat * meters_per_degree,
        })
        .collect();

    line.simplify_idx(&tolerance)
        .into_iter()
        .map(|i| points[i])
        .collect()
}

/// Index of the track point closest to `(lat, lon)`.
///
/// Points are scanned in order. Once within `close_enough` meters the closest
/// point is tracked; moving further than `far_enough` afterwards ends the
/// scan, so a track that comes back later does not steal the waypoint.
/// Returns 0 when the track never comes close.
pub fn snap_waypoint<I>(lat: f64, lon: f64, points: I, close_enough: f64, far_enough: f64) -> usize
where
    I: IntoIterator<Item = (f64, f64)>,
{
    let mut best = 0;
    let mut min_distance = f64::INFINITY;
    let mut entered = false;

    for (i, (p_lat, p_lon)) in points.into_iter().enumerate() {
        let distance = haversine_distance(lat, lon, p_lat, p_lon);
        if distance < close_enough {
            entered = true;
            if distance < min_distance {
                min_distance = distance;
                best = i;
            }
        } else if entered && distance > far_enough {
            break;
        }
    }
    best
}

/// Climb and descent as a percentage of the length. Zero length gives 0.
pub fn flatness(gain: f64, loss: f64, length: f64) -> f64 {
    if length > 0.0 {
        100.0 * (gain + loss) / length
    } else {
        0.0
    }
}

/// Whether a track should be shipped without elevation.
pub fn is_flat(gain: f64, loss: f64, length: f64, threshold: f64) -> bool {
    flatness(gain, loss, length) < threshold
}

fn track_activity(track: &InputTrack) -> Activity {
    track
        .description
        .as_deref()
        .map_or(Activity::Undefined, Activity::from_description)
}

#[derive(Default)]
struct AltitudeAccumulator {
    stats: Option<AltitudeStats>,
}

impl AltitudeAccumulator {
    fn add(&mut self, elevation: f64, previous: Option<f64>) {
        let stats = self.stats.get_or_insert(AltitudeStats {
            min: elevation,
            max: elevation,
            gain: 0.0,
            loss: 0.0,
        });
        stats.min = stats.min.min(elevation);
        stats.max = stats.max.max(elevation);
        if let Some(previous) = previous {
            let delta = elevation - previous;
            if delta > 0.0 {
                stats.gain += delta;
            } else {
                stats.loss -= delta;
            }
        }
    }
}

/// Analyze a parsed track.
///
/// Without a DEM the profile carries no elevation at all. With one, every
/// track point must get an elevation or the analysis fails with
/// [`WebTrackError::MissingElevation`], which callers may answer by retrying
/// without a DEM.
pub fn analyze(
    parsed: &ParsedTrack,
    dem: Option<Dem<'_>>,
    options: &AnalyzerOptions,
) -> Result<TrackProfile> {
    let mut segments = Vec::with_capacity(parsed.tracks.len());
    let mut activities: Vec<(Activity, f64)> = Vec::new();
    let mut altitude = AltitudeAccumulator::default();
    let mut total_length = 0.0;

    for (segment_index, track) in parsed.tracks.iter().enumerate() {
        let activity = track_activity(track);
        let mut points = Vec::with_capacity(track.point_count());
        let mut length = 0.0;
        let mut previous: Option<InputPoint> = None;
        let mut previous_elevation = None;

        for raw in &track.segments {
            let raw: Cow<'_, [InputPoint]> = match options.simplify {
                Some(tolerance) => Cow::Owned(simplify(raw, tolerance)),
                None => Cow::Borrowed(raw),
            };
            let heights = match dem {
                Some(dem) => elevations(&raw, dem.source, options.mode)?,
                None => vec![None; raw.len()],
            };

            for (point, elevation) in raw.iter().zip(heights) {
                if let Some(previous) = &previous {
                    length += point_distance(previous, point);
                }
                previous = Some(*point);

                if dem.is_some() {
                    let Some(elevation) = elevation else {
                        return Err(WebTrackError::MissingElevation {
                            segment: segment_index,
                            point: points.len(),
                        });
                    };
                    altitude.add(elevation, previous_elevation);
                    previous_elevation = Some(elevation);
                }

                points.push(TrackPoint {
                    lon: point.lon,
                    lat: point.lat,
                    distance: length,
                    elevation,
                });
            }
        }

        total_length += length;
        match activities.iter_mut().find(|(a, _)| *a == activity) {
            Some((_, total)) => *total += length,
            None => activities.push((activity, length)),
        }
        segments.push(Segment {
            activity,
            elevation_source: dem.map(|dem| dem.code),
            points,
        });
    }

    let mut waypoints = Vec::with_capacity(parsed.waypoints.len());
    for waypoint in &parsed.waypoints {
        let index = snap_waypoint(
            waypoint.lat,
            waypoint.lon,
            segments
                .iter()
                .flat_map(|s| s.points.iter())
                .map(|p| (p.lat, p.lon)),
            options.close_enough,
            options.far_enough(),
        );
        let elevation = match dem {
            Some(dem) => dem.source.elevation(waypoint.lat, waypoint.lon)?,
            None => None,
        };
        waypoints.push(Waypoint {
            lon: waypoint.lon,
            lat: waypoint.lat,
            elevation,
            elevation_source: elevation.and(dem.map(|dem| dem.code)),
            symbol: waypoint.symbol.clone(),
            name: waypoint.name.clone(),
            index,
        });
    }

    let mut profile = TrackProfile {
        segments,
        waypoints,
        total_length,
        activities,
        altitude: None,
    };
    if profile.has_elevation() {
        profile.altitude = Some(altitude.stats.unwrap_or_default());
    }

    if let Some(stats) = profile.altitude {
        let derivative = flatness(stats.gain, stats.loss, total_length);
        if derivative < options.flatness_threshold && !options.force_elevation {
            info!(
                derivative = %format!("{:.1}%", derivative),
                "The track is almost flat, elevation removed"
            );
            profile.strip_elevation();
        }
    }

    debug!(
        segments = profile.segments.len(),
        waypoints = profile.waypoints.len(),
        length = profile.total_length,
        elevation = profile.has_elevation(),
        "analyzed track"
    );
    Ok(profile)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::InputWaypoint;

    /// Points along the 45th parallel, `step` degrees apart.
    fn straight(n: usize, step: f64) -> Vec<InputPoint> {
        (0..n)
            .map(|i| InputPoint::new(45.0, 6.0 + i as f64 * step))
            .collect()
    }

    fn track(description: Option<&str>, points: Vec<InputPoint>) -> InputTrack {
        InputTrack {
            name: None,
            description: description.map(str::to_string),
            segments: vec![points],
        }
    }

    fn flat_ground(_lat: f64, _lon: f64) -> Result<Option<f64>> {
        Ok(Some(100.0))
    }

    #[test]
    fn test_haversine() {
        assert_eq!(haversine_distance(45.0, 6.0, 45.0, 6.0), 0.0);
        // One degree of latitude
        let d = haversine_distance(0.0, 0.0, 1.0, 0.0);
        assert!((d - 111_194.9).abs() < 1.0, "got {d}");
    }

    #[test]
    fn test_snapping_returns_point_index() {
        let points = straight(20, 0.001);
        for k in [0, 7, 19] {
            let index = snap_waypoint(
                points[k].lat,
                points[k].lon,
                points.iter().map(|p| (p.lat, p.lon)),
                DEFAULT_CLOSE_ENOUGH,
                2.0 * DEFAULT_CLOSE_ENOUGH,
            );
            assert_eq!(index, k);
        }
    }

    #[test]
    fn test_snapping_never_close() {
        let points = straight(10, 0.001);
        let index = snap_waypoint(
            50.0,
            6.0,
            points.iter().map(|p| (p.lat, p.lon)),
            500.0,
            1000.0,
        );
        assert_eq!(index, 0);
    }

    #[test]
    fn test_snapping_hysteresis() {
        // Out and back: the return leg passes exactly over the waypoint,
        // but the first approach wins.
        let mut points = straight(40, 0.001);
        let back: Vec<InputPoint> = points.iter().rev().cloned().collect();
        points.extend(back);

        let waypoint = InputPoint::new(45.0005, 6.005);
        let index = snap_waypoint(
            waypoint.lat,
            waypoint.lon,
            points.iter().map(|p| (p.lat, p.lon)),
            500.0,
            1000.0,
        );
        assert_eq!(index, 5);
    }

    #[test]
    fn test_flatness() {
        assert!(is_flat(1.0, 1.0, 1000.0, DEFAULT_FLATNESS_THRESHOLD));
        assert!(!is_flat(80.0, 20.0, 1000.0, DEFAULT_FLATNESS_THRESHOLD));
        assert_eq!(flatness(10.0, 10.0, 0.0), 0.0);
        assert!((flatness(80.0, 20.0, 1000.0) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_interpolate_missing() {
        let distances = [0.0, 10.0, 30.0, 40.0, 50.0];
        let mut values = [None, Some(100.0), None, Some(130.0), None];
        interpolate_missing(&distances, &mut values);
        assert_eq!(values, [None, Some(100.0), Some(120.0), Some(130.0), None]);
    }

    #[test]
    fn test_sample_at_spacing_picks_points() {
        let points = straight(10, 0.0005); // ~39 m apart
        let distances = cumulative_distances(&points);
        let calls = std::cell::Cell::new(0);
        let counting = |_lat: f64, _lon: f64| -> Result<Option<f64>> {
            calls.set(calls.get() + 1);
            Ok(Some(10.0))
        };

        let values = sample_at_spacing(&points, &distances, 141.0, &counting).unwrap();
        assert!(values.iter().all(|v| *v == Some(10.0)));
        assert!(calls.get() < points.len());
        assert!(calls.get() >= 2);
    }

    #[test]
    fn test_smoothed_follows_slope() {
        // Elevation grows linearly with longitude: smoothing must keep it.
        let slope = |_lat: f64, lon: f64| -> Result<Option<f64>> { Ok(Some((lon - 6.0) * 10_000.0)) };
        let points = straight(30, 0.0005);
        let values = smoothed_elevations(&points, &slope).unwrap();

        for (point, value) in points.iter().zip(values) {
            let expected = (point.lon - 6.0) * 10_000.0;
            assert!((value.unwrap() - expected).abs() < 1e-6);
        }
    }

    #[test]
    fn test_smoothed_keeps_partial_passes() {
        // Only the last point has data: every point before it stays empty,
        // the last one keeps its sample.
        let points = straight(5, 0.001);
        let last_lon = points[4].lon;
        let sparse = move |_lat: f64, lon: f64| -> Result<Option<f64>> {
            Ok(((lon - last_lon).abs() < 1e-9).then_some(42.0))
        };
        let values = smoothed_elevations(&points, &sparse).unwrap();
        assert_eq!(values, vec![None, None, None, None, Some(42.0)]);
    }

    #[test]
    fn test_analyze_without_dem() {
        let parsed = ParsedTrack {
            tracks: vec![
                track(Some("(webtrack activity: bus)"), straight(3, 0.01)),
                track(None, straight(2, 0.01)),
                track(Some("(webtrack activity: bus)"), straight(2, 0.01)),
            ],
            waypoints: vec![InputWaypoint {
                lat: 45.0,
                lon: 6.01,
                symbol: Some("Flag".to_string()),
                ..Default::default()
            }],
        };

        let profile = analyze(&parsed, None, &AnalyzerOptions::default()).unwrap();
        assert_eq!(profile.segments.len(), 3);
        assert!(!profile.has_elevation());
        assert!(profile.altitude.is_none());

        let step = haversine_distance(45.0, 6.0, 45.0, 6.01);
        assert!((profile.segments[0].length() - 2.0 * step).abs() < 1e-6);
        assert_eq!(profile.segments[1].points[0].distance, 0.0);
        assert!((profile.total_length - 4.0 * step).abs() < 1e-6);

        assert_eq!(profile.activities.len(), 2);
        assert_eq!(profile.activities[0].0, Activity::Bus);
        assert!((profile.activities[0].1 - 3.0 * step).abs() < 1e-6);
        assert_eq!(profile.activities[1].0, Activity::Undefined);

        assert_eq!(profile.waypoints[0].index, 1);
        assert_eq!(profile.waypoints[0].elevation_source, None);
    }

    #[test]
    fn test_analyze_joins_sub_segments() {
        let parsed = ParsedTrack {
            tracks: vec![InputTrack {
                segments: vec![straight(2, 0.01), vec![InputPoint::new(45.0, 6.03)]],
                ..Default::default()
            }],
            waypoints: vec![],
        };
        let profile = analyze(&parsed, None, &AnalyzerOptions::default()).unwrap();
        assert_eq!(profile.segments.len(), 1);
        assert_eq!(profile.segments[0].points.len(), 3);

        let expected = haversine_distance(45.0, 6.0, 45.0, 6.03);
        assert!((profile.total_length - expected).abs() < 1e-6);
    }

    #[test]
    fn test_analyze_flat_track_demoted() {
        let parsed = ParsedTrack {
            tracks: vec![track(None, straight(10, 0.001))],
            waypoints: vec![InputWaypoint {
                lat: 45.0,
                lon: 6.0,
                ..Default::default()
            }],
        };
        let dem = Dem {
            source: &flat_ground,
            code: b'E',
        };

        let profile = analyze(&parsed, Some(dem), &AnalyzerOptions::default()).unwrap();
        assert!(!profile.has_elevation());
        assert!(profile.altitude.is_none());
        assert_eq!(profile.waypoints[0].elevation, None);

        let forced = AnalyzerOptions {
            force_elevation: true,
            ..Default::default()
        };
        let profile = analyze(&parsed, Some(dem), &forced).unwrap();
        assert_eq!(profile.segments[0].elevation_source, Some(b'E'));
        assert_eq!(profile.waypoints[0].elevation, Some(100.0));
        let stats = profile.altitude.unwrap();
        assert_eq!((stats.min, stats.max, stats.gain, stats.loss), (100.0, 100.0, 0.0, 0.0));
    }

    #[test]
    fn test_analyze_steep_track_keeps_elevation() {
        // 100 m of climb per ~79 m point spacing, then back down
        let zigzag = |_lat: f64, lon: f64| -> Result<Option<f64>> {
            let step = ((lon - 6.0) / 0.001).round() as i64;
            Ok(Some(if step % 2 == 0 { 100.0 } else { 200.0 }))
        };
        let parsed = ParsedTrack {
            tracks: vec![track(None, straight(5, 0.001))],
            waypoints: vec![],
        };
        let options = AnalyzerOptions {
            mode: ElevationMode::Direct,
            ..Default::default()
        };

        let profile = analyze(
            &parsed,
            Some(Dem {
                source: &zigzag,
                code: b'G',
            }),
            &options,
        )
        .unwrap();
        let stats = profile.altitude.unwrap();
        assert_eq!(stats.min, 100.0);
        assert_eq!(stats.max, 200.0);
        assert_eq!(stats.gain, 200.0);
        assert_eq!(stats.loss, 200.0);
        assert!(profile.points().all(|p| p.elevation.is_some()));
    }

    #[test]
    fn test_analyze_missing_elevation() {
        let void = |_lat: f64, lon: f64| -> Result<Option<f64>> {
            Ok((lon < 6.0025).then_some(10.0))
        };
        let parsed = ParsedTrack {
            tracks: vec![
                track(None, straight(2, 0.001)),
                track(None, straight(5, 0.001)),
            ],
            waypoints: vec![],
        };
        let options = AnalyzerOptions {
            mode: ElevationMode::Direct,
            ..Default::default()
        };

        match analyze(&parsed, Some(Dem { source: &void, code: b'E' }), &options) {
            Err(WebTrackError::MissingElevation { segment, point }) => {
                assert_eq!((segment, point), (1, 3));
            }
            other => panic!("Expected MissingElevation, got {other:?}"),
        }
    }

    #[test]
    fn test_analyze_missing_elevation_smoothed() {
        // No data east of 7°: the whole second track is void
        let void_east = |_lat: f64, lon: f64| -> Result<Option<f64>> {
            Ok((lon < 7.0).then_some(10.0))
        };
        let parsed = ParsedTrack {
            tracks: vec![
                track(None, straight(3, 0.001)),
                InputTrack {
                    segments: vec![(0..4)
                        .map(|i| InputPoint::new(45.0, 7.1 + i as f64 * 0.001))
                        .collect()],
                    ..Default::default()
                },
            ],
            waypoints: vec![],
        };
        let dem = Dem {
            source: &void_east,
            code: b'E',
        };

        match analyze(&parsed, Some(dem), &AnalyzerOptions::default()) {
            Err(WebTrackError::MissingElevation { segment, point }) => {
                assert_eq!((segment, point), (1, 0));
            }
            other => panic!("Expected MissingElevation, got {other:?}"),
        }
    }

    #[test]
    fn test_analyze_single_point_with_dem() {
        let parsed = ParsedTrack {
            tracks: vec![track(None, vec![InputPoint::new(45.0, 6.0)])],
            waypoints: vec![],
        };
        let dem = Dem {
            source: &flat_ground,
            code: b'J',
        };

        // Zero length counts as flat
        let profile = analyze(&parsed, Some(dem), &AnalyzerOptions::default()).unwrap();
        assert_eq!(profile.point_count(), 1);
        assert!(!profile.has_elevation());
        assert!(crate::codec::encode(&profile).is_ok());

        let forced = AnalyzerOptions {
            force_elevation: true,
            ..Default::default()
        };
        let profile = analyze(&parsed, Some(dem), &forced).unwrap();
        assert_eq!(profile.total_length, 0.0);
        assert_eq!(profile.segments[0].points[0].elevation, Some(100.0));
        let decoded = crate::codec::decode(&crate::codec::encode(&profile).unwrap()).unwrap();
        assert_eq!(decoded.segments[0].elevation_source, Some(b'J'));
        assert_eq!(decoded.points().next().unwrap().elevation, Some(100.0));
    }

    #[test]
    fn test_simplify_drops_collinear_points() {
        let points = straight(10, 0.001);
        let simplified = simplify(&points, DEFAULT_SIMPLIFY_TOLERANCE);
        assert_eq!(simplified, vec![points[0], points[9]]);

        assert_eq!(simplify(&points[..2], 10.0), points[..2].to_vec());
    }

    #[test]
    fn test_simplify_keeps_corners() {
        // East along the parallel, then north along the meridian
        let points = vec![
            InputPoint::new(45.0, 6.0),
            InputPoint::new(45.0, 6.001),
            InputPoint::new(45.0, 6.002),
            InputPoint::new(45.001, 6.002),
            InputPoint::new(45.002, 6.002),
        ];
        let simplified = simplify(&points, DEFAULT_SIMPLIFY_TOLERANCE);
        assert_eq!(simplified, vec![points[0], points[2], points[4]]);
    }

    #[test]
    fn test_analyze_simplified() {
        let parsed = ParsedTrack {
            tracks: vec![track(None, straight(10, 0.001))],
            waypoints: vec![InputWaypoint {
                lat: 45.0,
                lon: 6.009,
                ..Default::default()
            }],
        };
        let options = AnalyzerOptions {
            simplify: Some(DEFAULT_SIMPLIFY_TOLERANCE),
            ..Default::default()
        };

        let profile = analyze(&parsed, None, &options).unwrap();
        assert_eq!(profile.point_count(), 2);
        let expected = haversine_distance(45.0, 6.0, 45.0, 6.009);
        assert!((profile.total_length - expected).abs() < 1e-6);
        assert_eq!(profile.waypoints[0].index, 1);
        assert!(profile.waypoints[0].index < profile.point_count());
        assert!(crate::codec::encode(&profile).is_ok());
    }
}
