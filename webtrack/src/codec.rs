//! WebTrack binary format.
//!
//! Layout, all integers big-endian:
//!
//! ```text
//! "webtrack-bin" ':' "2.0.0" ':'
//! u8 segment count, u16 waypoint count
//! per segment:   [u8; 2] activity, u8 elevation source ('F' = none), u32 point count
//! track info:    u32 total length (m)
//!                if more than one activity: per activity [u8; 2] code, u32 length (m)
//!                if any elevation: i16 min, i16 max, u32 gain, u32 loss
//! per segment, per point:
//!                first point i32 lon, i32 lat; then i16 Δlon, i16 Δlat (1e-5 degrees)
//!                u32 distance from segment start (dm)
//!                i16 elevation, if the segment has elevation
//! per waypoint:  i32 lon, i32 lat, u32 track point index, u8 elevation source,
//!                i16 elevation unless the source is 'F',
//!                symbol '\n' name '\n'
//! ```
//!
//! The activity table count is not stored: it is the number of distinct
//! activities in the segment headers.

use std::fs;
use std::io::{self, BufRead, Cursor, Read};
use std::path::Path;

use byteorder::{BigEndian as BE, ReadBytesExt, WriteBytesExt};
use tracing::debug;

use crate::activity::Activity;
use crate::dataset::NO_ELEVATION_CODE;
use crate::error::{Result, WebTrackError};
use crate::profile::{AltitudeStats, Segment, TrackPoint, TrackProfile, Waypoint};

/// Format name at the start of every file.
pub const FORMAT_NAME: &str = "webtrack-bin";

/// The only version read and written.
pub const FORMAT_VERSION: &str = "2.0.0";

const SEPARATOR: u8 = b':';
const TEXT_END: u8 = b'\n';

/// Fixed point scale of coordinates.
const COORD_SCALE: f64 = 1e5;

/// Decimeters per meter.
const DISTANCE_SCALE: f64 = 10.0;

/// Longest header field accepted by [`read_format_info`].
const MAX_HEADER_FIELD: usize = 32;

/// Name and version from a file header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormatInfo {
    pub name: String,
    pub version: String,
}

impl FormatInfo {
    /// Whether this library can decode the file.
    pub fn is_supported(&self) -> bool {
        self.name == FORMAT_NAME && self.version == FORMAT_VERSION
    }
}

fn to_i32(value: f64) -> Option<i32> {
    let value = value.round();
    (value >= i32::MIN as f64 && value <= i32::MAX as f64).then_some(value as i32)
}

fn to_i16(value: f64) -> Option<i16> {
    let value = value.round();
    (value >= i16::MIN as f64 && value <= i16::MAX as f64).then_some(value as i16)
}

fn to_u32(value: f64) -> Option<u32> {
    let value = value.round();
    (value >= 0.0 && value <= u32::MAX as f64).then_some(value as u32)
}

fn field_u32(value: f64, field: &'static str) -> Result<u32> {
    to_u32(value).ok_or(WebTrackError::ValueOutOfRange { field, value })
}

fn field_i16(value: f64, field: &'static str) -> Result<i16> {
    to_i16(value).ok_or(WebTrackError::ValueOutOfRange { field, value })
}

fn field_i32(value: f64, field: &'static str) -> Result<i32> {
    to_i32(value).ok_or(WebTrackError::ValueOutOfRange { field, value })
}

fn check_text(text: Option<&str>) -> Result<&[u8]> {
    let text = text.unwrap_or_default();
    if text.contains('\n') {
        return Err(WebTrackError::InvalidText {
            text: text.to_string(),
        });
    }
    Ok(text.as_bytes())
}

/// Serialize a profile.
///
/// # Errors
///
/// - [`WebTrackError::TooManyEntries`] for more than 255 segments or 65535
///   waypoints.
/// - [`WebTrackError::EncodingOverflow`] naming the global index of the first
///   point whose delta, distance or elevation does not fit its field.
/// - [`WebTrackError::MissingElevation`] for a point without elevation in a
///   segment that claims to have it.
/// - [`WebTrackError::InvalidText`] for waypoint text with a line feed.
pub fn encode(profile: &TrackProfile) -> Result<Vec<u8>> {
    let segment_count =
        u8::try_from(profile.segments.len()).map_err(|_| WebTrackError::TooManyEntries {
            what: "segments",
            count: profile.segments.len(),
            max: u8::MAX as usize,
        })?;
    let waypoint_count =
        u16::try_from(profile.waypoints.len()).map_err(|_| WebTrackError::TooManyEntries {
            what: "waypoints",
            count: profile.waypoints.len(),
            max: u16::MAX as usize,
        })?;

    let mut out = Vec::with_capacity(64 + profile.point_count() * 10);
    out.extend_from_slice(FORMAT_NAME.as_bytes());
    out.push(SEPARATOR);
    out.extend_from_slice(FORMAT_VERSION.as_bytes());
    out.push(SEPARATOR);
    out.write_u8(segment_count)?;
    out.write_u16::<BE>(waypoint_count)?;

    for segment in &profile.segments {
        out.extend_from_slice(&segment.activity.code());
        out.write_u8(segment.elevation_source.unwrap_or(NO_ELEVATION_CODE))?;
        let points = u32::try_from(segment.points.len()).map_err(|_| {
            WebTrackError::TooManyEntries {
                what: "points",
                count: segment.points.len(),
                max: u32::MAX as usize,
            }
        })?;
        out.write_u32::<BE>(points)?;
    }

    write_track_info(&mut out, profile)?;

    let mut index = 0;
    for (segment_index, segment) in profile.segments.iter().enumerate() {
        write_points(&mut out, segment, segment_index, &mut index)?;
    }

    for waypoint in &profile.waypoints {
        write_waypoint(&mut out, waypoint)?;
    }

    Ok(out)
}

fn write_track_info(out: &mut Vec<u8>, profile: &TrackProfile) -> Result<()> {
    out.write_u32::<BE>(field_u32(profile.total_length, "total length")?)?;

    let distinct = profile.distinct_activities();
    if distinct.len() > 1 {
        for activity in distinct {
            let length = profile
                .activities
                .iter()
                .find(|(a, _)| *a == activity)
                .map_or(0.0, |(_, length)| *length);
            out.extend_from_slice(&activity.code());
            out.write_u32::<BE>(field_u32(length, "activity length")?)?;
        }
    }

    if profile.has_elevation() {
        let stats = profile.altitude.unwrap_or_default();
        out.write_i16::<BE>(field_i16(stats.min, "minimum altitude")?)?;
        out.write_i16::<BE>(field_i16(stats.max, "maximum altitude")?)?;
        out.write_u32::<BE>(field_u32(stats.gain, "elevation gain")?)?;
        out.write_u32::<BE>(field_u32(stats.loss, "elevation loss")?)?;
    }
    Ok(())
}

fn write_points(
    out: &mut Vec<u8>,
    segment: &Segment,
    segment_index: usize,
    index: &mut usize,
) -> Result<()> {
    let overflow = |index: usize, reason| WebTrackError::EncodingOverflow { index, reason };
    let mut previous: Option<(i32, i32)> = None;

    for (point_index, point) in segment.points.iter().enumerate() {
        let lon = to_i32(point.lon * COORD_SCALE)
            .ok_or_else(|| overflow(*index, "coordinates out of range"))?;
        let lat = to_i32(point.lat * COORD_SCALE)
            .ok_or_else(|| overflow(*index, "coordinates out of range"))?;

        match previous {
            None => {
                out.write_i32::<BE>(lon)?;
                out.write_i32::<BE>(lat)?;
            }
            Some((prev_lon, prev_lat)) => {
                let delta = |current: i32, previous: i32| {
                    i16::try_from(current as i64 - previous as i64)
                        .map_err(|_| overflow(*index, "too far from previous point"))
                };
                out.write_i16::<BE>(delta(lon, prev_lon)?)?;
                out.write_i16::<BE>(delta(lat, prev_lat)?)?;
            }
        }
        previous = Some((lon, lat));

        let distance = to_u32(point.distance * DISTANCE_SCALE)
            .ok_or_else(|| overflow(*index, "too far from start point"))?;
        out.write_u32::<BE>(distance)?;

        if segment.has_elevation() {
            let elevation = point.elevation.ok_or(WebTrackError::MissingElevation {
                segment: segment_index,
                point: point_index,
            })?;
            let elevation =
                to_i16(elevation).ok_or_else(|| overflow(*index, "elevation out of range"))?;
            out.write_i16::<BE>(elevation)?;
        }

        *index += 1;
    }
    Ok(())
}

fn write_waypoint(out: &mut Vec<u8>, waypoint: &Waypoint) -> Result<()> {
    let symbol = check_text(waypoint.symbol.as_deref())?;
    let name = check_text(waypoint.name.as_deref())?;

    out.write_i32::<BE>(field_i32(waypoint.lon * COORD_SCALE, "waypoint longitude")?)?;
    out.write_i32::<BE>(field_i32(waypoint.lat * COORD_SCALE, "waypoint latitude")?)?;
    out.write_u32::<BE>(field_u32(waypoint.index as f64, "waypoint index")?)?;

    match (waypoint.elevation_source, waypoint.elevation) {
        (Some(source), Some(elevation)) => {
            out.write_u8(source)?;
            out.write_i16::<BE>(field_i16(elevation, "waypoint elevation")?)?;
        }
        _ => out.write_u8(NO_ELEVATION_CODE)?,
    }

    out.extend_from_slice(symbol);
    out.push(TEXT_END);
    out.extend_from_slice(name);
    out.push(TEXT_END);
    Ok(())
}

/// Encode a profile and write it to `path`.
///
/// Nothing is written unless encoding succeeds. Returns the file size.
pub fn write_file<P: AsRef<Path>>(path: P, profile: &TrackProfile) -> Result<usize> {
    let bytes = encode(profile)?;
    fs::write(path.as_ref(), &bytes)?;
    debug!(path = %path.as_ref().display(), size = bytes.len(), "wrote WebTrack");
    Ok(bytes.len())
}

/// Read just the header of a WebTrack stream.
///
/// Consumes the name, the version and both separators, nothing more.
pub fn read_format_info<R: Read>(mut reader: R) -> Result<FormatInfo> {
    let name = read_header_field(&mut reader)?;
    let version = read_header_field(&mut reader)?;
    Ok(FormatInfo { name, version })
}

fn read_header_field<R: Read>(reader: &mut R) -> Result<String> {
    let mut field = Vec::new();
    loop {
        let byte = reader.read_u8().map_err(|e| match e.kind() {
            io::ErrorKind::UnexpectedEof => {
                WebTrackError::MalformedWebTrack("truncated format header".to_string())
            }
            _ => WebTrackError::Io(e),
        })?;
        if byte == SEPARATOR {
            break;
        }
        if field.len() == MAX_HEADER_FIELD {
            return Err(WebTrackError::MalformedWebTrack(
                "missing format header".to_string(),
            ));
        }
        field.push(byte);
    }
    String::from_utf8(field)
        .map_err(|_| WebTrackError::MalformedWebTrack("missing format header".to_string()))
}

/// Whether the file at `path` has a header this library can decode.
///
/// Files without a recognisable header are reported as unsupported; only
/// I/O failures are errors.
pub fn is_supported_file<P: AsRef<Path>>(path: P) -> Result<bool> {
    let file = fs::File::open(path)?;
    match read_format_info(io::BufReader::new(file)) {
        Ok(info) => Ok(info.is_supported()),
        Err(WebTrackError::MalformedWebTrack(_)) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Read and decode a WebTrack file.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<TrackProfile> {
    decode(&fs::read(path)?)
}

struct Decoder<'a> {
    cursor: Cursor<&'a [u8]>,
}

fn malformed(what: impl Into<String>) -> WebTrackError {
    WebTrackError::MalformedWebTrack(what.into())
}

impl<'a> Decoder<'a> {
    fn remaining(&self) -> usize {
        let len = self.cursor.get_ref().len();
        len.saturating_sub(self.cursor.position() as usize)
    }

    fn u8(&mut self, what: &str) -> Result<u8> {
        self.cursor
            .read_u8()
            .map_err(|_| malformed(format!("truncated {what}")))
    }

    fn u16(&mut self, what: &str) -> Result<u16> {
        self.cursor
            .read_u16::<BE>()
            .map_err(|_| malformed(format!("truncated {what}")))
    }

    fn i16(&mut self, what: &str) -> Result<i16> {
        self.cursor
            .read_i16::<BE>()
            .map_err(|_| malformed(format!("truncated {what}")))
    }

    fn u32(&mut self, what: &str) -> Result<u32> {
        self.cursor
            .read_u32::<BE>()
            .map_err(|_| malformed(format!("truncated {what}")))
    }

    fn i32(&mut self, what: &str) -> Result<i32> {
        self.cursor
            .read_i32::<BE>()
            .map_err(|_| malformed(format!("truncated {what}")))
    }

    fn activity(&mut self, what: &str) -> Result<Activity> {
        let code = [self.u8(what)?, self.u8(what)?];
        Activity::from_code(code).ok_or_else(|| {
            malformed(format!(
                "unknown activity code {:?}",
                String::from_utf8_lossy(&code)
            ))
        })
    }

    fn elevation_source(&mut self, what: &str) -> Result<Option<u8>> {
        match self.u8(what)? {
            NO_ELEVATION_CODE => Ok(None),
            code if code.is_ascii_uppercase() => Ok(Some(code)),
            code => Err(malformed(format!("bad elevation source byte {code:#04x}"))),
        }
    }

    fn text(&mut self) -> Result<Option<String>> {
        let mut bytes = Vec::new();
        self.cursor.read_until(TEXT_END, &mut bytes)?;
        if bytes.pop() != Some(TEXT_END) {
            return Err(malformed("truncated waypoint text"));
        }
        let text = String::from_utf8(bytes).map_err(|_| malformed("waypoint text is not UTF-8"))?;
        Ok((!text.is_empty()).then_some(text))
    }
}

/// Decode a complete WebTrack file.
///
/// # Errors
///
/// - [`WebTrackError::UnsupportedFormat`] if the header is not
///   `webtrack-bin:2.0.0:`.
/// - [`WebTrackError::MalformedWebTrack`] if the data is truncated, has
///   trailing bytes or holds invalid codes.
pub fn decode(bytes: &[u8]) -> Result<TrackProfile> {
    let mut decoder = Decoder {
        cursor: Cursor::new(bytes),
    };

    let info = read_format_info(&mut decoder.cursor)?;
    if !info.is_supported() {
        return Err(WebTrackError::UnsupportedFormat {
            name: info.name,
            version: info.version,
        });
    }

    let segment_count = decoder.u8("segment count")?;
    let waypoint_count = decoder.u16("waypoint count")?;

    let mut segments = Vec::with_capacity(segment_count as usize);
    let mut point_counts = Vec::with_capacity(segment_count as usize);
    for _ in 0..segment_count {
        let activity = decoder.activity("segment header")?;
        let elevation_source = decoder.elevation_source("segment header")?;
        point_counts.push(decoder.u32("segment header")? as usize);
        segments.push(Segment {
            activity,
            elevation_source,
            points: Vec::new(),
        });
    }

    let mut profile = TrackProfile {
        segments,
        ..Default::default()
    };

    profile.total_length = decoder.u32("track length")? as f64;
    let distinct = profile.distinct_activities();
    if distinct.len() > 1 {
        for _ in 0..distinct.len() {
            let activity = decoder.activity("activity table")?;
            let length = decoder.u32("activity table")? as f64;
            profile.activities.push((activity, length));
        }
    } else if let Some(&activity) = distinct.first() {
        profile.activities.push((activity, profile.total_length));
    }

    if profile.has_elevation() {
        profile.altitude = Some(AltitudeStats {
            min: decoder.i16("altitude")? as f64,
            max: decoder.i16("altitude")? as f64,
            gain: decoder.u32("altitude")? as f64,
            loss: decoder.u32("altitude")? as f64,
        });
    }

    for (segment, count) in profile.segments.iter_mut().zip(point_counts) {
        let with_elevation = segment.has_elevation();
        // Each point takes at least six bytes; do not trust the header further.
        segment.points.reserve(count.min(decoder.remaining() / 6));

        let mut previous: Option<(i32, i32)> = None;
        for _ in 0..count {
            let (lon, lat) = match previous {
                None => (decoder.i32("point")?, decoder.i32("point")?),
                Some((prev_lon, prev_lat)) => {
                    let d_lon = decoder.i16("point")? as i32;
                    let d_lat = decoder.i16("point")? as i32;
                    (
                        prev_lon
                            .checked_add(d_lon)
                            .ok_or_else(|| malformed("coordinate overflow"))?,
                        prev_lat
                            .checked_add(d_lat)
                            .ok_or_else(|| malformed("coordinate overflow"))?,
                    )
                }
            };
            previous = Some((lon, lat));

            let distance = decoder.u32("point")? as f64 / DISTANCE_SCALE;
            let elevation = if with_elevation {
                Some(decoder.i16("point")? as f64)
            } else {
                None
            };

            segment.points.push(TrackPoint {
                lon: lon as f64 / COORD_SCALE,
                lat: lat as f64 / COORD_SCALE,
                distance,
                elevation,
            });
        }
    }

    let point_count = profile.point_count();
    for _ in 0..waypoint_count {
        let lon = decoder.i32("waypoint")? as f64 / COORD_SCALE;
        let lat = decoder.i32("waypoint")? as f64 / COORD_SCALE;
        let index = decoder.u32("waypoint")? as usize;
        if index > 0 && index >= point_count {
            return Err(malformed(format!(
                "waypoint index {index} beyond {point_count} track points"
            )));
        }

        let elevation_source = decoder.elevation_source("waypoint")?;
        let elevation = match elevation_source {
            Some(_) => Some(decoder.i16("waypoint")? as f64),
            None => None,
        };

        profile.waypoints.push(Waypoint {
            lon,
            lat,
            elevation,
            elevation_source,
            symbol: decoder.text()?,
            name: decoder.text()?,
            index,
        });
    }

    let trailing = decoder.remaining();
    if trailing > 0 {
        return Err(malformed(format!("{trailing} trailing bytes")));
    }

    Ok(profile)
}
