//! GeoJSON export of a track profile.
//!
//! Enable the `geojson` feature to use this module.
//!
//! # Example
//!
//! ```ignore
//! use webtrack::{codec, geojson::to_feature_collection};
//!
//! let profile = codec::read_file("track.webtrack")?;
//! println!("{}", to_feature_collection(&profile));
//! ```

use geojson::{Feature, FeatureCollection, Geometry, JsonObject, JsonValue, Value as GeoJsonValue};

use crate::profile::{TrackPoint, TrackProfile};

/// Symbol of the feature marking the start of the track.
pub const FIRST_POINT: &str = "First Point";

/// Symbol of the feature marking the end of the track.
pub const LAST_POINT: &str = "Last Point";

fn feature(value: GeoJsonValue, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(value)),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

fn marker(point: &TrackPoint, sym: &str) -> Feature {
    let mut properties = JsonObject::new();
    properties.insert("sym".to_string(), JsonValue::from(sym));
    properties.insert("notClustered".to_string(), JsonValue::Bool(true));
    feature(GeoJsonValue::Point(vec![point.lon, point.lat]), properties)
}

/// Features of a profile, in this order:
///
/// - one `LineString` per segment with an `activity` property,
/// - `First Point` and `Last Point` markers when the track has points,
/// - one `Point` per waypoint with `sym` and `name` properties.
pub fn to_feature_collection(profile: &TrackProfile) -> FeatureCollection {
    let mut features = Vec::with_capacity(profile.segments.len() + profile.waypoints.len() + 2);

    for segment in &profile.segments {
        let coordinates = segment.points.iter().map(|p| vec![p.lon, p.lat]).collect();
        let mut properties = JsonObject::new();
        properties.insert(
            "activity".to_string(),
            JsonValue::from(segment.activity.name()),
        );
        properties.insert("notClustered".to_string(), JsonValue::Bool(true));
        features.push(feature(GeoJsonValue::LineString(coordinates), properties));
    }

    if let (Some(first), Some(last)) = (profile.points().next(), profile.points().last()) {
        features.push(marker(first, FIRST_POINT));
        features.push(marker(last, LAST_POINT));
    }

    for waypoint in &profile.waypoints {
        let mut properties = JsonObject::new();
        properties.insert(
            "sym".to_string(),
            JsonValue::from(waypoint.symbol.as_deref().unwrap_or_default()),
        );
        properties.insert(
            "name".to_string(),
            waypoint
                .name
                .as_deref()
                .map_or(JsonValue::Null, JsonValue::from),
        );
        features.push(feature(
            GeoJsonValue::Point(vec![waypoint.lon, waypoint.lat]),
            properties,
        ));
    }

    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::activity::Activity;
    use crate::profile::{Segment, Waypoint};

    fn point(lon: f64, lat: f64) -> TrackPoint {
        TrackPoint {
            lon,
            lat,
            ..Default::default()
        }
    }

    #[test]
    fn test_feature_collection() {
        let profile = TrackProfile {
            segments: vec![
                Segment {
                    activity: Activity::Ski,
                    elevation_source: None,
                    points: vec![point(6.0, 45.0), point(6.1, 45.1)],
                },
                Segment {
                    activity: Activity::Bus,
                    elevation_source: None,
                    points: vec![point(6.2, 45.2)],
                },
            ],
            waypoints: vec![Waypoint {
                lon: 6.05,
                lat: 45.05,
                symbol: Some("Hut".to_string()),
                name: Some("Refuge".to_string()),
                ..Default::default()
            }],
            ..Default::default()
        };

        let collection = to_feature_collection(&profile);
        assert_eq!(collection.features.len(), 5);

        let props = collection.features[0].properties.as_ref().unwrap();
        assert_eq!(props["activity"], "SKI");
        match &collection.features[0].geometry.as_ref().unwrap().value {
            GeoJsonValue::LineString(coords) => assert_eq!(coords.len(), 2),
            other => panic!("Expected LineString, got {other:?}"),
        }

        let first = &collection.features[2];
        assert_eq!(first.properties.as_ref().unwrap()["sym"], FIRST_POINT);
        let last = &collection.features[3];
        assert_eq!(last.properties.as_ref().unwrap()["sym"], LAST_POINT);
        assert_eq!(
            last.geometry.as_ref().unwrap().value,
            GeoJsonValue::Point(vec![6.2, 45.2])
        );

        let waypoint = collection.features[4].properties.as_ref().unwrap();
        assert_eq!(waypoint["sym"], "Hut");
        assert_eq!(waypoint["name"], "Refuge");
    }

    #[test]
    fn test_empty_profile() {
        let collection = to_feature_collection(&TrackProfile::default());
        assert!(collection.features.is_empty());
    }
}
