//! Point extraction from event geometry.
//!
//! EONET encodes positions as GeoJSON, so a `Point` carries its coordinates
//! as `[lon, lat]`. Only points are renderable as markers; every other
//! geometry type (and any malformed point) yields no coordinate.

use eonet_types::{Event, GeometryRecord, LatLon, MapPoint};

/// Extract the coordinate of a `Point` geometry record.
///
/// Returns `None` unless the record is a `Point` whose coordinates are an
/// array of at least two finite numbers with the longitude in
/// `[-180, 180]` and the latitude in `[-90, 90]`.
pub fn extract_point(geometry: &GeometryRecord) -> Option<LatLon> {
    if geometry.kind != "Point" {
        return None;
    }
    point_from_coordinates(&geometry.coordinates)
}

/// Extract a point from a raw GeoJSON geometry object.
///
/// Same rules as [`extract_point`], applied to untyped JSON such as the
/// `geometry` member of a feed record.
pub fn extract_point_value(geometry: &serde_json::Value) -> Option<LatLon> {
    if geometry.get("type").and_then(serde_json::Value::as_str) != Some("Point") {
        return None;
    }
    point_from_coordinates(geometry.get("coordinates")?)
}

/// Position of the first `Point` record of an event.
pub fn first_point(records: &[GeometryRecord]) -> Option<LatLon> {
    records.iter().find_map(extract_point)
}

/// Derive map points, one per event with a point geometry, in event order.
pub fn map_points(events: &[Event]) -> Vec<MapPoint> {
    events
        .iter()
        .filter_map(|event| {
            let position = first_point(&event.geometry_records)?;
            Some(MapPoint {
                id: event.id.clone(),
                title: event.title.clone(),
                lat: position.lat,
                lon: position.lon,
            })
        })
        .collect()
}

fn point_from_coordinates(coordinates: &serde_json::Value) -> Option<LatLon> {
    let pair = coordinates.as_array()?;
    let lon = pair.first()?.as_f64()?;
    let lat = pair.get(1)?.as_f64()?;
    if !lon.is_finite() || !lat.is_finite() {
        return None;
    }
    if !(-180.0..=180.0).contains(&lon) || !(-90.0..=90.0).contains(&lat) {
        return None;
    }
    Some(LatLon::new(lat, lon))
}

#[cfg(test)]
mod tests {
    use eonet_types::{EventId, EventStatus};
    use serde_json::json;

    use super::*;

    fn geometry(kind: &str, coordinates: serde_json::Value) -> GeometryRecord {
        GeometryRecord {
            kind: kind.to_owned(),
            coordinates,
            date: None,
            magnitude: None,
        }
    }

    fn event(id: &str, records: Vec<GeometryRecord>) -> Event {
        Event {
            id: EventId::from(id),
            title: format!("Event {id}"),
            description: None,
            link: None,
            status: EventStatus::Open,
            categories: Vec::new(),
            sources: Vec::new(),
            geometry_records: records,
        }
    }

    #[test]
    fn point_coordinates_are_lon_lat() {
        let p = extract_point(&geometry("Point", json!([-122.5, 37.75])));
        assert_eq!(p, Some(LatLon::new(37.75, -122.5)));
    }

    #[test]
    fn extra_coordinate_members_are_ignored() {
        let p = extract_point(&geometry("Point", json!([10.0, 20.0, 350.0])));
        assert_eq!(p, Some(LatLon::new(20.0, 10.0)));
    }

    #[test]
    fn range_edges_are_accepted() {
        for (lon, lat) in [(-180.0, -90.0), (180.0, 90.0), (0.0, 0.0)] {
            let p = extract_point(&geometry("Point", json!([lon, lat])));
            assert_eq!(p, Some(LatLon::new(lat, lon)), "lon={lon} lat={lat}");
        }
    }

    #[test]
    fn non_point_types_yield_nothing() {
        let polygon = geometry("Polygon", json!([[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]]));
        assert_eq!(extract_point(&polygon), None);
        assert_eq!(extract_point(&geometry("point", json!([1.0, 2.0]))), None);
    }

    #[test]
    fn malformed_points_yield_nothing() {
        assert_eq!(extract_point(&geometry("Point", json!([1.0]))), None);
        assert_eq!(extract_point(&geometry("Point", json!([]))), None);
        assert_eq!(extract_point(&geometry("Point", json!(["1", "2"]))), None);
        assert_eq!(extract_point(&geometry("Point", json!({"lon": 1, "lat": 2}))), None);
        assert_eq!(extract_point(&geometry("Point", serde_json::Value::Null)), None);
        assert_eq!(extract_point(&geometry("Point", json!([200.0, 10.0]))), None);
        assert_eq!(extract_point(&geometry("Point", json!([10.0, -91.0]))), None);
    }

    #[test]
    fn raw_geometry_values() {
        let raw = json!({"type": "Point", "coordinates": [5, 6]});
        assert_eq!(extract_point_value(&raw), Some(LatLon::new(6.0, 5.0)));
        assert_eq!(extract_point_value(&json!(null)), None);
        assert_eq!(extract_point_value(&json!({"coordinates": [5, 6]})), None);
    }

    #[test]
    fn first_point_skips_non_points() {
        let records = vec![
            geometry("Polygon", json!([])),
            geometry("Point", json!([1.0, 2.0])),
            geometry("Point", json!([3.0, 4.0])),
        ];
        assert_eq!(first_point(&records), Some(LatLon::new(2.0, 1.0)));
        assert_eq!(first_point(&[]), None);
    }

    #[test]
    fn events_without_points_are_map_invisible() {
        let events = vec![
            event("a", vec![geometry("Point", json!([1.0, 2.0]))]),
            event("b", vec![geometry("Polygon", json!([]))]),
            event("c", vec![geometry("Point", json!([3.0, 4.0]))]),
        ];
        let points = map_points(&events);
        let ids: Vec<&str> = points.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "c"]);
        assert_eq!(points.first().map(|p| p.title.as_str()), Some("Event a"));
    }
}
