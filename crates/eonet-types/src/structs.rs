//! Core entity structs for the EONET explorer.
//!
//! Covers the ingested [`Event`] with its category, source and geometry
//! records, the derived [`MapPoint`] used by the map layer, the upstream
//! [`EventQuery`], and the small session-state records shared with the UI.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::enums::{EventStatus, StatusFilter};
use crate::ids::{CategoryId, EventId};

// ---------------------------------------------------------------------------
// Event
// ---------------------------------------------------------------------------

/// Reference from an event to one of its categories.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct CategoryRef {
    /// Category identifier, when the upstream record carries one.
    pub id: Option<CategoryId>,
    /// Human-readable category title.
    pub title: Option<String>,
}

/// Reference from an event to an upstream data source.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SourceRef {
    /// Source identifier (e.g. `InciWeb`, `JTWC`).
    pub id: Option<String>,
    /// Link to the source's page for this event.
    pub url: Option<String>,
}

/// Magnitude attached to a geometry record (wind speed, acreage, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Magnitude {
    /// Numeric magnitude.
    pub value: f64,
    /// Unit of measure, e.g. `kts` or `acres`.
    pub unit: Option<String>,
}

/// One observation of where an event was at a given time.
///
/// `coordinates` is kept as opaque JSON because its shape depends on
/// `kind` (`Point` is `[lon, lat]`, `Polygon` is nested rings).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeometryRecord {
    /// GeoJSON geometry type (`Point`, `Polygon`, ...).
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific coordinate structure.
    pub coordinates: serde_json::Value,
    /// Observation timestamp.
    pub date: Option<DateTime<Utc>>,
    /// Optional magnitude for this observation.
    pub magnitude: Option<Magnitude>,
}

/// A natural event as ingested from one fetch cycle.
///
/// Identity is [`Event::id`]. Events are never patched in place; a
/// re-fetch replaces the whole working set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct Event {
    /// Upstream-assigned unique identifier.
    pub id: EventId,
    /// Event title.
    pub title: String,
    /// Optional long description.
    pub description: Option<String>,
    /// Link to the upstream event page.
    pub link: Option<String>,
    /// Whether the event is still ongoing.
    pub status: EventStatus,
    /// Categories, in upstream order without duplicates.
    pub categories: Vec<CategoryRef>,
    /// Sources, in upstream order without duplicates.
    pub sources: Vec<SourceRef>,
    /// Geometry observations, in upstream order.
    pub geometry_records: Vec<GeometryRecord>,
}

impl Event {
    /// Geometry type of the first record, if any.
    pub fn primary_geometry_kind(&self) -> Option<&str> {
        self.geometry_records.first().map(|g| g.kind.as_str())
    }
}

// ---------------------------------------------------------------------------
// Map geometry
// ---------------------------------------------------------------------------

/// A WGS84 coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct LatLon {
    /// Latitude in degrees, within `[-90, 90]`.
    pub lat: f64,
    /// Longitude in degrees, within `[-180, 180]`.
    pub lon: f64,
}

impl LatLon {
    /// Construct a coordinate.
    pub const fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// A renderable event position, one per event with a point geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct MapPoint {
    /// Identifier of the event this point belongs to.
    pub id: EventId,
    /// Event title, shown as the marker label.
    pub title: String,
    /// Latitude in degrees.
    pub lat: f64,
    /// Longitude in degrees.
    pub lon: f64,
}

impl MapPoint {
    /// Position of the point.
    pub const fn position(&self) -> LatLon {
        LatLon::new(self.lat, self.lon)
    }
}

/// Axis-aligned latitude/longitude bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct GeoBounds {
    /// Southern edge (minimum latitude).
    pub south: f64,
    /// Western edge (minimum longitude).
    pub west: f64,
    /// Northern edge (maximum latitude).
    pub north: f64,
    /// Eastern edge (maximum longitude).
    pub east: f64,
}

impl GeoBounds {
    /// Smallest box enclosing every position, or `None` for an empty input.
    pub fn enclosing(positions: impl IntoIterator<Item = LatLon>) -> Option<Self> {
        let mut iter = positions.into_iter();
        let first = iter.next()?;
        let mut bounds = Self {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        for p in iter {
            bounds.south = bounds.south.min(p.lat);
            bounds.north = bounds.north.max(p.lat);
            bounds.west = bounds.west.min(p.lon);
            bounds.east = bounds.east.max(p.lon);
        }
        Some(bounds)
    }
}

// ---------------------------------------------------------------------------
// Query
// ---------------------------------------------------------------------------

/// Categories the explorer offers by default.
pub const SUPPORTED_CATEGORIES: [&str; 3] = ["wildfires", "severeStorms", "volcanoes"];

/// Default look-back window in days.
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Smallest accepted look-back window.
pub const MIN_WINDOW_DAYS: u32 = 1;

/// Largest accepted look-back window.
pub const MAX_WINDOW_DAYS: u32 = 365;

/// Parameters of one aggregation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct EventQuery {
    /// Requested categories; empty means "no category filter".
    pub categories: Vec<CategoryId>,
    /// Open/closed filter.
    pub status: StatusFilter,
    /// Look-back window, always within `1..=365`.
    pub window_days: u32,
}

impl EventQuery {
    /// Build a query, clamping the window into the accepted range.
    pub fn new(categories: Vec<CategoryId>, status: StatusFilter, window_days: u32) -> Self {
        Self {
            categories,
            status,
            window_days: window_days.clamp(MIN_WINDOW_DAYS, MAX_WINDOW_DAYS),
        }
    }

    /// Split a comma-separated category list, trimming and dropping blanks.
    pub fn parse_categories(csv: &str) -> Vec<CategoryId> {
        csv.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(CategoryId::from)
            .collect()
    }

    /// Parse a window value, falling back to the default when it is not an
    /// integer and clamping otherwise.
    pub fn parse_window_days(raw: Option<&str>) -> u32 {
        raw.and_then(|s| s.trim().parse::<i64>().ok())
            .map_or(DEFAULT_WINDOW_DAYS, |n| {
                let clamped = n.clamp(i64::from(MIN_WINDOW_DAYS), i64::from(MAX_WINDOW_DAYS));
                u32::try_from(clamped).unwrap_or(DEFAULT_WINDOW_DAYS)
            })
    }
}

impl Default for EventQuery {
    fn default() -> Self {
        Self::new(
            SUPPORTED_CATEGORIES.iter().copied().map(CategoryId::from).collect(),
            StatusFilter::Open,
            DEFAULT_WINDOW_DAYS,
        )
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// The single selected event, if any.
///
/// A non-null `selected_id` always refers to an event in the current
/// working set; the selection controller clears it otherwise.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct SelectionState {
    /// Identifier of the selected event.
    pub selected_id: Option<EventId>,
}

/// Load state of the aggregated event list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum FeedState {
    /// A fetch is in progress (or none has completed yet).
    #[default]
    Loading,
    /// The working set reflects the latest successful aggregation.
    Ready,
    /// The latest aggregation failed; the message is user-presentable.
    Failed(String),
}
