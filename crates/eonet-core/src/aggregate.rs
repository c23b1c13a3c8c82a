//! Multi-feed event aggregation.
//!
//! Turns N independent per-category feeds into one canonical list:
//! feeds are walked in request order, records in received order, and the
//! first occurrence of each event id wins outright. Later duplicates,
//! including the same event reported under a second category, are dropped
//! whole. Records without an id are malformed and skipped.
//!
//! Fetching fans out one request per category and joins them before the
//! merge. A single failed feed fails the whole aggregation so the caller
//! never sees a silently incomplete world.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use eonet_types::{
    CategoryId, CategoryRef, Event, EventId, EventQuery, EventStatus, GeometryRecord, Magnitude,
    SourceRef,
};
use futures::future::try_join_all;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::error::ExplorerError;
use crate::source::{EventSource, FeedRequest};

/// Fetch every feed the query names and merge them.
///
/// Zero or one category issues a single request; two or more categories are
/// fetched concurrently and joined before merging.
///
/// # Errors
///
/// Returns the first feed failure; no partial result is produced.
pub async fn fetch_aggregated<S: EventSource>(
    source: &S,
    query: &EventQuery,
) -> Result<Vec<Event>, ExplorerError> {
    let requests = feed_requests(query);
    info!(
        feeds = requests.len(),
        status = query.status.as_str(),
        window_days = query.window_days,
        "fetching event feeds"
    );

    let feeds = try_join_all(requests.iter().map(|request| async move {
        source.fetch_feed(request).await.inspect_err(|e| {
            warn!(category = request.category_label(), error = %e, "event feed failed");
        })
    }))
    .await?;

    let events = aggregate(&feeds);
    info!(events = events.len(), "event feeds aggregated");
    Ok(events)
}

/// Expand a query into the feed requests to issue, in category order.
pub fn feed_requests(query: &EventQuery) -> Vec<FeedRequest> {
    if query.categories.len() <= 1 {
        return vec![FeedRequest {
            category: query.categories.first().cloned(),
            status: query.status,
            window_days: query.window_days,
        }];
    }
    query
        .categories
        .iter()
        .map(|category| FeedRequest {
            category: Some(category.clone()),
            status: query.status,
            window_days: query.window_days,
        })
        .collect()
}

/// Merge raw feeds into a duplicate-free, order-stable event list.
///
/// Pure and idempotent: the same feeds always produce the same sequence.
pub fn aggregate<F: AsRef<[Value]>>(feeds: &[F]) -> Vec<Event> {
    let mut seen: BTreeSet<EventId> = BTreeSet::new();
    let mut events = Vec::new();
    let mut malformed: usize = 0;
    let mut duplicates: usize = 0;

    for record in feeds.iter().flat_map(|feed| feed.as_ref().iter()) {
        let Some(event) = parse_record(record) else {
            malformed = malformed.saturating_add(1);
            continue;
        };
        if seen.contains(&event.id) {
            duplicates = duplicates.saturating_add(1);
            continue;
        }
        seen.insert(event.id.clone());
        events.push(event);
    }

    if malformed > 0 || duplicates > 0 {
        debug!(malformed, duplicates, kept = events.len(), "dropped feed records");
    }
    events
}

/// Case-insensitive title search over an aggregated list.
///
/// A blank needle matches everything. Never mutates the list.
pub fn filter_by_title<'a>(events: &'a [Event], needle: &str) -> Vec<&'a Event> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return events.iter().collect();
    }
    events
        .iter()
        .filter(|e| e.title.to_lowercase().contains(&needle))
        .collect()
}

// ---------------------------------------------------------------------------
// Record parsing
// ---------------------------------------------------------------------------

/// Parse one raw feed record.
///
/// Accepts both a GeoJSON feature (`{"properties": {...}, "geometry": {...}}`)
/// and a plain EONET event (`{"id": ..., "geometry": [...]}`). Returns `None`
/// when the record has no usable id.
pub fn parse_record(record: &Value) -> Option<Event> {
    let props = match record.get("properties") {
        Some(p) if p.is_object() => p,
        _ => record,
    };
    let id = record_id(props)?;

    let geometry_records = match record.get("geometry") {
        Some(Value::Array(items)) => items.iter().filter_map(parse_geometry).collect(),
        Some(obj @ Value::Object(_)) => parse_geometry(obj).into_iter().collect(),
        _ => Vec::new(),
    };

    let closed = props
        .get("closed")
        .is_some_and(|c| !c.is_null() && c.as_str() != Some(""));

    Some(Event {
        id,
        title: string_field(props, "title").unwrap_or_default(),
        description: string_field(props, "description"),
        link: string_field(props, "link"),
        status: if closed {
            EventStatus::Closed
        } else {
            EventStatus::Open
        },
        categories: ordered_set(array_field(props, "categories").filter_map(parse_category)),
        sources: ordered_set(array_field(props, "sources").filter_map(parse_source)),
        geometry_records,
    })
}

fn record_id(props: &Value) -> Option<EventId> {
    match props.get("id")? {
        Value::String(s) if !s.trim().is_empty() => Some(EventId::new(s.as_str())),
        Value::Number(n) => Some(EventId::new(n.to_string())),
        _ => None,
    }
}

fn string_field(obj: &Value, key: &str) -> Option<String> {
    obj.get(key)
        .and_then(Value::as_str)
        .map(ToOwned::to_owned)
}

fn array_field<'a>(obj: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    obj.get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn parse_category(value: &Value) -> Option<CategoryRef> {
    match value {
        Value::String(id) => Some(CategoryRef {
            id: Some(CategoryId::new(id.as_str())),
            title: None,
        }),
        Value::Object(_) => {
            let id = match value.get("id") {
                Some(Value::String(s)) => Some(CategoryId::new(s.as_str())),
                Some(Value::Number(n)) => Some(CategoryId::new(n.to_string())),
                _ => None,
            };
            let title = string_field(value, "title");
            (id.is_some() || title.is_some()).then_some(CategoryRef { id, title })
        }
        _ => None,
    }
}

fn parse_source(value: &Value) -> Option<SourceRef> {
    let id = string_field(value, "id");
    let url = string_field(value, "url");
    (id.is_some() || url.is_some()).then_some(SourceRef { id, url })
}

fn parse_geometry(value: &Value) -> Option<GeometryRecord> {
    if !value.is_object() {
        return None;
    }
    let magnitude = value
        .get("magnitudeValue")
        .and_then(Value::as_f64)
        .map(|v| Magnitude {
            value: v,
            unit: string_field(value, "magnitudeUnit"),
        });
    Some(GeometryRecord {
        kind: string_field(value, "type").unwrap_or_default(),
        coordinates: value.get("coordinates").cloned().unwrap_or(Value::Null),
        date: value
            .get("date")
            .and_then(Value::as_str)
            .and_then(|d| d.parse::<DateTime<Utc>>().ok()),
        magnitude,
    })
}

fn ordered_set<T: PartialEq>(items: impl Iterator<Item = T>) -> Vec<T> {
    let mut out: Vec<T> = Vec::new();
    for item in items {
        if !out.contains(&item) {
            out.push(item);
        }
    }
    out
}
