//! HTTP client for the NASA EONET v3 catalog.
//!
//! Implements [`EventSource`] over `/events/geojson`, one request per feed,
//! and adds the catalog lookups the explanation flow needs: the category
//! list and single-event detail.

use std::time::Duration;

use eonet_core::{EventSource, ExplorerError, FeedRequest};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::error::RunnerError;

/// One entry of the EONET category catalog.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CategoryInfo {
    /// Category id (e.g. `wildfires`).
    pub id: String,
    /// Display title.
    pub title: String,
}

#[derive(Deserialize)]
struct CategoryCatalog {
    #[serde(default)]
    categories: Vec<CategoryInfo>,
}

/// Client for one EONET API base URL.
#[derive(Debug, Clone)]
pub struct EonetClient {
    client: reqwest::Client,
    base_url: String,
}

impl EonetClient {
    /// Create a client with a per-request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RunnerError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RunnerError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Base URL requests are issued against.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch the category catalog.
    pub async fn fetch_categories(&self) -> Result<Vec<CategoryInfo>, RunnerError> {
        let body = self.get_json(&format!("{}/categories", self.base_url), &[]).await?;
        let catalog: CategoryCatalog = serde_json::from_value(body)?;
        Ok(catalog.categories)
    }

    /// Fetch the full record of one event.
    pub async fn fetch_event(&self, id: &str) -> Result<Value, RunnerError> {
        let url = self.event_url(id)?;
        self.get_json(url.as_str(), &[]).await
    }

    /// `{base}/events/{id}` with the id percent-encoded as one path segment.
    fn event_url(&self, id: &str) -> Result<reqwest::Url, RunnerError> {
        let mut url = reqwest::Url::parse(&format!("{}/events", self.base_url))
            .map_err(|e| RunnerError::Http(format!("invalid base URL {}: {e}", self.base_url)))?;
        url.path_segments_mut()
            .map_err(|()| RunnerError::Http(format!("base URL {} cannot take a path", self.base_url)))?
            .push(id);
        Ok(url)
    }

    async fn get_json(&self, url: &str, query: &[(&str, String)]) -> Result<Value, RunnerError> {
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| RunnerError::Http(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(RunnerError::Http(format!("{url} returned {status}: {detail}")));
        }

        response
            .json()
            .await
            .map_err(|e| RunnerError::Http(format!("{url} returned invalid JSON: {e}")))
    }
}

/// Query parameters for one feed request.
pub fn feed_params(request: &FeedRequest) -> Vec<(&'static str, String)> {
    let mut params = vec![
        ("status", request.status.as_str().to_owned()),
        ("days", request.window_days.to_string()),
    ];
    if let Some(category) = &request.category {
        params.push(("category", category.as_str().to_owned()));
    }
    params
}

/// Raw records of a feed body.
///
/// Accepts a GeoJSON `FeatureCollection` (`features`) or a plain event list
/// (`events`). Anything else is an empty feed.
pub fn feed_records(body: Value) -> Vec<Value> {
    let Value::Object(mut map) = body else {
        return Vec::new();
    };
    match map.remove("features").or_else(|| map.remove("events")) {
        Some(Value::Array(records)) => records,
        _ => Vec::new(),
    }
}

impl EventSource for EonetClient {
    async fn fetch_feed(&self, request: &FeedRequest) -> Result<Vec<Value>, ExplorerError> {
        let url = format!("{}/events/geojson", self.base_url);
        let body = self
            .get_json(&url, &feed_params(request))
            .await
            .map_err(|e| ExplorerError::FeedFailed {
                category: request.category_label().to_owned(),
                reason: e.to_string(),
            })?;
        let records = feed_records(body);
        debug!(
            category = request.category_label(),
            records = records.len(),
            "feed received"
        );
        Ok(records)
    }
}
