//! Aggregation, map synchronization and answer normalization for the EONET
//! explorer.
//!
//! This crate holds everything with real state: merging per-category feeds
//! into one working set, keeping a marker layer in sync with that set and
//! the selection, and turning free-form agent replies into typed documents.
//! It performs no I/O of its own; feeds and replies arrive through the
//! [`EventSource`] and [`ExplanationSource`] traits.
//!
//! # Modules
//!
//! - [`geo`] -- Point extraction from GeoJSON geometry.
//! - [`aggregate`] -- Concurrent feed fetch, record parsing, deduplication.
//! - [`answer`] -- Tolerant extraction of structured answers.
//! - [`render`] -- Localized text rendering of answers.
//! - [`viewport`] -- [`MapSurface`] trait and a headless Web-Mercator view.
//! - [`map_sync`] -- [`MapSyncEngine`], sole owner of the marker layer.
//! - [`selection`] -- Selection state and stale-reply suppression.
//! - [`session`] -- [`ExplorerSession`], tying the above together.
//! - [`source`] -- Collaborator traits and request types.
//! - [`error`] -- [`ExplorerError`].

pub mod aggregate;
pub mod answer;
pub mod error;
pub mod geo;
pub mod map_sync;
pub mod render;
pub mod selection;
pub mod session;
pub mod source;
pub mod viewport;

pub use aggregate::{aggregate, fetch_aggregated, filter_by_title};
pub use answer::normalize_answer;
pub use error::ExplorerError;
pub use geo::{extract_point, map_points};
pub use map_sync::{MapSyncEngine, MarkerHandle, RenderReport};
pub use selection::{Completion, ExplainTicket, ExplanationState, SelectionController};
pub use session::{EventDetail, ExplorerSession};
pub use source::{EventSource, ExplainRequest, Explanation, ExplanationSource, FeedRequest};
pub use viewport::{MapSurface, Viewport};
