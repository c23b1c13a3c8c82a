//! The explorer session: one user's working set, filters, selection and map.
//!
//! All mutation goes through `&mut self`, so reactions are serialized. The
//! session upholds the selection invariant at every entry point that can
//! change the working set: a selected id always names an event in
//! [`ExplorerSession::events`].

use eonet_types::{
    Event, EventId, EventQuery, EventStatus, FeedState, Lang, LatLon, MapPoint, SelectionState,
};
use serde::Serialize;
use tracing::{debug, info};

use crate::aggregate::{fetch_aggregated, filter_by_title};
use crate::error::ExplorerError;
use crate::geo::{first_point, map_points};
use crate::map_sync::{MapSyncEngine, MarkerHandle, RenderReport};
use crate::selection::{Completion, ExplainTicket, ExplanationState, SelectionController};
use crate::source::{EventSource, Explanation, ExplanationSource};
use crate::viewport::MapSurface;

/// Placeholder shown for a missing geometry type.
const NO_GEOMETRY: &str = "N/A";

/// Display data for the selected event.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDetail {
    /// Event id.
    pub id: EventId,
    /// Event title.
    pub title: String,
    /// Description, or a localized placeholder when absent.
    pub description: String,
    /// `open` or `closed`.
    pub status: EventStatus,
    /// Type of the first geometry record, or `N/A`.
    pub geometry_kind: String,
    /// Approximate location, when the event has a point.
    pub point: Option<LatLon>,
}

impl EventDetail {
    /// Build the detail view of an event.
    pub fn of(event: &Event, lang: Lang) -> Self {
        let description = event
            .description
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map_or_else(|| no_description(lang).to_owned(), ToOwned::to_owned);
        Self {
            id: event.id.clone(),
            title: event.title.clone(),
            description,
            status: event.status,
            geometry_kind: event
                .primary_geometry_kind()
                .unwrap_or(NO_GEOMETRY)
                .to_owned(),
            point: first_point(&event.geometry_records),
        }
    }

    /// External map link for the approximate location.
    pub fn map_link(&self) -> Option<String> {
        self.point
            .map(|p| format!("https://www.google.com/maps?q={},{}", p.lat, p.lon))
    }
}

const fn no_description(lang: Lang) -> &'static str {
    match lang {
        Lang::En => "No description provided.",
        Lang::Es => "Sin descripción.",
    }
}

/// A single explorer session bound to a map surface.
#[derive(Debug)]
pub struct ExplorerSession<S: MapSurface> {
    query: EventQuery,
    search: String,
    lang: Lang,
    events: Vec<Event>,
    feed_state: FeedState,
    selection: SelectionController,
    engine: MapSyncEngine<S>,
}

impl<S: MapSurface> ExplorerSession<S> {
    /// Start a session with an empty working set.
    pub fn new(surface: S, query: EventQuery, lang: Lang) -> Self {
        Self {
            query,
            search: String::new(),
            lang,
            events: Vec::new(),
            feed_state: FeedState::Loading,
            selection: SelectionController::new(),
            engine: MapSyncEngine::new(surface),
        }
    }

    // -------------------------------------------------------------------
    // Fetching
    // -------------------------------------------------------------------

    /// Fetch and aggregate the current query, then replace the working set.
    ///
    /// Returns the number of aggregated events.
    ///
    /// # Errors
    ///
    /// Returns the aggregation failure after recording it in
    /// [`ExplorerSession::feed_state`].
    pub async fn refresh<E: EventSource>(&mut self, source: &E) -> Result<usize, ExplorerError> {
        self.feed_state = FeedState::Loading;
        let result = fetch_aggregated(source, &self.query).await;
        let outcome = result.as_ref().map(Vec::len).map_err(Clone::clone);
        self.apply_fetch_result(result);
        outcome
    }

    /// Replace the working set with a finished aggregation.
    ///
    /// A failure empties the working set. Either way a selection that no
    /// longer names an event is cleared.
    pub fn apply_fetch_result(&mut self, result: Result<Vec<Event>, ExplorerError>) {
        match result {
            Ok(events) => {
                info!(events = events.len(), "working set replaced");
                self.events = events;
                self.feed_state = FeedState::Ready;
            }
            Err(err) => {
                self.events.clear();
                self.feed_state = FeedState::Failed(err.to_string());
            }
        }
        self.selection.reconcile(&self.events);
    }

    /// Load state of the working set.
    pub const fn feed_state(&self) -> &FeedState {
        &self.feed_state
    }

    // -------------------------------------------------------------------
    // Filters
    // -------------------------------------------------------------------

    /// Active query.
    pub const fn query(&self) -> &EventQuery {
        &self.query
    }

    /// Replace the query. Returns `true` if a re-fetch is needed.
    ///
    /// A category or status change also clears the selection; a window
    /// change alone only re-fetches.
    pub fn set_query(&mut self, query: EventQuery) -> bool {
        if query == self.query {
            return false;
        }
        if query.categories != self.query.categories || query.status != self.query.status {
            debug!("category or status changed, clearing selection");
            self.selection.clear();
        }
        self.query = query;
        true
    }

    /// Set the free-text title filter. Affects [`Self::visible_events`] only.
    pub fn set_search(&mut self, search: &str) {
        search.clone_into(&mut self.search);
    }

    /// Current free-text title filter.
    pub fn search(&self) -> &str {
        &self.search
    }

    /// Reply language.
    pub const fn lang(&self) -> Lang {
        self.lang
    }

    /// Change the reply language.
    pub const fn set_lang(&mut self, lang: Lang) {
        self.lang = lang;
    }

    // -------------------------------------------------------------------
    // Views
    // -------------------------------------------------------------------

    /// The aggregated working set, in aggregation order.
    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Events matching the search, for the list view.
    pub fn visible_events(&self) -> Vec<&Event> {
        filter_by_title(&self.events, &self.search)
    }

    /// Map points for every mappable event in the working set.
    pub fn map_points(&self) -> Vec<MapPoint> {
        map_points(&self.events)
    }

    /// Currently selected id.
    pub const fn selection(&self) -> Option<&EventId> {
        self.selection.selected()
    }

    /// The full selection state.
    pub const fn selection_state(&self) -> &SelectionState {
        self.selection.state()
    }

    /// The selected event.
    pub fn selected_event(&self) -> Option<&Event> {
        let id = self.selection.selected()?;
        self.events.iter().find(|e| &e.id == id)
    }

    /// Detail view of the selected event.
    pub fn detail(&self) -> Option<EventDetail> {
        self.selected_event().map(|e| EventDetail::of(e, self.lang))
    }

    /// The map engine, read-only.
    pub const fn map(&self) -> &MapSyncEngine<S> {
        &self.engine
    }

    // -------------------------------------------------------------------
    // Selection and map
    // -------------------------------------------------------------------

    /// Select an event in the working set.
    ///
    /// Returns `false` for unknown ids or a repeated selection.
    pub fn select(&mut self, id: &EventId) -> bool {
        if !self.events.iter().any(|e| &e.id == id) {
            debug!(event_id = %id, "ignoring selection of unknown event");
            return false;
        }
        self.selection.select(id.clone())
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) -> bool {
        self.selection.clear()
    }

    /// Select the event behind a clicked marker.
    pub fn click_marker(&mut self, handle: MarkerHandle) -> bool {
        match self.engine.click(handle) {
            Some(id) => self.select(&id),
            None => false,
        }
    }

    /// Run one render cycle of the map.
    pub fn render(&mut self) -> RenderReport {
        let points = map_points(&self.events);
        self.engine.render(&points, self.selection.selected())
    }

    /// Release the map layer.
    pub fn teardown(&mut self) {
        self.engine.teardown();
    }

    // -------------------------------------------------------------------
    // Explanation
    // -------------------------------------------------------------------

    /// Explanation state for the current selection.
    pub const fn explanation(&self) -> &ExplanationState {
        self.selection.explanation()
    }

    /// Start an explanation request for the selection.
    ///
    /// # Errors
    ///
    /// See [`SelectionController::begin_explanation`].
    pub fn begin_explanation(&mut self, question: Option<&str>) -> Result<ExplainTicket, ExplorerError> {
        self.selection.begin_explanation(question, self.lang)
    }

    /// Apply a finished explanation request.
    pub fn complete_explanation(
        &mut self,
        ticket: &ExplainTicket,
        result: Result<Explanation, ExplorerError>,
    ) -> Completion {
        self.selection.complete_explanation(ticket, result)
    }

    /// Abandon a request started with [`Self::begin_explanation`].
    pub fn cancel_explanation(&mut self, ticket: &ExplainTicket) -> bool {
        self.selection.cancel_explanation(ticket)
    }

    /// Request and apply an explanation for the selection in one step.
    ///
    /// Dropping the returned future before it resolves cancels the request,
    /// so the selection can be explained again.
    ///
    /// # Errors
    ///
    /// Returns the begin failure, or the agent failure after recording it.
    pub async fn explain<X: ExplanationSource>(
        &mut self,
        agent: &X,
        question: Option<&str>,
    ) -> Result<&ExplanationState, ExplorerError> {
        let ticket = self.selection.begin_explanation(question, self.lang)?;
        let request = ticket.request().clone();
        let in_flight = InFlight {
            selection: &mut self.selection,
            ticket: Some(ticket),
        };
        let result = agent.explain(&request).await;
        let failure = result.as_ref().err().cloned();
        in_flight.complete(result);
        match failure {
            Some(err) => Err(err),
            None => Ok(self.explanation()),
        }
    }
}

/// An outstanding explanation request. Cancelled on drop unless completed.
struct InFlight<'a> {
    selection: &'a mut SelectionController,
    ticket: Option<ExplainTicket>,
}

impl InFlight<'_> {
    fn complete(mut self, result: Result<Explanation, ExplorerError>) -> Completion {
        match self.ticket.take() {
            Some(ticket) => self.selection.complete_explanation(&ticket, result),
            None => Completion::Discarded,
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if let Some(ticket) = self.ticket.take() {
            self.selection.cancel_explanation(&ticket);
        }
    }
}
