//! Integration tests for the explorer session.
//!
//! Feeds and agent replies come from in-memory fakes, so the whole
//! fetch -> aggregate -> select -> map -> explain cycle runs without a
//! network. The map is driven through the headless `Viewport`.

#![allow(clippy::unwrap_used)]

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use eonet_core::render::render_text;
use eonet_core::{
    Completion, EventSource, ExplainRequest, Explanation, ExplanationSource, ExplanationState,
    ExplorerError, ExplorerSession, FeedRequest, MapSurface, Viewport,
};
use eonet_types::{
    CategoryId, EventId, EventQuery, FeedState, Lang, MarkerVisualState, ParsedAnswer,
    StatusFilter,
};
use serde_json::{Value, json};
use tokio::sync::Notify;

// ---------------------------------------------------------------------------
// Fakes
// ---------------------------------------------------------------------------

/// Canned feeds keyed by category (`*` for the unfiltered feed).
#[derive(Default)]
struct FakeFeeds {
    feeds: BTreeMap<String, Result<Vec<Value>, String>>,
    delays: BTreeMap<String, Duration>,
    calls: Mutex<Vec<FeedRequest>>,
}

impl FakeFeeds {
    fn with(mut self, category: &str, records: Vec<Value>) -> Self {
        self.feeds.insert(category.to_owned(), Ok(records));
        self
    }

    fn failing(mut self, category: &str, reason: &str) -> Self {
        self.feeds.insert(category.to_owned(), Err(reason.to_owned()));
        self
    }

    fn delayed(mut self, category: &str, millis: u64) -> Self {
        self.delays
            .insert(category.to_owned(), Duration::from_millis(millis));
        self
    }

    fn calls(&self) -> Vec<FeedRequest> {
        self.calls.lock().unwrap().clone()
    }
}

impl EventSource for FakeFeeds {
    fn fetch_feed(
        &self,
        request: &FeedRequest,
    ) -> impl Future<Output = Result<Vec<Value>, ExplorerError>> + Send {
        self.calls.lock().unwrap().push(request.clone());
        let label = request.category_label().to_owned();
        let delay = self.delays.get(&label).copied().unwrap_or_default();
        let result = match self.feeds.get(&label) {
            Some(Ok(records)) => Ok(records.clone()),
            Some(Err(reason)) => Err(ExplorerError::FeedFailed {
                category: label,
                reason: reason.clone(),
            }),
            None => Ok(Vec::new()),
        };
        async move {
            tokio::time::sleep(delay).await;
            result
        }
    }
}

/// Two feeds that can only finish together: "wildfires" waits until
/// "volcanoes" has started.
#[derive(Default)]
struct GatedFeeds {
    gate: Arc<Notify>,
}

impl EventSource for GatedFeeds {
    fn fetch_feed(
        &self,
        request: &FeedRequest,
    ) -> impl Future<Output = Result<Vec<Value>, ExplorerError>> + Send {
        let gate = Arc::clone(&self.gate);
        let label = request.category_label().to_owned();
        async move {
            if label == "wildfires" {
                gate.notified().await;
            } else {
                gate.notify_one();
            }
            Ok(vec![feature(&format!("{label}-1"), &label, &label, 1.0, 1.0)])
        }
    }
}

/// Agent that never answers.
struct SilentAgent;

impl ExplanationSource for SilentAgent {
    fn explain(
        &self,
        _request: &ExplainRequest,
    ) -> impl Future<Output = Result<Explanation, ExplorerError>> + Send {
        std::future::pending()
    }
}

/// Agent that answers every request with the same text.
struct ScriptedAgent {
    reply: Result<String, String>,
    requests: Mutex<Vec<ExplainRequest>>,
}

impl ScriptedAgent {
    fn replying(text: &str) -> Self {
        Self {
            reply: Ok(text.to_owned()),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_owned()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

impl ExplanationSource for ScriptedAgent {
    fn explain(
        &self,
        request: &ExplainRequest,
    ) -> impl Future<Output = Result<Explanation, ExplorerError>> + Send {
        self.requests.lock().unwrap().push(request.clone());
        let result = self
            .reply
            .clone()
            .map(|raw_text| Explanation {
                raw_text,
                retrieval: Some(json!({"chunks": 2})),
            })
            .map_err(ExplorerError::Explanation);
        std::future::ready(result)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn feature(id: &str, title: &str, category: &str, lon: f64, lat: f64) -> Value {
    json!({
        "type": "Feature",
        "properties": {
            "id": id,
            "title": title,
            "closed": null,
            "categories": [{"id": category, "title": category}],
            "sources": [{"id": "SRC", "url": "https://example.org/src"}]
        },
        "geometry": {"type": "Point", "coordinates": [lon, lat]}
    })
}

fn polygon_feature(id: &str, title: &str, category: &str) -> Value {
    json!({
        "type": "Feature",
        "properties": {"id": id, "title": title, "categories": [{"id": category}]},
        "geometry": {"type": "Polygon", "coordinates": [[[0, 0], [1, 0], [1, 1], [0, 0]]]}
    })
}

fn query(categories: &[&str]) -> EventQuery {
    EventQuery::new(
        categories.iter().map(|c| CategoryId::from(*c)).collect(),
        StatusFilter::Open,
        7,
    )
}

fn session(categories: &[&str]) -> ExplorerSession<Viewport> {
    ExplorerSession::new(Viewport::default(), query(categories), Lang::En)
}

fn ids(session: &ExplorerSession<Viewport>) -> Vec<String> {
    session
        .events()
        .iter()
        .map(|e| e.id.as_str().to_owned())
        .collect()
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn multi_category_fetch_merges_in_request_order() {
    // The first feed finishes last; order must still follow the request.
    let feeds = FakeFeeds::default()
        .with(
            "wildfires",
            vec![
                feature("EONET_1", "Fire A", "wildfires", -120.0, 38.0),
                feature("EONET_2", "Fire near volcano", "wildfires", 15.0, 37.7),
            ],
        )
        .with(
            "volcanoes",
            vec![
                feature("EONET_2", "Fire near volcano", "volcanoes", 15.0, 37.7),
                feature("EONET_3", "Etna", "volcanoes", 15.0, 37.75),
            ],
        )
        .delayed("wildfires", 20);

    let mut s = session(&["wildfires", "volcanoes"]);
    let count = s.refresh(&feeds).await.unwrap();

    assert_eq!(count, 3);
    assert_eq!(ids(&s), vec!["EONET_1", "EONET_2", "EONET_3"]);
    assert_eq!(s.feed_state(), &FeedState::Ready);

    // The duplicate keeps its first feed's category only.
    let dup = &s.events()[1];
    assert_eq!(dup.categories.len(), 1);
    assert_eq!(
        dup.categories[0].id.as_ref().map(CategoryId::as_str),
        Some("wildfires")
    );

    let calls = feeds.calls();
    assert_eq!(calls.len(), 2);
    assert!(calls.iter().all(|c| c.window_days == 7));
}

#[tokio::test]
async fn multi_category_feeds_are_fetched_concurrently() {
    let feeds = GatedFeeds::default();
    let mut s = session(&["wildfires", "volcanoes"]);

    let joined = tokio::time::timeout(Duration::from_secs(1), s.refresh(&feeds)).await;
    assert!(joined.is_ok(), "feeds should be in flight together");
    let count = joined.unwrap().unwrap();

    assert_eq!(count, 2);
    assert_eq!(ids(&s), vec!["wildfires-1", "volcanoes-1"]);
}

#[tokio::test]
async fn aggregation_is_idempotent() {
    let feeds = FakeFeeds::default()
        .with(
            "wildfires",
            vec![
                feature("a", "A", "wildfires", 1.0, 1.0),
                json!({"properties": {"title": "no id"}}),
                feature("b", "B", "wildfires", 2.0, 2.0),
            ],
        )
        .with("severeStorms", vec![feature("a", "A", "severeStorms", 1.0, 1.0)]);

    let mut s = session(&["wildfires", "severeStorms"]);
    s.refresh(&feeds).await.unwrap();
    let first = s.events().to_vec();
    s.refresh(&feeds).await.unwrap();
    assert_eq!(s.events(), first.as_slice());
    assert_eq!(ids(&s), vec!["a", "b"]);
}

#[tokio::test]
async fn single_or_no_category_issues_one_request() {
    let feeds = FakeFeeds::default()
        .with("volcanoes", vec![feature("v", "V", "volcanoes", 0.0, 0.0)])
        .with("*", vec![feature("x", "X", "wildfires", 0.0, 0.0)]);

    let mut one = session(&["volcanoes"]);
    one.refresh(&feeds).await.unwrap();
    assert_eq!(ids(&one), vec!["v"]);

    let mut none = session(&[]);
    none.refresh(&feeds).await.unwrap();
    assert_eq!(ids(&none), vec!["x"]);

    let calls = feeds.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].category_label(), "volcanoes");
    assert!(calls[1].category.is_none());
}

#[tokio::test]
async fn one_failed_feed_fails_the_whole_aggregation() {
    let feeds = FakeFeeds::default()
        .with("wildfires", vec![feature("a", "A", "wildfires", 1.0, 1.0)])
        .failing("volcanoes", "HTTP 503");

    let mut s = session(&["wildfires", "volcanoes"]);
    let err = s.refresh(&feeds).await.unwrap_err();

    assert_eq!(
        err,
        ExplorerError::FeedFailed {
            category: "volcanoes".to_owned(),
            reason: "HTTP 503".to_owned(),
        }
    );
    assert!(s.events().is_empty());
    assert!(matches!(s.feed_state(), FeedState::Failed(msg) if msg.contains("HTTP 503")));
}

// ---------------------------------------------------------------------------
// Selection healing
// ---------------------------------------------------------------------------

#[tokio::test]
async fn selection_heals_when_event_disappears() {
    let before = FakeFeeds::default().with(
        "wildfires",
        vec![
            feature("a", "A", "wildfires", 1.0, 1.0),
            feature("b", "B", "wildfires", 2.0, 2.0),
        ],
    );
    let after = FakeFeeds::default().with("wildfires", vec![feature("b", "B", "wildfires", 2.0, 2.0)]);

    let mut s = session(&["wildfires"]);
    s.refresh(&before).await.unwrap();
    assert!(s.select(&EventId::from("a")));
    s.render();

    s.refresh(&after).await.unwrap();
    assert!(s.selection().is_none());

    let report = s.render();
    assert!(report.rebuilt);
    assert!(s.map().selected_marker().is_none());
}

#[tokio::test]
async fn surviving_selection_outlives_refetch() {
    let feeds = FakeFeeds::default().with("wildfires", vec![feature("a", "A", "wildfires", 1.0, 1.0)]);
    let mut s = session(&["wildfires"]);
    s.refresh(&feeds).await.unwrap();
    s.select(&EventId::from("a"));
    s.refresh(&feeds).await.unwrap();
    assert_eq!(s.selection().map(EventId::as_str), Some("a"));
}

// ---------------------------------------------------------------------------
// Map synchronization
// ---------------------------------------------------------------------------

#[tokio::test]
async fn unchanged_points_do_not_refit_and_selection_touches_two_markers() {
    let feeds = FakeFeeds::default().with(
        "wildfires",
        vec![
            feature("a", "A", "wildfires", -120.0, 38.0),
            feature("b", "B", "wildfires", -100.0, 30.0),
            feature("c", "C", "wildfires", -80.0, 25.0),
            polygon_feature("p", "Polygon only", "wildfires"),
        ],
    );
    let mut s = session(&["wildfires"]);
    s.refresh(&feeds).await.unwrap();

    let first = s.render();
    assert!(first.rebuilt && first.fitted);
    assert_eq!(s.map().markers().len(), 3);
    let fit_key = s.map().last_fit_key().map(ToOwned::to_owned);

    // Same content fetched again: no rebuild, no viewport change.
    s.refresh(&feeds).await.unwrap();
    let zoom = s.map().surface().zoom();
    assert!(!s.render().rebuilt);
    assert_eq!(s.map().last_fit_key().map(ToOwned::to_owned), fit_key);
    assert!((s.map().surface().zoom() - zoom).abs() < f64::EPSILON);

    s.select(&EventId::from("a"));
    assert_eq!(s.render().restyled.len(), 1);
    s.select(&EventId::from("c"));
    let report = s.render();
    assert!(!report.rebuilt);
    assert_eq!(report.restyled.len(), 2);
    assert_eq!(s.map().stats().layer_rebuilds, 1);

    let states: Vec<MarkerVisualState> = s.map().markers().iter().map(|m| m.state()).collect();
    assert_eq!(
        states,
        vec![
            MarkerVisualState::Normal,
            MarkerVisualState::Normal,
            MarkerVisualState::Selected
        ]
    );

    // Point-less events are selectable but never highlighted.
    s.select(&EventId::from("p"));
    let report = s.render();
    assert_eq!(report.restyled, vec![EventId::from("c")]);
    assert!(s.map().selected_marker().is_none());
    assert_eq!(s.selection().map(EventId::as_str), Some("p"));
}

// ---------------------------------------------------------------------------
// Explanations
// ---------------------------------------------------------------------------

#[tokio::test]
async fn explanation_is_normalized_and_rendered() {
    let feeds = FakeFeeds::default().with("volcanoes", vec![feature("v", "Etna", "volcanoes", 15.0, 37.7)]);
    let reply = "Here you go:\n```json\n{\"summary\": \"Etna is erupting.\", \"what_is_happening\": \"Lava flows\", \"references\": [\"NASA\", {\"title\": \"EONET\", \"url\": \"https://eonet.gsfc.nasa.gov\"}]}\n```";
    let agent = ScriptedAgent::replying(reply);

    let mut s = session(&["volcanoes"]);
    s.refresh(&feeds).await.unwrap();
    s.select(&EventId::from("v"));
    let state = s.explain(&agent, Some("What is happening?")).await.unwrap().clone();

    let ExplanationState::Ready {
        answer, retrieval, ..
    } = state
    else {
        panic!("expected a ready explanation");
    };
    let doc = answer.document().unwrap();
    assert_eq!(doc.summary, "Etna is erupting.");
    assert_eq!(doc.meaning, vec!["Lava flows".to_owned()]);
    assert_eq!(doc.sources.len(), 2);
    assert_eq!(retrieval, Some(json!({"chunks": 2})));

    let text = render_text(&answer, Lang::En);
    assert!(text.contains("## Summary"));
    assert!(text.contains("- [EONET](https://eonet.gsfc.nasa.gov)"));

    let requests = agent.requests.lock().unwrap();
    assert_eq!(requests[0].question.as_deref(), Some("What is happening?"));
    assert_eq!(requests[0].lang, Lang::En);
}

#[tokio::test]
async fn unparseable_reply_is_kept_verbatim() {
    let feeds = FakeFeeds::default().with("wildfires", vec![feature("a", "A", "wildfires", 1.0, 1.0)]);
    let agent = ScriptedAgent::replying("not json at all");
    let mut s = session(&["wildfires"]);
    s.refresh(&feeds).await.unwrap();
    s.select(&EventId::from("a"));

    let state = s.explain(&agent, None).await.unwrap();
    assert_eq!(
        state.answer(),
        Some(&ParsedAnswer::Unstructured("not json at all".to_owned()))
    );
}

#[tokio::test]
async fn stale_reply_is_discarded_after_reselection() {
    let feeds = FakeFeeds::default().with(
        "wildfires",
        vec![
            feature("a", "A", "wildfires", 1.0, 1.0),
            feature("b", "B", "wildfires", 2.0, 2.0),
        ],
    );
    let agent = ScriptedAgent::replying("{\"summary\": \"about A\"}");
    let mut s = session(&["wildfires"]);
    s.refresh(&feeds).await.unwrap();

    s.select(&EventId::from("a"));
    let ticket = s.begin_explanation(None).unwrap();
    let late = agent.explain(ticket.request()).await;

    s.select(&EventId::from("b"));
    assert_eq!(s.complete_explanation(&ticket, late), Completion::Discarded);
    assert_eq!(s.explanation(), &ExplanationState::Idle);

    // The new selection can still be explained.
    assert!(s.begin_explanation(None).is_ok());
}

#[tokio::test]
async fn agent_failure_is_reported_and_retryable() {
    let feeds = FakeFeeds::default().with("wildfires", vec![feature("a", "A", "wildfires", 1.0, 1.0)]);
    let agent = ScriptedAgent::failing("Missing agent env vars");
    let mut s = session(&["wildfires"]);
    s.refresh(&feeds).await.unwrap();
    s.select(&EventId::from("a"));

    let err = s.explain(&agent, None).await.unwrap_err();
    assert_eq!(err, ExplorerError::Explanation("Missing agent env vars".to_owned()));
    assert!(matches!(s.explanation(), ExplanationState::Failed { .. }));

    let retry = ScriptedAgent::replying("{\"summary\": \"ok\"}");
    assert!(s.explain(&retry, None).await.is_ok());
}

#[tokio::test]
async fn abandoned_explanation_can_be_retried() {
    let feeds = FakeFeeds::default().with("wildfires", vec![feature("a", "A", "wildfires", 1.0, 1.0)]);
    let mut s = session(&["wildfires"]);
    s.refresh(&feeds).await.unwrap();
    s.select(&EventId::from("a"));

    let abandoned = tokio::time::timeout(Duration::from_millis(20), s.explain(&SilentAgent, None)).await;
    assert!(abandoned.is_err());
    assert_eq!(s.explanation(), &ExplanationState::Idle);
    assert_eq!(s.selection(), Some(&EventId::from("a")));

    let retry = ScriptedAgent::replying("{\"summary\": \"ok\"}");
    assert!(s.explain(&retry, None).await.is_ok());
    assert!(matches!(s.explanation(), ExplanationState::Ready { .. }));
}

#[tokio::test]
async fn explanation_without_selection_is_rejected() {
    let agent = ScriptedAgent::replying("{}");
    let mut s = session(&["wildfires"]);
    assert_eq!(
        s.explain(&agent, None).await.unwrap_err(),
        ExplorerError::NothingSelected
    );
    assert!(agent.requests.lock().unwrap().is_empty());
}
