//! Collaborator traits for the upstream catalog and the explanation agent.
//!
//! The core never performs I/O itself. It asks an [`EventSource`] for raw
//! per-category feeds and an [`ExplanationSource`] for agent replies; the
//! runner crate provides HTTP implementations and tests provide in-memory
//! ones.

use std::future::Future;

use eonet_types::{CategoryId, EventId, Lang, StatusFilter};
use serde::{Deserialize, Serialize};

use crate::error::ExplorerError;

/// One category-scoped feed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedRequest {
    /// Category filter; `None` requests every category.
    pub category: Option<CategoryId>,
    /// Open/closed filter.
    pub status: StatusFilter,
    /// Look-back window in days.
    pub window_days: u32,
}

impl FeedRequest {
    /// Label used in logs and errors (`*` for an unfiltered feed).
    pub fn category_label(&self) -> &str {
        self.category.as_ref().map_or("*", CategoryId::as_str)
    }
}

/// A source of raw event feeds.
///
/// A feed is the list of raw records (GeoJSON features or plain EONET
/// events) the upstream returned for one request, in received order.
pub trait EventSource {
    /// Fetch one feed.
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::FeedFailed`] if the feed could not be
    /// retrieved or decoded.
    fn fetch_feed(
        &self,
        request: &FeedRequest,
    ) -> impl Future<Output = Result<Vec<serde_json::Value>, ExplorerError>> + Send;
}

/// Request for an explanation of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExplainRequest {
    /// The event to explain.
    pub event_id: EventId,
    /// Optional user question; blank questions are dropped.
    pub question: Option<String>,
    /// Language of the reply.
    pub lang: Lang,
}

impl ExplainRequest {
    /// Build a request, discarding a blank question.
    pub fn new(event_id: EventId, question: Option<&str>, lang: Lang) -> Self {
        let question = question
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(ToOwned::to_owned);
        Self {
            event_id,
            question,
            lang,
        }
    }

    /// The user's question, or the default question for the language.
    pub fn effective_question(&self) -> &str {
        self.question
            .as_deref()
            .unwrap_or_else(|| default_question(self.lang))
    }
}

/// Raw reply from the explanation agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Explanation {
    /// The agent's reply text, unmodified.
    pub raw_text: String,
    /// Retrieval metadata passed through from the agent, if any.
    pub retrieval: Option<serde_json::Value>,
}

/// A source of event explanations.
pub trait ExplanationSource {
    /// Ask the agent to explain one event.
    ///
    /// # Errors
    ///
    /// Returns [`ExplorerError::Explanation`] if the agent could not be
    /// reached or returned a failure status.
    fn explain(
        &self,
        request: &ExplainRequest,
    ) -> impl Future<Output = Result<Explanation, ExplorerError>> + Send;
}

/// Question asked when the user leaves the question box empty.
pub const fn default_question(lang: Lang) -> &'static str {
    match lang {
        Lang::En => {
            "Explain this event in a simple way for a non-technical user. Focus on what it is, \
             why it appears in EONET, and how to interpret sources and geometry."
        }
        Lang::Es => {
            "Explica este evento de forma simple para un usuario no técnico. Enfócate en qué es, \
             por qué aparece en EONET y cómo interpretar sources y geometry."
        }
    }
}

/// Canned questions offered next to the question box.
pub const fn quick_questions(lang: Lang) -> [&'static str; 3] {
    match lang {
        Lang::En => [
            "What does this event mean?",
            "How reliable is this data?",
            "How should I interpret geometry and sources?",
        ],
        Lang::Es => [
            "¿Qué significa este evento?",
            "¿Qué tan confiable es este dato?",
            "¿Cómo interpreto geometry y sources?",
        ],
    }
}
