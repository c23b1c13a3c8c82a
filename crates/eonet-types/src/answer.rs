//! Normalized explanation documents.
//!
//! The generative backend replies with loosely structured text. The core
//! reconciles it into an [`AnswerDocument`]; when nothing structured can be
//! recovered the reply is kept verbatim as [`ParsedAnswer::Unstructured`].

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// A cited source in an explanation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AnswerSource {
    /// Display label (never empty).
    pub label: String,
    /// Link target, when one was supplied.
    pub url: Option<String>,
}

impl AnswerSource {
    /// A source with a label and no link.
    pub fn labelled(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            url: None,
        }
    }
}

/// Structural breakdown of a generated explanation.
///
/// Every field defaults to empty; a partially filled document is valid and
/// renders only its non-empty sections.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub struct AnswerDocument {
    /// One to three line overview.
    pub summary: String,
    /// What the event means.
    pub meaning: Vec<String>,
    /// How to interpret the event data.
    pub how_to_read: Vec<String>,
    /// Caveats and uncertainty.
    pub limitations: Vec<String>,
    /// Suggested follow-ups.
    pub next_steps: Vec<String>,
    /// Cited sources.
    pub sources: Vec<AnswerSource>,
}

impl AnswerDocument {
    /// Whether no field carries any content.
    pub fn is_empty(&self) -> bool {
        self.summary.is_empty()
            && self.meaning.is_empty()
            && self.how_to_read.is_empty()
            && self.limitations.is_empty()
            && self.next_steps.is_empty()
            && self.sources.is_empty()
    }
}

/// Outcome of normalizing a raw reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum ParsedAnswer {
    /// A structured object was recovered and mapped.
    Structured(AnswerDocument),
    /// Nothing structured was found; display the raw text as-is.
    Unstructured(String),
}

impl ParsedAnswer {
    /// The structured document, if one was recovered.
    pub const fn document(&self) -> Option<&AnswerDocument> {
        match self {
            Self::Structured(doc) => Some(doc),
            Self::Unstructured(_) => None,
        }
    }

    /// Whether the answer fell back to raw text.
    pub const fn is_unstructured(&self) -> bool {
        matches!(self, Self::Unstructured(_))
    }
}
