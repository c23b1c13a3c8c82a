//! Enumeration types for the EONET explorer.
//!
//! Covers event lifecycle status, the status filter sent upstream, the
//! interface language, and the per-marker visual state owned by the map
//! synchronization engine.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

// ---------------------------------------------------------------------------
// Event status
// ---------------------------------------------------------------------------

/// Lifecycle status of a single event.
///
/// EONET marks an event closed by setting its `closed` timestamp; an event
/// with no `closed` value is still open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum EventStatus {
    /// The event is ongoing.
    #[default]
    Open,
    /// The event has ended.
    Closed,
}

impl EventStatus {
    /// Lowercase label used in detail panels.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
        }
    }
}

/// Status filter passed to the upstream catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum StatusFilter {
    /// Only ongoing events.
    #[default]
    Open,
    /// Only ended events.
    Closed,
    /// Both open and closed events.
    All,
}

impl StatusFilter {
    /// Parse a user-supplied filter value.
    ///
    /// Matching is case-insensitive; anything unrecognized falls back to
    /// [`StatusFilter::Open`].
    pub fn parse_lenient(raw: &str) -> Self {
        match raw.trim().to_lowercase().as_str() {
            "closed" => Self::Closed,
            "all" => Self::All,
            _ => Self::Open,
        }
    }

    /// Query-string value understood by the upstream catalog.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Open => "open",
            Self::Closed => "closed",
            Self::All => "all",
        }
    }
}

// ---------------------------------------------------------------------------
// Language
// ---------------------------------------------------------------------------

/// Interface and explanation language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export, export_to = "bindings/")]
pub enum Lang {
    /// English.
    En,
    /// Spanish (the default).
    #[default]
    Es,
}

impl Lang {
    /// Parse a stored or requested language tag.
    ///
    /// Only `"en"` selects English; every other value, including a missing
    /// one, selects Spanish.
    pub fn parse_lenient(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            Some("en") => Self::En,
            _ => Self::Es,
        }
    }

    /// Two-letter tag.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::En => "en",
            Self::Es => "es",
        }
    }
}

// ---------------------------------------------------------------------------
// Marker visual state
// ---------------------------------------------------------------------------

/// Visual state of one map marker.
///
/// At most one marker holds [`MarkerVisualState::Selected`] at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[ts(export, export_to = "bindings/")]
pub enum MarkerVisualState {
    /// Default appearance.
    #[default]
    Normal,
    /// Enlarged, highlighted and raised to the front.
    Selected,
}
