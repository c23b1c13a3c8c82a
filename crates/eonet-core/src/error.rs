//! Error types for the `eonet-core` crate.
//!
//! Only the failures a user can act on are errors here. Malformed records,
//! unparseable answers, stale responses and dangling selections are handled
//! in place and never surface through [`ExplorerError`].

/// Errors that can occur while driving an explorer session.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExplorerError {
    /// One category feed failed, so the whole aggregation failed.
    #[error("feed for category {category} failed: {reason}")]
    FeedFailed {
        /// The category whose feed failed (`*` for an unfiltered feed).
        category: String,
        /// Description of the failure.
        reason: String,
    },

    /// An explanation was requested with no event selected.
    #[error("no event is selected")]
    NothingSelected,

    /// An explanation for the current selection is already outstanding.
    #[error("an explanation for event {0} is already in flight")]
    ExplanationInFlight(String),

    /// The explanation backend returned an error.
    #[error("explanation failed: {0}")]
    Explanation(String),
}
