//! Shared type definitions for the EONET explorer.
//!
//! This crate is the single source of truth for all types used across the
//! workspace. Types defined here flow downstream to `TypeScript` via `ts-rs`
//! for the browser front end.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe wrappers for upstream string identifiers
//! - [`enums`] -- Event status, status filter, language, marker state
//! - [`structs`] -- Events, geometry, map points, queries, session state
//! - [`answer`] -- Normalized explanation documents

pub mod answer;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use answer::{AnswerDocument, AnswerSource, ParsedAnswer};
pub use enums::{EventStatus, Lang, MarkerVisualState, StatusFilter};
pub use ids::{CategoryId, EventId};
pub use structs::{
    CategoryRef, DEFAULT_WINDOW_DAYS, Event, EventQuery, FeedState, GeoBounds, GeometryRecord,
    LatLon, MAX_WINDOW_DAYS, MIN_WINDOW_DAYS, MapPoint, Magnitude, SUPPORTED_CATEGORIES,
    SelectionState, SourceRef,
};

#[cfg(test)]
mod tests {
    //! Integration tests for type exports and `TypeScript` binding generation.

    #[test]
    fn export_bindings() {
        // ts-rs generates TypeScript bindings when types with
        // #[ts(export)] are used. The files are written to the `bindings/`
        // directory relative to the crate root.
        use ts_rs::TS;

        // IDs
        let _ = crate::ids::EventId::export_all();
        let _ = crate::ids::CategoryId::export_all();

        // Enums
        let _ = crate::enums::EventStatus::export_all();
        let _ = crate::enums::StatusFilter::export_all();
        let _ = crate::enums::Lang::export_all();
        let _ = crate::enums::MarkerVisualState::export_all();

        // Structs
        let _ = crate::structs::CategoryRef::export_all();
        let _ = crate::structs::SourceRef::export_all();
        let _ = crate::structs::Magnitude::export_all();
        let _ = crate::structs::GeometryRecord::export_all();
        let _ = crate::structs::Event::export_all();
        let _ = crate::structs::LatLon::export_all();
        let _ = crate::structs::MapPoint::export_all();
        let _ = crate::structs::GeoBounds::export_all();
        let _ = crate::structs::EventQuery::export_all();
        let _ = crate::structs::SelectionState::export_all();
        let _ = crate::structs::FeedState::export_all();

        // Answers
        let _ = crate::answer::AnswerSource::export_all();
        let _ = crate::answer::AnswerDocument::export_all();
        let _ = crate::answer::ParsedAnswer::export_all();
    }
}
