//! Type-safe identifier wrappers around upstream string identifiers.
//!
//! EONET assigns every event and category a string identifier (for example
//! `EONET_6512` or `wildfires`). Wrapping them prevents an event id from
//! being passed where a category id is expected.

use serde::{Deserialize, Serialize};
use ts_rs::TS;

/// Generates a newtype wrapper around [`String`] with standard derives.
macro_rules! define_id {
    (
        $(#[$meta:meta])*
        $name:ident
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
        #[serde(transparent)]
        #[ts(export, export_to = "bindings/")]
        pub struct $name(pub String);

        impl $name {
            /// Create an identifier from any string-like value.
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Borrow the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Return the inner [`String`] value.
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_owned())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

define_id! {
    /// Upstream-assigned identifier of a natural event.
    EventId
}

define_id! {
    /// Identifier of an EONET category (e.g. `wildfires`, `severeStorms`).
    CategoryId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_serializes_as_plain_string() {
        let id = EventId::new("EONET_6512");
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("\"EONET_6512\""));
    }

    #[test]
    fn id_roundtrip_serde() {
        let restored: Result<CategoryId, _> = serde_json::from_str("\"volcanoes\"");
        assert!(restored.is_ok());
        assert_eq!(restored.ok().map(CategoryId::into_inner).as_deref(), Some("volcanoes"));
    }

    #[test]
    fn id_display_matches_inner() {
        let id = EventId::from("EONET_1");
        assert_eq!(id.to_string(), "EONET_1");
        assert_eq!(id.as_str(), "EONET_1");
    }
}
