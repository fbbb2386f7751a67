//! Branded ID newtypes.
//!
//! Every addressable entity gets its own newtype around `String` so a window
//! id can never be passed where an annotation id is expected. IDs minted by
//! tessera itself are UUID v7 (time-ordered); IDs handed in by external
//! collaborators (engine windows, annotations) are wrapped verbatim.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

fn new_v7() -> String {
    Uuid::now_v7().to_string()
}

macro_rules! branded_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Create a new random ID (UUID v7, time-ordered).
            #[must_use]
            pub fn new() -> Self {
                Self(new_v7())
            }

            /// Return the inner string as a slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume self and return the inner `String`.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self(s)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                Self(s.to_owned())
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

branded_id! {
    /// Identifier of a pooled rendering context.
    ContextId
}

branded_id! {
    /// Identifier of the component that owns a rendering context.
    OwnerId
}

branded_id! {
    /// Identifier of an open visualization window.
    WindowId
}

branded_id! {
    /// Identifier of an annotation, as assigned by the visualization engine.
    AnnotationId
}

branded_id! {
    /// Per-device identifier sent with every realtime connection.
    DeviceId
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn context_id_new_is_uuid_v7() {
        let id = ContextId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn device_id_new_is_uuid_v7() {
        let id = DeviceId::new();
        let parsed = Uuid::parse_str(id.as_str()).expect("should be valid UUID");
        assert_eq!(parsed.get_version(), Some(uuid::Version::SortRand));
    }

    #[test]
    fn ids_are_unique() {
        assert_ne!(ContextId::new(), ContextId::new());
    }

    #[test]
    fn external_ids_wrap_verbatim() {
        let id = WindowId::from("window-1");
        assert_eq!(id.as_str(), "window-1");
        assert_eq!(format!("{id}"), "window-1");
    }

    #[test]
    fn ids_sort_by_inner_string() {
        let mut ids = vec![AnnotationId::from("b"), AnnotationId::from("a"), AnnotationId::from("c")];
        ids.sort();
        let sorted: Vec<&str> = ids.iter().map(AnnotationId::as_str).collect();
        assert_eq!(sorted, ["a", "b", "c"]);
    }

    #[test]
    fn into_string() {
        let id = OwnerId::from("canvas-7");
        let s: String = id.into();
        assert_eq!(s, "canvas-7");
    }

    #[test]
    fn serde_is_transparent() {
        let id = AnnotationId::from("anno-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"anno-1\"");
        let back: AnnotationId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }
}
