//! # tessera-annotations
//!
//! Bridges annotation engine events into shared state.
//!
//! - [`EngineEvent`]: the typed events the engine emits (create, update,
//!   delete, select, intersect)
//! - [`AnnotationEventRouter`]: forwards user-origin changes, defers
//!   visibility publishes to the next paint frame, and normalizes selection
//!   geometry into highlight shapes

#![deny(unsafe_code)]

pub mod events;
pub mod router;

pub use events::{AnnotationEvent, EngineEvent, IntersectionEvent, SelectionEvent};
pub use router::{AnnotationEventRouter, NORMALIZATION_SCALE, normalize};
