//! Typed events emitted by the visualization engine.

use serde::{Deserialize, Serialize};
use tessera_core::annotation::{Geometry, Origin};
use tessera_core::ids::AnnotationId;

/// Create, update or delete of one annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationEvent {
    /// Engine-assigned id.
    pub id: AnnotationId,
    /// Who produced the change.
    pub origin: Origin,
    /// New geometry, if the engine sent one.
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

/// The user selected (or deselected) an annotation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionEvent {
    /// Selected annotation, if any.
    #[serde(default)]
    pub id: Option<AnnotationId>,
    /// Selected geometry in engine coordinates.
    #[serde(default)]
    pub geometry: Option<Geometry>,
}

/// The set of annotations intersecting the viewport changed.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntersectionEvent {
    /// Ids currently intersecting the viewport, in any order.
    pub visible: Vec<AnnotationId>,
}

/// One engine notification.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum EngineEvent {
    /// Annotation created.
    Create(AnnotationEvent),
    /// Annotation changed.
    Update(AnnotationEvent),
    /// Annotation removed.
    Delete(AnnotationEvent),
    /// Selection changed.
    Select(SelectionEvent),
    /// Viewport intersection changed.
    Intersect(IntersectionEvent),
}

impl EngineEvent {
    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Create(_) => "create",
            Self::Update(_) => "update",
            Self::Delete(_) => "delete",
            Self::Select(_) => "select",
            Self::Intersect(_) => "intersect",
        }
    }
}
