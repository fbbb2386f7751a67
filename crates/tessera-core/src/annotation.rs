//! Annotation records, geometry, and derived visibility/highlight state.

use serde::{Deserialize, Serialize};

use crate::ids::AnnotationId;

/// Where an annotation event came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Origin {
    /// Direct user interaction in the visualization engine.
    User,
    /// Programmatic replay of persisted state.
    Backend,
}

/// A 2D point in engine (or normalized) coordinates.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Point {
    /// X coordinate.
    pub x: f64,
    /// Y coordinate.
    pub y: f64,
}

impl Point {
    /// Create a point.
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Annotation geometry as emitted by the visualization engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Geometry {
    /// Axis-aligned rectangle anchored at its top-left corner.
    Rectangle {
        /// Left edge.
        x: f64,
        /// Top edge.
        y: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
    /// Closed polygon.
    Polygon {
        /// Vertices in drawing order.
        points: Vec<Point>,
    },
    /// Any selector kind tessera does not interpret (circle, freehand, ...).
    Other {
        /// The engine's name for the selector kind.
        kind: String,
    },
}

/// One annotation known to the router.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    /// Engine-assigned id.
    pub id: AnnotationId,
    /// Shape of the annotation, if the engine supplied one.
    pub geometry: Option<Geometry>,
    /// Who produced it.
    pub origin: Origin,
    /// Whether it currently intersects the viewport. Recomputed, never persisted.
    pub visible: bool,
}

/// Summary of what is currently visible, used to suppress redundant publishes.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VisibilitySignature {
    /// Number of user-origin annotations known to the router.
    pub user_count: usize,
    /// Sorted, deduplicated ids currently intersecting the viewport.
    pub visible_ids: Vec<AnnotationId>,
}

/// Axis-aligned bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bounds {
    /// Smallest x.
    pub min_x: f64,
    /// Smallest y.
    pub min_y: f64,
    /// Largest x.
    pub max_x: f64,
    /// Largest y.
    pub max_y: f64,
}

/// The currently highlighted selection in the normalized coordinate frame.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HighlightShape {
    /// Bounding box of the selection.
    pub bounds: Bounds,
    /// Normalized polygon vertices; empty for rectangles.
    pub points: Vec<Point>,
}
