//! Per-window viewport state.
//!
//! Viewports are compared per axis against an epsilon threshold, never with
//! exact float equality. `(0, 0, 1)` is the uninitialized default that every
//! window starts with before the engine reports real coordinates.

use serde::{Deserialize, Serialize};

use crate::ids::WindowId;

/// Default divergence threshold between two viewports, per axis.
pub const DEFAULT_EPSILON: f64 = 0.001;

/// Center and zoom of one open window.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewportState {
    /// Window this viewport belongs to.
    pub window_id: WindowId,
    /// Center x coordinate.
    pub x: f64,
    /// Center y coordinate.
    pub y: f64,
    /// Zoom factor.
    pub zoom: f64,
}

impl ViewportState {
    /// Create a viewport for `window_id` at the given coordinates.
    pub fn new(window_id: WindowId, x: f64, y: f64, zoom: f64) -> Self {
        Self {
            window_id,
            x,
            y,
            zoom,
        }
    }

    /// The uninitialized default `(0, 0, 1)` for `window_id`.
    pub fn uninitialized(window_id: WindowId) -> Self {
        Self::new(window_id, 0.0, 0.0, 1.0)
    }

    /// Whether these coordinates are still the uninitialized default.
    pub fn is_uninitialized(&self, epsilon: f64) -> bool {
        !coords_diverge((self.x, self.y, self.zoom), (0.0, 0.0, 1.0), epsilon)
    }

    /// Whether any axis differs from `other` by more than `epsilon`.
    ///
    /// The window ids are ignored; only coordinates are compared.
    pub fn diverges_from(&self, other: &Self, epsilon: f64) -> bool {
        coords_diverge(
            (self.x, self.y, self.zoom),
            (other.x, other.y, other.zoom),
            epsilon,
        )
    }

    /// Copy of `self` re-targeted at another window.
    #[must_use]
    pub fn for_window(&self, window_id: WindowId) -> Self {
        Self {
            window_id,
            ..self.clone()
        }
    }
}

fn coords_diverge(a: (f64, f64, f64), b: (f64, f64, f64), epsilon: f64) -> bool {
    (a.0 - b.0).abs() > epsilon || (a.1 - b.1).abs() > epsilon || (a.2 - b.2).abs() > epsilon
}
