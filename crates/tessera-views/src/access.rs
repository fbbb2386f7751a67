//! Engine seam for reading and applying a window's viewport.

use tessera_core::ViewportState;

/// Per-window handle into the visualization engine.
///
/// `apply` may synchronously emit a viewport-changed notification back into
/// the synchronizer; the synchronizer never holds its lock across either
/// call.
pub trait ViewportAccess: Send + Sync {
    /// The engine's current viewport for this window.
    fn read(&self) -> ViewportState;

    /// Move the engine's camera to `viewport`.
    fn apply(&self, viewport: &ViewportState);
}
