//! Typed state-change messages and the serializing dispatcher.
//!
//! Components never reach into shared state directly. Each one holds a
//! cloned [`Dispatcher`] and publishes [`StateMessage`] values; a single
//! consumer drains the [`DispatchReceiver`] in order (see
//! [`crate::store::run_dispatcher`]).

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

use crate::annotation::{AnnotationRecord, HighlightShape, VisibilitySignature};
use crate::ids::{AnnotationId, WindowId};
use crate::viewport::ViewportState;

/// A state change published by one of the runtime managers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StateMessage {
    /// A window's debounced local viewport was published.
    ViewportPublished {
        /// The published viewport.
        viewport: ViewportState,
    },
    /// Coordinates from a divergent view were applied to the active view.
    ViewportApplied {
        /// The view whose coordinates were copied.
        source: WindowId,
        /// The applied viewport (targeting the active window).
        viewport: ViewportState,
    },
    /// The active window changed.
    ActiveWindowChanged {
        /// The newly active window.
        window_id: WindowId,
    },
    /// A user-origin annotation was created.
    AnnotationCreated {
        /// The created record.
        record: AnnotationRecord,
    },
    /// A user-origin annotation was updated.
    AnnotationUpdated {
        /// The updated record.
        record: AnnotationRecord,
    },
    /// A user-origin annotation was deleted.
    AnnotationDeleted {
        /// Id of the deleted annotation.
        id: AnnotationId,
    },
    /// The set of visible annotations changed.
    VisibilityChanged {
        /// The new signature.
        signature: VisibilitySignature,
    },
    /// The highlighted selection changed; `None` clears it.
    HighlightChanged {
        /// The new highlight, if any.
        shape: Option<HighlightShape>,
    },
}

impl StateMessage {
    /// Short classification string for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ViewportPublished { .. } => "viewport_published",
            Self::ViewportApplied { .. } => "viewport_applied",
            Self::ActiveWindowChanged { .. } => "active_window_changed",
            Self::AnnotationCreated { .. } => "annotation_created",
            Self::AnnotationUpdated { .. } => "annotation_updated",
            Self::AnnotationDeleted { .. } => "annotation_deleted",
            Self::VisibilityChanged { .. } => "visibility_changed",
            Self::HighlightChanged { .. } => "highlight_changed",
        }
    }
}

/// Cloneable publishing side of the state channel.
#[derive(Clone, Debug)]
pub struct Dispatcher {
    tx: mpsc::UnboundedSender<StateMessage>,
}

/// Receiving side of the state channel. There is exactly one per dispatcher.
pub type DispatchReceiver = mpsc::UnboundedReceiver<StateMessage>;

impl Dispatcher {
    /// Create a dispatcher and its single receiver.
    pub fn channel() -> (Self, DispatchReceiver) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Publish a message. Returns `false` if the consumer is gone.
    ///
    /// Publishing never blocks, so it is safe from synchronous callbacks.
    pub fn publish(&self, message: StateMessage) -> bool {
        let kind = message.kind();
        if self.tx.send(message).is_ok() {
            true
        } else {
            debug!(kind, "state consumer closed, dropping message");
            false
        }
    }

    /// Whether the consumer has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}
