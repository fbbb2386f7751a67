//! Reference shared-state store.
//!
//! [`AppState`] is a plain reducer over [`StateMessage`]. The real
//! application store is an external collaborator; this one backs the
//! headless runtime and the tests.

use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::annotation::{AnnotationRecord, HighlightShape, VisibilitySignature};
use crate::dispatch::{DispatchReceiver, StateMessage};
use crate::ids::{AnnotationId, WindowId};
use crate::viewport::ViewportState;

/// Snapshot of everything the runtime managers have published.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppState {
    /// Last published viewport per window.
    pub viewports: IndexMap<WindowId, ViewportState>,
    /// The active window, once one has been activated.
    pub active_window: Option<WindowId>,
    /// User-origin annotations.
    pub annotations: IndexMap<AnnotationId, AnnotationRecord>,
    /// Latest visibility signature.
    pub visibility: VisibilitySignature,
    /// Current highlight, if any.
    pub highlight: Option<HighlightShape>,
    /// Number of messages applied so far.
    pub applied: u64,
}

impl AppState {
    /// Apply one message.
    pub fn apply(&mut self, message: StateMessage) {
        match message {
            StateMessage::ViewportPublished { viewport }
            | StateMessage::ViewportApplied { viewport, .. } => {
                let _ = self.viewports.insert(viewport.window_id.clone(), viewport);
            }
            StateMessage::ActiveWindowChanged { window_id } => {
                self.active_window = Some(window_id);
            }
            StateMessage::AnnotationCreated { record } | StateMessage::AnnotationUpdated { record } => {
                let _ = self.annotations.insert(record.id.clone(), record);
            }
            StateMessage::AnnotationDeleted { id } => {
                let _ = self.annotations.shift_remove(&id);
            }
            StateMessage::VisibilityChanged { signature } => {
                self.visibility = signature;
            }
            StateMessage::HighlightChanged { shape } => {
                self.highlight = shape;
            }
        }
        self.applied += 1;
    }
}

/// Drain `rx` into `state` until the channel closes or `cancel` fires.
///
/// This is the single serializing consumer: messages are applied strictly in
/// the order they were published.
pub async fn run_dispatcher(
    mut rx: DispatchReceiver,
    state: Arc<RwLock<AppState>>,
    cancel: CancellationToken,
) {
    loop {
        tokio::select! {
            message = rx.recv() => {
                let Some(message) = message else { break };
                trace!(kind = message.kind(), "applying state message");
                state.write().apply(message);
            }
            () = cancel.cancelled() => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotation::Origin;
    use crate::dispatch::Dispatcher;

    fn record(id: &str) -> AnnotationRecord {
        AnnotationRecord {
            id: AnnotationId::from(id),
            geometry: None,
            origin: Origin::User,
            visible: false,
        }
    }

    #[test]
    fn create_update_delete() {
        let mut state = AppState::default();
        state.apply(StateMessage::AnnotationCreated { record: record("a") });
        state.apply(StateMessage::AnnotationCreated { record: record("b") });
        let mut updated = record("a");
        updated.visible = true;
        state.apply(StateMessage::AnnotationUpdated { record: updated });
        state.apply(StateMessage::AnnotationDeleted {
            id: AnnotationId::from("b"),
        });

        assert_eq!(state.annotations.len(), 1);
        assert!(state.annotations[&AnnotationId::from("a")].visible);
        assert_eq!(state.applied, 4);
    }

    #[test]
    fn applied_viewport_overwrites_published() {
        let mut state = AppState::default();
        let w = WindowId::from("w1");
        state.apply(StateMessage::ViewportPublished {
            viewport: ViewportState::new(w.clone(), 1.0, 1.0, 1.0),
        });
        state.apply(StateMessage::ViewportApplied {
            source: WindowId::from("w2"),
            viewport: ViewportState::new(w.clone(), 9.0, 9.0, 2.0),
        });
        assert!((state.viewports[&w].x - 9.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn run_dispatcher_applies_until_closed() {
        let (dispatcher, rx) = Dispatcher::channel();
        let state = Arc::new(RwLock::new(AppState::default()));
        let task = tokio::spawn(run_dispatcher(rx, state.clone(), CancellationToken::new()));

        let _ = dispatcher.publish(StateMessage::ActiveWindowChanged {
            window_id: WindowId::from("w1"),
        });
        drop(dispatcher);
        task.await.unwrap();

        let state = state.read();
        assert_eq!(state.active_window.as_ref().map(WindowId::as_str), Some("w1"));
        assert_eq!(state.applied, 1);
    }

    #[tokio::test]
    async fn run_dispatcher_stops_on_cancel() {
        let (_dispatcher, rx) = Dispatcher::channel();
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run_dispatcher(
            rx,
            Arc::new(RwLock::new(AppState::default())),
            cancel.clone(),
        ));
        cancel.cancel();
        task.await.unwrap();
    }
}
