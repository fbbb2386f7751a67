//! Annotation event routing.
//!
//! Every engine event is tracked locally, but only user-origin changes are
//! forwarded to shared state: backend-origin events are replays of persisted
//! annotations and must never flow back out. Visibility publishes wait for
//! the next paint frame and collapse to the latest signature.

use std::sync::{Arc, Weak};

use indexmap::IndexMap;
use parking_lot::Mutex;
use tessera_core::annotation::{
    AnnotationRecord, Bounds, Geometry, HighlightShape, Origin, Point, VisibilitySignature,
};
use tessera_core::ids::AnnotationId;
use tessera_core::{Dispatcher, FrameSource, StateMessage, TaskSlot};
use tracing::{debug, trace};

use crate::events::{AnnotationEvent, EngineEvent, IntersectionEvent, SelectionEvent};

/// Engine coordinates are divided by this to get the normalized frame.
pub const NORMALIZATION_SCALE: f64 = 1000.0;

#[derive(Default)]
struct RouterState {
    records: IndexMap<AnnotationId, AnnotationRecord>,
    signature: VisibilitySignature,
    highlight: Option<HighlightShape>,
}

struct Inner {
    dispatcher: Dispatcher,
    frames: Arc<dyn FrameSource>,
    state: Mutex<RouterState>,
    visibility: TaskSlot,
}

/// Routes [`EngineEvent`]s into shared state. Cheap to clone.
#[derive(Clone)]
pub struct AnnotationEventRouter {
    inner: Arc<Inner>,
}

impl AnnotationEventRouter {
    /// Create a router publishing to `dispatcher`, deferring visibility
    /// publishes to `frames`.
    pub fn new(dispatcher: Dispatcher, frames: Arc<dyn FrameSource>) -> Self {
        Self {
            inner: Arc::new(Inner {
                dispatcher,
                frames,
                state: Mutex::new(RouterState::default()),
                visibility: TaskSlot::new(),
            }),
        }
    }

    /// Handle one engine event.
    pub fn route(&self, event: EngineEvent) {
        trace!(kind = event.kind(), "engine event");
        match event {
            EngineEvent::Create(event) => self.upsert(event, true),
            EngineEvent::Update(event) => self.upsert(event, false),
            EngineEvent::Delete(event) => self.delete(event),
            EngineEvent::Select(event) => self.select(event),
            EngineEvent::Intersect(event) => self.intersect(event),
        }
    }

    /// Tracked records, in first-seen order.
    pub fn records(&self) -> Vec<AnnotationRecord> {
        self.inner.state.lock().records.values().cloned().collect()
    }

    /// Latest visibility signature.
    pub fn signature(&self) -> VisibilitySignature {
        self.inner.state.lock().signature.clone()
    }

    /// Current highlight.
    pub fn highlight(&self) -> Option<HighlightShape> {
        self.inner.state.lock().highlight.clone()
    }

    /// Cancel the pending visibility publish.
    pub fn shutdown(&self) {
        if self.inner.visibility.cancel() {
            debug!("pending visibility publish cancelled");
        }
    }

    fn upsert(&self, event: AnnotationEvent, created: bool) {
        let AnnotationEvent {
            id,
            origin,
            geometry,
        } = event;
        let record = {
            let mut state = self.inner.state.lock();
            let visible = state.records.get(&id).is_some_and(|r| r.visible);
            let record = AnnotationRecord {
                id: id.clone(),
                geometry,
                origin,
                visible,
            };
            let _ = state.records.insert(id, record.clone());
            record
        };

        if origin == Origin::Backend {
            trace!(id = %record.id, "backend-origin change tracked, not forwarded");
            return;
        }
        let message = if created {
            StateMessage::AnnotationCreated { record }
        } else {
            StateMessage::AnnotationUpdated { record }
        };
        let _ = self.inner.dispatcher.publish(message);
    }

    fn delete(&self, event: AnnotationEvent) {
        let _ = self.inner.state.lock().records.shift_remove(&event.id);
        if event.origin == Origin::Backend {
            trace!(id = %event.id, "backend-origin delete tracked, not forwarded");
            return;
        }
        let _ = self
            .inner
            .dispatcher
            .publish(StateMessage::AnnotationDeleted { id: event.id });
    }

    fn select(&self, event: SelectionEvent) {
        let shape = event.geometry.as_ref().and_then(normalize);
        if shape.is_none() {
            debug!(id = ?event.id, "selection without usable geometry, clearing highlight");
        }
        self.inner.state.lock().highlight.clone_from(&shape);
        let _ = self
            .inner
            .dispatcher
            .publish(StateMessage::HighlightChanged { shape });
    }

    fn intersect(&self, event: IntersectionEvent) {
        let mut visible_ids = event.visible;
        visible_ids.sort();
        visible_ids.dedup();

        {
            let mut state = self.inner.state.lock();
            for record in state.records.values_mut() {
                record.visible = visible_ids.binary_search(&record.id).is_ok();
            }
            let user_count = state
                .records
                .values()
                .filter(|r| r.origin == Origin::User)
                .count();
            let signature = VisibilitySignature {
                user_count,
                visible_ids,
            };
            if signature == state.signature {
                return;
            }
            state.signature = signature;
        }

        let weak = Arc::downgrade(&self.inner);
        self.inner
            .visibility
            .replace(self.inner.frames.next_frame(), move || publish_visibility(&weak));
    }
}

fn publish_visibility(inner: &Weak<Inner>) {
    let Some(inner) = inner.upgrade() else {
        return;
    };
    let signature = inner.state.lock().signature.clone();
    trace!(
        visible = signature.visible_ids.len(),
        user_count = signature.user_count,
        "visibility published"
    );
    let _ = inner
        .dispatcher
        .publish(StateMessage::VisibilityChanged { signature });
}

/// Map engine geometry into the normalized frame. `None` for anything that
/// cannot be highlighted.
pub fn normalize(geometry: &Geometry) -> Option<HighlightShape> {
    match geometry {
        Geometry::Rectangle {
            x,
            y,
            width,
            height,
        } => {
            let (x0, x1) = ordered(*x, x + width);
            let (y0, y1) = ordered(*y, y + height);
            Some(HighlightShape {
                bounds: Bounds {
                    min_x: x0 / NORMALIZATION_SCALE,
                    min_y: y0 / NORMALIZATION_SCALE,
                    max_x: x1 / NORMALIZATION_SCALE,
                    max_y: y1 / NORMALIZATION_SCALE,
                },
                points: Vec::new(),
            })
        }
        Geometry::Polygon { points } => {
            let first = points.first()?;
            let start = Point::new(first.x / NORMALIZATION_SCALE, first.y / NORMALIZATION_SCALE);
            let mut bounds = Bounds {
                min_x: start.x,
                min_y: start.y,
                max_x: start.x,
                max_y: start.y,
            };
            let mut normalized = Vec::with_capacity(points.len());
            for p in points {
                let n = Point::new(p.x / NORMALIZATION_SCALE, p.y / NORMALIZATION_SCALE);
                bounds.min_x = bounds.min_x.min(n.x);
                bounds.min_y = bounds.min_y.min(n.y);
                bounds.max_x = bounds.max_x.max(n.x);
                bounds.max_y = bounds.max_y.max(n.y);
                normalized.push(n);
            }
            Some(HighlightShape {
                bounds,
                points: normalized,
            })
        }
        Geometry::Other { kind } => {
            trace!(kind = %kind, "unsupported selector kind");
            None
        }
    }
}

fn ordered(a: f64, b: f64) -> (f64, f64) {
    if a <= b { (a, b) } else { (b, a) }
}
