//! Cross-view viewport synchronization.
//!
//! Every registered window has a stored viewport: the last value published
//! for it. Local camera changes are debounced per window, then published and
//! followed by a reconcile pass that pulls the last divergent inactive view
//! into the active one. Three guards keep the views from chasing each other:
//!
//! - divergence is per axis against epsilon, never exact equality
//! - applies are throttled to one per `min_sync_interval`
//! - after an apply, local changes are ignored for `suppression`, which
//!   swallows the engine's echo of the applied camera

use std::sync::{Arc, Weak};
use std::time::Duration;

use indexmap::IndexMap;
use parking_lot::Mutex;
use tessera_core::ids::WindowId;
use tessera_core::viewport::DEFAULT_EPSILON;
use tessera_core::{Dispatcher, StateMessage, TaskSlot, ViewportState};
use tokio::time::Instant;
use tracing::{debug, info, trace};

use crate::access::ViewportAccess;

/// Synchronizer timing.
#[derive(Clone, Debug)]
pub struct SyncConfig {
    /// Kill-switch. When `false`, nothing is published or applied.
    pub enabled: bool,
    /// Quiet period before a local change is published.
    pub debounce: Duration,
    /// Per-axis divergence threshold.
    pub epsilon: f64,
    /// Minimum time between two applies.
    pub min_sync_interval: Duration,
    /// Time after an apply during which local changes are ignored.
    pub suppression: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            debounce: Duration::from_millis(200),
            epsilon: DEFAULT_EPSILON,
            min_sync_interval: Duration::from_millis(500),
            suppression: Duration::from_millis(100),
        }
    }
}

struct ViewEntry {
    access: Arc<dyn ViewportAccess>,
    stored: ViewportState,
    debounce: TaskSlot,
}

struct SyncState {
    views: IndexMap<WindowId, ViewEntry>,
    active: Option<WindowId>,
    enabled: bool,
    last_sync: Option<Instant>,
    suppress_until: Option<Instant>,
}

impl SyncState {
    fn suppressed(&self, now: Instant) -> bool {
        self.suppress_until.is_some_and(|until| now < until)
    }
}

struct Inner {
    config: SyncConfig,
    dispatcher: Dispatcher,
    state: Mutex<SyncState>,
}

/// Keeps the active view in step with divergent views. Cheap to clone.
#[derive(Clone)]
pub struct ViewSynchronizer {
    inner: Arc<Inner>,
}

impl ViewSynchronizer {
    /// Create a synchronizer publishing to `dispatcher`.
    pub fn new(config: SyncConfig, dispatcher: Dispatcher) -> Self {
        let enabled = config.enabled;
        Self {
            inner: Arc::new(Inner {
                config,
                dispatcher,
                state: Mutex::new(SyncState {
                    views: IndexMap::new(),
                    active: None,
                    enabled,
                    last_sync: None,
                    suppress_until: None,
                }),
            }),
        }
    }

    /// Register a window. Its stored viewport starts at the uninitialized
    /// default. Re-registering replaces the access handle and keeps the
    /// stored viewport.
    pub fn register_view(&self, window_id: WindowId, access: Arc<dyn ViewportAccess>) {
        let mut state = self.inner.state.lock();
        if let Some(entry) = state.views.get_mut(&window_id) {
            entry.access = access;
            return;
        }
        debug!(window = %window_id, "view registered");
        let stored = ViewportState::uninitialized(window_id.clone());
        let _ = state.views.insert(
            window_id,
            ViewEntry {
                access,
                stored,
                debounce: TaskSlot::new(),
            },
        );
    }

    /// Remove a window and cancel its pending debounce.
    pub fn unregister_view(&self, window_id: &WindowId) -> bool {
        let mut state = self.inner.state.lock();
        let Some(entry) = state.views.shift_remove(window_id) else {
            return false;
        };
        let _ = entry.debounce.cancel();
        if state.active.as_ref() == Some(window_id) {
            state.active = None;
        }
        debug!(window = %window_id, "view unregistered");
        true
    }

    /// Local camera change reported by the engine.
    ///
    /// Debounced per window; ignored while disabled or inside the
    /// post-apply suppression window.
    pub fn on_viewport_changed(&self, viewport: ViewportState) {
        let state = self.inner.state.lock();
        if !state.enabled {
            return;
        }
        if state.suppressed(Instant::now()) {
            trace!(window = %viewport.window_id, "viewport change suppressed");
            return;
        }
        let Some(entry) = state.views.get(&viewport.window_id) else {
            debug!(window = %viewport.window_id, "viewport change for unknown window");
            return;
        };
        let weak = Arc::downgrade(&self.inner);
        entry.debounce.replace_after(self.inner.config.debounce, move || {
            if let Some(sync) = upgrade(&weak) {
                sync.publish(viewport);
            }
        });
    }

    /// Make `window_id` the active view.
    ///
    /// Its stored viewport is applied unless it is still the uninitialized
    /// default; an apply drops the window's pending local change. Returns
    /// `false` for an unknown window.
    pub fn activate(&self, window_id: &WindowId) -> bool {
        let epsilon = self.inner.config.epsilon;
        let pending_apply = {
            let mut state = self.inner.state.lock();
            let Some(entry) = state.views.get(window_id) else {
                return false;
            };
            let apply = (!entry.stored.is_uninitialized(epsilon))
                .then(|| (Arc::clone(&entry.access), entry.stored.clone()));
            if apply.is_some() && entry.debounce.cancel() {
                trace!(window = %window_id, "pending change superseded by activation");
            }
            state.active = Some(window_id.clone());
            if apply.is_some() {
                state.suppress_until = Some(Instant::now() + self.inner.config.suppression);
            }
            apply
        };

        info!(window = %window_id, "view activated");
        let _ = self.inner.dispatcher.publish(StateMessage::ActiveWindowChanged {
            window_id: window_id.clone(),
        });
        if let Some((access, stored)) = pending_apply {
            access.apply(&stored);
        }
        true
    }

    /// Pull the last divergent inactive view into the active one.
    ///
    /// Only inactive views that have published real coordinates are
    /// candidates: a view still at the uninitialized default never pulls the
    /// active view back to `(0, 0, 1)`. Returns the source window when
    /// coordinates were applied. A candidate that arrives inside
    /// `min_sync_interval` of the previous apply is dropped. An apply cancels
    /// the active view's pending local change, which predates it.
    pub fn reconcile(&self) -> Option<WindowId> {
        let epsilon = self.inner.config.epsilon;
        let (active_id, active_access) = {
            let state = self.inner.state.lock();
            if !state.enabled {
                return None;
            }
            let active_id = state.active.clone()?;
            let access = Arc::clone(&state.views.get(&active_id)?.access);
            (active_id, access)
        };
        let current = active_access.read();

        let (source, applied) = {
            let mut state = self.inner.state.lock();
            if state.active.as_ref() != Some(&active_id) {
                return None;
            }
            let (source, candidate) = state
                .views
                .iter()
                .rev()
                .find(|(id, entry)| {
                    **id != active_id
                        && !entry.stored.is_uninitialized(epsilon)
                        && entry.stored.diverges_from(&current, epsilon)
                })
                .map(|(id, entry)| (id.clone(), entry.stored.clone()))?;

            let now = Instant::now();
            if let Some(last) = state.last_sync {
                if now.duration_since(last) < self.inner.config.min_sync_interval {
                    debug!(source = %source, "sync throttled, dropping candidate");
                    return None;
                }
            }
            state.last_sync = Some(now);
            state.suppress_until = Some(now + self.inner.config.suppression);

            let applied = candidate.for_window(active_id.clone());
            if let Some(entry) = state.views.get_mut(&active_id) {
                entry.stored = applied.clone();
                if entry.debounce.cancel() {
                    trace!(window = %active_id, "pending change superseded by sync");
                }
            }
            (source, applied)
        };

        debug!(source = %source, target = %active_id, "applying divergent viewport");
        active_access.apply(&applied);
        let _ = self.inner.dispatcher.publish(StateMessage::ViewportApplied {
            source: source.clone(),
            viewport: applied,
        });
        Some(source)
    }

    /// Shared-state viewport update that originated elsewhere. Updates the
    /// stored value for a registered window, then reconciles.
    pub fn ingest(&self, viewport: ViewportState) -> Option<WindowId> {
        {
            let mut state = self.inner.state.lock();
            let entry = state.views.get_mut(&viewport.window_id)?;
            entry.stored = viewport;
        }
        self.reconcile()
    }

    /// Flip the kill-switch. Disabling cancels pending debounces.
    pub fn set_enabled(&self, enabled: bool) {
        let mut state = self.inner.state.lock();
        if state.enabled == enabled {
            return;
        }
        state.enabled = enabled;
        if !enabled {
            for entry in state.views.values() {
                let _ = entry.debounce.cancel();
            }
        }
        info!(enabled, "viewport sync toggled");
    }

    /// Whether sync is enabled.
    pub fn is_enabled(&self) -> bool {
        self.inner.state.lock().enabled
    }

    /// Stored viewport for `window_id`.
    pub fn stored(&self, window_id: &WindowId) -> Option<ViewportState> {
        self.inner
            .state
            .lock()
            .views
            .get(window_id)
            .map(|e| e.stored.clone())
    }

    /// The active window.
    pub fn active(&self) -> Option<WindowId> {
        self.inner.state.lock().active.clone()
    }

    /// Registered windows in registration order.
    pub fn windows(&self) -> Vec<WindowId> {
        self.inner.state.lock().views.keys().cloned().collect()
    }

    /// Cancel every pending debounce and drop all views.
    pub fn shutdown(&self) {
        let mut state = self.inner.state.lock();
        for entry in state.views.values() {
            let _ = entry.debounce.cancel();
        }
        state.views.clear();
        state.active = None;
    }

    fn publish(&self, viewport: ViewportState) {
        {
            let mut state = self.inner.state.lock();
            if !state.enabled {
                return;
            }
            let Some(entry) = state.views.get_mut(&viewport.window_id) else {
                return;
            };
            entry.stored = viewport.clone();
        }
        trace!(window = %viewport.window_id, "viewport published");
        let _ = self
            .inner
            .dispatcher
            .publish(StateMessage::ViewportPublished { viewport });
        let _ = self.reconcile();
    }
}

fn upgrade(weak: &Weak<Inner>) -> Option<ViewSynchronizer> {
    weak.upgrade().map(|inner| ViewSynchronizer { inner })
}

#[cfg(test)]
mod tests {
    use tessera_core::DispatchReceiver;
    use tessera_core::test_utils::settle;

    use super::*;

    /// Engine stand-in: holds a camera, records applies, and optionally
    /// echoes each apply back as a viewport-changed notification.
    struct MockView {
        window: WindowId,
        current: Mutex<ViewportState>,
        applied: Mutex<Vec<ViewportState>>,
        echo_to: Mutex<Option<ViewSynchronizer>>,
    }

    impl MockView {
        fn new(window: &WindowId) -> Arc<Self> {
            Arc::new(Self {
                window: window.clone(),
                current: Mutex::new(ViewportState::uninitialized(window.clone())),
                applied: Mutex::new(Vec::new()),
                echo_to: Mutex::new(None),
            })
        }

        fn at(&self, x: f64, y: f64, zoom: f64) -> ViewportState {
            let viewport = ViewportState::new(self.window.clone(), x, y, zoom);
            *self.current.lock() = viewport.clone();
            viewport
        }

        fn applied(&self) -> Vec<ViewportState> {
            self.applied.lock().clone()
        }
    }

    impl ViewportAccess for MockView {
        fn read(&self) -> ViewportState {
            self.current.lock().clone()
        }

        fn apply(&self, viewport: &ViewportState) {
            *self.current.lock() = viewport.clone();
            self.applied.lock().push(viewport.clone());
            let echo = self.echo_to.lock().clone();
            if let Some(sync) = echo {
                sync.on_viewport_changed(viewport.clone());
            }
        }
    }

    fn setup(config: SyncConfig) -> (ViewSynchronizer, DispatchReceiver) {
        let (dispatcher, rx) = Dispatcher::channel();
        (ViewSynchronizer::new(config, dispatcher), rx)
    }

    fn register(sync: &ViewSynchronizer, name: &str) -> (WindowId, Arc<MockView>) {
        let id = WindowId::from(name);
        let view = MockView::new(&id);
        sync.register_view(id.clone(), view.clone());
        (id, view)
    }

    fn drain(rx: &mut DispatchReceiver) -> Vec<StateMessage> {
        let mut out = Vec::new();
        while let Ok(msg) = rx.try_recv() {
            out.push(msg);
        }
        out
    }

    async fn advance(ms: u64) {
        tokio::time::sleep(Duration::from_millis(ms)).await;
        settle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn burst_collapses_to_last_value() {
        let (sync, mut rx) = setup(SyncConfig::default());
        let (w1, view) = register(&sync, "w1");

        for i in 1..=5 {
            sync.on_viewport_changed(view.at(f64::from(i), 0.0, 1.0));
            advance(50).await;
        }
        assert!(drain(&mut rx).is_empty());

        advance(200).await;
        let published = drain(&mut rx);
        assert_eq!(
            published,
            vec![StateMessage::ViewportPublished {
                viewport: ViewportState::new(w1.clone(), 5.0, 0.0, 1.0)
            }]
        );
        assert_eq!(sync.stored(&w1).map(|v| v.x), Some(5.0));
    }

    #[tokio::test(start_paused = true)]
    async fn activation_scenario() {
        let (sync, mut rx) = setup(SyncConfig::default());
        let (w1, view1) = register(&sync, "w1");
        let (w2, _view2) = register(&sync, "w2");

        // Uninitialized window: activation applies nothing.
        assert!(sync.activate(&w1));
        assert!(view1.applied().is_empty());

        sync.on_viewport_changed(view1.at(5.0, 5.0, 2.0));
        advance(250).await;

        assert!(sync.activate(&w2));
        assert!(sync.activate(&w1));
        assert_eq!(view1.applied(), vec![ViewportState::new(w1.clone(), 5.0, 5.0, 2.0)]);
        assert_eq!(sync.active(), Some(w1.clone()));

        let kinds: Vec<&str> = drain(&mut rx).iter().map(StateMessage::kind).collect();
        assert_eq!(
            kinds,
            vec![
                "active_window_changed",
                "viewport_published",
                "active_window_changed",
                "active_window_changed"
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unknown_window_activation_fails() {
        let (sync, _rx) = setup(SyncConfig::default());
        assert!(!sync.activate(&WindowId::from("nope")));
        assert!(sync.active().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn divergent_inactive_view_applied_to_active() {
        let (sync, mut rx) = setup(SyncConfig::default());
        let (w1, view1) = register(&sync, "w1");
        let (w2, _view2) = register(&sync, "w2");
        let _ = view1.at(1.0, 1.0, 1.5);
        assert!(sync.activate(&w1));

        assert_eq!(sync.ingest(ViewportState::new(w2.clone(), 3.0, 4.0, 2.0)), Some(w2.clone()));
        assert_eq!(view1.applied(), vec![ViewportState::new(w1.clone(), 3.0, 4.0, 2.0)]);
        assert_eq!(sync.stored(&w1).map(|v| v.zoom), Some(2.0));

        let messages = drain(&mut rx);
        assert!(messages.contains(&StateMessage::ViewportApplied {
            source: w2,
            viewport: ViewportState::new(w1, 3.0, 4.0, 2.0),
        }));
    }

    #[tokio::test(start_paused = true)]
    async fn epsilon_sized_delta_never_applies() {
        let (sync, _rx) = setup(SyncConfig::default());
        let (w1, view1) = register(&sync, "w1");
        let (w2, _view2) = register(&sync, "w2");
        let _ = view1.at(3.0, 4.0, 2.0);
        assert!(sync.activate(&w1));

        let nudged = ViewportState::new(w2, 3.0 + DEFAULT_EPSILON, 4.0, 2.0);
        assert!(sync.ingest(nudged).is_none());
        assert!(view1.applied().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn last_divergent_view_in_registration_order_wins() {
        let (sync, _rx) = setup(SyncConfig::default());
        let (w1, view1) = register(&sync, "w1");
        let (w2, _) = register(&sync, "w2");
        let (w3, _) = register(&sync, "w3");
        let _ = view1.at(1.0, 1.0, 1.5);
        assert!(sync.activate(&w1));

        // Seed w3 first, then w2: registration order decides, not recency.
        {
            let mut state = sync.inner.state.lock();
            state.views.get_mut(&w3).unwrap().stored = ViewportState::new(w3.clone(), 9.0, 9.0, 3.0);
        }
        assert_eq!(sync.ingest(ViewportState::new(w2.clone(), 2.0, 2.0, 2.0)), Some(w3));
    }

    #[tokio::test(start_paused = true)]
    async fn throttled_candidate_is_dropped() {
        let (sync, _rx) = setup(SyncConfig::default());
        let (w1, view1) = register(&sync, "w1");
        let (w2, _) = register(&sync, "w2");
        let _ = view1.at(1.0, 1.0, 1.5);
        assert!(sync.activate(&w1));

        assert!(sync.ingest(ViewportState::new(w2.clone(), 3.0, 3.0, 2.0)).is_some());
        advance(100).await;
        assert!(sync.ingest(ViewportState::new(w2.clone(), 6.0, 6.0, 2.0)).is_none());

        // Not retried once the interval passes.
        advance(1000).await;
        assert_eq!(view1.applied().len(), 1);

        assert!(sync.ingest(ViewportState::new(w2, 7.0, 7.0, 2.0)).is_some());
        assert_eq!(view1.applied().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn echo_of_apply_is_suppressed() {
        let (sync, mut rx) = setup(SyncConfig::default());
        let (w1, view1) = register(&sync, "w1");
        let (w2, _) = register(&sync, "w2");
        *view1.echo_to.lock() = Some(sync.clone());
        let _ = view1.at(1.0, 1.0, 1.5);
        assert!(sync.activate(&w1));
        let _ = drain(&mut rx);

        assert!(sync.ingest(ViewportState::new(w2, 3.0, 3.0, 2.0)).is_some());
        advance(1000).await;

        let kinds: Vec<&str> = drain(&mut rx).iter().map(StateMessage::kind).collect();
        assert_eq!(kinds, vec!["viewport_applied"]);
    }

    #[tokio::test(start_paused = true)]
    async fn kill_switch_blocks_publish() {
        let (sync, mut rx) = setup(SyncConfig {
            enabled: false,
            ..SyncConfig::default()
        });
        let (w1, view1) = register(&sync, "w1");
        assert!(!sync.is_enabled());

        sync.on_viewport_changed(view1.at(5.0, 5.0, 2.0));
        advance(500).await;
        assert!(drain(&mut rx).is_empty());
        assert!(sync.stored(&w1).unwrap().is_uninitialized(DEFAULT_EPSILON));

        sync.set_enabled(true);
        sync.on_viewport_changed(view1.at(5.0, 5.0, 2.0));
        sync.set_enabled(false);
        advance(500).await;
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn unregister_cancels_pending_debounce() {
        let (sync, mut rx) = setup(SyncConfig::default());
        let (w1, view1) = register(&sync, "w1");
        assert!(sync.activate(&w1));
        let _ = drain(&mut rx);

        sync.on_viewport_changed(view1.at(5.0, 5.0, 2.0));
        assert!(sync.unregister_view(&w1));
        advance(500).await;
        assert!(drain(&mut rx).is_empty());
        assert!(sync.active().is_none());
        assert!(!sync.unregister_view(&w1));
    }

    #[tokio::test(start_paused = true)]
    async fn apply_drops_pending_local_change() {
        let (sync, mut rx) = setup(SyncConfig::default());
        let (w1, view1) = register(&sync, "w1");
        let (w2, _view2) = register(&sync, "w2");
        assert!(sync.activate(&w1));

        sync.on_viewport_changed(view1.at(2.0, 2.0, 1.5));
        advance(50).await;
        assert_eq!(sync.ingest(ViewportState::new(w2.clone(), 9.0, 9.0, 2.0)), Some(w2));
        let _ = drain(&mut rx);

        advance(1000).await;
        let engine = view1.read();
        assert_eq!(engine, ViewportState::new(w1.clone(), 9.0, 9.0, 2.0));
        assert_eq!(sync.stored(&w1), Some(engine));
        assert!(drain(&mut rx).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn activation_apply_drops_pending_local_change() {
        let (sync, mut rx) = setup(SyncConfig::default());
        let (w1, view1) = register(&sync, "w1");
        let (w2, _view2) = register(&sync, "w2");
        assert!(sync.activate(&w1));
        sync.on_viewport_changed(view1.at(5.0, 5.0, 2.0));
        advance(250).await;

        assert!(sync.activate(&w2));
        sync.on_viewport_changed(view1.at(7.0, 7.0, 3.0));
        assert!(sync.activate(&w1));
        let _ = drain(&mut rx);

        advance(1000).await;
        assert_eq!(view1.read(), ViewportState::new(w1.clone(), 5.0, 5.0, 2.0));
        assert_eq!(sync.stored(&w1), Some(ViewportState::new(w1, 5.0, 5.0, 2.0)));
        assert!(drain(&mut rx).is_empty());
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        fn nudge(view: &MockView, k: f64, scale: f64) -> ViewportState {
            let current = view.read();
            view.at(current.x + k * scale * DEFAULT_EPSILON, current.y, current.zoom)
        }

        proptest! {
            #![proptest_config(ProptestConfig::with_cases(24))]

            /// Two windows nudging each other alternately never keep
            /// syncing once the input stops.
            #[test]
            fn alternating_nudges_converge(
                cycles in 1usize..8,
                scale in 1.01f64..3.0,
                gap_ms in 0u64..700,
            ) {
                let rt = tokio::runtime::Builder::new_current_thread()
                    .enable_all()
                    .start_paused(true)
                    .build()
                    .unwrap();
                rt.block_on(async move {
                    let (sync, mut rx) = setup(SyncConfig::default());
                    let (w1, view1) = register(&sync, "w1");
                    let (_w2, view2) = register(&sync, "w2");
                    *view1.echo_to.lock() = Some(sync.clone());
                    let _ = view1.at(10.0, 10.0, 2.0);
                    let _ = view2.at(10.0, 10.0, 2.0);
                    assert!(sync.activate(&w1));

                    for i in 0..cycles {
                        #[allow(clippy::cast_precision_loss)]
                        let k = (i + 1) as f64;
                        sync.on_viewport_changed(nudge(&view2, k, scale));
                        advance(250 + gap_ms).await;
                        sync.on_viewport_changed(nudge(&view1, -k, scale));
                        advance(250 + gap_ms).await;
                    }
                    let _ = drain(&mut rx);

                    advance(10_000).await;
                    let tail = drain(&mut rx);
                    assert!(tail.is_empty(), "still syncing after input stopped: {tail:?}");
                    assert!(view1.applied().len() <= cycles * 2);
                });
            }
        }
    }
}
