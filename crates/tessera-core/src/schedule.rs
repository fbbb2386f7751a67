//! Timer and paint-frame scheduling with cancel tokens.
//!
//! Two primitives cover every deferred action in tessera:
//!
//! - [`TaskSlot`] owns at most one pending task. [`TaskSlot::replace`] is
//!   cancel-and-replace (debounce, next-frame publish);
//!   [`TaskSlot::start_if_idle`] is single-flight (reconnect backoff).
//! - [`FrameClock`] is a paint-frame counter. [`FrameSource::next_frame`]
//!   resolves on the next tick, which the host drives (or
//!   [`FrameClock::drive`] in headless mode).
//!
//! Pending tasks run on the ambient tokio runtime; scheduling outside a
//! runtime panics.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

// ─────────────────────────────────────────────────────────────────────────────
// TaskSlot
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
struct SlotState {
    generation: u64,
    pending: Option<CancellationToken>,
}

/// Holder for at most one pending deferred action.
///
/// When the trigger resolves the slot re-checks its generation under the
/// lock before running the action, so a `cancel` or `replace` that races
/// with the trigger always wins. Dropping the slot cancels the pending task.
#[derive(Debug, Default)]
pub struct TaskSlot {
    state: Arc<Mutex<SlotState>>,
}

impl TaskSlot {
    /// Create an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cancel any pending task and schedule `action` to run once `trigger`
    /// resolves.
    pub fn replace<T, F>(&self, trigger: T, action: F)
    where
        T: Future<Output = ()> + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let (generation, token) = {
            let mut state = self.state.lock();
            if let Some(previous) = state.pending.take() {
                previous.cancel();
            }
            arm(&mut state)
        };
        self.spawn(generation, token, trigger, action);
    }

    /// [`replace`](Self::replace) with a timer trigger.
    pub fn replace_after<F>(&self, delay: Duration, action: F)
    where
        F: FnOnce() + Send + 'static,
    {
        self.replace(tokio::time::sleep(delay), action);
    }

    /// Schedule `action` only if nothing is pending. Returns whether it was
    /// scheduled.
    pub fn start_if_idle<T, F>(&self, trigger: T, action: F) -> bool
    where
        T: Future<Output = ()> + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let (generation, token) = {
            let mut state = self.state.lock();
            if state.pending.is_some() {
                return false;
            }
            arm(&mut state)
        };
        self.spawn(generation, token, trigger, action);
        true
    }

    /// [`start_if_idle`](Self::start_if_idle) with a timer trigger.
    pub fn start_after_if_idle<F>(&self, delay: Duration, action: F) -> bool
    where
        F: FnOnce() + Send + 'static,
    {
        self.start_if_idle(tokio::time::sleep(delay), action)
    }

    /// Cancel the pending task, if any. Returns whether one was pending.
    pub fn cancel(&self) -> bool {
        let mut state = self.state.lock();
        state.generation += 1;
        match state.pending.take() {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }

    /// Whether a task is waiting on its trigger.
    pub fn is_pending(&self) -> bool {
        self.state.lock().pending.is_some()
    }

    fn spawn<T, F>(&self, generation: u64, token: CancellationToken, trigger: T, action: F)
    where
        T: Future<Output = ()> + Send + 'static,
        F: FnOnce() + Send + 'static,
    {
        let slot = Arc::clone(&self.state);
        let _ = tokio::spawn(async move {
            tokio::select! {
                () = trigger => {}
                () = token.cancelled() => return,
            }
            {
                let mut state = slot.lock();
                if state.generation != generation || token.is_cancelled() {
                    return;
                }
                state.pending = None;
            }
            action();
        });
    }
}

fn arm(state: &mut SlotState) -> (u64, CancellationToken) {
    state.generation += 1;
    let token = CancellationToken::new();
    state.pending = Some(token.clone());
    (state.generation, token)
}

impl Drop for TaskSlot {
    fn drop(&mut self) {
        if let Some(token) = self.state.lock().pending.take() {
            token.cancel();
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Frames
// ─────────────────────────────────────────────────────────────────────────────

/// Source of paint-frame boundaries.
pub trait FrameSource: Send + Sync + 'static {
    /// A future that resolves at the next frame boundary after this call.
    ///
    /// The boundary is captured eagerly: a frame that ticks between this
    /// call and the first poll still wakes the future.
    fn next_frame(&self) -> BoxFuture<'static, ()>;
}

/// Monotonic paint-frame counter.
#[derive(Clone, Debug)]
pub struct FrameClock {
    tx: Arc<watch::Sender<u64>>,
}

impl Default for FrameClock {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameClock {
    /// Create a clock at frame 0.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(0);
        Self { tx: Arc::new(tx) }
    }

    /// Advance to the next frame and return its number.
    pub fn tick(&self) -> u64 {
        self.tx.send_modify(|frame| *frame += 1);
        *self.tx.borrow()
    }

    /// Current frame number.
    pub fn frame(&self) -> u64 {
        *self.tx.borrow()
    }

    /// Tick the clock every `period` until `cancel` fires.
    pub fn drive(&self, period: Duration, cancel: CancellationToken) -> JoinHandle<()> {
        let clock = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let _ = clock.tick();
                    }
                    () = cancel.cancelled() => break,
                }
            }
        })
    }
}

impl FrameSource for FrameClock {
    fn next_frame(&self) -> BoxFuture<'static, ()> {
        let mut rx = self.tx.subscribe();
        Box::pin(async move {
            if rx.changed().await.is_err() {
                // Clock gone: the frame never comes.
                std::future::pending::<()>().await;
            }
        })
    }
}
