//! Bounded rendering-context pool.
//!
//! The platform caps concurrently live contexts (16 on most browsers and
//! drivers). The pool owns every context it creates, hands callers a
//! [`ContextHandle`] carrying only metadata, and keeps occupancy at or below
//! capacity by evicting the oldest handle before each allocation that would
//! exceed it.
//!
//! Each owner holds at most one handle: acquiring again releases the
//! previous one first.

use std::collections::HashMap;
use std::time::Instant;

use indexmap::IndexMap;
use parking_lot::Mutex;
use serde::Serialize;
use tessera_core::ids::{ContextId, OwnerId};
use tracing::{debug, info, warn};

use crate::platform::{ContextAttributes, ContextPlatform, Invalidation, ResourceKind};

/// Default pool capacity.
pub const DEFAULT_CAPACITY: usize = 16;

/// Default occupancy ratio that triggers the near-capacity warning.
pub const DEFAULT_WARN_RATIO: f64 = 0.8;

/// Pool sizing.
#[derive(Clone, Debug)]
pub struct PoolConfig {
    /// Maximum live contexts.
    pub capacity: usize,
    /// Occupancy ratio at which an acquire logs a warning.
    pub warn_ratio: f64,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            warn_ratio: DEFAULT_WARN_RATIO,
        }
    }
}

/// Caller-visible metadata for a pooled context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ContextHandle {
    /// Pool-assigned id.
    pub id: ContextId,
    /// Component that owns the handle.
    pub owner: OwnerId,
    /// Context family.
    pub kind: ResourceKind,
    /// Creation time.
    pub created_at: Instant,
    /// Monotonic creation counter; breaks `created_at` ties.
    pub sequence: u64,
}

impl ContextHandle {
    fn age_key(&self) -> (Instant, u64) {
        (self.created_at, self.sequence)
    }
}

/// Pool counters.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolStats {
    /// Live contexts.
    pub size: usize,
    /// Configured capacity.
    pub capacity: usize,
    /// Successful acquires.
    pub acquired: u64,
    /// Handles evicted to make room.
    pub evicted: u64,
    /// Acquires the platform refused.
    pub failed_allocations: u64,
    /// Releases whose teardown reported an error.
    pub failed_releases: u64,
}

struct Entry<C> {
    handle: ContextHandle,
    context: C,
}

struct PoolState<C> {
    entries: IndexMap<ContextId, Entry<C>>,
    by_owner: HashMap<OwnerId, ContextId>,
    next_sequence: u64,
    stats: PoolStats,
}

impl<C> PoolState<C> {
    fn remove(&mut self, id: &ContextId) -> Option<Entry<C>> {
        let entry = self.entries.shift_remove(id)?;
        if self.by_owner.get(&entry.handle.owner) == Some(id) {
            let _ = self.by_owner.remove(&entry.handle.owner);
        }
        Some(entry)
    }

    fn oldest(&self) -> Option<ContextId> {
        self.entries
            .values()
            .min_by_key(|e| e.handle.age_key())
            .map(|e| e.handle.id.clone())
    }
}

/// Bounded pool of platform rendering contexts.
///
/// Share it as `Arc<ResourcePool<P>>`; every operation takes `&self`.
pub struct ResourcePool<P: ContextPlatform> {
    platform: P,
    config: PoolConfig,
    state: Mutex<PoolState<P::Context>>,
}

impl<P: ContextPlatform> ResourcePool<P> {
    /// Create an empty pool. A zero capacity is raised to 1.
    pub fn new(platform: P, mut config: PoolConfig) -> Self {
        config.capacity = config.capacity.max(1);
        let stats = PoolStats {
            capacity: config.capacity,
            ..PoolStats::default()
        };
        Self {
            platform,
            config,
            state: Mutex::new(PoolState {
                entries: IndexMap::new(),
                by_owner: HashMap::new(),
                next_sequence: 0,
                stats,
            }),
        }
    }

    /// Acquire a context for `owner` on `surface`.
    ///
    /// Asks the platform for a new context first. Only once it exists is
    /// `owner`'s previous handle released and, when the pool is full, the
    /// oldest handle evicted. Returns `None` if the platform refuses, with
    /// the pool left exactly as it was.
    pub fn acquire(
        &self,
        owner: &OwnerId,
        surface: P::Surface,
        kind: ResourceKind,
        attrs: &ContextAttributes,
    ) -> Option<ContextHandle> {
        let mut state = self.state.lock();

        let context = match self.platform.create(surface, kind, attrs) {
            Ok(context) => context,
            Err(error) => {
                warn!(owner = %owner, ?kind, %error, "context allocation failed");
                state.stats.failed_allocations += 1;
                return None;
            }
        };

        if let Some(previous) = state.by_owner.get(owner).cloned() {
            debug!(owner = %owner, context = %previous, "replacing owner's context");
            if let Some(entry) = state.remove(&previous) {
                let _ = self.teardown(&mut state, entry);
            }
        }

        if state.entries.len() >= self.config.capacity {
            if let Some(oldest) = state.oldest() {
                if let Some(entry) = state.remove(&oldest) {
                    info!(
                        evicted = %oldest,
                        evicted_owner = %entry.handle.owner,
                        capacity = self.config.capacity,
                        "context pool full, evicting oldest"
                    );
                    state.stats.evicted += 1;
                    let _ = self.teardown(&mut state, entry);
                }
            }
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;
        let handle = ContextHandle {
            id: ContextId::new(),
            owner: owner.clone(),
            kind,
            created_at: Instant::now(),
            sequence,
        };
        let _ = state.by_owner.insert(owner.clone(), handle.id.clone());
        let _ = state.entries.insert(
            handle.id.clone(),
            Entry {
                handle: handle.clone(),
                context,
            },
        );
        state.stats.acquired += 1;

        let size = state.entries.len();
        if self.at_warn_level(size) {
            warn!(
                size,
                capacity = self.config.capacity,
                "context pool nearing capacity"
            );
        }
        debug!(owner = %owner, context = %handle.id, ?kind, size, "context acquired");

        Some(handle)
    }

    /// Release the context `id`.
    ///
    /// The bookkeeping entry is always removed. Returns `true` only if the
    /// entry existed and platform teardown succeeded.
    pub fn release(&self, id: &ContextId) -> bool {
        let mut state = self.state.lock();
        match state.remove(id) {
            Some(entry) => self.teardown(&mut state, entry),
            None => false,
        }
    }

    /// Release every context. Returns how many entries were removed.
    pub fn release_all(&self) -> usize {
        let mut state = self.state.lock();
        let ids: Vec<ContextId> = state.entries.keys().cloned().collect();
        let mut released = 0;
        for id in &ids {
            if let Some(entry) = state.remove(id) {
                let _ = self.teardown(&mut state, entry);
                released += 1;
            }
        }
        if released > 0 {
            info!(released, "released all pooled contexts");
        }
        released
    }

    /// Run `f` against the live context `id`. `None` if it was released.
    pub fn with_context<R>(&self, id: &ContextId, f: impl FnOnce(&mut P::Context) -> R) -> Option<R> {
        let mut state = self.state.lock();
        state.entries.get_mut(id).map(|entry| f(&mut entry.context))
    }

    /// Live handle count.
    pub fn size(&self) -> usize {
        self.state.lock().entries.len()
    }

    /// Configured capacity.
    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Whether `id` is live.
    pub fn contains(&self, id: &ContextId) -> bool {
        self.state.lock().entries.contains_key(id)
    }

    /// The handle currently held by `owner`.
    pub fn handle_for(&self, owner: &OwnerId) -> Option<ContextHandle> {
        let state = self.state.lock();
        let id = state.by_owner.get(owner)?;
        state.entries.get(id).map(|e| e.handle.clone())
    }

    /// Live handles, oldest first.
    pub fn handles(&self) -> Vec<ContextHandle> {
        let state = self.state.lock();
        let mut handles: Vec<ContextHandle> =
            state.entries.values().map(|e| e.handle.clone()).collect();
        handles.sort_by_key(ContextHandle::age_key);
        handles
    }

    /// Snapshot of the pool counters.
    pub fn stats(&self) -> PoolStats {
        let state = self.state.lock();
        PoolStats {
            size: state.entries.len(),
            ..state.stats
        }
    }

    #[allow(clippy::cast_precision_loss)]
    fn at_warn_level(&self, size: usize) -> bool {
        size as f64 >= self.config.capacity as f64 * self.config.warn_ratio
    }

    fn teardown(&self, state: &mut PoolState<P::Context>, entry: Entry<P::Context>) -> bool {
        let Entry { handle, mut context } = entry;
        let mut ok = true;

        match self.platform.force_invalidate(&mut context) {
            Ok(Invalidation::Invalidated | Invalidation::Unsupported) => {}
            Err(error) => {
                warn!(context = %handle.id, owner = %handle.owner, %error, "forced invalidation failed");
                ok = false;
            }
        }
        if let Err(error) = self.platform.destroy(context) {
            warn!(context = %handle.id, owner = %handle.owner, %error, "context teardown failed");
            ok = false;
        }

        if !ok {
            state.stats.failed_releases += 1;
        }
        ok
    }
}
