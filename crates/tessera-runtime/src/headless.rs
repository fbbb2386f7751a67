//! In-memory [`ContextPlatform`] for headless runs and tests.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use tessera_pool::{ContextAttributes, ContextPlatform, Invalidation, PlatformError, ResourceKind};
use tracing::trace;

/// Offscreen target size.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HeadlessSurface {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl HeadlessSurface {
    /// Surface of the given size.
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// A context that only records what it was created with.
#[derive(Debug)]
pub struct HeadlessContext {
    /// Creation order, starting at 1.
    pub serial: u64,
    /// Target it was created on.
    pub surface: HeadlessSurface,
    /// Context family.
    pub kind: ResourceKind,
    /// Creation attributes.
    pub attributes: ContextAttributes,
    /// Set once the context has been force-invalidated.
    pub lost: bool,
}

/// Platform with an optional hard limit on live contexts, standing in for a
/// browser or driver cap.
#[derive(Debug, Default)]
pub struct HeadlessPlatform {
    limit: Option<usize>,
    serial: AtomicU64,
    live: AtomicUsize,
}

impl HeadlessPlatform {
    /// Unlimited platform.
    pub fn new() -> Self {
        Self::default()
    }

    /// Platform that refuses to create more than `limit` live contexts.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            limit: Some(limit),
            ..Self::default()
        }
    }

    /// Contexts created and not yet destroyed.
    pub fn live(&self) -> usize {
        self.live.load(Ordering::Acquire)
    }
}

impl ContextPlatform for HeadlessPlatform {
    type Surface = HeadlessSurface;
    type Context = HeadlessContext;

    fn create(
        &self,
        surface: HeadlessSurface,
        kind: ResourceKind,
        attrs: &ContextAttributes,
    ) -> Result<HeadlessContext, PlatformError> {
        if surface.width == 0 || surface.height == 0 {
            return Err(PlatformError::Allocation(format!(
                "zero-sized surface {}x{}",
                surface.width, surface.height
            )));
        }
        if let Some(limit) = self.limit.filter(|limit| self.live() >= *limit) {
            return Err(PlatformError::Allocation(format!(
                "platform limit of {limit} live contexts reached"
            )));
        }

        let serial = self.serial.fetch_add(1, Ordering::AcqRel) + 1;
        let _ = self.live.fetch_add(1, Ordering::AcqRel);
        trace!(serial, ?kind, "headless context created");
        Ok(HeadlessContext {
            serial,
            surface,
            kind,
            attributes: attrs.clone(),
            lost: false,
        })
    }

    fn force_invalidate(&self, context: &mut HeadlessContext) -> Result<Invalidation, PlatformError> {
        context.lost = true;
        Ok(Invalidation::Invalidated)
    }

    fn destroy(&self, context: HeadlessContext) -> Result<(), PlatformError> {
        let _ = self.live.fetch_sub(1, Ordering::AcqRel);
        trace!(serial = context.serial, lost = context.lost, "headless context destroyed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use tessera_core::ids::OwnerId;
    use tessera_pool::{PoolConfig, ResourcePool};

    use super::*;

    fn surface() -> HeadlessSurface {
        HeadlessSurface::new(640, 480)
    }

    #[test]
    fn zero_sized_surface_refused() {
        let platform = HeadlessPlatform::new();
        let result = platform.create(
            HeadlessSurface::new(0, 10),
            ResourceKind::Primary,
            &ContextAttributes::default(),
        );
        assert_matches!(result, Err(PlatformError::Allocation(_)));
        assert_eq!(platform.live(), 0);
    }

    #[test]
    fn limit_refuses_past_cap() {
        let platform = HeadlessPlatform::with_limit(1);
        let attrs = ContextAttributes::default();
        let first = platform.create(surface(), ResourceKind::Primary, &attrs).unwrap();
        assert_eq!(first.serial, 1);
        assert_matches!(
            platform.create(surface(), ResourceKind::Secondary, &attrs),
            Err(PlatformError::Allocation(_))
        );
        platform.destroy(first).unwrap();
        assert!(platform.create(surface(), ResourceKind::Secondary, &attrs).is_ok());
    }

    #[test]
    fn pool_evicts_over_headless_platform() {
        let pool = ResourcePool::new(
            HeadlessPlatform::new(),
            PoolConfig {
                capacity: 2,
                ..PoolConfig::default()
            },
        );
        let attrs = ContextAttributes::default();
        for owner in ["a", "b", "c"] {
            let _ = pool
                .acquire(&OwnerId::from(owner), surface(), ResourceKind::Primary, &attrs)
                .unwrap();
        }
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.release_all(), 2);
        assert_eq!(pool.size(), 0);
    }
}
