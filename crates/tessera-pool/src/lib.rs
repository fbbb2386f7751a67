//! # tessera-pool
//!
//! Bounded pool of hardware-accelerated rendering contexts.
//!
//! - [`ResourcePool`]: acquire/release with per-owner replacement and
//!   oldest-first eviction, keeping `size() <= capacity()` at all times
//! - [`ContextPlatform`]: the seam to the host's context API
//! - [`ContextHandle`]: metadata callers hold; the context itself stays in
//!   the pool and is reached through [`ResourcePool::with_context`]

#![deny(unsafe_code)]

pub mod errors;
pub mod platform;
pub mod pool;

pub use errors::PlatformError;
pub use platform::{ContextAttributes, ContextPlatform, Invalidation, PowerPreference, ResourceKind};
pub use pool::{ContextHandle, DEFAULT_CAPACITY, PoolConfig, PoolStats, ResourcePool};
