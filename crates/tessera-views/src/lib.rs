//! # tessera-views
//!
//! Viewport synchronization across concurrently open visualization windows.
//!
//! [`ViewSynchronizer`] tracks one active view among N registered views,
//! debounces local camera changes into published state, and pulls divergent
//! views into the active one without feeding back on its own applies.
//! [`ViewportAccess`] is the per-window seam into the engine.

#![deny(unsafe_code)]

pub mod access;
pub mod synchronizer;

pub use access::ViewportAccess;
pub use synchronizer::{SyncConfig, ViewSynchronizer};
