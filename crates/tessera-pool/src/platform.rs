//! Platform seam for creating and tearing down rendering contexts.

use serde::{Deserialize, Serialize};

use crate::errors::PlatformError;

/// Which context family a handle was created for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ResourceKind {
    /// Main 3D viewport.
    Primary,
    /// Thumbnails, minimaps and other auxiliary canvases.
    Secondary,
}

/// GPU power hint passed through to the platform.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PowerPreference {
    /// Let the platform decide.
    #[default]
    Default,
    /// Prefer the discrete GPU.
    HighPerformance,
    /// Prefer the integrated GPU.
    LowPower,
}

/// Context creation attributes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextAttributes {
    /// Multisample antialiasing.
    pub antialias: bool,
    /// Alpha channel in the drawing buffer.
    pub alpha: bool,
    /// Keep the drawing buffer between frames (needed for readback).
    pub preserve_drawing_buffer: bool,
    /// GPU selection hint.
    pub power_preference: PowerPreference,
}

impl Default for ContextAttributes {
    fn default() -> Self {
        Self {
            antialias: true,
            alpha: true,
            preserve_drawing_buffer: false,
            power_preference: PowerPreference::Default,
        }
    }
}

/// Outcome of a forced invalidation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Invalidation {
    /// The platform dropped the context's GPU resources immediately.
    Invalidated,
    /// The platform has no forced-loss primitive; destroy does the work.
    Unsupported,
}

/// Creates and destroys platform rendering contexts.
///
/// Calls are synchronous and made while the pool's lock is held, so
/// implementations must not call back into the pool.
pub trait ContextPlatform: Send + Sync {
    /// Surface a context is created on (canvas, window, offscreen target).
    type Surface;
    /// The platform context. Never leaves the pool.
    type Context: Send;

    /// Allocate a context on `surface`.
    fn create(
        &self,
        surface: Self::Surface,
        kind: ResourceKind,
        attrs: &ContextAttributes,
    ) -> Result<Self::Context, PlatformError>;

    /// Force the context to drop its GPU resources before destruction.
    fn force_invalidate(&self, _context: &mut Self::Context) -> Result<Invalidation, PlatformError> {
        Ok(Invalidation::Unsupported)
    }

    /// Destroy the context.
    fn destroy(&self, context: Self::Context) -> Result<(), PlatformError>;
}
