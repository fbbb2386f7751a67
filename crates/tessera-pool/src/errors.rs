//! Platform error types.

/// Failure reported by a [`ContextPlatform`](crate::ContextPlatform).
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// The platform refused to allocate a context.
    #[error("context allocation failed: {0}")]
    Allocation(String),

    /// Forced invalidation failed.
    #[error("context invalidation failed: {0}")]
    Invalidation(String),

    /// Destroying the context failed.
    #[error("context teardown failed: {0}")]
    Teardown(String),
}
