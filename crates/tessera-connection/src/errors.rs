//! Connection error types.

/// Errors surfaced by the realtime channel.
///
/// Transport failures are transient: the manager turns them into a status
/// change and a scheduled reconnect. Only [`InvalidEndpoint`] and
/// [`NotOpen`] reach callers directly.
///
/// [`InvalidEndpoint`]: ConnectionError::InvalidEndpoint
/// [`NotOpen`]: ConnectionError::NotOpen
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// The endpoint could not be parsed or uses an unsupported scheme.
    #[error("invalid endpoint {endpoint:?}: {reason}")]
    InvalidEndpoint {
        /// The rejected input.
        endpoint: String,
        /// Why it was rejected.
        reason: String,
    },

    /// No socket is open.
    #[error("connection is not open")]
    NotOpen,

    /// The dial failed before the socket opened.
    #[error("dial failed: {0}")]
    Dial(String),

    /// The open socket failed.
    #[error("transport error: {0}")]
    Transport(String),
}
