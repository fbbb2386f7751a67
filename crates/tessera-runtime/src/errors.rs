//! Runtime startup errors.

use tessera_connection::ConnectionError;
use tessera_settings::SettingsError;

/// Reasons [`Runtime::start`](crate::Runtime::start) can refuse to start.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// Settings failed validation.
    #[error("invalid settings: {0}")]
    Settings(#[from] SettingsError),

    /// The configured endpoint could not be used.
    #[error("invalid connection settings: {0}")]
    Connection(#[from] ConnectionError),
}
