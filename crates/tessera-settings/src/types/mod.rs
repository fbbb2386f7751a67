//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase", default)]` so a partial
//! JSON file only needs the keys it changes; everything else keeps the
//! production default.

mod connection;
mod pool;
mod views;

pub use connection::*;
pub use pool::*;
pub use views::*;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings type.
///
/// ```json
/// {
///   "pool": { "capacity": 8 },
///   "connection": { "endpoint": "wss://viz.example.com/realtime" },
///   "sync": { "disabled": true }
/// }
/// ```
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TesseraSettings {
    /// Rendering-context pool.
    pub pool: PoolSettings,
    /// Realtime channel.
    pub connection: ConnectionSettings,
    /// Cross-view viewport synchronization.
    pub sync: SyncSettings,
    /// Annotation routing.
    pub annotations: AnnotationSettings,
    /// Log output.
    pub logging: LoggingSettings,
}

impl TesseraSettings {
    /// Reject values the runtime managers cannot operate with.
    pub fn validate(&self) -> Result<()> {
        if self.pool.capacity == 0 {
            return Err(SettingsError::InvalidValue(
                "pool.capacity must be at least 1".into(),
            ));
        }
        if !(self.pool.warn_ratio > 0.0 && self.pool.warn_ratio <= 1.0) {
            return Err(SettingsError::InvalidValue(format!(
                "pool.warnRatio must be in (0, 1], got {}",
                self.pool.warn_ratio
            )));
        }
        if !(self.sync.epsilon > 0.0 && self.sync.epsilon.is_finite()) {
            return Err(SettingsError::InvalidValue(format!(
                "sync.epsilon must be positive, got {}",
                self.sync.epsilon
            )));
        }
        if self.annotations.frame_interval_ms == 0 {
            return Err(SettingsError::InvalidValue(
                "annotations.frameIntervalMs must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Log output settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive (overridden by `RUST_LOG`).
    pub level: String,
    /// Emit JSON lines instead of compact text.
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}
