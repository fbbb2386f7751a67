//! Viewport synchronization and annotation routing settings.

use serde::{Deserialize, Serialize};

/// Cross-view viewport synchronization timing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SyncSettings {
    /// Kill-switch: when set, local viewport changes are never published.
    pub disabled: bool,
    /// Quiet period before a local viewport change is published.
    pub debounce_ms: u64,
    /// Minimum time between two applied cross-view syncs.
    pub min_sync_interval_ms: u64,
    /// Window after an apply during which local changes are not republished.
    pub suppression_ms: u64,
    /// Per-axis divergence threshold.
    pub epsilon: f64,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            disabled: false,
            debounce_ms: 200,
            min_sync_interval_ms: 500,
            suppression_ms: 100,
            epsilon: 0.001,
        }
    }
}

/// Annotation routing settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AnnotationSettings {
    /// Paint-frame period used when the runtime drives frames itself.
    pub frame_interval_ms: u64,
}

impl Default for AnnotationSettings {
    fn default() -> Self {
        Self {
            frame_interval_ms: 16,
        }
    }
}
