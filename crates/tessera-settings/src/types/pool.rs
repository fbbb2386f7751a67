//! Rendering-context pool settings.

use serde::{Deserialize, Serialize};

/// Pool sizing.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PoolSettings {
    /// Maximum concurrently held contexts. 16 matches common platform ceilings.
    pub capacity: usize,
    /// Occupancy ratio at which a warning is logged.
    pub warn_ratio: f64,
}

impl Default for PoolSettings {
    fn default() -> Self {
        Self {
            capacity: 16,
            warn_ratio: 0.8,
        }
    }
}
