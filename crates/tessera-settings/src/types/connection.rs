//! Realtime channel settings.

use serde::{Deserialize, Serialize};

/// Endpoint, credentials, and reconnect timing for the realtime channel.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConnectionSettings {
    /// WebSocket endpoint (`ws://` or `wss://`). No connection is made when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    /// Opaque auth token appended as `token=`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_token: Option<String>,
    /// Device identifier appended as `device_id=`. Generated per process when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_id: Option<String>,
    /// Fixed delay before a reconnect attempt, in milliseconds.
    pub reconnect_delay_ms: u64,
    /// Capacity of the inbound frame fan-out buffer.
    pub inbound_buffer: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            auth_token: None,
            device_id: None,
            reconnect_delay_ms: 3000,
            inbound_buffer: 256,
        }
    }
}
