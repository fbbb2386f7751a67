//! Settings → component configuration.

use std::time::Duration;

use tessera_connection::{AuthToken, ConnectionConfig};
use tessera_core::ids::DeviceId;
use tessera_pool::PoolConfig;
use tessera_settings::{AnnotationSettings, ConnectionSettings, PoolSettings, SyncSettings};
use tessera_views::SyncConfig;

/// Pool sizing.
pub fn pool_config(settings: &PoolSettings) -> PoolConfig {
    PoolConfig {
        capacity: settings.capacity,
        warn_ratio: settings.warn_ratio,
    }
}

/// Reconnect timing and inbound buffering.
pub fn connection_config(settings: &ConnectionSettings) -> ConnectionConfig {
    ConnectionConfig {
        reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
        inbound_capacity: settings.inbound_buffer,
    }
}

/// Synchronizer timing. `disabled` maps onto the kill-switch.
pub fn sync_config(settings: &SyncSettings) -> SyncConfig {
    SyncConfig {
        enabled: !settings.disabled,
        debounce: Duration::from_millis(settings.debounce_ms),
        epsilon: settings.epsilon,
        min_sync_interval: Duration::from_millis(settings.min_sync_interval_ms),
        suppression: Duration::from_millis(settings.suppression_ms),
    }
}

/// Headless paint-frame period.
pub fn frame_interval(settings: &AnnotationSettings) -> Duration {
    Duration::from_millis(settings.frame_interval_ms.max(1))
}

/// Token and device id for the dial URL. A missing device id gets a fresh
/// one for this process.
pub fn credentials(settings: &ConnectionSettings) -> (Option<AuthToken>, DeviceId) {
    let token = settings
        .auth_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .map(AuthToken::new);
    let device_id = settings
        .device_id
        .as_deref()
        .filter(|d| !d.is_empty())
        .map_or_else(DeviceId::new, DeviceId::from);
    (token, device_id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_component_defaults() {
        let pool = pool_config(&PoolSettings::default());
        assert_eq!(pool.capacity, PoolConfig::default().capacity);

        let conn = connection_config(&ConnectionSettings::default());
        assert_eq!(conn.reconnect_delay, Duration::from_secs(3));
        assert_eq!(conn.inbound_capacity, 256);

        let sync = sync_config(&SyncSettings::default());
        let expected = SyncConfig::default();
        assert!(sync.enabled);
        assert_eq!(sync.debounce, expected.debounce);
        assert_eq!(sync.min_sync_interval, expected.min_sync_interval);
        assert_eq!(sync.suppression, expected.suppression);
    }

    #[test]
    fn disabled_sync_turns_off_kill_switch() {
        let settings = SyncSettings {
            disabled: true,
            ..SyncSettings::default()
        };
        assert!(!sync_config(&settings).enabled);
    }

    #[test]
    fn credentials_from_settings() {
        let settings = ConnectionSettings {
            auth_token: Some("tok".into()),
            device_id: Some("dev-1".into()),
            ..ConnectionSettings::default()
        };
        let (token, device) = credentials(&settings);
        assert_eq!(token.unwrap().expose(), "tok");
        assert_eq!(device.as_str(), "dev-1");
    }

    #[test]
    fn missing_device_id_is_generated() {
        let settings = ConnectionSettings {
            auth_token: Some(String::new()),
            ..ConnectionSettings::default()
        };
        let (token, device) = credentials(&settings);
        assert!(token.is_none());
        assert!(!device.as_str().is_empty());
    }
}
