//! # tessera-settings
//!
//! Layered configuration for the tessera runtime.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults** ([`TesseraSettings::default()`])
//! 2. **User file** `~/.tessera/settings.json` (deep-merged over defaults)
//! 3. **Environment variables** `TESSERA_*` (highest priority)
//!
//! There is no global instance: the loaded value is handed to the runtime,
//! which derives each manager's configuration from it.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{
    apply_env_overrides, apply_overrides, deep_merge, load_settings, load_settings_from_path,
    load_settings_with, settings_path,
};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_path_under_home_dir() {
        let path = settings_path();
        assert!(path.ends_with(".tessera/settings.json"));
    }

    #[test]
    fn round_trip_through_json() {
        let mut settings = TesseraSettings::default();
        settings.connection.endpoint = Some("ws://localhost:1/rt".into());
        let json = serde_json::to_string(&settings).unwrap();
        let back: TesseraSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.connection.endpoint, settings.connection.endpoint);
        assert_eq!(back.pool.capacity, settings.pool.capacity);
    }
}
