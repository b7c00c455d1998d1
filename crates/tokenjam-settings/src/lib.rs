//! # tokenjam-settings
//!
//! Layered configuration for the tokenjam server.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`Settings::default()`]
//! 2. **Settings file**: `~/.tokenjam/settings.json` or an explicit path,
//!    deep-merged over defaults
//! 3. **Environment variables**: `TOKENJAM_*` overrides (highest priority)
//!
//! Command-line flags are applied by the binary on top of the result.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn re_exports_work() {
        let _settings = Settings::default();
        let path = settings_path();
        assert!(path.ends_with(".tokenjam/settings.json"));
    }

    #[test]
    fn default_settings_are_valid() {
        let settings = Settings::default();
        assert_eq!(settings.server.host, "0.0.0.0");
        assert_eq!(settings.server.port, 8001);
        assert_eq!(settings.server.send_queue_capacity, 5);
        assert_eq!(settings.session.clear_hold_ms, 2000);
        assert_eq!(settings.session.stale_after_ms, 1000);
        assert_eq!(settings.evaluator.tick_ms, 100);
        assert_eq!(settings.evaluator.timeout_ms, 1000);
        assert_eq!(settings.evaluator.prompt, "λ> ");
        assert_eq!(settings.logging.level, "info");
        assert!(settings.catalog_path.is_none());
        assert!(settings.validate().is_ok());
    }
}
