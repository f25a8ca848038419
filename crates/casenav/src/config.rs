//! Controller configuration
//!
//! Loaded from TOML or built in code. Every field has a default, so an
//! empty document is a valid configuration.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Default view when none is configured
pub const DEFAULT_VIEW: &str = "dashboard";
/// Default debounce window after a restore
pub const DEFAULT_RESTORE_WINDOW_MS: u64 = 100;
/// Default session-storage key for snapshots
pub const DEFAULT_SNAPSHOT_KEY: &str = "casenav.navigation-state";

/// Navigation controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NavigationConfig {
    /// View shown when the URL names none
    pub default_view: String,
    /// Length of the `restoring` window in milliseconds
    pub restore_window_ms: u64,
    /// Session-storage key for snapshots
    pub snapshot_key: String,
    /// Offer the session snapshot back on reload
    pub restore_snapshot_on_reload: bool,
}

impl Default for NavigationConfig {
    fn default() -> Self {
        Self {
            default_view: DEFAULT_VIEW.to_string(),
            restore_window_ms: DEFAULT_RESTORE_WINDOW_MS,
            snapshot_key: DEFAULT_SNAPSHOT_KEY.to_string(),
            restore_snapshot_on_reload: true,
        }
    }
}

impl NavigationConfig {
    /// Create default configuration
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default view
    #[inline]
    #[must_use]
    pub fn with_default_view(mut self, view: impl Into<String>) -> Self {
        self.default_view = view.into();
        self
    }

    /// Set the restore window
    #[inline]
    #[must_use]
    pub fn with_restore_window(mut self, window: Duration) -> Self {
        self.restore_window_ms = u64::try_from(window.as_millis()).unwrap_or(u64::MAX);
        self
    }

    /// Set the snapshot key
    #[inline]
    #[must_use]
    pub fn with_snapshot_key(mut self, key: impl Into<String>) -> Self {
        self.snapshot_key = key.into();
        self
    }

    /// Enable or disable snapshot restore on reload
    #[inline]
    #[must_use]
    pub fn with_snapshot_restore(mut self, enabled: bool) -> Self {
        self.restore_snapshot_on_reload = enabled;
        self
    }

    /// Restore window as a duration
    #[inline]
    #[must_use]
    pub fn restore_window(&self) -> Duration {
        Duration::from_millis(self.restore_window_ms)
    }

    /// Check the configuration is usable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_view.is_empty() {
            return Err(ConfigError::EmptyDefaultView);
        }
        Ok(())
    }

    /// Parse and validate a TOML document
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_document_is_default() {
        let config = NavigationConfig::from_toml_str("").unwrap();
        assert_eq!(config, NavigationConfig::default());
        assert_eq!(config.restore_window(), Duration::from_millis(100));
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = NavigationConfig::from_toml_str(
            r#"
            default_view = "clients"
            restore_window_ms = 250
            "#,
        )
        .unwrap();
        assert_eq!(config.default_view, "clients");
        assert_eq!(config.restore_window_ms, 250);
        assert_eq!(config.snapshot_key, DEFAULT_SNAPSHOT_KEY);
        assert!(config.restore_snapshot_on_reload);
    }

    #[test]
    fn empty_default_view_is_rejected() {
        let err = NavigationConfig::from_toml_str(r#"default_view = """#).unwrap_err();
        assert!(matches!(err, ConfigError::EmptyDefaultView));
    }

    #[test]
    fn malformed_document_is_rejected() {
        let err = NavigationConfig::from_toml_str("default_view = [").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn builder() {
        let config = NavigationConfig::new()
            .with_default_view("home")
            .with_restore_window(Duration::from_millis(5))
            .with_snapshot_key("k")
            .with_snapshot_restore(false);
        assert_eq!(config.default_view, "home");
        assert_eq!(config.restore_window_ms, 5);
        assert_eq!(config.snapshot_key, "k");
        assert!(!config.restore_snapshot_on_reload);
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "default_view = \"reports\"").unwrap();
        let config = NavigationConfig::from_file(file.path()).unwrap();
        assert_eq!(config.default_view, "reports");
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let err = NavigationConfig::from_file("/nonexistent/casenav.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
