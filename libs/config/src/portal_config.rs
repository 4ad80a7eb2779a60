//! Portal Configuration Module
//!
//! Loads [`PortalConfig`] from built-in defaults, an optional TOML file and
//! `PORTAL_*` environment variables, in that order of precedence (later
//! sources win).

use crate::defaults;
use anyhow::{bail, Context, Result};
use config_crate::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

/// Main portal runtime configuration
#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
#[serde(default)]
pub struct PortalConfig {
    /// Door actor settings
    pub actors: ActorSettings,

    /// Restart policy for supervised doors
    pub supervision: SupervisionSettings,

    /// Log output settings
    pub logging: LoggingSettings,
}

/// Door actor settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct ActorSettings {
    pub mailbox_capacity: usize,
    pub request_timeout_ms: u64,
}

/// Restart policy for supervised doors
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct SupervisionSettings {
    pub max_restarts: u32,
    pub restart_window_secs: u64,
    pub restart_delay_ms: u64,
    pub restart_timeout_ms: u64,
    pub max_children: usize,
}

/// Log output settings
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Filter directive used when RUST_LOG is unset
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            mailbox_capacity: defaults::actors::MAILBOX_CAPACITY,
            request_timeout_ms: defaults::actors::REQUEST_TIMEOUT_MS,
        }
    }
}

impl ActorSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

impl Default for SupervisionSettings {
    fn default() -> Self {
        Self {
            max_restarts: defaults::supervision::MAX_RESTARTS,
            restart_window_secs: defaults::supervision::RESTART_WINDOW_SECS,
            restart_delay_ms: defaults::supervision::RESTART_DELAY_MS,
            restart_timeout_ms: defaults::supervision::RESTART_TIMEOUT_MS,
            max_children: defaults::supervision::MAX_CHILDREN,
        }
    }
}

impl SupervisionSettings {
    pub fn restart_window(&self) -> Duration {
        Duration::from_secs(self.restart_window_secs)
    }

    pub fn restart_delay(&self) -> Duration {
        Duration::from_millis(self.restart_delay_ms)
    }

    pub fn restart_timeout(&self) -> Duration {
        Duration::from_millis(self.restart_timeout_ms)
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: defaults::logging::LEVEL.to_string(),
            json: false,
        }
    }
}

impl PortalConfig {
    /// Load configuration from an optional TOML file with environment overrides.
    ///
    /// A path that is given must exist; without one only defaults and
    /// environment variables apply.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        Self::load_with_env(path, None)
    }

    /// Same as [`PortalConfig::load`], reading overrides from `env` instead
    /// of the process environment when provided.
    pub fn load_with_env(path: Option<&Path>, env: Option<HashMap<String, String>>) -> Result<Self> {
        let mut builder = Config::builder();

        if let Some(path) = path {
            info!("Loading portal config: {:?}", path);
            builder = builder.add_source(File::from(path).required(true));
        }

        // Override with environment variables (PORTAL_ prefix, "__" between sections)
        builder = builder.add_source(
            Environment::with_prefix(defaults::logging::ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true)
                .source(env),
        );

        let config: PortalConfig = builder
            .build()
            .context("Failed to build configuration")?
            .try_deserialize()
            .context("Failed to deserialize configuration")?;

        config.validate()?;
        debug!(?config, "Portal configuration loaded");
        Ok(config)
    }

    /// Reject settings the runtime cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.actors.mailbox_capacity == 0 {
            bail!("actors.mailbox_capacity must be greater than zero");
        }
        if self.actors.request_timeout_ms == 0 {
            bail!("actors.request_timeout_ms must be greater than zero");
        }
        if self.supervision.restart_timeout_ms == 0 {
            bail!("supervision.restart_timeout_ms must be greater than zero");
        }
        if self.supervision.max_children == 0 {
            bail!("supervision.max_children must be greater than zero");
        }
        Ok(())
    }

    /// Render the effective configuration as TOML
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize configuration")
    }
}

/// Convenience function to load configuration from an optional file
pub fn load_config(path: Option<&Path>) -> Result<PortalConfig> {
    PortalConfig::load(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    fn no_env() -> Option<HashMap<String, String>> {
        Some(HashMap::new())
    }

    #[test]
    fn test_defaults_without_file() {
        let config = PortalConfig::load_with_env(None, no_env()).unwrap();
        assert_eq!(config, PortalConfig::default());
        assert_eq!(config.actors.request_timeout(), Duration::from_secs(5));
        assert_eq!(config.supervision.restart_window(), Duration::from_secs(60));
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_load_partial_file() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("portal.toml");

        let config_content = r#"
[actors]
request_timeout_ms = 250

[supervision]
max_restarts = 2

[logging]
level = "debug"
json = true
"#;

        fs::write(&config_path, config_content).unwrap();

        let config = PortalConfig::load_with_env(Some(&config_path), no_env()).unwrap();

        assert_eq!(config.actors.request_timeout_ms, 250);
        assert_eq!(config.actors.mailbox_capacity, defaults::actors::MAILBOX_CAPACITY);
        assert_eq!(config.supervision.max_restarts, 2);
        assert_eq!(config.supervision.restart_delay_ms, defaults::supervision::RESTART_DELAY_MS);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    fn test_environment_override() {
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("portal.toml");
        fs::write(&config_path, "[supervision]\nmax_restarts = 2\n").unwrap();

        let mut env = HashMap::new();
        env.insert("PORTAL_SUPERVISION__MAX_RESTARTS".to_string(), "9".to_string());
        env.insert("PORTAL_ACTORS__MAILBOX_CAPACITY".to_string(), "16".to_string());

        let config = PortalConfig::load_with_env(Some(&config_path), Some(env)).unwrap();

        assert_eq!(config.supervision.max_restarts, 9);
        assert_eq!(config.actors.mailbox_capacity, 16);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("absent.toml");
        assert!(PortalConfig::load_with_env(Some(&missing), no_env()).is_err());
    }

    #[test]
    fn test_validation_rejects_zero_capacity() {
        let mut config = PortalConfig::default();
        config.actors.mailbox_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("mailbox_capacity"));

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("portal.toml");
        fs::write(&config_path, "[actors]\nrequest_timeout_ms = 0\n").unwrap();
        assert!(PortalConfig::load_with_env(Some(&config_path), no_env()).is_err());
    }

    #[test]
    fn test_toml_output_reloads() {
        let mut config = PortalConfig::default();
        config.supervision.max_restarts = 3;
        let rendered = config.to_toml().unwrap();
        assert!(rendered.contains("[supervision]"));

        let dir = tempdir().unwrap();
        let config_path = dir.path().join("portal.toml");
        fs::write(&config_path, rendered).unwrap();

        let reloaded = PortalConfig::load_with_env(Some(&config_path), no_env()).unwrap();
        assert_eq!(reloaded, config);
    }
}
