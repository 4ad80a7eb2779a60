//! # Portal Configuration
//!
//! Layered configuration for the portal runtime: built-in defaults, an
//! optional TOML file, then `PORTAL_*` environment variables.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use portal_config::PortalConfig;
//!
//! let config = PortalConfig::load(None).expect("valid configuration");
//! println!("request timeout: {:?}", config.actors.request_timeout());
//! ```
//!
//! Environment keys use `__` between sections, e.g.
//! `PORTAL_SUPERVISION__MAX_RESTARTS=3`.

pub mod defaults;
pub mod portal_config;

// Re-export commonly used types
pub use portal_config::{
    load_config, ActorSettings, LoggingSettings, PortalConfig, SupervisionSettings,
};
