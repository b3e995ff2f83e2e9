//! Layered key/value configuration for Switchyard.
//!
//! This crate provides a small configuration layer for Switchyard hosts
//! with support for:
//! - `appsettings.cfg` plus a per-deployment overlay `appsettings.{mode}.cfg`
//! - Environment variable overrides, consulted at lookup time
//! - Typed lookups that fall back to a default instead of failing
//! - Optional `.env` loading
//!
//! # Overview
//!
//! [`ConfigLoader`] reads the layers and produces an immutable
//! [`Configuration`]. The deployment mode comes from `DEPLOYMENT_MODE` and
//! defaults to `development`.
//!
//! # Example
//!
//! ```no_run
//! use switchyard_config::{ConfigLoader, Configuration};
//!
//! # fn main() -> Result<(), switchyard_config::ConfigError> {
//! let config = ConfigLoader::new().with_dotenv().load()?;
//!
//! let level = config.get_or("LOG_LEVEL", "info");
//! let timeout_ms: u64 = config.get_or_parsed("REQUEST_TIMEOUT_MS", 30_000);
//!
//! // Or share one snapshot across the process
//! let _ = Configuration::init_global(config);
//! # Ok(())
//! # }
//! ```
//!
//! # File Format
//!
//! ```text
//! # appsettings.cfg
//! LOG_LEVEL = info
//! LOG_FORMAT = json
//! REQUEST_TIMEOUT_MS = 30000
//! ```

#![warn(missing_docs)]

mod configuration;
mod error;
pub mod file;
mod loader;
pub mod value;

pub use configuration::{Configuration, EnvSource};
pub use error::ConfigError;
pub use loader::{
    overlay_file, ConfigLoader, BASE_FILE, DEFAULT_DEPLOYMENT_MODE, DEPLOYMENT_MODE_VAR,
};
pub use value::FromConfigValue;
