//! Configuration loader with layered approach.
//!
//! This module provides the [`ConfigLoader`] for building a
//! [`Configuration`] from cfg files, explicit values and the environment.

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::configuration::EnvSource;
use crate::file;
use crate::{ConfigError, Configuration};

/// Environment variable selecting the overlay file.
pub const DEPLOYMENT_MODE_VAR: &str = "DEPLOYMENT_MODE";

/// Deployment mode used when [`DEPLOYMENT_MODE_VAR`] is unset.
pub const DEFAULT_DEPLOYMENT_MODE: &str = "development";

/// Name of the base configuration file.
pub const BASE_FILE: &str = "appsettings.cfg";

/// Returns the overlay file name for a deployment mode.
#[must_use]
pub fn overlay_file(mode: &str) -> String {
    format!("appsettings.{mode}.cfg")
}

/// Configuration loader with layered approach.
///
/// Layers are applied in order, later layers overwriting earlier keys:
/// 1. `appsettings.cfg` in the base directory (optional)
/// 2. `appsettings.{mode}.cfg` in the base directory (optional)
/// 3. Files added with [`with_file`](Self::with_file) (required)
/// 4. Values added with [`with_values`](Self::with_values)
///
/// Environment variables are not merged in; they are consulted at lookup
/// time and always take precedence.
///
/// # Example
///
/// ```no_run
/// use switchyard_config::ConfigLoader;
///
/// # fn main() -> Result<(), switchyard_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_base_dir("/etc/my-service")
///     .with_dotenv()
///     .load()?;
///
/// let timeout_ms = config.get_or_parsed("REQUEST_TIMEOUT_MS", 30_000_u64);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    base_dir: Option<PathBuf>,
    deployment_mode: Option<String>,
    skip_default_files: bool,
    files: Vec<PathBuf>,
    overrides: Vec<(String, String)>,
    env: EnvSource,
    dotenv: bool,
}

impl ConfigLoader {
    /// Create a new configuration loader.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory holding `appsettings*.cfg`. Defaults to the current directory.
    #[must_use]
    pub fn with_base_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.base_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Overrides the deployment mode instead of reading `DEPLOYMENT_MODE`.
    #[must_use]
    pub fn with_deployment_mode(mut self, mode: impl Into<String>) -> Self {
        self.deployment_mode = Some(mode.into());
        self
    }

    /// Skips the `appsettings*.cfg` files entirely.
    #[must_use]
    pub fn without_files(mut self) -> Self {
        self.skip_default_files = true;
        self
    }

    /// Adds a cfg file that must exist.
    #[must_use]
    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.files.push(path.as_ref().to_path_buf());
        self
    }

    /// Adds explicit key/value pairs on top of the files.
    #[must_use]
    pub fn with_values<I, K, V>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.overrides.extend(values.into_iter().map(|(k, v)| {
            let key: String = k.into();
            (file::normalize_key(&key), v.into())
        }));
        self
    }

    /// Replaces the process environment with a fixed set of variables.
    #[must_use]
    pub fn with_env<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let vars: HashMap<String, String> = vars
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        self.env = EnvSource::Fixed(vars);
        self
    }

    /// Ignores the environment entirely.
    #[must_use]
    pub fn without_env(mut self) -> Self {
        self.env = EnvSource::Fixed(HashMap::new());
        self
    }

    /// Loads a `.env` file into the process environment before reading.
    ///
    /// A missing `.env` file is not an error.
    #[must_use]
    pub fn with_dotenv(mut self) -> Self {
        self.dotenv = true;
        self
    }

    /// Reads every layer and returns the configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - A file added with `with_file` does not exist
    /// - Any file cannot be read or contains a malformed line
    /// - The current directory is needed and cannot be determined
    pub fn load(self) -> Result<Configuration, ConfigError> {
        if self.dotenv {
            // Load .env file, ignore if not found
            let _ = dotenvy::dotenv();
        }

        let mode = self
            .deployment_mode
            .clone()
            .or_else(|| self.env.var(DEPLOYMENT_MODE_VAR))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEPLOYMENT_MODE.to_string());

        let mut values = HashMap::new();

        if !self.skip_default_files {
            let base = match &self.base_dir {
                Some(dir) => dir.clone(),
                None => env::current_dir()?,
            };

            for name in [BASE_FILE.to_string(), overlay_file(&mode)] {
                let path = base.join(&name);
                if let Some(file_values) = file::load_optional_cfg_file(&path)? {
                    tracing::debug!(file = %path.display(), keys = file_values.len(), "loaded configuration file");
                    values.extend(file_values);
                }
            }
        }

        for path in &self.files {
            let file_values = file::load_cfg_file(path)?;
            tracing::debug!(file = %path.display(), keys = file_values.len(), "loaded configuration file");
            values.extend(file_values);
        }

        values.extend(self.overrides);

        Ok(Configuration::new(values, self.env, mode))
    }
}
