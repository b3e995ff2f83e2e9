//! The loaded configuration snapshot.

use crate::file::normalize_key;
use crate::value::FromConfigValue;
use crate::ConfigLoader;
use std::collections::HashMap;
use std::env;
use std::sync::OnceLock;

/// Where environment overrides come from.
#[derive(Debug, Clone, Default)]
pub enum EnvSource {
    /// The live process environment.
    #[default]
    Process,
    /// A fixed set of variables (tests, embedded hosts).
    Fixed(HashMap<String, String>),
}

impl EnvSource {
    /// Looks up an environment variable.
    #[must_use]
    pub fn var(&self, key: &str) -> Option<String> {
        match self {
            Self::Process => env::var(key).ok(),
            Self::Fixed(vars) => vars.get(key).cloned(),
        }
    }
}

static GLOBAL: OnceLock<Configuration> = OnceLock::new();

/// An immutable view over file values with environment overrides.
///
/// Lookups check the environment first, then values loaded from cfg
/// files, then the caller's default. Environment names match exactly;
/// file keys match case-insensitively. Typed lookups never fail: a blank,
/// missing or unparsable value yields the default.
///
/// # Example
///
/// ```
/// use switchyard_config::ConfigLoader;
/// use std::time::Duration;
///
/// let config = ConfigLoader::new()
///     .without_env()
///     .with_values([("REQUEST_TIMEOUT_MS", "250"), ("NAME", "edge")])
///     .load()
///     .unwrap();
///
/// assert_eq!(config.get_or("NAME", "default"), "edge");
/// assert_eq!(config.get_or_parsed("REQUEST_TIMEOUT_MS", Duration::from_secs(30)), Duration::from_millis(250));
/// assert_eq!(config.get_or_parsed("MISSING", 3_u8), 3);
/// ```
#[derive(Debug, Clone, Default)]
pub struct Configuration {
    values: HashMap<String, String>,
    env: EnvSource,
    deployment_mode: String,
}

impl Configuration {
    pub(crate) fn new(
        values: HashMap<String, String>,
        env: EnvSource,
        deployment_mode: String,
    ) -> Self {
        Self {
            values,
            env,
            deployment_mode,
        }
    }

    /// Returns the process-wide configuration, loading it on first use.
    ///
    /// Files are read from the current directory. If they cannot be parsed
    /// the failure is logged and only the environment is consulted.
    pub fn global() -> &'static Configuration {
        GLOBAL.get_or_init(|| match ConfigLoader::new().load() {
            Ok(config) => config,
            Err(error) => {
                tracing::warn!(%error, "failed to load configuration files, using environment only");
                let mode = env::var(crate::loader::DEPLOYMENT_MODE_VAR)
                    .unwrap_or_else(|_| crate::loader::DEFAULT_DEPLOYMENT_MODE.to_string());
                Self::new(HashMap::new(), EnvSource::Process, mode)
            }
        })
    }

    /// Installs `config` as the process-wide configuration.
    ///
    /// Returns the configuration back if the global was already initialized.
    pub fn init_global(config: Configuration) -> Result<(), Configuration> {
        GLOBAL.set(config)
    }

    /// Returns the deployment mode used to pick the overlay file.
    #[must_use]
    pub fn deployment_mode(&self) -> &str {
        &self.deployment_mode
    }

    /// Returns the raw value for `key`, environment first.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<String> {
        self.env
            .var(key)
            .or_else(|| self.file_value(key).map(ToString::to_string))
    }

    /// Returns the raw value for `key`, or `default`.
    #[must_use]
    pub fn get_or(&self, key: &str, default: impl Into<String>) -> String {
        self.get(key).unwrap_or_else(|| default.into())
    }

    /// Returns the value for `key` coerced to `T`.
    ///
    /// Blank values read as absent.
    #[must_use]
    pub fn get_parsed<T: FromConfigValue>(&self, key: &str) -> Option<T> {
        self.get(key)
            .filter(|raw| !raw.trim().is_empty())
            .and_then(|raw| T::from_config_value(&raw))
    }

    /// Returns the value for `key` coerced to `T`, or `default`.
    #[must_use]
    pub fn get_or_parsed<T: FromConfigValue>(&self, key: &str, default: T) -> T {
        self.get_parsed(key).unwrap_or(default)
    }

    /// Returns the value loaded from files, ignoring the environment.
    #[must_use]
    pub fn file_value(&self, key: &str) -> Option<&str> {
        self.values.get(&normalize_key(key)).map(String::as_str)
    }

    /// Returns the number of file-backed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if no file-backed keys were loaded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
