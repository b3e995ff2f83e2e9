//! `.cfg` file parsing.
//!
//! The format is deliberately small:
//!
//! ```text
//! # comment
//! REQUEST_TIMEOUT_MS = 5000
//! CONNECTION = host=db;port=5432
//! ```
//!
//! Leading whitespace is ignored, blank lines and lines starting with `#`
//! are skipped, and each remaining line is split on its first `=`. Keys and
//! values are trimmed. Comments are only recognized at the start of a line.
//!
//! Keys are case-insensitive: they are folded with [`normalize_key`] when
//! parsed, so `Port` and `PORT` name the same setting.

use crate::ConfigError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Folds a key to the form file values are stored under.
#[must_use]
pub fn normalize_key(key: &str) -> String {
    key.trim().to_ascii_lowercase()
}

/// Parses cfg `content`, attributing errors to `path`.
///
/// Keys are returned normalized. Later duplicates of a key overwrite
/// earlier ones, whatever their case.
pub fn parse_cfg(content: &str, path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    let mut values = HashMap::new();

    for (index, raw) in content.lines().enumerate() {
        let line = raw.trim_start();

        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let (key, value) = line
            .split_once('=')
            .ok_or_else(|| ConfigError::parse(path, index + 1, line.trim_end()))?;

        let key = key.trim();
        if key.is_empty() {
            return Err(ConfigError::parse(path, index + 1, line.trim_end()));
        }

        values.insert(normalize_key(key), value.trim().to_string());
    }

    Ok(values)
}

/// Reads and parses a cfg file that must exist.
pub fn load_cfg_file(path: &Path) -> Result<HashMap<String, String>, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::file_not_found(path));
    }

    let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;
    parse_cfg(&content, path)
}

/// Reads and parses a cfg file, returning `None` when it does not exist.
pub fn load_optional_cfg_file(
    path: &Path,
) -> Result<Option<HashMap<String, String>>, ConfigError> {
    if path.exists() {
        load_cfg_file(path).map(Some)
    } else {
        Ok(None)
    }
}
