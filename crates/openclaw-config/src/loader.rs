//! Config file discovery and layered loading.
//!
//! Implements the load algorithm:
//! 1. Parse the embedded defaults document -> base.
//! 2. Merge the user config file (`~/.openclaw/config.json`, or an explicit
//!    override path), if present, over the base.
//! 3. Deserialize the merged tree -> [`GatewayConfig`].

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::types::GatewayConfig;

/// Embedded default configuration document.
const DEFAULTS_JSON: &str = include_str!("defaults.json");

/// Largest user config file this loader will read (1 MiB), to avoid reading
/// an unbounded file into memory from a misconfigured path.
const MAX_CONFIG_FILE_SIZE: u64 = 1_048_576;

/// Load the gateway configuration with defaults + user-file layering.
///
/// `user_config_path`, if given, is read instead of the default
/// `~/.openclaw/config.json` location.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the user config file exists but can't be
/// read or parsed, or if it exceeds the size limit.
pub fn load(user_config_path: Option<&Path>) -> ConfigResult<GatewayConfig> {
    let mut merged: Value =
        serde_json::from_str(DEFAULTS_JSON).map_err(|e| ConfigError::Parse {
            path: "<embedded defaults>".to_owned(),
            source: e,
        })?;

    let resolved_path = match user_config_path {
        Some(p) => Some(p.to_path_buf()),
        None => default_user_config_path()?,
    };

    if let Some(path) = &resolved_path {
        if let Some(overlay) = try_load_file(path)? {
            deep_merge(&mut merged, &overlay);
            info!(path = %path.display(), "loaded user config");
        } else {
            debug!(path = %path.display(), "no user config found, using defaults");
        }
    }

    serde_json::from_value(merged).map_err(|e| ConfigError::Parse {
        path: resolved_path.map_or_else(|| "<merged config>".to_owned(), |p| p.display().to_string()),
        source: e,
    })
}

/// Load a config from an explicit path with no defaults layering.
///
/// # Errors
///
/// Returns a [`ConfigError`] if the file can't be read or parsed, or is
/// oversized.
pub fn load_file(path: &Path) -> ConfigResult<GatewayConfig> {
    let value = try_load_file(path)?.ok_or_else(|| ConfigError::Read {
        path: path.display().to_string(),
        source: std::io::Error::new(std::io::ErrorKind::NotFound, "config file not found"),
    })?;

    serde_json::from_value(value).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })
}

/// `~/.openclaw/config.json`, if a home directory can be determined.
fn default_user_config_path() -> ConfigResult<Option<PathBuf>> {
    let Some(dirs) = directories::BaseDirs::new() else {
        return Err(ConfigError::NoHomeDir);
    };
    Ok(Some(dirs.home_dir().join(".openclaw").join("config.json")))
}

/// Read and parse a JSON file, returning `None` if it doesn't exist.
///
/// Reads before checking size (a single syscall) to avoid a TOCTOU gap
/// between a separate stat and the read.
fn try_load_file(path: &Path) -> ConfigResult<Option<Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(ConfigError::Read {
                path: path.display().to_string(),
                source: e,
            });
        },
    };

    if content.len() as u64 > MAX_CONFIG_FILE_SIZE {
        return Err(ConfigError::TooLarge {
            path: path.display().to_string(),
            size: content.len() as u64,
            limit: MAX_CONFIG_FILE_SIZE,
        });
    }

    let value: Value = serde_json::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        source: e,
    })?;

    Ok(Some(value))
}

/// Recursively merge `overlay` into `base`, in place. Objects merge
/// key-by-key; any other value (array, scalar, or a type mismatch) is
/// replaced wholesale by the overlay's value.
fn deep_merge(base: &mut Value, overlay: &Value) {
    match (base, overlay) {
        (Value::Object(base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(key) {
                    Some(base_value) => deep_merge(base_value, overlay_value),
                    None => {
                        base_map.insert(key.clone(), overlay_value.clone());
                    },
                }
            }
        },
        (base_slot, overlay_value) => {
            *base_slot = overlay_value.clone();
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_temp_json(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn load_with_no_user_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("does-not-exist.json");
        let config = load(Some(&missing)).unwrap();
        assert_eq!(config.limits.max_concurrent, 5);
        assert_eq!(config.limits.max_retained, 15);
        assert!(config.backends.is_empty());
    }

    #[test]
    fn load_merges_user_file_over_defaults() {
        let (_dir, path) = write_temp_json(
            r#"{"limits": {"max_concurrent": 9}, "backends": {"claude-cli": {"command": "claude"}}}"#,
        );
        let config = load(Some(&path)).unwrap();
        assert_eq!(config.limits.max_concurrent, 9);
        // untouched default field survives the merge
        assert_eq!(config.limits.max_retained, 15);
        assert!(config.backends.contains_key("claude-cli"));
    }

    #[test]
    fn oversized_user_file_is_rejected() {
        let body = format!("{{\"x\": \"{}\"}}", "a".repeat(1_100_000));
        let (_dir, path) = write_temp_json(&body);

        let err = load(Some(&path)).unwrap_err();
        assert!(matches!(err, ConfigError::TooLarge { .. }));
    }

    #[test]
    fn deep_merge_replaces_arrays_wholesale() {
        let mut base = serde_json::json!({"a": [1, 2, 3]});
        let overlay = serde_json::json!({"a": [9]});
        deep_merge(&mut base, &overlay);
        assert_eq!(base, serde_json::json!({"a": [9]}));
    }
}
