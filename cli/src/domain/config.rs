//! Domain types and validators for teectl configuration.
//!
//! Pure functions only — no I/O, no async, no filesystem access.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::domain::environment::environment_names;
use crate::domain::error::ConfigError;
use crate::domain::status::TransitionRule;

// ── Constants ────────────────────────────────────────────────────────────────

pub const VALID_CONFIG_KEYS: &[&str] = &[
    "defaults.environment",
    "defaults.instance_type",
    "watch.interval_secs",
];

/// Poll interval bounds for the status watcher, in seconds.
pub const MIN_WATCH_INTERVAL_SECS: u64 = 1;
pub const MAX_WATCH_INTERVAL_SECS: u64 = 300;

// ── Config schema ────────────────────────────────────────────────────────────

/// Top-level configuration stored in `~/.teectl/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TeectlConfig {
    /// Defaults applied when flags are omitted.
    pub defaults: DefaultsConfig,
    /// Status watcher settings.
    pub watch: WatchConfig,
}

/// Defaults applied when flags are omitted.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DefaultsConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub environment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_type: Option<String>,
}

/// Status watcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    /// Overrides the built-in contract/API divergence table when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transitions: Option<Vec<TransitionRule>>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            transitions: None,
        }
    }
}

fn default_interval_secs() -> u64 {
    5
}

// ── Validators ───────────────────────────────────────────────────────────────

/// Validates a configuration key against the whitelist.
///
/// # Errors
///
/// Returns an error if the key is not in the allowed list.
pub fn validate_config_key(key: &str) -> Result<()> {
    if !VALID_CONFIG_KEYS.contains(&key) {
        return Err(ConfigError::UnknownKey {
            key: key.to_string(),
            valid: VALID_CONFIG_KEYS.join(", "),
        }
        .into());
    }
    Ok(())
}

/// Validates a configuration value for the given key.
///
/// # Errors
///
/// Returns an error if the value is not valid for the key.
pub fn validate_config_value(key: &str, value: &str) -> Result<()> {
    let invalid = |valid: String| ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.to_string(),
        valid,
    };
    match key {
        "defaults.environment" => {
            let names = environment_names();
            if !names.contains(&value) {
                return Err(invalid(names.join(", ")).into());
            }
        }
        "defaults.instance_type" => {
            if !is_valid_instance_type(value) {
                return Err(invalid("lowercase letters, digits and '-'".to_string()).into());
            }
        }
        "watch.interval_secs" => {
            let ok = value
                .parse::<u64>()
                .is_ok_and(|v| (MIN_WATCH_INTERVAL_SECS..=MAX_WATCH_INTERVAL_SECS).contains(&v));
            if !ok {
                return Err(invalid(format!(
                    "{MIN_WATCH_INTERVAL_SECS}-{MAX_WATCH_INTERVAL_SECS}"
                ))
                .into());
            }
        }
        _ => {}
    }
    Ok(())
}

/// SKU identifiers are short lowercase slugs, e.g. `g1-standard-4t`.
#[must_use]
pub fn is_valid_instance_type(value: &str) -> bool {
    !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
        && !value.starts_with('-')
}

/// Apply a validated `key = value` to the config.
///
/// # Errors
///
/// Returns an error if the key or value is invalid.
pub fn apply_config_value(config: &mut TeectlConfig, key: &str, value: &str) -> Result<()> {
    validate_config_key(key)?;
    validate_config_value(key, value)?;
    match key {
        "defaults.environment" => config.defaults.environment = Some(value.to_string()),
        "defaults.instance_type" => config.defaults.instance_type = Some(value.to_string()),
        "watch.interval_secs" => config.watch.interval_secs = value.parse()?,
        _ => anyhow::bail!("Unknown setting: {key}"),
    }
    Ok(())
}

// ── Unit tests ───────────────────────────────────────────────────────────────
