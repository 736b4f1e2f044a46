//! Application service — configuration use-cases.

use anyhow::Result;

use crate::application::ports::ConfigStore;
use crate::domain::config::{TeectlConfig, apply_config_value};
use crate::domain::status::TransitionPolicy;

/// Load configuration.
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be read or parsed.
pub fn load_config(store: &impl ConfigStore) -> Result<TeectlConfig> {
    store.load()
}

/// Validate and persist one `key = value` setting.
///
/// Nothing is written if the key or value is rejected.
///
/// # Errors
///
/// Returns a `ConfigError` for an unknown key or invalid value, or an I/O
/// error if the file cannot be written.
pub fn set_value(store: &impl ConfigStore, key: &str, value: &str) -> Result<TeectlConfig> {
    let mut config = store.load()?;
    apply_config_value(&mut config, key, value)?;
    store.save(&config)?;
    Ok(config)
}

/// Reconciliation policy: the configured override table, or the built-in one.
#[must_use]
pub fn transition_policy(config: &TeectlConfig) -> TransitionPolicy {
    config
        .watch
        .transitions
        .clone()
        .map_or_else(TransitionPolicy::default, TransitionPolicy::from_rules)
}
