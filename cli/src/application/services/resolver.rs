//! Application service — credential and environment resolution.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Environment variable values are passed in by the caller.

use anyhow::{Context, Result};

use crate::application::ports::CredentialStore;
use crate::domain::credential::Credential;
use crate::domain::environment::{EnvironmentConfig, resolve_environment, select_environment_name};
use crate::domain::error::{AuthError, CredentialTier};

/// Resolve the signing credential: explicit value, then `TEECTL_PRIVATE_KEY`,
/// then the credential store.
///
/// The first present value wins and is validated on the spot; an invalid
/// value never falls through to a lower tier. A supplied explicit value is
/// always present, even when blank. An empty environment variable counts as
/// unset, but one holding only whitespace is present and malformed.
///
/// # Errors
///
/// Returns [`AuthError::NotFound`] when no tier has a value and
/// [`AuthError::InvalidFormat`] naming the tier whose value is malformed.
pub fn resolve_credential(
    explicit: Option<&str>,
    from_env: Option<&str>,
    store: &impl CredentialStore,
) -> Result<Credential> {
    if let Some(raw) = explicit {
        return Ok(Credential::parse(raw, CredentialTier::Explicit)?);
    }
    if let Some(raw) = from_env.filter(|v| !v.is_empty()) {
        return Ok(Credential::parse(raw, CredentialTier::Environment)?);
    }
    let stored = store.get().context("cannot read credential store")?;
    match stored.as_deref().filter(|s| !s.trim().is_empty()) {
        Some(raw) => Ok(Credential::parse(raw, CredentialTier::Store)?),
        None => Err(AuthError::NotFound.into()),
    }
}

/// Pick and look up the target environment.
///
/// Name priority: `--env`, then `TEECTL_ENV`, then the config default.
///
/// # Errors
///
/// Returns a `ConfigError` for unknown names or a chain ID mismatch.
pub fn resolve_target_environment(
    explicit: Option<&str>,
    from_env: Option<&str>,
    from_config: Option<&str>,
    expected_chain_id: Option<u64>,
) -> Result<EnvironmentConfig> {
    let name = select_environment_name(explicit, from_env, from_config);
    resolve_environment(&name, expected_chain_id)
}
