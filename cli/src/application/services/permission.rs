//! Application service — log-visibility permission diff.
//!
//! The diff is computed once per pipeline run and handed to both the batch
//! builder and the watcher.

use alloy::primitives::Address;
use anyhow::{Context, Result};

use crate::application::ports::ChainClient;

/// Whether anyone may currently read `app`'s logs.
///
/// # Errors
///
/// Returns an error if the permission controller cannot be queried.
pub async fn current_log_visibility_is_public(
    client: &impl ChainClient,
    app: Address,
) -> Result<bool> {
    client
        .logs_public(app)
        .await
        .with_context(|| format!("reading log permission for {app}"))
}

/// A permission call is needed iff the current visibility differs.
#[must_use]
pub fn permission_change_needed(current_public: bool, desired_public: bool) -> bool {
    current_public != desired_public
}
