//! JSON output helpers.
//!
//! `--json` documents go to stdout. A failing command prints an error object
//! whose `code` is derived from the typed error found in the chain.

use anyhow::{Context, Result};
use serde::Serialize;

use crate::domain::error::{
    AuthError, ChainStateError, ConfigError, ConvergenceFailure, NetworkError, ReleaseError,
};

/// Renders documents as pretty-printed JSON on stdout.
pub struct JsonRenderer;

impl JsonRenderer {
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn render<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        let out = serde_json::to_string_pretty(value).context("JSON serialization failed")?;
        println!("{out}");
        Ok(())
    }
}

/// Format a JSON error object.
///
/// Output (pretty-printed):
/// ```json
/// {
///   "error": true,
///   "message": "...",
///   "code": "..."
/// }
/// ```
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn format_error(message: &str, code: &str) -> Result<String> {
    let obj = serde_json::json!({
        "error": true,
        "message": message,
        "code": code,
    });
    serde_json::to_string_pretty(&obj).context("JSON serialization failed")
}

/// Machine-readable code for the first typed error in `err`'s chain.
#[must_use]
pub fn error_code(err: &anyhow::Error) -> &'static str {
    for cause in err.chain() {
        if cause.is::<ConfigError>() {
            return "CONFIG_ERROR";
        }
        if cause.is::<AuthError>() {
            return "AUTH_ERROR";
        }
        if cause.is::<NetworkError>() {
            return "NETWORK_ERROR";
        }
        if cause.is::<ChainStateError>() {
            return "CHAIN_STATE_ERROR";
        }
        if cause.is::<ReleaseError>() {
            return "RELEASE_ERROR";
        }
        if cause.is::<ConvergenceFailure>() {
            return "CONVERGENCE_FAILURE";
        }
    }
    "ERROR"
}
