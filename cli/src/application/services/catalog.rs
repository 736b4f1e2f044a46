//! Application service — instance type selection against the SKU catalog.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use anyhow::{Context, Result};
use teectl_common::Sku;

use crate::application::ports::{ProgressReporter, StatusApi};
use crate::domain::error::ConfigError;

/// Instance types offered by the environment.
///
/// # Errors
///
/// Returns a `NetworkError` if the status API cannot be read.
pub async fn instance_types(api: &impl StatusApi) -> Result<Vec<Sku>> {
    api.skus().await.context("cannot list instance types")
}

/// Pick the instance type for a release: the flag, then the configured
/// default, then the first offered SKU.
///
/// A requested name is checked against the catalog when the catalog can be
/// read; an unreadable catalog only warns when a name was given.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownInstanceType`] for a name the catalog does
/// not offer, or the catalog error when no name was given.
pub async fn select_instance_type(
    api: &impl StatusApi,
    reporter: &impl ProgressReporter,
    requested: Option<&str>,
    configured: Option<&str>,
) -> Result<String> {
    let wanted = requested.or(configured).filter(|s| !s.trim().is_empty());
    let skus = match (api.skus().await, wanted) {
        (Ok(skus), _) => skus,
        (Err(e), Some(name)) => {
            tracing::debug!(error = %format!("{e:#}"), "SKU catalog unavailable");
            reporter.warn(&format!(
                "cannot verify instance type '{name}': catalog unavailable"
            ));
            return Ok(name.to_string());
        }
        (Err(e), None) => return Err(e.context("cannot pick a default instance type")),
    };

    let Some(name) = wanted else {
        return skus.first().map(|s| s.sku.clone()).ok_or_else(|| {
            ConfigError::UnknownInstanceType {
                requested: "(default)".to_string(),
                available: "none".to_string(),
            }
            .into()
        });
    };

    if skus.is_empty() || skus.iter().any(|s| s.sku == name) {
        return Ok(name.to_string());
    }
    Err(ConfigError::UnknownInstanceType {
        requested: name.to_string(),
        available: skus
            .iter()
            .map(|s| s.sku.as_str())
            .collect::<Vec<_>>()
            .join(", "),
    }
    .into())
}
