//! Application service — preflight checks before anything is signed.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! No retries: connectivity and identity problems surface immediately.

use anyhow::Result;

use crate::application::ports::{ChainClient, ChainConnector};
use crate::domain::credential::Credential;
use crate::domain::environment::EnvironmentConfig;
use crate::domain::error::{ChainStateError, ConfigError, NetworkError};

/// Everything later pipeline stages need, bundled once.
#[derive(Debug)]
pub struct PipelineContext<C> {
    pub credential: Credential,
    pub environment: EnvironmentConfig,
    pub client: C,
    pub rpc_url: String,
}

/// Effective RPC URL: `--rpc-url`, then `TEECTL_RPC_URL`, then the
/// environment default.
///
/// # Errors
///
/// Returns [`ConfigError::MissingRpcUrl`] if every source is empty and
/// [`ConfigError::InvalidRpcUrl`] if the chosen value is not an http(s) URL.
pub fn effective_rpc_url(
    rpc_override: Option<&str>,
    from_env: Option<&str>,
    environment: &EnvironmentConfig,
) -> Result<String> {
    let chosen = [rpc_override, from_env, Some(environment.default_rpc_url)]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingRpcUrl {
            environment: environment.name.to_string(),
        })?;

    let parsed = url::Url::parse(chosen).map_err(|e| ConfigError::InvalidRpcUrl {
        url: chosen.to_string(),
        reason: e.to_string(),
    })?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidRpcUrl {
            url: chosen.to_string(),
            reason: format!("unsupported scheme '{}'", parsed.scheme()),
        }
        .into());
    }
    Ok(chosen.to_string())
}

/// Connect with `credential` as signer and verify the node's chain ID.
///
/// # Errors
///
/// Returns a `ConfigError` for a missing/invalid RPC URL,
/// [`NetworkError::RpcUnreachable`] if the node cannot be queried and
/// [`ChainStateError::ChainIdMismatch`] if it serves a different chain.
pub async fn check<K: ChainConnector>(
    connector: &K,
    credential: Credential,
    environment: EnvironmentConfig,
    rpc_override: Option<&str>,
    rpc_from_env: Option<&str>,
) -> Result<PipelineContext<K::Client>> {
    let rpc_url = effective_rpc_url(rpc_override, rpc_from_env, &environment)?;

    let unreachable = |e: anyhow::Error| NetworkError::RpcUnreachable {
        url: rpc_url.clone(),
        reason: format!("{e:#}"),
    };
    let client = connector
        .connect(&rpc_url, &credential, &environment)
        .await
        .map_err(unreachable)?;
    let actual = client.chain_id().await.map_err(unreachable)?;

    if actual != environment.chain_id {
        return Err(ChainStateError::ChainIdMismatch {
            expected: environment.chain_id,
            actual,
        }
        .into());
    }
    tracing::debug!(rpc_url = %rpc_url, chain_id = actual, "preflight ok");

    Ok(PipelineContext {
        credential,
        environment,
        client,
        rpc_url,
    })
}
