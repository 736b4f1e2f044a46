//! Command implementations
//!
//! Handlers parse flags into domain inputs, build the infra adapters for the
//! resolved environment and call one application service.

pub mod auth;
pub mod config;
pub mod deploy;
pub mod environment;
pub mod info;
pub mod instance_types;
pub mod lifecycle;
pub mod version;

use std::time::Duration;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::preflight::{self, PipelineContext};
use crate::application::services::watcher::WatchOptions;
use crate::application::services::{config_service, resolver};
use crate::domain::batch::FeeOverride;
use crate::domain::config::TeectlConfig;
use crate::domain::environment::EnvironmentConfig;
use crate::infra::chain::{AlloyChainClient, AlloyConnector};

pub const PRIVATE_KEY_VAR: &str = "TEECTL_PRIVATE_KEY";
pub const ENV_VAR: &str = "TEECTL_ENV";
pub const RPC_URL_VAR: &str = "TEECTL_RPC_URL";

/// Environment selection shared by every networked command.
#[derive(Args, Debug, Clone, Default)]
pub struct EnvArgs {
    /// Target environment (sepolia, mainnet, local)
    #[arg(long = "env", value_name = "NAME")]
    pub environment: Option<String>,

    /// Refuse to run unless the environment is this chain
    #[arg(long, value_name = "ID")]
    pub chain_id: Option<u64>,
}

/// Environment plus signer and node selection.
#[derive(Args, Debug, Clone, Default)]
pub struct NetworkArgs {
    #[command(flatten)]
    pub env: EnvArgs,

    /// Override the environment's RPC URL (also TEECTL_RPC_URL)
    #[arg(long, value_name = "URL")]
    pub rpc_url: Option<String>,

    /// Signing key as hex (prefer TEECTL_PRIVATE_KEY or `teectl auth login`)
    #[arg(long, value_name = "HEX")]
    pub private_key: Option<String>,
}

/// Fee caps replacing the node's estimate.
#[derive(Args, Debug, Clone, Copy, Default)]
pub struct FeeArgs {
    /// Maximum fee per gas, in gwei
    #[arg(long, value_name = "GWEI", value_parser = parse_gwei)]
    pub max_fee_gwei: Option<u128>,

    /// Maximum priority fee per gas, in gwei
    #[arg(long, value_name = "GWEI", value_parser = parse_gwei)]
    pub priority_fee_gwei: Option<u128>,
}

impl From<FeeArgs> for FeeOverride {
    fn from(args: FeeArgs) -> Self {
        Self {
            max_fee_per_gas: args.max_fee_gwei,
            max_priority_fee_per_gas: args.priority_fee_gwei,
        }
    }
}

/// Parse a decimal gwei amount into wei.
fn parse_gwei(s: &str) -> Result<u128, String> {
    if s.trim_start().starts_with('-') {
        return Err("fee must not be negative".to_string());
    }
    let units = alloy::primitives::utils::parse_units(s.trim(), "gwei").map_err(|e| e.to_string())?;
    u128::try_from(units.get_absolute()).map_err(|_| "fee is too large".to_string())
}

/// A set, non-blank environment variable.
pub(crate) fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Load config and resolve the target environment.
///
/// # Errors
///
/// Returns a `ConfigError` for an unknown environment or chain ID mismatch.
pub(crate) fn resolve_target(
    app: &AppContext,
    args: &EnvArgs,
) -> Result<(EnvironmentConfig, TeectlConfig)> {
    let config = config_service::load_config(&app.config_store)?;
    let environment = resolver::resolve_target_environment(
        args.environment.as_deref(),
        env_var(ENV_VAR).as_deref(),
        config.defaults.environment.as_deref(),
        args.chain_id,
    )?;
    tracing::debug!(environment = environment.name, "target environment");
    Ok((environment, config))
}

/// Resolve the credential and run preflight against `environment`.
///
/// # Errors
///
/// Propagates resolver and preflight errors.
pub(crate) async fn connect(
    app: &AppContext,
    args: &NetworkArgs,
    environment: EnvironmentConfig,
) -> Result<PipelineContext<AlloyChainClient>> {
    let credential = resolver::resolve_credential(
        args.private_key.as_deref(),
        std::env::var(PRIVATE_KEY_VAR).ok().as_deref(),
        &app.credential_store,
    )?;
    preflight::check(
        &AlloyConnector,
        credential,
        environment,
        args.rpc_url.as_deref(),
        env_var(RPC_URL_VAR).as_deref(),
    )
    .await
}

/// Watcher settings from the config file.
pub(crate) fn watch_options(config: &TeectlConfig) -> WatchOptions {
    WatchOptions {
        interval: Duration::from_secs(config.watch.interval_secs),
        policy: config_service::transition_policy(config),
        ..WatchOptions::default()
    }
}

/// Resolves on Ctrl-C. Never resolves if the handler cannot be installed.
pub(crate) async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
