//! Target network configurations.
//!
//! Pure lookups only — no I/O. Each environment is an immutable record; an
//! unknown name is always an error, never a silent fallback.

use alloy::primitives::{Address, address};
use anyhow::Result;

use crate::domain::error::ConfigError;

/// Environment used when nothing else selects one.
pub const DEFAULT_ENVIRONMENT: &str = "sepolia";

/// Immutable description of one deployment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnvironmentConfig {
    /// Human name, e.g. `"sepolia"`.
    pub name: &'static str,
    /// EVM chain ID the contracts live on.
    pub chain_id: u64,
    /// RPC URL used when neither `--rpc-url` nor `TEECTL_RPC_URL` is set.
    pub default_rpc_url: &'static str,
    /// Application-controller contract (app status, releases, lifecycle).
    pub app_controller: Address,
    /// Permission-controller contract (log visibility appointees).
    pub permission_controller: Address,
    /// Base URL of the off-chain status/build API.
    pub api_base_url: &'static str,
    /// Endpoint that encrypts private env payloads for the TEE.
    pub kms_url: &'static str,
    /// EIP-7702 delegation target implementing ERC-7579 batch execution.
    pub delegator: Address,
}

const SEPOLIA: EnvironmentConfig = EnvironmentConfig {
    name: "sepolia",
    chain_id: 11_155_111,
    default_rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
    app_controller: address!("0x0dd810a6ffba6a9820a10d97b659f07d8d23d4e2"),
    permission_controller: address!("0x44632dfbdcb6d3e21ef613b0ca8a6a0c618f5a37"),
    api_base_url: "https://api.sepolia.teectl.dev",
    kms_url: "https://kms.sepolia.teectl.dev/v1/encrypt",
    delegator: address!("0x63c0c19a282a1b52b07dd5a65b58948a07dae32b"),
};

const MAINNET: EnvironmentConfig = EnvironmentConfig {
    name: "mainnet",
    chain_id: 1,
    default_rpc_url: "https://ethereum-rpc.publicnode.com",
    app_controller: address!("0xc38d35fc995e75342a21cbd6d770305b142fbe67"),
    permission_controller: address!("0x25e5f8b1e7adf44518d35d5b2271f114e081f0e5"),
    api_base_url: "https://api.teectl.dev",
    kms_url: "https://kms.teectl.dev/v1/encrypt",
    delegator: address!("0x63c0c19a282a1b52b07dd5a65b58948a07dae32b"),
};

/// Anvil devnet with the contracts deployed by the first default account.
const LOCAL: EnvironmentConfig = EnvironmentConfig {
    name: "local",
    chain_id: 31_337,
    default_rpc_url: "http://127.0.0.1:8545",
    app_controller: address!("0x5fbdb2315678afecb367f032d93f642f64180aa3"),
    permission_controller: address!("0xe7f1725e7734ce288f8367e1bb143e90bb3f0512"),
    api_base_url: "http://127.0.0.1:8080",
    kms_url: "http://127.0.0.1:8081/v1/encrypt",
    delegator: address!("0x9fe46736679d2d9a65f0992f2272de9f3c7fa6e0"),
};

/// All built-in environments, in display order.
pub const ENVIRONMENTS: &[EnvironmentConfig] = &[SEPOLIA, MAINNET, LOCAL];

/// Names of all built-in environments.
#[must_use]
pub fn environment_names() -> Vec<&'static str> {
    ENVIRONMENTS.iter().map(|e| e.name).collect()
}

/// Look up an environment by name.
///
/// When `expected_chain_id` is given it must equal the environment's chain ID.
///
/// # Errors
///
/// Returns [`ConfigError::UnknownEnvironment`] for an unknown name and
/// [`ConfigError::ChainIdMismatch`] when the chain ID does not match.
pub fn resolve_environment(name: &str, expected_chain_id: Option<u64>) -> Result<EnvironmentConfig> {
    let env = ENVIRONMENTS
        .iter()
        .find(|e| e.name == name)
        .copied()
        .ok_or_else(|| ConfigError::UnknownEnvironment {
            name: name.to_string(),
            valid: environment_names().join(", "),
        })?;

    if let Some(actual) = expected_chain_id
        && actual != env.chain_id
    {
        return Err(ConfigError::ChainIdMismatch {
            environment: env.name.to_string(),
            expected: env.chain_id,
            actual,
        }
        .into());
    }
    Ok(env)
}

/// Pick the environment name: explicit flag, then `TEECTL_ENV`, then the
/// config default, then [`DEFAULT_ENVIRONMENT`].
#[must_use]
pub fn select_environment_name(
    explicit: Option<&str>,
    from_env: Option<&str>,
    from_config: Option<&str>,
) -> String {
    [explicit, from_env, from_config]
        .into_iter()
        .flatten()
        .map(str::trim)
        .find(|s| !s.is_empty())
        .unwrap_or(DEFAULT_ENVIRONMENT)
        .to_string()
}
