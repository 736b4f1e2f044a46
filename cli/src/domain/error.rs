//! Typed domain error enums.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All error types implement `thiserror::Error` and convert to `anyhow::Error`
//! via the `?` operator. Callers classify failures with `downcast_ref`.

use thiserror::Error;

// ── Config errors ─────────────────────────────────────────────────────────────

/// Configuration problems: unknown environment, missing RPC URL, bad settings.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Unknown environment '{name}'.\n\nValid environments: {valid}")]
    UnknownEnvironment { name: String, valid: String },

    #[error(
        "Environment '{environment}' is chain {expected}, but chain {actual} was requested."
    )]
    ChainIdMismatch {
        environment: String,
        expected: u64,
        actual: u64,
    },

    #[error(
        "No RPC URL for environment '{environment}'. Pass --rpc-url or set TEECTL_RPC_URL."
    )]
    MissingRpcUrl { environment: String },

    #[error("Invalid RPC URL '{url}': {reason}")]
    InvalidRpcUrl { url: String, reason: String },

    #[error("Unknown instance type '{requested}'.\n\nAvailable: {available}")]
    UnknownInstanceType { requested: String, available: String },

    #[error("Unknown setting: {key}\n\nValid settings: {valid}")]
    UnknownKey { key: String, valid: String },

    #[error("Invalid value for {key}: {value}\n\nValid values: {valid}")]
    InvalidValue {
        key: String,
        value: String,
        valid: String,
    },
}

// ── Auth errors ───────────────────────────────────────────────────────────────

/// Where a credential was found during resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialTier {
    Explicit,
    Environment,
    Store,
}

impl std::fmt::Display for CredentialTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Explicit => write!(f, "--private-key"),
            Self::Environment => write!(f, "TEECTL_PRIVATE_KEY"),
            Self::Store => write!(f, "credential store"),
        }
    }
}

/// Credential problems.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error(
        "No private key found. Pass --private-key, set TEECTL_PRIVATE_KEY, or run 'teectl auth login'."
    )]
    NotFound,

    #[error("Private key from {tier} is not a 32-byte hex string.")]
    InvalidFormat { tier: CredentialTier },

    #[error("Signing failed: {0}")]
    Signing(String),
}

// ── Network errors ────────────────────────────────────────────────────────────

/// A remote endpoint could not be reached or answered garbage.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum NetworkError {
    #[error("RPC endpoint {url} is unreachable: {reason}")]
    RpcUnreachable { url: String, reason: String },

    #[error("Status API {url} is unreachable: {reason}")]
    ApiUnreachable { url: String, reason: String },

    #[error("KMS endpoint {url} failed: {reason}")]
    KmsUnreachable { url: String, reason: String },
}

// ── Chain state errors ────────────────────────────────────────────────────────

/// The chain disagrees with what the pipeline expected.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ChainStateError {
    #[error(
        "Chain ID mismatch: environment expects {expected} but the RPC node reports {actual}. \
Refusing to sign for the wrong network."
    )]
    ChainIdMismatch { expected: u64, actual: u64 },

    #[error("Transaction simulation reverted: {reason}")]
    SimulationReverted { reason: String },

    #[error("Transaction {tx_hash} reverted: {reason}")]
    Reverted { tx_hash: String, reason: String },

    #[error("Contract returned unknown app status code {0}")]
    UnknownStatusCode(u8),

    #[error("Batch was prepared for {expected} but the signer is {actual}")]
    SenderMismatch { expected: String, actual: String },
}

// ── Release errors ────────────────────────────────────────────────────────────

/// Failures while turning a Dockerfile or image into a release descriptor.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ReleaseError {
    #[error("docker build failed with exit code {code}")]
    BuildFailed { code: i32 },

    #[error("Push to {image} was denied after re-authenticating:\n{detail}")]
    PushDenied { image: String, detail: String },

    #[error("Push to {image} failed:\n{detail}")]
    PushFailed { image: String, detail: String },

    #[error("docker pull {image} failed:\n{detail}")]
    PullFailed { image: String, detail: String },

    #[error("No registry digest found for {image}. Was it pushed?")]
    DigestUnavailable { image: String },

    #[error("Invalid image reference '{0}'")]
    InvalidImageRef(String),

    #[error("Invalid env file line {line}: {reason}")]
    InvalidEnvFile { line: usize, reason: String },

    #[error("'{0}' is reserved and cannot be set in the env file")]
    ReservedEnvKey(String),

    #[error("Encrypting the private environment failed: {0}")]
    EncryptionFailed(String),
}

// ── Convergence failures ──────────────────────────────────────────────────────

/// The watcher observed a terminal state instead of the one it waited for.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConvergenceFailure {
    #[error("App {app_id} reported status '{status}'. Check the app logs for details.")]
    TerminalStatus { app_id: String, status: String },

    #[error("App {app_id} is {status} on-chain and will not reach the target state.")]
    ContractTerminal { app_id: String, status: String },
}
