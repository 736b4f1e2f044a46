//! Port trait definitions for the Application layer.
//!
//! Ports are the interfaces (contracts) that infrastructure must fulfill.
//! This file imports only from `crate::domain` and the shared wire types —
//! never from `crate::infra`, `crate::commands`, or `crate::output`.

use std::path::Path;
use std::process::{ExitStatus, Output};
use std::time::Duration;

use alloy::primitives::{Address, B256, Bytes};
use anyhow::Result;
use teectl_common::{ApiAppInfo, Sku};

use crate::domain::batch::{BatchReceipt, GasEstimate, PreparedBatch};
use crate::domain::config::TeectlConfig;
use crate::domain::credential::Credential;
use crate::domain::environment::EnvironmentConfig;
use crate::domain::status::ContractStatus;

// ── Command Runner Port ───────────────────────────────────────────────────────

/// Result of a streamed subprocess: exit status and the last stderr lines.
#[derive(Debug, Clone)]
pub struct StreamedOutput {
    pub status: ExitStatus,
    /// Bounded tail of stderr, kept for failure classification.
    pub stderr_tail: String,
}

/// Abstracts process execution so infrastructure can be swapped or mocked.
#[allow(async_fn_in_trait)]
pub trait CommandRunner {
    /// Run a program and capture its output.
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output>;
    /// Run a program with a custom timeout override.
    ///
    /// # Errors
    ///
    /// Returns an error if the process cannot be spawned or exceeds `timeout`.
    /// On timeout, the child process must be killed (not left orphaned).
    async fn run_with_timeout(&self, program: &str, args: &[&str], timeout: Duration)
    -> Result<Output>;
    /// Run a long program, forwarding its output line by line as it arrives.
    ///
    /// Waits for the process to exit or `timeout` to elapse, killing it in
    /// the latter case. Only a bounded stderr tail is kept.
    async fn run_streaming(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<StreamedOutput>;
    /// Run a program with inherited stdio (interactive) and return its status.
    /// The child is killed once `timeout` elapses.
    async fn run_status(&self, program: &str, args: &[&str], timeout: Duration)
    -> Result<ExitStatus>;
}

// ── Container Tool Port ───────────────────────────────────────────────────────

/// Outcome of a registry step that may be refused.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    Succeeded,
    /// The tool exited non-zero; carries its stderr tail.
    Failed(String),
}

impl StepOutcome {
    #[must_use]
    pub fn into_result(self) -> std::result::Result<(), String> {
        match self {
            Self::Succeeded => Ok(()),
            Self::Failed(detail) => Err(detail),
        }
    }
}

/// Container image operations needed to prepare a release.
#[allow(async_fn_in_trait)]
pub trait ImageBuilder {
    /// Build `dockerfile` in `context` for linux/amd64, tagged `tag`.
    ///
    /// # Errors
    ///
    /// Returns `ReleaseError::BuildFailed` with the exit code on failure.
    async fn build(&self, dockerfile: &Path, context: &Path, tag: &str) -> Result<()>;
    /// Push `image`; a refused push is `Ok(StepOutcome::Failed(..))`.
    async fn push(&self, image: &str) -> Result<StepOutcome>;
    /// Re-authenticate against `registry` so a retried push can succeed.
    async fn remediate_push_access(&self, registry: &str) -> Result<StepOutcome>;
    /// Pull an existing image.
    async fn pull(&self, image: &str) -> Result<()>;
    /// `RepoDigests` of a local image, e.g. `repo@sha256:<hex>`.
    async fn repo_digests(&self, image: &str) -> Result<Vec<String>>;
}

// ── Chain Ports ───────────────────────────────────────────────────────────────

/// Opens a signing connection to an EVM node.
#[allow(async_fn_in_trait)]
pub trait ChainConnector {
    type Client: ChainClient;

    /// Connect to `rpc_url` with `credential` as the signer.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL is invalid or the signer is rejected.
    async fn connect(
        &self,
        rpc_url: &str,
        credential: &Credential,
        environment: &EnvironmentConfig,
    ) -> Result<Self::Client>;
}

/// Typed reads and batch execution against the environment's contracts.
#[allow(async_fn_in_trait)]
pub trait ChainClient {
    /// Address that signs and sends batches.
    fn sender(&self) -> Address;
    async fn chain_id(&self) -> Result<u64>;
    async fn app_status(&self, app: Address) -> Result<ContractStatus>;
    async fn latest_release_block(&self, app: Address) -> Result<u64>;
    async fn calculate_app_id(&self, deployer: Address, salt: B256) -> Result<Address>;
    /// Whether the log-view permission is granted to anyone for `app`.
    async fn logs_public(&self, app: Address) -> Result<bool>;
    /// Simulate the batch and price it.
    ///
    /// # Errors
    ///
    /// Returns `ChainStateError::SimulationReverted` if any call reverts.
    async fn estimate(&self, batch: &PreparedBatch) -> Result<GasEstimate>;
    /// Sign, submit and wait for the receipt.
    ///
    /// # Errors
    ///
    /// Returns `ChainStateError::Reverted` for a failed receipt.
    async fn execute(&self, batch: &PreparedBatch, gas: Option<GasEstimate>) -> Result<BatchReceipt>;
}

// ── Off-chain Ports ───────────────────────────────────────────────────────────

/// Off-chain status API for one environment.
#[allow(async_fn_in_trait)]
pub trait StatusApi {
    /// Current off-chain view of `app`, or `None` if the API does not know it.
    async fn app_info(&self, app: Address) -> Result<Option<ApiAppInfo>>;
    /// Instance types offered by the platform.
    async fn skus(&self) -> Result<Vec<Sku>>;
}

/// Encrypts private env payloads for an app's TEE.
#[allow(async_fn_in_trait)]
pub trait KmsEncryptor {
    async fn encrypt(&self, app: Address, plaintext: &[u8]) -> Result<Bytes>;
}

// ── Local Storage Ports ───────────────────────────────────────────────────────

/// Secure local storage for the signing key.
pub trait CredentialStore {
    /// The stored secret, or `None` if nothing is stored.
    fn get(&self) -> Result<Option<String>>;
    fn put(&self, secret: &str) -> Result<()>;
    /// Remove the stored secret; `false` if there was none.
    fn delete(&self) -> Result<bool>;
}

/// Abstracts config persistence (load/save).
pub trait ConfigStore {
    /// Load the config, returning defaults if the file is absent.
    fn load(&self) -> Result<TeectlConfig>;
    fn save(&self, config: &TeectlConfig) -> Result<()>;
    fn path(&self) -> &Path;
}

// ── Progress Reporting Port ───────────────────────────────────────────────────

/// Abstracts progress reporting so services can emit events without
/// depending on the Presentation layer. Sync trait — no async needed.
pub trait ProgressReporter {
    /// Emit an in-progress step message.
    fn step(&self, message: &str);
    /// Emit a success message.
    fn success(&self, message: &str);
    /// Emit a warning message.
    fn warn(&self, message: &str);
}
