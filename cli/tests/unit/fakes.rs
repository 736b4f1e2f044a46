//! Recording fakes for the application ports.
//!
//! Each fake keeps a call log behind a `Mutex` so tests can assert on what
//! the service did, not just on what it returned.

#![allow(dead_code, clippy::expect_used)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::{Arc, Mutex};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use alloy::primitives::{Address, B256, Bytes, b256};
use anyhow::Result;
use teectl_cli::application::ports::{
    ChainClient, ChainConnector, CommandRunner, ConfigStore, CredentialStore, ImageBuilder,
    KmsEncryptor, ProgressReporter, StatusApi, StepOutcome, StreamedOutput,
};
use teectl_cli::domain::batch::{BatchReceipt, GasEstimate, PreparedBatch};
use teectl_cli::domain::config::TeectlConfig;
use teectl_cli::domain::credential::Credential;
use teectl_cli::domain::environment::EnvironmentConfig;
use teectl_cli::domain::error::{ChainStateError, NetworkError, ReleaseError};
use teectl_cli::domain::status::ContractStatus;
use teectl_common::{ApiAppInfo, Sku};

use crate::helpers::{APP, DIGEST, exit_status};

pub const TX_HASH: B256 =
    b256!("0x2222222222222222222222222222222222222222222222222222222222222222");

pub fn unexpected<T>() -> Result<T> {
    anyhow::bail!("not expected in this test")
}

// ── Reporter ──────────────────────────────────────────────────────────────────

mockall::mock! {
    pub Reporter {}
    impl ProgressReporter for Reporter {
        fn step(&self, message: &str);
        fn success(&self, message: &str);
        fn warn(&self, message: &str);
    }
}

/// Reporter that keeps every line, prefixed by its kind.
#[derive(Default)]
pub struct RecordingReporter {
    lines: Mutex<Vec<String>>,
}

impl RecordingReporter {
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().expect("lock").clone()
    }

    pub fn count_containing(&self, needle: &str) -> usize {
        self.lines().iter().filter(|l| l.contains(needle)).count()
    }

    fn push(&self, kind: &str, message: &str) {
        self.lines
            .lock()
            .expect("lock")
            .push(format!("{kind}: {message}"));
    }
}

impl ProgressReporter for RecordingReporter {
    fn step(&self, message: &str) {
        self.push("step", message);
    }
    fn success(&self, message: &str) {
        self.push("success", message);
    }
    fn warn(&self, message: &str) {
        self.push("warn", message);
    }
}

// ── Command runner ────────────────────────────────────────────────────────────

/// Runner that answers every invocation with a queued result and logs argv.
#[derive(Default)]
pub struct ScriptedRunner {
    outputs: Mutex<VecDeque<Output>>,
    streamed: Mutex<VecDeque<StreamedOutput>>,
    statuses: Mutex<VecDeque<ExitStatus>>,
    calls: Arc<Mutex<Vec<String>>>,
    timeouts: Arc<Mutex<Vec<Duration>>>,
}

impl ScriptedRunner {
    pub fn with_output(self, code: i32, stdout: &str, stderr: &str) -> Self {
        self.outputs.lock().expect("lock").push_back(Output {
            status: exit_status(code),
            stdout: stdout.as_bytes().to_vec(),
            stderr: stderr.as_bytes().to_vec(),
        });
        self
    }

    pub fn with_streamed(self, code: i32, stderr_tail: &str) -> Self {
        self.streamed.lock().expect("lock").push_back(StreamedOutput {
            status: exit_status(code),
            stderr_tail: stderr_tail.to_string(),
        });
        self
    }

    pub fn with_status(self, code: i32) -> Self {
        self.statuses
            .lock()
            .expect("lock")
            .push_back(exit_status(code));
        self
    }

    /// Shared handle to the argv log; stays readable after the runner moves.
    pub fn call_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.calls)
    }

    /// Timeouts passed to streamed and interactive runs, in call order.
    pub fn timeout_log(&self) -> Arc<Mutex<Vec<Duration>>> {
        Arc::clone(&self.timeouts)
    }

    fn record(&self, program: &str, args: &[&str]) {
        self.calls
            .lock()
            .expect("lock")
            .push(format!("{program} {}", args.join(" ")));
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<Output> {
        self.record(program, args);
        match self.outputs.lock().expect("lock").pop_front() {
            Some(out) => Ok(out),
            None => unexpected(),
        }
    }
    async fn run_with_timeout(&self, program: &str, args: &[&str], _: Duration) -> Result<Output> {
        self.run(program, args).await
    }
    async fn run_streaming(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<StreamedOutput> {
        self.record(program, args);
        self.timeouts.lock().expect("lock").push(timeout);
        match self.streamed.lock().expect("lock").pop_front() {
            Some(out) => Ok(out),
            None => unexpected(),
        }
    }
    async fn run_status(
        &self,
        program: &str,
        args: &[&str],
        timeout: Duration,
    ) -> Result<ExitStatus> {
        self.record(program, args);
        self.timeouts.lock().expect("lock").push(timeout);
        match self.statuses.lock().expect("lock").pop_front() {
            Some(status) => Ok(status),
            None => unexpected(),
        }
    }
}

// ── Images ────────────────────────────────────────────────────────────────────

/// Image builder with queued push outcomes.
pub struct RecordingImages {
    pushes: Mutex<VecDeque<StepOutcome>>,
    remediation: StepOutcome,
    digests: Vec<String>,
    build_exit: Option<i32>,
    calls: Mutex<Vec<String>>,
}

impl Default for RecordingImages {
    fn default() -> Self {
        Self {
            pushes: Mutex::new(VecDeque::new()),
            remediation: StepOutcome::Succeeded,
            digests: vec![format!("docker.io/acme/app@sha256:{}", alloy::hex::encode(DIGEST))],
            build_exit: None,
            calls: Mutex::new(Vec::new()),
        }
    }
}

impl RecordingImages {
    pub fn with_pushes(self, outcomes: impl IntoIterator<Item = StepOutcome>) -> Self {
        self.pushes.lock().expect("lock").extend(outcomes);
        self
    }

    pub fn with_remediation(mut self, outcome: StepOutcome) -> Self {
        self.remediation = outcome;
        self
    }

    pub fn with_digests(mut self, digests: &[&str]) -> Self {
        self.digests = digests.iter().map(|d| (*d).to_string()).collect();
        self
    }

    pub fn with_build_failure(mut self, code: i32) -> Self {
        self.build_exit = Some(code);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    pub fn count(&self, verb: &str) -> usize {
        self.calls()
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(verb))
            .count()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("lock").push(call);
    }
}

impl ImageBuilder for RecordingImages {
    async fn build(&self, dockerfile: &Path, context: &Path, tag: &str) -> Result<()> {
        self.record(format!(
            "build {} {} {tag}",
            dockerfile.display(),
            context.display()
        ));
        match self.build_exit {
            Some(code) => Err(ReleaseError::BuildFailed { code }.into()),
            None => Ok(()),
        }
    }
    async fn push(&self, image: &str) -> Result<StepOutcome> {
        self.record(format!("push {image}"));
        Ok(self
            .pushes
            .lock()
            .expect("lock")
            .pop_front()
            .unwrap_or(StepOutcome::Succeeded))
    }
    async fn remediate_push_access(&self, registry: &str) -> Result<StepOutcome> {
        self.record(format!("login {registry}"));
        Ok(self.remediation.clone())
    }
    async fn pull(&self, image: &str) -> Result<()> {
        self.record(format!("pull {image}"));
        Ok(())
    }
    async fn repo_digests(&self, image: &str) -> Result<Vec<String>> {
        self.record(format!("inspect {image}"));
        Ok(self.digests.clone())
    }
}

// ── KMS ───────────────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct FakeKms {
    pub fail: bool,
    plaintexts: Mutex<Vec<(Address, Vec<u8>)>>,
}

impl FakeKms {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn plaintexts(&self) -> Vec<(Address, Vec<u8>)> {
        self.plaintexts.lock().expect("lock").clone()
    }
}

impl KmsEncryptor for FakeKms {
    async fn encrypt(&self, app: Address, plaintext: &[u8]) -> Result<Bytes> {
        self.plaintexts
            .lock()
            .expect("lock")
            .push((app, plaintext.to_vec()));
        if self.fail {
            anyhow::bail!("kms offline");
        }
        Ok(Bytes::from(format!("sealed:{}", plaintext.len()).into_bytes()))
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// Connector handing out a [`FakeChain`] that reports `chain_id`.
pub struct FakeConnector {
    pub chain_id: u64,
    pub connects: AtomicUsize,
}

impl FakeConnector {
    pub fn new(chain_id: u64) -> Self {
        Self {
            chain_id,
            connects: AtomicUsize::new(0),
        }
    }
}

impl ChainConnector for FakeConnector {
    type Client = FakeChain;

    async fn connect(
        &self,
        _rpc_url: &str,
        credential: &Credential,
        _environment: &EnvironmentConfig,
    ) -> Result<FakeChain> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        Ok(FakeChain::new(credential.address()).with_chain_id(self.chain_id))
    }
}

/// Scripted chain. Queued statuses are consumed one per read; the last one
/// repeats once the queue is down to a single entry.
pub struct FakeChain {
    sender: Address,
    chain_id: u64,
    statuses: Mutex<VecDeque<ContractStatus>>,
    release_block: u64,
    app_id: Address,
    logs_public: bool,
    revert: Option<String>,
    node_down: bool,
    receipt_block: Option<u64>,
    gas: GasEstimate,
    pub status_reads: AtomicUsize,
    estimates: Mutex<Vec<PreparedBatch>>,
    executed: Mutex<Vec<(PreparedBatch, Option<GasEstimate>)>>,
}

impl FakeChain {
    pub fn new(sender: Address) -> Self {
        Self {
            sender,
            chain_id: 11_155_111,
            statuses: Mutex::new(VecDeque::from([ContractStatus::Started])),
            release_block: 0,
            app_id: APP,
            logs_public: false,
            revert: None,
            node_down: false,
            receipt_block: Some(100),
            gas: GasEstimate {
                gas_limit: 210_000,
                max_fee_per_gas: 2_000_000_000,
                max_priority_fee_per_gas: 1_000_000_000,
            },
            status_reads: AtomicUsize::new(0),
            estimates: Mutex::new(Vec::new()),
            executed: Mutex::new(Vec::new()),
        }
    }

    pub fn with_chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = chain_id;
        self
    }

    pub fn with_statuses(self, statuses: impl IntoIterator<Item = ContractStatus>) -> Self {
        *self.statuses.lock().expect("lock") = statuses.into_iter().collect();
        self
    }

    pub fn with_release_block(mut self, block: u64) -> Self {
        self.release_block = block;
        self
    }

    pub fn with_receipt_block(mut self, block: Option<u64>) -> Self {
        self.receipt_block = block;
        self
    }

    pub fn with_logs_public(mut self, public: bool) -> Self {
        self.logs_public = public;
        self
    }

    pub fn reverting(mut self, reason: &str) -> Self {
        self.revert = Some(reason.to_string());
        self
    }

    /// Gas estimation fails as if the node could not be reached.
    pub fn unreachable(mut self) -> Self {
        self.node_down = true;
        self
    }

    pub fn status_reads(&self) -> usize {
        self.status_reads.load(Ordering::SeqCst)
    }

    pub fn estimates(&self) -> Vec<PreparedBatch> {
        self.estimates.lock().expect("lock").clone()
    }

    pub fn executed(&self) -> Vec<(PreparedBatch, Option<GasEstimate>)> {
        self.executed.lock().expect("lock").clone()
    }
}

impl ChainClient for FakeChain {
    fn sender(&self) -> Address {
        self.sender
    }
    async fn chain_id(&self) -> Result<u64> {
        Ok(self.chain_id)
    }
    async fn app_status(&self, _app: Address) -> Result<ContractStatus> {
        self.status_reads.fetch_add(1, Ordering::SeqCst);
        let mut queue = self.statuses.lock().expect("lock");
        let status = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().copied()
        };
        Ok(status.unwrap_or(ContractStatus::None))
    }
    async fn latest_release_block(&self, _app: Address) -> Result<u64> {
        Ok(self.release_block)
    }
    async fn calculate_app_id(&self, _deployer: Address, _salt: B256) -> Result<Address> {
        Ok(self.app_id)
    }
    async fn logs_public(&self, _app: Address) -> Result<bool> {
        Ok(self.logs_public)
    }
    async fn estimate(&self, batch: &PreparedBatch) -> Result<GasEstimate> {
        self.estimates.lock().expect("lock").push(batch.clone());
        if self.node_down {
            return Err(NetworkError::RpcUnreachable {
                url: "http://127.0.0.1:8545".to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        match &self.revert {
            Some(reason) => Err(ChainStateError::SimulationReverted {
                reason: reason.clone(),
            }
            .into()),
            None => Ok(self.gas),
        }
    }
    async fn execute(&self, batch: &PreparedBatch, gas: Option<GasEstimate>) -> Result<BatchReceipt> {
        self.executed
            .lock()
            .expect("lock")
            .push((batch.clone(), gas));
        Ok(BatchReceipt {
            tx_hash: TX_HASH,
            block_number: self.receipt_block,
        })
    }
}

// ── Status API ────────────────────────────────────────────────────────────────

/// Off-chain API with queued answers; the last one repeats.
#[derive(Default)]
pub struct FakeApi {
    infos: Mutex<VecDeque<Result<Option<ApiAppInfo>, String>>>,
    skus: Option<Vec<Sku>>,
}

impl FakeApi {
    pub fn with_infos(self, infos: impl IntoIterator<Item = Option<ApiAppInfo>>) -> Self {
        self.infos
            .lock()
            .expect("lock")
            .extend(infos.into_iter().map(Ok));
        self
    }

    pub fn then_error(self, message: &str) -> Self {
        self.infos
            .lock()
            .expect("lock")
            .push_back(Err(message.to_string()));
        self
    }

    pub fn with_skus(mut self, names: &[&str]) -> Self {
        self.skus = Some(
            names
                .iter()
                .map(|n| Sku {
                    sku: (*n).to_string(),
                    description: None,
                    vcpus: Some(2),
                    memory_gb: Some(4),
                })
                .collect(),
        );
        self
    }
}

impl StatusApi for FakeApi {
    async fn app_info(&self, _app: Address) -> Result<Option<ApiAppInfo>> {
        let mut queue = self.infos.lock().expect("lock");
        let next = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        match next {
            Some(Ok(info)) => Ok(info),
            Some(Err(message)) => Err(anyhow::anyhow!(message)),
            None => Ok(None),
        }
    }
    async fn skus(&self) -> Result<Vec<Sku>> {
        match &self.skus {
            Some(skus) => Ok(skus.clone()),
            None => anyhow::bail!("catalog unreachable"),
        }
    }
}

// ── Local stores ──────────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryCredentialStore {
    secret: Mutex<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn holding(secret: &str) -> Self {
        Self {
            secret: Mutex::new(Some(secret.to_string())),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Result<Option<String>> {
        Ok(self.secret.lock().expect("lock").clone())
    }
    fn put(&self, secret: &str) -> Result<()> {
        *self.secret.lock().expect("lock") = Some(secret.to_string());
        Ok(())
    }
    fn delete(&self) -> Result<bool> {
        Ok(self.secret.lock().expect("lock").take().is_some())
    }
}

pub struct MemoryConfigStore {
    config: Mutex<TeectlConfig>,
    path: PathBuf,
    pub saves: AtomicUsize,
}

impl Default for MemoryConfigStore {
    fn default() -> Self {
        Self {
            config: Mutex::new(TeectlConfig::default()),
            path: PathBuf::from("/tmp/teectl-test/config.yaml"),
            saves: AtomicUsize::new(0),
        }
    }
}

impl MemoryConfigStore {
    pub fn current(&self) -> TeectlConfig {
        self.config.lock().expect("lock").clone()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn load(&self) -> Result<TeectlConfig> {
        Ok(self.current())
    }
    fn save(&self, config: &TeectlConfig) -> Result<()> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        *self.config.lock().expect("lock") = config.clone();
        Ok(())
    }
    fn path(&self) -> &Path {
        &self.path
    }
}
