//! App status model: contract codes, off-chain labels, reconciliation.
//!
//! The contract and the off-chain API are two independent views of the same
//! app. They disagree while a transition is in flight; [`reconcile`] turns a
//! pair of observations into one display label and [`WatchProgress`]
//! accumulates observations across polls to decide convergence.
//!
//! Pure types only — no I/O, no async.

use serde::{Deserialize, Serialize};

use crate::domain::error::{ChainStateError, ConvergenceFailure};

// ── Contract status ──────────────────────────────────────────────────────────

/// Lifecycle status stored by the application controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    None,
    Started,
    Stopped,
    Terminated,
    Suspended,
}

impl ContractStatus {
    /// Decode the `uint8` returned by `getAppStatus`.
    ///
    /// # Errors
    ///
    /// Returns [`ChainStateError::UnknownStatusCode`] for codes above 4.
    pub fn from_code(code: u8) -> Result<Self, ChainStateError> {
        match code {
            0 => Ok(Self::None),
            1 => Ok(Self::Started),
            2 => Ok(Self::Stopped),
            3 => Ok(Self::Terminated),
            4 => Ok(Self::Suspended),
            other => Err(ChainStateError::UnknownStatusCode(other)),
        }
    }

    /// User-facing label for the on-chain status.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::None => "Pending",
            Self::Started => "Running",
            Self::Stopped => "Stopped",
            Self::Terminated => "Terminated",
            Self::Suspended => "Suspended",
        }
    }

    /// Off-chain label that means the two sources agree.
    #[must_use]
    pub fn api_equivalent(self) -> Option<&'static str> {
        match self {
            Self::Started => Some(ApiStatus::RUNNING),
            Self::Stopped => Some(ApiStatus::STOPPED),
            Self::Terminated => Some(ApiStatus::TERMINATED),
            Self::None | Self::Suspended => None,
        }
    }

    /// The app can no longer reach a running state without operator action.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Terminated | Self::Suspended)
    }
}

impl std::fmt::Display for ContractStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ── Off-chain status ─────────────────────────────────────────────────────────

/// Opaque status string reported by the off-chain API.
///
/// Only compared through the associated constants below.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApiStatus(String);

impl ApiStatus {
    pub const RUNNING: &'static str = "Running";
    pub const FAILED: &'static str = "Failed";
    pub const DEPLOYING: &'static str = "Deploying";
    pub const UPGRADING: &'static str = "Upgrading";
    pub const RESUMING: &'static str = "Resuming";
    pub const STOPPING: &'static str = "Stopping";
    pub const STOPPED: &'static str = "Stopped";
    pub const TERMINATING: &'static str = "Terminating";
    pub const TERMINATED: &'static str = "Terminated";

    /// Labels that mean the instance is mid-rollout.
    const IN_FLIGHT: &'static [&'static str] = &[Self::DEPLOYING, Self::UPGRADING, Self::RESUMING];

    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn is(&self, known: &str) -> bool {
        self.0 == known
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn is_failed(&self) -> bool {
        self.is(Self::FAILED)
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.is(Self::RUNNING)
    }

    #[must_use]
    pub fn is_in_flight(&self) -> bool {
        Self::IN_FLIGHT.contains(&self.as_str())
    }
}

impl From<Option<String>> for ApiStatus {
    fn from(value: Option<String>) -> Self {
        Self(value.unwrap_or_default())
    }
}

impl std::fmt::Display for ApiStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Snapshot ─────────────────────────────────────────────────────────────────

/// One observation of both status sources.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppStatusSnapshot {
    pub contract: ContractStatus,
    pub api: ApiStatus,
    pub ip: Option<String>,
    pub instance_type: Option<String>,
    /// Latest release block; only read while watching an upgrade.
    pub release_block: Option<u64>,
}

// ── Transition policy ────────────────────────────────────────────────────────

/// One row of the divergence table: when the contract reports `contract` and
/// the API reports any of `api`, display `label`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRule {
    pub contract: ContractStatus,
    #[serde(default)]
    pub api: Vec<String>,
    pub label: String,
}

impl TransitionRule {
    fn new(contract: ContractStatus, api: &[&str], label: &str) -> Self {
        Self {
            contract,
            api: api.iter().map(|s| (*s).to_string()).collect(),
            label: label.to_string(),
        }
    }
}

/// Lookup table for known in-flight divergences between the two sources.
///
/// A heuristic, so it can be replaced from `watch.transitions` in the config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPolicy {
    rules: Vec<TransitionRule>,
}

impl Default for TransitionPolicy {
    fn default() -> Self {
        Self {
            rules: vec![
                TransitionRule::new(
                    ContractStatus::Started,
                    &["", ApiStatus::STOPPED, ApiStatus::DEPLOYING, ApiStatus::RESUMING],
                    "Starting",
                ),
                TransitionRule::new(ContractStatus::Started, &[ApiStatus::UPGRADING], "Upgrading"),
                TransitionRule::new(
                    ContractStatus::Stopped,
                    &[ApiStatus::RUNNING, ApiStatus::STOPPING],
                    "Stopping",
                ),
                TransitionRule::new(
                    ContractStatus::Terminated,
                    &[ApiStatus::RUNNING, ApiStatus::STOPPED, ApiStatus::TERMINATING],
                    "Terminating",
                ),
            ],
        }
    }
}

impl TransitionPolicy {
    #[must_use]
    pub fn from_rules(rules: Vec<TransitionRule>) -> Self {
        Self { rules }
    }

    /// First matching rule's label, if any.
    #[must_use]
    pub fn lookup(&self, contract: ContractStatus, api: &ApiStatus) -> Option<&str> {
        self.rules
            .iter()
            .find(|r| r.contract == contract && r.api.iter().any(|a| api.is(a)))
            .map(|r| r.label.as_str())
    }
}

// ── Reconciliation ───────────────────────────────────────────────────────────

pub const UPDATING_PERMISSIONS: &str = "Updating permissions";

/// Result of reconciling one snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayStatus {
    /// Both sources agree.
    Settled(String),
    /// A known in-flight divergence.
    Transitioning(String),
    /// Sources disagree in an unknown way; the off-chain value is shown.
    OffChain(String),
    /// The off-chain API reported its terminal failure string.
    Failed,
}

impl DisplayStatus {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            Self::Settled(s) | Self::Transitioning(s) | Self::OffChain(s) => s,
            Self::Failed => ApiStatus::FAILED,
        }
    }
}

/// Combine the two status sources into one display status.
///
/// `permission_pending` is true when the submitted batch also changed the
/// log-visibility permission, which restarts the instance.
#[must_use]
pub fn reconcile(
    contract: ContractStatus,
    api: &ApiStatus,
    policy: &TransitionPolicy,
    permission_pending: bool,
) -> DisplayStatus {
    if api.is_failed() {
        return DisplayStatus::Failed;
    }
    if let Some(equivalent) = contract.api_equivalent()
        && api.is(equivalent)
    {
        return DisplayStatus::Settled(contract.label().to_string());
    }
    if permission_pending && contract == ContractStatus::Started && api.is_in_flight() {
        return DisplayStatus::Transitioning(UPDATING_PERMISSIONS.to_string());
    }
    if let Some(label) = policy.lookup(contract, api) {
        return DisplayStatus::Transitioning(label.to_string());
    }
    if api.is_empty() {
        return DisplayStatus::Settled(contract.label().to_string());
    }
    DisplayStatus::OffChain(api.as_str().to_string())
}

// ── Watch progress ───────────────────────────────────────────────────────────

/// What the watcher waits for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchTarget {
    /// A fresh deploy (or start) reaching a running instance with an IP.
    Running,
    /// An upgrade whose release landed at `release_block`.
    UpgradeComplete { release_block: u64 },
}

/// One-line notice for a meaningful change between polls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransitionNotice {
    Status(String),
    IpAssigned(String),
    InstanceType(String),
}

impl std::fmt::Display for TransitionNotice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Status(s) => write!(f, "status: {s}"),
            Self::IpAssigned(ip) => write!(f, "ip assigned: {ip}"),
            Self::InstanceType(t) => write!(f, "instance type: {t}"),
        }
    }
}

/// Accumulates observations across polls.
#[derive(Debug, Clone)]
pub struct WatchProgress {
    target: WatchTarget,
    settle_polls: u32,
    initial_contract: Option<ContractStatus>,
    last: Option<AppStatusSnapshot>,
    last_label: Option<String>,
    change_observed: bool,
    api_change_observed: bool,
    polls_since_release: u32,
}

impl WatchProgress {
    #[must_use]
    pub fn new(target: WatchTarget, settle_polls: u32) -> Self {
        Self {
            target,
            settle_polls,
            initial_contract: None,
            last: None,
            last_label: None,
            change_observed: false,
            api_change_observed: false,
            polls_since_release: 0,
        }
    }

    /// Record one poll and return the notices it produced.
    ///
    /// # Errors
    ///
    /// Returns a [`ConvergenceFailure`] when the snapshot is terminal: the
    /// off-chain failure string, or a terminated/suspended contract.
    pub fn observe(
        &mut self,
        app_id: &str,
        snapshot: AppStatusSnapshot,
        display: &DisplayStatus,
    ) -> Result<Vec<TransitionNotice>, ConvergenceFailure> {
        if matches!(display, DisplayStatus::Failed) {
            return Err(ConvergenceFailure::TerminalStatus {
                app_id: app_id.to_string(),
                status: snapshot.api.to_string(),
            });
        }
        if snapshot.contract.is_terminal() {
            return Err(ConvergenceFailure::ContractTerminal {
                app_id: app_id.to_string(),
                status: snapshot.contract.label().to_string(),
            });
        }

        let mut notices = Vec::new();
        let label = display.label();
        if self.last_label.as_deref() != Some(label) {
            notices.push(TransitionNotice::Status(label.to_string()));
            self.last_label = Some(label.to_string());
        }

        match &self.last {
            None => {
                self.initial_contract = Some(snapshot.contract);
                if let Some(ip) = &snapshot.ip {
                    notices.push(TransitionNotice::IpAssigned(ip.clone()));
                }
                if let Some(t) = &snapshot.instance_type {
                    notices.push(TransitionNotice::InstanceType(t.clone()));
                }
            }
            Some(prev) => {
                if prev.api != snapshot.api {
                    self.api_change_observed = true;
                }
                if prev.contract != snapshot.contract
                    || prev.api != snapshot.api
                    || prev.ip != snapshot.ip
                {
                    self.change_observed = true;
                }
                if let Some(ip) = &snapshot.ip
                    && prev.ip.as_ref() != Some(ip)
                {
                    notices.push(TransitionNotice::IpAssigned(ip.clone()));
                }
                if let Some(t) = &snapshot.instance_type
                    && prev.instance_type.as_ref() != Some(t)
                {
                    notices.push(TransitionNotice::InstanceType(t.clone()));
                }
            }
        }

        if let WatchTarget::UpgradeComplete { release_block } = self.target
            && snapshot.release_block.is_some_and(|b| b >= release_block)
        {
            self.polls_since_release = self.polls_since_release.saturating_add(1);
        }

        self.last = Some(snapshot);
        Ok(notices)
    }

    /// Whether the last observation satisfies the target's exit condition.
    #[must_use]
    pub fn is_converged(&self) -> bool {
        let Some(last) = &self.last else {
            return false;
        };
        if last.contract != ContractStatus::Started || last.ip.is_none() {
            return false;
        }
        match self.target {
            WatchTarget::Running => {
                self.change_observed || self.initial_contract != Some(ContractStatus::Started)
            }
            WatchTarget::UpgradeComplete { release_block } => {
                last.release_block.is_some_and(|b| b >= release_block)
                    && last.api.is_running()
                    && (self.api_change_observed || self.polls_since_release >= self.settle_polls)
            }
        }
    }

    #[must_use]
    pub fn last(&self) -> Option<&AppStatusSnapshot> {
        self.last.as_ref()
    }

    #[must_use]
    pub fn into_last(self) -> Option<AppStatusSnapshot> {
        self.last
    }
}

// ── Unit tests ───────────────────────────────────────────────────────────────
