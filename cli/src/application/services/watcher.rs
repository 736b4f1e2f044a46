//! Application service — dual-source status watcher.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Each tick reads the contract (fatal on error), then the off-chain API
//! (best-effort), reconciles the pair and feeds [`WatchProgress`].

use std::future::Future;
use std::time::Duration;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use teectl_common::ApiAppInfo;
use tokio::time::MissedTickBehavior;

use crate::application::ports::{ChainClient, ProgressReporter, StatusApi};
use crate::domain::status::{
    ApiStatus, AppStatusSnapshot, ContractStatus, DisplayStatus, TransitionPolicy, WatchProgress,
    WatchTarget, reconcile,
};

/// Polls after the upgrade's release block is visible before converging
/// without an observed off-chain change.
pub const DEFAULT_SETTLE_POLLS: u32 = 6;

/// Default poll interval.
pub const DEFAULT_INTERVAL: Duration = Duration::from_secs(5);

/// Watcher settings.
#[derive(Debug, Clone)]
pub struct WatchOptions {
    pub interval: Duration,
    pub policy: TransitionPolicy,
    /// The submitted batch also changed the log permission.
    pub permission_pending: bool,
    pub settle_polls: u32,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            interval: DEFAULT_INTERVAL,
            policy: TransitionPolicy::default(),
            permission_pending: false,
            settle_polls: DEFAULT_SETTLE_POLLS,
        }
    }
}

/// How a watch ended without error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchOutcome {
    Converged(AppStatusSnapshot),
    /// Shutdown was requested; carries the last observation, if any.
    Cancelled(Option<AppStatusSnapshot>),
}

/// Take one snapshot without looping.
///
/// An off-chain read failure leaves the API fields empty.
///
/// # Errors
///
/// Returns an error if the contract cannot be read.
pub async fn snapshot(
    client: &impl ChainClient,
    api: &impl StatusApi,
    app: Address,
) -> Result<AppStatusSnapshot> {
    let mut last_api = None;
    poll_once(client, api, app, WatchTarget::Running, &mut last_api).await
}

/// Reconcile one snapshot for display.
#[must_use]
pub fn display_status(snapshot: &AppStatusSnapshot, opts: &WatchOptions) -> DisplayStatus {
    reconcile(
        snapshot.contract,
        &snapshot.api,
        &opts.policy,
        opts.permission_pending,
    )
}

/// Poll until `target` is reached, a terminal state is seen, or `shutdown`
/// resolves.
///
/// The first poll happens immediately. Notices go to `reporter` only when
/// something changed; convergence emits exactly one success line.
///
/// # Errors
///
/// Returns a `ConvergenceFailure` for terminal states and propagates
/// contract read errors.
pub async fn watch_until(
    client: &impl ChainClient,
    api: &impl StatusApi,
    reporter: &impl ProgressReporter,
    app: Address,
    target: WatchTarget,
    opts: &WatchOptions,
    shutdown: impl Future<Output = ()>,
) -> Result<WatchOutcome> {
    let app_label = app.to_string();
    let mut progress = WatchProgress::new(target, opts.settle_polls);
    let mut last_api: Option<ApiAppInfo> = None;
    let mut ticker = tokio::time::interval(opts.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    tokio::pin!(shutdown);

    loop {
        let tick = async {
            ticker.tick().await;
            poll_once(client, api, app, target, &mut last_api).await
        };
        let snap = tokio::select! {
            () = &mut shutdown => {
                tracing::debug!(app = %app_label, "watch cancelled");
                return Ok(WatchOutcome::Cancelled(progress.into_last()));
            }
            snap = tick => snap?,
        };

        let display = display_status(&snap, opts);
        for notice in progress.observe(&app_label, snap, &display)? {
            reporter.step(&notice.to_string());
        }

        if progress.is_converged() {
            let last = progress
                .into_last()
                .context("watch converged without an observation")?;
            let ip = last.ip.as_deref().unwrap_or("unknown");
            reporter.success(&format!("app is now running at {ip}"));
            return Ok(WatchOutcome::Converged(last));
        }
    }
}

async fn poll_once(
    client: &impl ChainClient,
    api: &impl StatusApi,
    app: Address,
    target: WatchTarget,
    last_api: &mut Option<ApiAppInfo>,
) -> Result<AppStatusSnapshot> {
    let contract: ContractStatus = client
        .app_status(app)
        .await
        .with_context(|| format!("reading status of {app}"))?;
    let release_block = match target {
        WatchTarget::UpgradeComplete { .. } => Some(
            client
                .latest_release_block(app)
                .await
                .with_context(|| format!("reading latest release of {app}"))?,
        ),
        WatchTarget::Running => None,
    };

    match api.app_info(app).await {
        Ok(Some(info)) => *last_api = Some(info),
        Ok(None) => {}
        Err(e) => tracing::debug!(error = %format!("{e:#}"), "status API read failed"),
    }

    let info = last_api.clone().unwrap_or_default();
    Ok(AppStatusSnapshot {
        contract,
        api: ApiStatus::from(info.status),
        ip: info.ip.filter(|ip| !ip.is_empty()),
        instance_type: info.instance_type,
        release_block,
    })
}
