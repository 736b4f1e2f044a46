//! Status watching against scripted chain and API views.
//!
//! Runs on paused tokio time, so poll intervals elapse instantly.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use teectl_cli::application::services::watcher::{
    WatchOptions, WatchOutcome, display_status, snapshot, watch_until,
};
use teectl_cli::domain::error::ConvergenceFailure;
use teectl_cli::domain::status::{ContractStatus, DisplayStatus, UPDATING_PERMISSIONS, WatchTarget};

use crate::fakes::{FakeApi, FakeChain, RecordingReporter};
use crate::helpers::{APP, DEV_ADDRESS, api_info};

const RUNNING_AT: &str = "app is now running at";

fn never() -> std::future::Pending<()> {
    std::future::pending()
}

#[tokio::test(start_paused = true)]
async fn fresh_deploy_converges_once_running_with_ip() {
    let chain =
        FakeChain::new(DEV_ADDRESS).with_statuses([ContractStatus::None, ContractStatus::Started]);
    let api = FakeApi::default().with_infos([
        None,
        Some(api_info("Deploying", None)),
        Some(api_info("Running", Some("10.0.0.5"))),
    ]);
    let reporter = RecordingReporter::default();

    let outcome = watch_until(
        &chain,
        &api,
        &reporter,
        APP,
        WatchTarget::Running,
        &WatchOptions::default(),
        never(),
    )
    .await
    .unwrap();

    let WatchOutcome::Converged(last) = outcome else {
        panic!("expected convergence");
    };
    assert_eq!(last.contract, ContractStatus::Started);
    assert_eq!(last.ip.as_deref(), Some("10.0.0.5"));
    assert_eq!(reporter.count_containing(RUNNING_AT), 1);
    assert_eq!(reporter.count_containing("10.0.0.5"), 2);
    assert_eq!(chain.status_reads(), 3);

    let lines = reporter.lines();
    let statuses: Vec<&String> = lines.iter().filter(|l| l.contains("status:")).collect();
    assert_eq!(statuses.len(), 3, "{lines:?}");
    assert!(statuses[0].ends_with("Pending"));
    assert!(statuses[1].ends_with("Starting"));
    assert!(statuses[2].ends_with("Running"));
}

#[tokio::test(start_paused = true)]
async fn failed_api_status_aborts_in_the_same_tick() {
    let chain = FakeChain::new(DEV_ADDRESS).with_statuses([ContractStatus::Started]);
    let api = FakeApi::default().with_infos([Some(api_info("Failed", None))]);
    let reporter = RecordingReporter::default();

    let err = watch_until(
        &chain,
        &api,
        &reporter,
        APP,
        WatchTarget::Running,
        &WatchOptions::default(),
        never(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ConvergenceFailure>(),
        Some(ConvergenceFailure::TerminalStatus { status, .. }) if status == "Failed"
    ));
    assert_eq!(chain.status_reads(), 1);
    assert_eq!(reporter.count_containing(RUNNING_AT), 0);
}

#[tokio::test(start_paused = true)]
async fn terminated_contract_is_a_convergence_failure() {
    let chain = FakeChain::new(DEV_ADDRESS)
        .with_statuses([ContractStatus::None, ContractStatus::Terminated]);
    let api = FakeApi::default();
    let reporter = RecordingReporter::default();

    let err = watch_until(
        &chain,
        &api,
        &reporter,
        APP,
        WatchTarget::Running,
        &WatchOptions::default(),
        never(),
    )
    .await
    .unwrap_err();

    assert!(matches!(
        err.downcast_ref::<ConvergenceFailure>(),
        Some(ConvergenceFailure::ContractTerminal { .. })
    ));
}

#[tokio::test(start_paused = true)]
async fn running_api_never_converges_without_started_contract() {
    let chain = FakeChain::new(DEV_ADDRESS).with_statuses([ContractStatus::Stopped]);
    let api = FakeApi::default().with_infos([Some(api_info("Running", Some("10.0.0.5")))]);
    let reporter = RecordingReporter::default();

    let outcome = watch_until(
        &chain,
        &api,
        &reporter,
        APP,
        WatchTarget::Running,
        &WatchOptions::default(),
        tokio::time::sleep(Duration::from_secs(60)),
    )
    .await
    .unwrap();

    let WatchOutcome::Cancelled(Some(last)) = outcome else {
        panic!("expected a cancelled watch with a last observation");
    };
    assert_eq!(last.contract, ContractStatus::Stopped);
    assert!(chain.status_reads() >= 10);
    assert_eq!(reporter.count_containing(RUNNING_AT), 0);
    assert_eq!(reporter.count_containing("Stopping"), 1);
}

#[tokio::test(start_paused = true)]
async fn already_running_app_needs_an_observed_change() {
    let chain = FakeChain::new(DEV_ADDRESS).with_statuses([ContractStatus::Started]);
    let api = FakeApi::default().with_infos([Some(api_info("Running", Some("10.0.0.5")))]);
    let reporter = RecordingReporter::default();

    let outcome = watch_until(
        &chain,
        &api,
        &reporter,
        APP,
        WatchTarget::Running,
        &WatchOptions::default(),
        tokio::time::sleep(Duration::from_secs(30)),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, WatchOutcome::Cancelled(Some(_))));
    assert_eq!(reporter.count_containing(RUNNING_AT), 0);
}

#[tokio::test(start_paused = true)]
async fn api_outage_keeps_the_last_off_chain_view() {
    let chain =
        FakeChain::new(DEV_ADDRESS).with_statuses([ContractStatus::None, ContractStatus::Started]);
    let api = FakeApi::default()
        .with_infos([Some(api_info("Deploying", None))])
        .then_error("502 bad gateway")
        .with_infos([Some(api_info("Running", Some("10.0.0.7")))]);
    let reporter = RecordingReporter::default();

    let outcome = watch_until(
        &chain,
        &api,
        &reporter,
        APP,
        WatchTarget::Running,
        &WatchOptions::default(),
        never(),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, WatchOutcome::Converged(_)));
    assert_eq!(reporter.count_containing(RUNNING_AT), 1);
    assert!(reporter.count_containing("Starting") >= 1);
}

#[tokio::test(start_paused = true)]
async fn upgrade_converges_when_api_moves_after_release() {
    let chain = FakeChain::new(DEV_ADDRESS)
        .with_statuses([ContractStatus::Started])
        .with_release_block(120);
    let api = FakeApi::default().with_infos([
        Some(api_info("Upgrading", Some("10.0.0.5"))),
        Some(api_info("Running", Some("10.0.0.5"))),
    ]);
    let reporter = RecordingReporter::default();

    let outcome = watch_until(
        &chain,
        &api,
        &reporter,
        APP,
        WatchTarget::UpgradeComplete { release_block: 120 },
        &WatchOptions::default(),
        never(),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, WatchOutcome::Converged(_)));
    assert_eq!(chain.status_reads(), 2);
    assert_eq!(reporter.count_containing(RUNNING_AT), 1);
}

#[tokio::test(start_paused = true)]
async fn quiet_upgrade_converges_after_settle_polls() {
    let chain = FakeChain::new(DEV_ADDRESS)
        .with_statuses([ContractStatus::Started])
        .with_release_block(120);
    let api = FakeApi::default().with_infos([Some(api_info("Running", Some("10.0.0.5")))]);
    let reporter = RecordingReporter::default();
    let opts = WatchOptions {
        settle_polls: 3,
        ..WatchOptions::default()
    };

    let outcome = watch_until(
        &chain,
        &api,
        &reporter,
        APP,
        WatchTarget::UpgradeComplete { release_block: 120 },
        &opts,
        never(),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, WatchOutcome::Converged(_)));
    assert_eq!(chain.status_reads(), 3);
}

#[tokio::test(start_paused = true)]
async fn upgrade_waits_for_the_release_block() {
    let chain = FakeChain::new(DEV_ADDRESS)
        .with_statuses([ContractStatus::Started])
        .with_release_block(99);
    let api = FakeApi::default().with_infos([
        Some(api_info("Upgrading", Some("10.0.0.5"))),
        Some(api_info("Running", Some("10.0.0.5"))),
    ]);
    let reporter = RecordingReporter::default();

    let outcome = watch_until(
        &chain,
        &api,
        &reporter,
        APP,
        WatchTarget::UpgradeComplete { release_block: 120 },
        &WatchOptions::default(),
        tokio::time::sleep(Duration::from_secs(60)),
    )
    .await
    .unwrap();

    assert!(matches!(outcome, WatchOutcome::Cancelled(_)));
}

#[tokio::test]
async fn snapshot_combines_both_views() {
    let chain = FakeChain::new(DEV_ADDRESS).with_statuses([ContractStatus::Started]);
    let api = FakeApi::default().with_infos([Some(api_info("Running", Some("10.0.0.5")))]);

    let snap = snapshot(&chain, &api, APP).await.unwrap();

    assert_eq!(snap.contract, ContractStatus::Started);
    assert!(snap.api.is_running());
    assert_eq!(snap.ip.as_deref(), Some("10.0.0.5"));
    assert_eq!(snap.instance_type.as_deref(), Some("g1-small"));
    assert!(snap.release_block.is_none());
}

#[tokio::test]
async fn snapshot_tolerates_unknown_app_in_api() {
    let chain = FakeChain::new(DEV_ADDRESS).with_statuses([ContractStatus::Stopped]);
    let api = FakeApi::default();

    let snap = snapshot(&chain, &api, APP).await.unwrap();
    let display = display_status(&snap, &WatchOptions::default());

    assert_eq!(display, DisplayStatus::Settled("Stopped".to_string()));
}

#[tokio::test]
async fn pending_permission_change_is_shown_while_rolling_out() {
    let chain = FakeChain::new(DEV_ADDRESS).with_statuses([ContractStatus::Started]);
    let api = FakeApi::default().with_infos([Some(api_info("Deploying", None))]);
    let opts = WatchOptions {
        permission_pending: true,
        ..WatchOptions::default()
    };

    let snap = snapshot(&chain, &api, APP).await.unwrap();

    assert_eq!(display_status(&snap, &opts).label(), UPDATING_PERMISSIONS);
}
