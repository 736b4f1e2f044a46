//! Application service — deploy, upgrade and lifecycle pipelines.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.
//! Stages run in order and every failure short-circuits:
//! release preparation → batch build → estimate/confirm/submit → watch.

use std::future::Future;

use alloy::primitives::{Address, B256};
use anyhow::{Context, Result};

use crate::application::ports::{
    ChainClient, ImageBuilder, KmsEncryptor, ProgressReporter, StatusApi,
};
use crate::application::services::batch::{SubmitOutcome, submit};
use crate::application::services::permission::{
    current_log_visibility_is_public, permission_change_needed,
};
use crate::application::services::preflight::PipelineContext;
use crate::application::services::release::{PrepareRequest, prepare};
use crate::application::services::watcher::{WatchOptions, WatchOutcome, watch_until};
use crate::domain::batch::{
    BatchOperation, BatchReceipt, FeeOverride, GasEstimate, LifecycleAction, PreparedBatch,
    build_batch, build_lifecycle_batch,
};
use crate::domain::release::{LogVisibility, ReleaseSource};
use crate::domain::status::WatchTarget;

/// Collaborators used by the release pipelines.
pub struct PipelinePorts<'a, I, K, A, R> {
    pub images: &'a I,
    pub kms: &'a K,
    pub api: &'a A,
    pub reporter: &'a R,
}

/// What to release and how.
pub struct ReleaseRequest<'a> {
    pub source: &'a ReleaseSource,
    pub env_contents: Option<&'a str>,
    pub instance_type: &'a str,
    pub log_visibility: LogVisibility,
    pub fees: FeeOverride,
    /// `None` returns right after the receipt.
    pub watch: Option<WatchOptions>,
}

/// Result of a deploy or upgrade run.
#[derive(Debug)]
pub enum PipelineOutcome {
    /// The caller declined the cost; nothing was signed.
    Declined { app_id: Address },
    Submitted {
        app_id: Address,
        image_ref: String,
        receipt: BatchReceipt,
        watch: Option<WatchOutcome>,
    },
}

/// Fresh 32-byte salt for `createApp`, drawn from the OS RNG.
#[must_use]
pub fn generate_salt() -> B256 {
    B256::random()
}

fn now_unix() -> u64 {
    u64::try_from(chrono::Utc::now().timestamp()).unwrap_or(0)
}

/// Deploy a new app.
///
/// # Errors
///
/// Propagates the first failing stage's error.
pub async fn deploy<C, I, K, A, R>(
    ctx: &PipelineContext<C>,
    ports: PipelinePorts<'_, I, K, A, R>,
    req: ReleaseRequest<'_>,
    confirm: impl FnOnce(&PreparedBatch, &GasEstimate) -> Result<bool>,
    shutdown: impl Future<Output = ()>,
) -> Result<PipelineOutcome>
where
    C: ChainClient,
    I: ImageBuilder,
    K: KmsEncryptor,
    A: StatusApi,
    R: ProgressReporter,
{
    let sender = ctx.client.sender();
    let salt = generate_salt();
    let app_id = ctx
        .client
        .calculate_app_id(sender, salt)
        .await
        .context("deriving app id")?;
    ports.reporter.step(&format!("app id: {app_id}"));

    let prepared = prepare(
        ports.images,
        ports.kms,
        ports.reporter,
        PrepareRequest {
            source: req.source,
            env_contents: req.env_contents,
            instance_type: req.instance_type,
            log_visibility: req.log_visibility,
            app_id,
            now_unix: now_unix(),
        },
    )
    .await?;

    // A new app starts with private logs.
    let desired_public = req.log_visibility.is_public();
    let change_needed = permission_change_needed(false, desired_public);
    let batch = build_batch(
        BatchOperation::Deploy { salt },
        app_id,
        prepared.descriptor,
        desired_public,
        change_needed,
        &prepared.image_ref,
        &ctx.environment,
        sender,
    );

    let receipt = match submit(&ctx.client, ports.reporter, &batch, req.fees, confirm).await? {
        SubmitOutcome::Submitted(receipt) => receipt,
        SubmitOutcome::Declined => return Ok(PipelineOutcome::Declined { app_id }),
    };

    let watch = match req.watch {
        Some(mut opts) => {
            opts.permission_pending = change_needed;
            ports.reporter.step("waiting for the app to start...");
            Some(
                watch_until(
                    &ctx.client,
                    ports.api,
                    ports.reporter,
                    app_id,
                    WatchTarget::Running,
                    &opts,
                    shutdown,
                )
                .await?,
            )
        }
        None => None,
    };

    Ok(PipelineOutcome::Submitted {
        app_id,
        image_ref: prepared.image_ref,
        receipt,
        watch,
    })
}

/// Roll out a new release of an existing app.
///
/// # Errors
///
/// Propagates the first failing stage's error.
pub async fn upgrade<C, I, K, A, R>(
    ctx: &PipelineContext<C>,
    ports: PipelinePorts<'_, I, K, A, R>,
    app_id: Address,
    req: ReleaseRequest<'_>,
    confirm: impl FnOnce(&PreparedBatch, &GasEstimate) -> Result<bool>,
    shutdown: impl Future<Output = ()>,
) -> Result<PipelineOutcome>
where
    C: ChainClient,
    I: ImageBuilder,
    K: KmsEncryptor,
    A: StatusApi,
    R: ProgressReporter,
{
    let desired_public = req.log_visibility.is_public();
    let current_public = current_log_visibility_is_public(&ctx.client, app_id).await?;
    let change_needed = permission_change_needed(current_public, desired_public);

    let prepared = prepare(
        ports.images,
        ports.kms,
        ports.reporter,
        PrepareRequest {
            source: req.source,
            env_contents: req.env_contents,
            instance_type: req.instance_type,
            log_visibility: req.log_visibility,
            app_id,
            now_unix: now_unix(),
        },
    )
    .await?;

    let batch = build_batch(
        BatchOperation::Upgrade,
        app_id,
        prepared.descriptor,
        desired_public,
        change_needed,
        &prepared.image_ref,
        &ctx.environment,
        ctx.client.sender(),
    );

    let receipt = match submit(&ctx.client, ports.reporter, &batch, req.fees, confirm).await? {
        SubmitOutcome::Submitted(receipt) => receipt,
        SubmitOutcome::Declined => return Ok(PipelineOutcome::Declined { app_id }),
    };

    let watch = match req.watch {
        Some(mut opts) => {
            opts.permission_pending = change_needed;
            let release_block = match receipt.block_number {
                Some(block) => block,
                None => ctx
                    .client
                    .latest_release_block(app_id)
                    .await
                    .context("reading release block after upgrade")?,
            };
            ports.reporter.step("waiting for the upgrade to roll out...");
            Some(
                watch_until(
                    &ctx.client,
                    ports.api,
                    ports.reporter,
                    app_id,
                    WatchTarget::UpgradeComplete { release_block },
                    &opts,
                    shutdown,
                )
                .await?,
            )
        }
        None => None,
    };

    Ok(PipelineOutcome::Submitted {
        app_id,
        image_ref: prepared.image_ref,
        receipt,
        watch,
    })
}

/// Start, stop or terminate an app through a single-call batch.
///
/// # Errors
///
/// Propagates estimation and execution errors.
pub async fn lifecycle<C: ChainClient>(
    ctx: &PipelineContext<C>,
    reporter: &impl ProgressReporter,
    action: LifecycleAction,
    app_id: Address,
    fees: FeeOverride,
    confirm: impl FnOnce(&PreparedBatch, &GasEstimate) -> Result<bool>,
) -> Result<SubmitOutcome> {
    let batch = build_lifecycle_batch(action, app_id, &ctx.environment, ctx.client.sender());
    submit(&ctx.client, reporter, &batch, fees, confirm).await
}
