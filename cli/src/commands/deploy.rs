//! `teectl deploy` and `teectl upgrade`.

use std::path::PathBuf;
use std::process::ExitCode;

use alloy::primitives::Address;
use anyhow::{Context, Result};
use clap::Args;
use teectl_common::ReleaseOutput;

use crate::app::AppContext;
use crate::application::services::catalog::select_instance_type;
use crate::application::services::deploy::{
    self, PipelineOutcome, PipelinePorts, ReleaseRequest,
};
use crate::application::services::watcher::{WatchOutcome, WatchOptions, display_status};
use crate::commands::{FeeArgs, NetworkArgs, connect, resolve_target, shutdown_signal, watch_options};
use crate::domain::batch::{GasEstimate, PreparedBatch};
use crate::domain::config::TeectlConfig;
use crate::domain::environment::EnvironmentConfig;
use crate::domain::release::{LogVisibility, ReleaseSource};
use crate::infra::kms::HttpKmsEncryptor;
use crate::infra::status_api::HttpStatusApi;

/// Release inputs shared by deploy and upgrade.
#[derive(Args, Debug, Clone)]
pub struct ReleaseArgs {
    /// Dockerfile to build for linux/amd64
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with = "image",
        requires = "repository",
        required_unless_present = "image"
    )]
    pub dockerfile: Option<PathBuf>,

    /// Existing image reference to release instead of building
    #[arg(long, value_name = "REF")]
    pub image: Option<String>,

    /// Repository the built image is pushed to
    #[arg(long, value_name = "REPO")]
    pub repository: Option<String>,

    /// Build context (defaults to the Dockerfile's directory)
    #[arg(long, value_name = "DIR", requires = "dockerfile")]
    pub context: Option<PathBuf>,

    /// dotenv file; keys ending in _PUBLIC are published, the rest encrypted
    #[arg(long, value_name = "PATH")]
    pub env_file: Option<PathBuf>,

    /// Instance type (see `teectl instance-types`)
    #[arg(long, value_name = "NAME")]
    pub instance_type: Option<String>,

    /// Who may read the app's logs
    #[arg(long, value_name = "public|private|off", default_value = "private")]
    pub log_visibility: LogVisibility,

    /// Return once the transaction is mined
    #[arg(long)]
    pub no_watch: bool,
}

impl ReleaseArgs {
    fn source(&self) -> Result<ReleaseSource> {
        match (&self.dockerfile, &self.image, &self.repository) {
            (Some(path), None, Some(repository)) => Ok(ReleaseSource::Dockerfile {
                path: path.clone(),
                context: self.context.clone(),
                repository: repository.clone(),
            }),
            (None, Some(image), _) => Ok(ReleaseSource::Image(image.clone())),
            _ => anyhow::bail!("pass either --dockerfile with --repository, or --image"),
        }
    }

    fn env_contents(&self) -> Result<Option<String>> {
        self.env_file
            .as_ref()
            .map(|path| {
                std::fs::read_to_string(path)
                    .with_context(|| format!("cannot read env file {}", path.display()))
            })
            .transpose()
    }
}

#[derive(Args, Debug)]
pub struct DeployArgs {
    #[command(flatten)]
    pub network: NetworkArgs,
    #[command(flatten)]
    pub release: ReleaseArgs,
    #[command(flatten)]
    pub fees: FeeArgs,
}

#[derive(Args, Debug)]
pub struct UpgradeArgs {
    /// App address
    pub app: Address,
    #[command(flatten)]
    pub network: NetworkArgs,
    #[command(flatten)]
    pub release: ReleaseArgs,
    #[command(flatten)]
    pub fees: FeeArgs,
}

/// Run `teectl deploy`.
///
/// # Errors
///
/// Propagates the first failing pipeline stage.
pub async fn run_deploy(app: &AppContext, args: DeployArgs) -> Result<ExitCode> {
    run_release(app, None, args.network, args.release, args.fees).await
}

/// Run `teectl upgrade <APP>`.
///
/// # Errors
///
/// Propagates the first failing pipeline stage.
pub async fn run_upgrade(app: &AppContext, args: UpgradeArgs) -> Result<ExitCode> {
    run_release(app, Some(args.app), args.network, args.release, args.fees).await
}

async fn run_release(
    app: &AppContext,
    target_app: Option<Address>,
    network: NetworkArgs,
    release: ReleaseArgs,
    fees: FeeArgs,
) -> Result<ExitCode> {
    let source = release.source()?;
    let env_contents = release.env_contents()?;
    let (environment, config) = resolve_target(app, &network.env)?;
    let ctx = connect(app, &network, environment).await?;

    let reporter = app.reporter();
    let api = HttpStatusApi::new(ctx.environment.api_base_url)?;
    let kms = HttpKmsEncryptor::new(ctx.environment.kms_url)?;
    let images = app.image_builder();

    let instance_type = select_instance_type(
        &api,
        &reporter,
        release.instance_type.as_deref(),
        config.defaults.instance_type.as_deref(),
    )
    .await?;

    let watch = (!release.no_watch).then(|| watch_options(&config));
    let req = ReleaseRequest {
        source: &source,
        env_contents: env_contents.as_deref(),
        instance_type: &instance_type,
        log_visibility: release.log_visibility,
        fees: fees.into(),
        watch: watch.clone(),
    };
    let ports = PipelinePorts {
        images: &images,
        kms: &kms,
        api: &api,
        reporter: &reporter,
    };
    let confirm = |batch: &PreparedBatch, gas: &GasEstimate| app.confirm_batch(batch, gas);

    let outcome = match target_app {
        None => deploy::deploy(&ctx, ports, req, confirm, shutdown_signal()).await?,
        Some(app_id) => {
            deploy::upgrade(&ctx, ports, app_id, req, confirm, shutdown_signal()).await?
        }
    };

    render_outcome(app, &ctx.environment, &config, watch.as_ref(), outcome)
}

fn render_outcome(
    app: &AppContext,
    environment: &EnvironmentConfig,
    config: &TeectlConfig,
    watch_opts: Option<&WatchOptions>,
    outcome: PipelineOutcome,
) -> Result<ExitCode> {
    let PipelineOutcome::Submitted {
        app_id,
        image_ref,
        receipt,
        watch,
    } = outcome
    else {
        return Ok(ExitCode::SUCCESS);
    };

    let default_opts = watch_options(config);
    let opts = watch_opts.unwrap_or(&default_opts);
    let (status, ip) = match &watch {
        Some(WatchOutcome::Converged(snap)) => {
            (display_status(snap, opts).label().to_string(), snap.ip.clone())
        }
        Some(WatchOutcome::Cancelled(last)) => {
            app.output
                .warn("Stopped watching; the app keeps rolling out on the platform.");
            app.output
                .info(&format!("Check progress with: teectl info {app_id}"));
            (
                last.as_ref()
                    .map_or_else(|| "Unknown".to_string(), |s| display_status(s, opts).label().to_string()),
                last.as_ref().and_then(|s| s.ip.clone()),
            )
        }
        None => ("Submitted".to_string(), None),
    };

    app.renderer().render_release(&ReleaseOutput {
        app_id: app_id.to_string(),
        environment: environment.name.to_string(),
        tx_hash: receipt.tx_hash.to_string(),
        image: image_ref,
        status,
        ip,
    })?;
    Ok(ExitCode::SUCCESS)
}
