//! `teectl info <APP>` — one-shot dual-source snapshot.

use std::process::ExitCode;

use alloy::primitives::Address;
use anyhow::Result;
use clap::Args;
use teectl_common::AppInfoOutput;

use crate::app::AppContext;
use crate::application::services::watcher::{display_status, snapshot};
use crate::commands::{NetworkArgs, connect, resolve_target, watch_options};
use crate::infra::status_api::HttpStatusApi;
use crate::output::progress;

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// App address
    pub app: Address,
    #[command(flatten)]
    pub network: NetworkArgs,
}

/// Run `teectl info`.
///
/// # Errors
///
/// Returns an error if preflight fails or the contract cannot be read.
pub async fn run(app: &AppContext, args: InfoArgs) -> Result<ExitCode> {
    let (environment, config) = resolve_target(app, &args.network.env)?;
    let ctx = connect(app, &args.network, environment).await?;
    let api = HttpStatusApi::new(ctx.environment.api_base_url)?;

    let pb = progress::spinner("reading app status...", app.output.show_progress());
    let snap = snapshot(&ctx.client, &api, args.app).await;
    progress::finish_clear(&pb);
    let snap = snap?;

    let display = display_status(&snap, &watch_options(&config));
    app.renderer().render_app_info(&AppInfoOutput {
        app_id: args.app.to_string(),
        environment: ctx.environment.name.to_string(),
        contract_status: snap.contract.to_string(),
        api_status: (!snap.api.is_empty()).then(|| snap.api.to_string()),
        status: display.label().to_string(),
        ip: snap.ip.clone(),
        instance_type: snap.instance_type.clone(),
    })?;
    Ok(ExitCode::SUCCESS)
}
