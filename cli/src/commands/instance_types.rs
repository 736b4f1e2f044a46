//! `teectl instance-types` — list the SKU catalog.

use std::process::ExitCode;

use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::catalog::instance_types;
use crate::commands::{EnvArgs, resolve_target};
use crate::infra::status_api::HttpStatusApi;

#[derive(Args, Debug)]
pub struct InstanceTypesArgs {
    #[command(flatten)]
    pub env: EnvArgs,
}

/// Run `teectl instance-types`.
///
/// # Errors
///
/// Returns an error if the status API cannot be reached.
pub async fn run(app: &AppContext, args: InstanceTypesArgs) -> Result<ExitCode> {
    let (environment, _) = resolve_target(app, &args.env)?;
    let api = HttpStatusApi::new(environment.api_base_url)?;
    let skus = instance_types(&api).await?;
    app.renderer().render_skus(&skus)?;
    Ok(ExitCode::SUCCESS)
}
