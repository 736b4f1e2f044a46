//! `teectl start|stop|terminate <APP>`.

use std::process::ExitCode;

use alloy::primitives::Address;
use anyhow::Result;
use clap::Args;

use crate::app::AppContext;
use crate::application::services::batch::SubmitOutcome;
use crate::application::services::deploy::lifecycle;
use crate::commands::{FeeArgs, NetworkArgs, connect, resolve_target};
use crate::domain::batch::{GasEstimate, LifecycleAction, PreparedBatch};
use crate::output::JsonRenderer;

#[derive(Args, Debug)]
pub struct LifecycleArgs {
    /// App address
    pub app: Address,
    #[command(flatten)]
    pub network: NetworkArgs,
    #[command(flatten)]
    pub fees: FeeArgs,
}

/// Submit a single lifecycle call.
///
/// Terminating asks for an extra confirmation first.
///
/// # Errors
///
/// Propagates preflight, estimation and execution errors.
pub async fn run(app: &AppContext, action: LifecycleAction, args: LifecycleArgs) -> Result<ExitCode> {
    let (environment, _config) = resolve_target(app, &args.network.env)?;

    if action == LifecycleAction::Terminate
        && !app.confirm(
            &format!("Terminate {} permanently? This cannot be undone.", args.app),
            // --yes proceeds; the prompt itself defaults to no.
            app.non_interactive,
        )?
    {
        app.output.warn("Cancelled; nothing was signed.");
        return Ok(ExitCode::SUCCESS);
    }

    let ctx = connect(app, &args.network, environment).await?;
    let reporter = app.reporter();
    let confirm = |batch: &PreparedBatch, gas: &GasEstimate| app.confirm_batch(batch, gas);

    match lifecycle(&ctx, &reporter, action, args.app, args.fees.into(), confirm).await? {
        SubmitOutcome::Submitted(receipt) => {
            tracing::info!(app = %args.app, action = action.verb(), tx_hash = %receipt.tx_hash, "lifecycle call mined");
            if app.is_json() {
                JsonRenderer.render(&serde_json::json!({
                    "app_id": args.app.to_string(),
                    "action": action.verb(),
                    "tx_hash": receipt.tx_hash.to_string(),
                }))?;
            } else {
                app.output
                    .success(&format!("{} submitted for {}", action.verb(), args.app));
            }
        }
        SubmitOutcome::Declined => {}
    }
    Ok(ExitCode::SUCCESS)
}
