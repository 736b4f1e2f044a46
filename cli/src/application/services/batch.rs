//! Application service — gas estimation, confirmation and submission.
//!
//! Imports only from `crate::domain` and `crate::application::ports`.

use alloy::primitives::utils::format_ether;
use anyhow::Result;

use crate::application::ports::{ChainClient, ProgressReporter};
use crate::domain::batch::{BatchReceipt, FeeOverride, GasEstimate, PreparedBatch};
use crate::domain::error::ChainStateError;

/// Outcome of [`submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    Submitted(BatchReceipt),
    /// The caller declined the estimated cost; nothing was signed.
    Declined,
}

/// Simulate the batch and price it.
///
/// # Errors
///
/// Returns `ChainStateError::SimulationReverted` if any call would revert,
/// before the caller is asked to confirm or a transaction is signed, and
/// `NetworkError::RpcUnreachable` if the node could not be asked.
pub async fn estimate_gas(client: &impl ChainClient, batch: &PreparedBatch) -> Result<GasEstimate> {
    client.estimate(batch).await
}

/// Human summary of the maximum cost, e.g. `"0.0021 ETH"`.
#[must_use]
pub fn describe_cost(gas: &GasEstimate) -> String {
    format!("{} ETH", format_ether(gas.max_cost_wei()))
}

/// Estimate, confirm, then sign, submit and wait for the receipt.
///
/// `confirm` sees the batch and the final gas parameters; returning
/// `Ok(false)` cancels without signing.
///
/// # Errors
///
/// Returns [`ChainStateError::SenderMismatch`] if the batch was prepared for
/// another account, or any estimation/execution error.
pub async fn submit(
    client: &impl ChainClient,
    reporter: &impl ProgressReporter,
    batch: &PreparedBatch,
    fees: FeeOverride,
    confirm: impl FnOnce(&PreparedBatch, &GasEstimate) -> Result<bool>,
) -> Result<SubmitOutcome> {
    if batch.sender() != client.sender() {
        return Err(ChainStateError::SenderMismatch {
            expected: batch.sender().to_string(),
            actual: client.sender().to_string(),
        }
        .into());
    }

    reporter.step(&format!("estimating gas for {} call(s)...", batch.len()));
    let gas = estimate_gas(client, batch).await?.with_override(fees);
    tracing::debug!(
        gas_limit = gas.gas_limit,
        max_fee_per_gas = gas.max_fee_per_gas,
        max_priority_fee_per_gas = gas.max_priority_fee_per_gas,
        "gas estimate"
    );

    if !confirm(batch, &gas)? {
        return Ok(SubmitOutcome::Declined);
    }

    reporter.step("submitting transaction...");
    let receipt = client.execute(batch, Some(gas)).await?;
    tracing::info!(tx_hash = %receipt.tx_hash, block = ?receipt.block_number, "batch mined");
    reporter.success(&format!("transaction {} confirmed", receipt.tx_hash));
    Ok(SubmitOutcome::Submitted(receipt))
}
