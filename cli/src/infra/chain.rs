//! Alloy implementation of the chain ports.
//!
//! Batches are sent as an ERC-7579 `execute` self-call from the sender's EOA.
//! When the EOA is not yet delegated to the environment's delegator, a
//! signed EIP-7702 authorization is attached to the same transaction.

use alloy::eips::BlockId;
use alloy::eips::eip7702::{Authorization, SignedAuthorization};
use alloy::network::{EthereumWallet, TransactionBuilder, TransactionBuilder7702};
use alloy::primitives::{Address, B256, U256};
use alloy::providers::{DynProvider, Provider, ProviderBuilder};
use alloy::rpc::types::TransactionRequest;
use alloy::signers::SignerSync;
use alloy::signers::local::PrivateKeySigner;
use alloy::sol_types::decode_revert_reason;
use alloy::transports::TransportError;
use anyhow::{Context, Result};

use crate::application::ports::{ChainClient, ChainConnector};
use crate::domain::batch::{BatchReceipt, GasEstimate, PreparedBatch};
use crate::domain::contracts::{
    ANYONE_CAN_CALL, IAppController, IPermissionController, is_delegated_to,
    log_permission_selector,
};
use crate::domain::credential::Credential;
use crate::domain::environment::EnvironmentConfig;
use crate::domain::error::{AuthError, ChainStateError, ConfigError, NetworkError};
use crate::domain::status::ContractStatus;

/// Opens HTTP providers with a local signer.
pub struct AlloyConnector;

impl ChainConnector for AlloyConnector {
    type Client = AlloyChainClient;

    async fn connect(
        &self,
        rpc_url: &str,
        credential: &Credential,
        environment: &EnvironmentConfig,
    ) -> Result<AlloyChainClient> {
        let url: url::Url = rpc_url.parse().map_err(|e: url::ParseError| {
            ConfigError::InvalidRpcUrl {
                url: rpc_url.to_string(),
                reason: e.to_string(),
            }
        })?;
        let signer = credential.signer()?;
        let sender = signer.address();
        let provider = ProviderBuilder::new()
            .wallet(EthereumWallet::from(signer.clone()))
            .connect_http(url)
            .erased();
        Ok(AlloyChainClient {
            provider,
            signer,
            sender,
            environment: *environment,
            rpc_url: rpc_url.to_string(),
        })
    }
}

/// Signing client bound to one environment's contracts.
pub struct AlloyChainClient {
    provider: DynProvider,
    signer: PrivateKeySigner,
    sender: Address,
    environment: EnvironmentConfig,
    rpc_url: String,
}

impl AlloyChainClient {
    fn app_controller(&self) -> IAppController::IAppControllerInstance<&DynProvider> {
        IAppController::new(self.environment.app_controller, &self.provider)
    }

    /// The self-call carrying the batch, with a delegation authorization when
    /// the sender is not delegated yet.
    ///
    /// The authorization is signed locally so the node can simulate the
    /// delegated call. It leaves the process only inside an executed batch.
    async fn batch_request(&self, batch: &PreparedBatch) -> Result<TransactionRequest> {
        let mut tx = TransactionRequest::default()
            .with_from(self.sender)
            .with_to(self.sender)
            .with_input(batch.execute_calldata());

        let code = self
            .provider
            .get_code_at(self.sender)
            .await
            .context("reading sender code")?;
        if !is_delegated_to(&code, self.environment.delegator) {
            tracing::debug!(delegator = %self.environment.delegator, "attaching EIP-7702 authorization");
            tx = tx.with_authorization_list(vec![self.sign_authorization(batch.chain_id()).await?]);
        }
        Ok(tx)
    }

    async fn sign_authorization(&self, chain_id: u64) -> Result<SignedAuthorization> {
        let nonce = self
            .provider
            .get_transaction_count(self.sender)
            .await
            .context("reading sender nonce")?;
        // The transaction itself consumes `nonce`; the authorization is
        // processed after that increment.
        let auth = Authorization {
            chain_id: U256::from(chain_id),
            address: self.environment.delegator,
            nonce: nonce + 1,
        };
        let signature = self
            .signer
            .sign_hash_sync(&auth.signature_hash())
            .map_err(|e| AuthError::Signing(e.to_string()))?;
        Ok(auth.into_signed(signature))
    }
}

/// Best available revert reason from an RPC error.
fn revert_reason(err: &TransportError) -> String {
    if let Some(payload) = err.as_error_resp() {
        if let Some(reason) = payload
            .as_revert_data()
            .and_then(|data| decode_revert_reason(&data))
        {
            return reason;
        }
        return payload.message.to_string();
    }
    err.to_string()
}

/// Sort a failed `eth_estimateGas` into a revert or an unreachable node.
///
/// A node error response mentioning a revert (or carrying revert data) is a
/// simulation revert. Other error responses are passed through. Everything
/// else never got an answer from the node.
fn estimate_failure(err: &TransportError, rpc_url: &str) -> anyhow::Error {
    match err.as_error_resp() {
        Some(payload)
            if payload.as_revert_data().is_some()
                || payload.message.to_ascii_lowercase().contains("revert") =>
        {
            ChainStateError::SimulationReverted {
                reason: revert_reason(err),
            }
            .into()
        }
        Some(payload) => anyhow::anyhow!(
            "gas estimation rejected by the node ({}): {}",
            payload.code,
            payload.message
        ),
        None => NetworkError::RpcUnreachable {
            url: rpc_url.to_string(),
            reason: err.to_string(),
        }
        .into(),
    }
}

impl ChainClient for AlloyChainClient {
    fn sender(&self) -> Address {
        self.sender
    }

    async fn chain_id(&self) -> Result<u64> {
        Ok(self.provider.get_chain_id().await?)
    }

    async fn app_status(&self, app: Address) -> Result<ContractStatus> {
        let code = self.app_controller().getAppStatus(app).call().await?;
        Ok(ContractStatus::from_code(code)?)
    }

    async fn latest_release_block(&self, app: Address) -> Result<u64> {
        let block = self
            .app_controller()
            .getAppLatestReleaseBlockNumber(app)
            .call()
            .await?;
        Ok(u64::from(block))
    }

    async fn calculate_app_id(&self, deployer: Address, salt: B256) -> Result<Address> {
        Ok(self
            .app_controller()
            .calculateAppId(deployer, salt)
            .call()
            .await?)
    }

    async fn logs_public(&self, app: Address) -> Result<bool> {
        let permissions =
            IPermissionController::new(self.environment.permission_controller, &self.provider);
        Ok(permissions
            .canCall(
                app,
                ANYONE_CAN_CALL,
                self.environment.app_controller,
                log_permission_selector(),
            )
            .call()
            .await?)
    }

    async fn estimate(&self, batch: &PreparedBatch) -> Result<GasEstimate> {
        let tx = self.batch_request(batch).await?;
        let gas_limit = self
            .provider
            .estimate_gas(tx)
            .await
            .map_err(|e| estimate_failure(&e, &self.rpc_url))?;
        let fees = self
            .provider
            .estimate_eip1559_fees()
            .await
            .context("fetching fee estimate")?;
        Ok(GasEstimate {
            gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas,
            max_priority_fee_per_gas: fees.max_priority_fee_per_gas,
        })
    }

    async fn execute(&self, batch: &PreparedBatch, gas: Option<GasEstimate>) -> Result<BatchReceipt> {
        if batch.sender() != self.sender {
            return Err(ChainStateError::SenderMismatch {
                expected: batch.sender().to_string(),
                actual: self.sender.to_string(),
            }
            .into());
        }

        let mut tx = self.batch_request(batch).await?;
        if let Some(gas) = gas {
            tx = tx
                .with_gas_limit(gas.gas_limit)
                .with_max_fee_per_gas(gas.max_fee_per_gas)
                .with_max_priority_fee_per_gas(gas.max_priority_fee_per_gas);
        }
        let replay = tx.clone();

        let pending = self
            .provider
            .send_transaction(tx)
            .await
            .context("submitting batch transaction")?;
        let tx_hash = *pending.tx_hash();
        tracing::info!(%tx_hash, calls = batch.len(), "batch submitted");

        let receipt = pending
            .get_receipt()
            .await
            .with_context(|| format!("waiting for receipt of {tx_hash}"))?;

        if !receipt.status() {
            let mut call = self.provider.call(replay);
            if let Some(block) = receipt.block_number {
                call = call.block(BlockId::number(block));
            }
            let reason = match call.await {
                Err(e) => revert_reason(&e),
                Ok(_) => "execution reverted".to_string(),
            };
            return Err(ChainStateError::Reverted {
                tx_hash: tx_hash.to_string(),
                reason,
            }
            .into());
        }

        Ok(BatchReceipt {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
        })
    }
}
