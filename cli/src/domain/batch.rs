//! Pure construction of the calls submitted in one EIP-7702 batch.
//!
//! Building is deterministic: identical inputs give byte-identical calldata.

use alloy::primitives::{Address, B256, Bytes, U256};
use alloy::sol_types::{SolCall, SolValue};

use crate::domain::contracts::{
    ANYONE_CAN_CALL, BATCH_EXECUTION_MODE, Execution, IAppController, IERC7579Account,
    IPermissionController, log_permission_selector,
};
use crate::domain::environment::EnvironmentConfig;
use crate::domain::release::ReleaseDescriptor;

/// What the first call of a release batch does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BatchOperation {
    /// `createApp(salt, release)`; the app address is derived from the salt.
    Deploy { salt: B256 },
    /// `upgradeApp(app, release)`.
    Upgrade,
}

/// Single-call lifecycle actions on the application controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    Start,
    Stop,
    Terminate,
}

impl LifecycleAction {
    #[must_use]
    pub fn verb(self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Terminate => "terminate",
        }
    }
}

/// One call inside a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchCall {
    pub target: Address,
    pub calldata: Bytes,
    /// Human description shown in the confirmation prompt.
    pub description: String,
}

/// Calls ready for estimation and submission, bound to one sender and chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBatch {
    calls: Vec<BatchCall>,
    sender: Address,
    chain_id: u64,
}

impl PreparedBatch {
    #[must_use]
    pub fn calls(&self) -> &[BatchCall] {
        &self.calls
    }

    #[must_use]
    pub fn sender(&self) -> Address {
        self.sender
    }

    #[must_use]
    pub fn chain_id(&self) -> u64 {
        self.chain_id
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.calls.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }

    /// Calldata of the ERC-7579 `execute` self-call wrapping every call.
    #[must_use]
    pub fn execute_calldata(&self) -> Bytes {
        encode_execute(&self.calls)
    }
}

/// Fee parameters and gas limit for a batch; advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GasEstimate {
    pub gas_limit: u64,
    pub max_fee_per_gas: u128,
    pub max_priority_fee_per_gas: u128,
}

impl GasEstimate {
    /// Upper bound on what the transaction can cost, in wei.
    #[must_use]
    pub fn max_cost_wei(&self) -> U256 {
        U256::from(self.gas_limit) * U256::from(self.max_fee_per_gas)
    }
}

/// Caller-supplied fee caps replacing the estimated ones.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeeOverride {
    pub max_fee_per_gas: Option<u128>,
    pub max_priority_fee_per_gas: Option<u128>,
}

impl GasEstimate {
    #[must_use]
    pub fn with_override(self, fees: FeeOverride) -> Self {
        Self {
            gas_limit: self.gas_limit,
            max_fee_per_gas: fees.max_fee_per_gas.unwrap_or(self.max_fee_per_gas),
            max_priority_fee_per_gas: fees
                .max_priority_fee_per_gas
                .unwrap_or(self.max_priority_fee_per_gas),
        }
    }
}

/// Outcome of a mined batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatchReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
}

/// Build the release batch: the deploy/upgrade call, then the log-permission
/// call iff `permission_change_needed`.
#[must_use]
#[allow(clippy::too_many_arguments)]
pub fn build_batch(
    operation: BatchOperation,
    app_id: Address,
    release: ReleaseDescriptor,
    desired_public_logs: bool,
    permission_change_needed: bool,
    image_ref: &str,
    environment: &EnvironmentConfig,
    sender: Address,
) -> PreparedBatch {
    let release = release.into_release();
    let first = match operation {
        BatchOperation::Deploy { salt } => BatchCall {
            target: environment.app_controller,
            calldata: IAppController::createAppCall { salt, release }.abi_encode().into(),
            description: format!("deploy {image_ref} as {app_id}"),
        },
        BatchOperation::Upgrade => BatchCall {
            target: environment.app_controller,
            calldata: IAppController::upgradeAppCall { app: app_id, release }
                .abi_encode()
                .into(),
            description: format!("upgrade {app_id} to {image_ref}"),
        },
    };

    let mut calls = vec![first];
    if permission_change_needed {
        calls.push(permission_call(app_id, desired_public_logs, environment));
    }

    PreparedBatch {
        calls,
        sender,
        chain_id: environment.chain_id,
    }
}

/// Build a single-call lifecycle batch.
#[must_use]
pub fn build_lifecycle_batch(
    action: LifecycleAction,
    app_id: Address,
    environment: &EnvironmentConfig,
    sender: Address,
) -> PreparedBatch {
    let calldata: Vec<u8> = match action {
        LifecycleAction::Start => IAppController::startAppCall { app: app_id }.abi_encode(),
        LifecycleAction::Stop => IAppController::stopAppCall { app: app_id }.abi_encode(),
        LifecycleAction::Terminate => IAppController::terminateAppCall { app: app_id }.abi_encode(),
    };
    PreparedBatch {
        calls: vec![BatchCall {
            target: environment.app_controller,
            calldata: calldata.into(),
            description: format!("{} {app_id}", action.verb()),
        }],
        sender,
        chain_id: environment.chain_id,
    }
}

fn permission_call(app_id: Address, public: bool, environment: &EnvironmentConfig) -> BatchCall {
    let selector = log_permission_selector();
    let (calldata, description) = if public {
        (
            IPermissionController::setAppointeeCall {
                account: app_id,
                appointee: ANYONE_CAN_CALL,
                target: environment.app_controller,
                selector,
            }
            .abi_encode(),
            "make logs public",
        )
    } else {
        (
            IPermissionController::removeAppointeeCall {
                account: app_id,
                appointee: ANYONE_CAN_CALL,
                target: environment.app_controller,
                selector,
            }
            .abi_encode(),
            "make logs private",
        )
    };
    BatchCall {
        target: environment.permission_controller,
        calldata: calldata.into(),
        description: description.to_string(),
    }
}

/// Encode `execute(batchMode, abi.encode(Execution[]))`.
#[must_use]
pub fn encode_execute(calls: &[BatchCall]) -> Bytes {
    let executions: Vec<Execution> = calls
        .iter()
        .map(|c| Execution {
            target: c.target,
            value: U256::ZERO,
            callData: c.calldata.clone(),
        })
        .collect();
    IERC7579Account::executeCall {
        mode: BATCH_EXECUTION_MODE,
        executionCalldata: executions.abi_encode().into(),
    }
    .abi_encode()
    .into()
}
