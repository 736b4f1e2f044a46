//! Contract ABIs and protocol constants.
//!
//! Only call signatures and return types live here; the contracts
//! themselves are opaque.

use alloy::primitives::{Address, B256, FixedBytes, address, b256, keccak256};
use alloy::sol;

sol! {
    /// Content-addressed image reference.
    #[sol(all_derives)]
    struct Artifact {
        bytes32 digest;
        string registry;
    }

    #[sol(all_derives)]
    struct RmsRelease {
        Artifact[] artifacts;
        uint32 upgradeByTime;
    }

    /// Release record carried by `createApp` and `upgradeApp`.
    #[sol(all_derives)]
    struct Release {
        RmsRelease rmsRelease;
        bytes publicEnv;
        bytes encryptedEnv;
    }

    #[sol(rpc)]
    interface IAppController {
        function createApp(bytes32 salt, Release release) external returns (address app);
        function upgradeApp(address app, Release release) external returns (uint256);
        function startApp(address app) external;
        function stopApp(address app) external;
        function terminateApp(address app) external;
        function getAppStatus(address app) external view returns (uint8);
        function getAppLatestReleaseBlockNumber(address app) external view returns (uint32);
        function calculateAppId(address deployer, bytes32 salt) external view returns (address);
    }

    #[sol(rpc)]
    interface IPermissionController {
        function setAppointee(address account, address appointee, address target, bytes4 selector) external;
        function removeAppointee(address account, address appointee, address target, bytes4 selector) external;
        function canCall(address account, address caller, address target, bytes4 selector) external returns (bool);
    }

    /// One call inside an ERC-7579 batch.
    #[sol(all_derives)]
    struct Execution {
        address target;
        uint256 value;
        bytes callData;
    }

    /// Execution entry point of the EIP-7702 delegator.
    interface IERC7579Account {
        function execute(bytes32 mode, bytes executionCalldata) external payable;
    }
}

/// Appointee meaning "any caller"; holding the log-view permission for it
/// makes an app's logs public.
pub const ANYONE_CAN_CALL: Address = address!("0x493219d9949348178af1f58740655951a8cd110c");

/// ERC-7579 mode word: call type batch, default exec type, no selector/payload.
pub const BATCH_EXECUTION_MODE: B256 =
    b256!("0x0100000000000000000000000000000000000000000000000000000000000000");

/// Signature of the permission gating app log access.
pub const LOG_PERMISSION_SIGNATURE: &str = "canViewAppLogs()";

/// 4-byte selector for the log-view permission.
#[must_use]
pub fn log_permission_selector() -> FixedBytes<4> {
    let hash = keccak256(LOG_PERMISSION_SIGNATURE.as_bytes());
    FixedBytes::<4>::from_slice(&hash[..4])
}

/// EIP-7702 delegation designator prefix found in delegated EOA code.
pub const DELEGATION_PREFIX: [u8; 3] = [0xef, 0x01, 0x00];

/// Whether `code` delegates to `delegator`.
#[must_use]
pub fn is_delegated_to(code: &[u8], delegator: Address) -> bool {
    code.len() == 23 && code[..3] == DELEGATION_PREFIX && &code[3..] == delegator.as_slice()
}
