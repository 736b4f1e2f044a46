//! Integration tests for commands that never touch the network:
//! `environment list` and `auth`.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

const DEV_KEY: &str = "0xac0974bec39a17e36ba4a6b4d238ff944bacb478cbed5efcae784d7bf4f2ff80";
const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

fn teectl(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("teectl"));
    cmd.env("NO_COLOR", "1")
        .env("HOME", home.path())
        .env("TEECTL_CONFIG", home.path().join("config.yaml"))
        .env_remove("TEECTL_PRIVATE_KEY")
        .env_remove("TEECTL_ENV")
        .env_remove("TEECTL_RPC_URL");
    cmd
}

// --- environment ---

#[test]
fn test_environment_list_marks_sepolia_by_default() {
    let home = TempDir::new().expect("tempdir");
    teectl(&home)
        .args(["environment", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* sepolia"))
        .stdout(predicate::str::contains("mainnet"))
        .stdout(predicate::str::contains("local"));
}

#[test]
fn test_environment_list_follows_env_var() {
    let home = TempDir::new().expect("tempdir");
    teectl(&home)
        .env("TEECTL_ENV", "mainnet")
        .args(["environment", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("* mainnet"));
}

#[test]
fn test_environment_list_json() {
    let home = TempDir::new().expect("tempdir");
    let assert = teectl(&home)
        .args(["environment", "list", "--json"])
        .assert()
        .success();
    let v: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid JSON");
    let envs = v.as_array().expect("array");
    let sepolia = envs
        .iter()
        .find(|e| e["name"] == "sepolia")
        .expect("sepolia listed");
    assert_eq!(sepolia["chain_id"], 11_155_111);
    assert_eq!(sepolia["selected"], true);
}

// --- auth ---

#[test]
fn test_whoami_uses_env_key() {
    let home = TempDir::new().expect("tempdir");
    teectl(&home)
        .env("TEECTL_PRIVATE_KEY", DEV_KEY)
        .args(["auth", "whoami"])
        .assert()
        .success()
        .stdout(predicate::str::contains(DEV_ADDRESS));
}

#[test]
fn test_whoami_without_any_key_fails_with_auth_code() {
    let home = TempDir::new().expect("tempdir");
    let assert = teectl(&home)
        .args(["auth", "whoami", "--json"])
        .assert()
        .failure();
    let v: serde_json::Value =
        serde_json::from_slice(&assert.get_output().stdout).expect("valid JSON error");
    assert_eq!(v["code"], "AUTH_ERROR");
}

#[test]
fn test_login_stores_key_and_logout_removes_it() {
    let home = TempDir::new().expect("tempdir");
    teectl(&home)
        .args(["auth", "login", "--private-key", DEV_KEY])
        .assert()
        .success()
        .stdout(predicate::str::contains(DEV_ADDRESS));

    let key_file = home.path().join(".teectl").join("private-key");
    assert!(key_file.exists());

    teectl(&home)
        .args(["auth", "whoami", "-q"])
        .assert()
        .success()
        .stdout(predicate::str::contains(DEV_ADDRESS));

    teectl(&home)
        .args(["auth", "logout"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Removed stored key"));
    assert!(!key_file.exists());
}

#[test]
fn test_login_rejects_malformed_key() {
    let home = TempDir::new().expect("tempdir");
    teectl(&home)
        .args(["auth", "login", "--private-key", "0x1234"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("32-byte hex"));
}

#[test]
fn test_login_without_key_refuses_to_prompt_in_ci() {
    let home = TempDir::new().expect("tempdir");
    teectl(&home)
        .env("CI", "1")
        .args(["auth", "login"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--private-key"));
}

#[test]
fn test_whitespace_env_key_is_rejected_not_skipped() {
    let home = TempDir::new().expect("tempdir");
    teectl(&home)
        .args(["auth", "login", "--private-key", DEV_KEY])
        .assert()
        .success();

    teectl(&home)
        .env("TEECTL_PRIVATE_KEY", "   ")
        .args(["auth", "whoami"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("TEECTL_PRIVATE_KEY"))
        .stderr(predicate::str::contains("32-byte hex"));
}
