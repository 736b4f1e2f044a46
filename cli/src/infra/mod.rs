//! Infrastructure layer — concrete implementations of application port traits.
//!
//! This module contains all I/O-performing code: process execution, docker,
//! JSON-RPC, HTTP APIs and files under `~/.teectl`.
//!
//! Imports from `crate::domain` and `crate::application::ports` are allowed.
//! Imports from `crate::commands` or `crate::output` are forbidden.

use std::path::PathBuf;

use anyhow::Result;

pub mod chain;
pub mod command_runner;
pub mod config;
pub mod credential_store;
pub mod docker;
pub mod kms;
pub mod status_api;

/// `~/.teectl`.
///
/// # Errors
///
/// Returns an error if the home directory cannot be determined.
pub fn teectl_home() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("cannot determine home directory"))?;
    Ok(home.join(".teectl"))
}
