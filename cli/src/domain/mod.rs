//! Domain layer — pure business logic, types, and validation.
//!
//! This module has zero imports from `crate::infra`, `crate::commands`,
//! `crate::application`, `tokio`, `std::fs`, `std::process`, or `std::net`.
//! All functions are synchronous and take data in, returning data out.

pub mod batch;
pub mod config;
pub mod contracts;
pub mod credential;
pub mod environment;
pub mod error;
pub mod release;
pub mod status;

pub use config::{TeectlConfig, validate_config_key, validate_config_value};
pub use credential::Credential;
pub use environment::{EnvironmentConfig, resolve_environment};
pub use error::{
    AuthError, ChainStateError, ConfigError, ConvergenceFailure, CredentialTier, NetworkError,
    ReleaseError,
};
