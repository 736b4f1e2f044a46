//! `teectl auth login|logout|whoami` — manage the stored signing key.

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::ports::CredentialStore;
use crate::application::services::resolver::resolve_credential;
use crate::commands::PRIVATE_KEY_VAR;
use crate::domain::credential::Credential;
use crate::domain::error::CredentialTier;

#[derive(Subcommand)]
pub enum AuthCommand {
    /// Store a signing key in ~/.teectl (prompts when --private-key is absent)
    Login {
        /// Key to store, as hex
        #[arg(long, value_name = "HEX")]
        private_key: Option<String>,
    },
    /// Remove the stored signing key
    Logout,
    /// Show the address of the key that would sign
    Whoami {
        /// Key to inspect instead of the resolved one
        #[arg(long, value_name = "HEX")]
        private_key: Option<String>,
    },
}

/// Run the auth command.
///
/// # Errors
///
/// Returns an error if the key is malformed or the store cannot be accessed.
pub fn run(app: &AppContext, cmd: AuthCommand) -> Result<ExitCode> {
    match cmd {
        AuthCommand::Login { private_key } => login(app, private_key),
        AuthCommand::Logout => logout(app),
        AuthCommand::Whoami { private_key } => whoami(app, private_key.as_deref()),
    }
}

fn login(app: &AppContext, private_key: Option<String>) -> Result<ExitCode> {
    let raw = match private_key {
        Some(raw) => raw,
        None if app.non_interactive => {
            anyhow::bail!("--private-key is required when prompts are disabled")
        }
        None => dialoguer::Password::new()
            .with_prompt("Private key (hex)")
            .interact()
            .context("cannot read private key")?,
    };
    let credential = Credential::parse(&raw, CredentialTier::Explicit)?;
    app.credential_store.put(&credential.secret_hex())?;
    app.output
        .success(&format!("Stored key for {}", credential.address()));
    if app.is_json() {
        app.renderer()
            .render_identity(&credential.address().to_string())?;
    }
    Ok(ExitCode::SUCCESS)
}

fn logout(app: &AppContext) -> Result<ExitCode> {
    if app.credential_store.delete()? {
        app.output.success("Removed stored key");
    } else {
        app.output.info("No stored key to remove");
    }
    Ok(ExitCode::SUCCESS)
}

fn whoami(app: &AppContext, private_key: Option<&str>) -> Result<ExitCode> {
    let credential = resolve_credential(
        private_key,
        std::env::var(PRIVATE_KEY_VAR).ok().as_deref(),
        &app.credential_store,
    )?;
    app.renderer()
        .render_identity(&credential.address().to_string())?;
    Ok(ExitCode::SUCCESS)
}
