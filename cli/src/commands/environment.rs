//! `teectl environment list`.

use std::process::ExitCode;

use anyhow::Result;
use clap::Subcommand;

use crate::app::AppContext;
use crate::application::services::config_service;
use crate::commands::{ENV_VAR, env_var};
use crate::domain::environment::{ENVIRONMENTS, select_environment_name};

#[derive(Subcommand)]
pub enum EnvironmentCommand {
    /// List built-in environments; `*` marks the one in effect
    List,
}

/// Run the environment command.
///
/// # Errors
///
/// Returns an error if the config file cannot be read.
pub fn run(app: &AppContext, cmd: EnvironmentCommand) -> Result<ExitCode> {
    match cmd {
        EnvironmentCommand::List => {
            let config = config_service::load_config(&app.config_store)?;
            let selected = select_environment_name(
                None,
                env_var(ENV_VAR).as_deref(),
                config.defaults.environment.as_deref(),
            );
            app.renderer().render_environments(ENVIRONMENTS, &selected)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}
