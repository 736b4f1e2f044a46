//! CLI argument parsing with clap derive

use std::process::ExitCode;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::app::{AppContext, AppFlags, BehaviourFlags, OutputFlags};
use crate::commands;

/// Deploy and manage containerized apps on TEE instances anchored on-chain
#[derive(Parser)]
#[command(
    name = "teectl",
    version,
    propagate_version = true,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output (also NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Answer yes to confirmations (also CI / TEECTL_YES)
    #[arg(short, long, global = true)]
    pub yes: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build or pull an image and deploy it as a new app
    Deploy(commands::deploy::DeployArgs),

    /// Roll out a new release of an existing app
    Upgrade(commands::deploy::UpgradeArgs),

    /// Show the on-chain and platform status of an app
    Info(commands::info::InfoArgs),

    /// Start a stopped app
    Start(commands::lifecycle::LifecycleArgs),

    /// Stop a running app
    Stop(commands::lifecycle::LifecycleArgs),

    /// Terminate an app permanently
    Terminate(commands::lifecycle::LifecycleArgs),

    /// List instance types offered by an environment
    InstanceTypes(commands::instance_types::InstanceTypesArgs),

    /// Inspect built-in environments
    #[command(subcommand)]
    Environment(commands::environment::EnvironmentCommand),

    /// Manage the stored signing key
    #[command(subcommand)]
    Auth(commands::auth::AuthCommand),

    /// Manage configuration
    #[command(subcommand)]
    Config(commands::config::ConfigCommand),

    /// Show version
    Version,
}

impl Cli {
    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command fails.
    pub async fn run(self) -> Result<ExitCode> {
        let Cli {
            json,
            quiet,
            no_color,
            yes,
            command,
        } = self;
        let app = AppContext::new(&AppFlags {
            output: OutputFlags {
                no_color,
                quiet,
                json,
            },
            behaviour: BehaviourFlags { yes },
        })?;

        match command {
            Command::Deploy(args) => commands::deploy::run_deploy(&app, args).await,
            Command::Upgrade(args) => commands::deploy::run_upgrade(&app, args).await,
            Command::Info(args) => commands::info::run(&app, args).await,
            Command::Start(args) => {
                commands::lifecycle::run(&app, crate::domain::batch::LifecycleAction::Start, args)
                    .await
            }
            Command::Stop(args) => {
                commands::lifecycle::run(&app, crate::domain::batch::LifecycleAction::Stop, args)
                    .await
            }
            Command::Terminate(args) => {
                commands::lifecycle::run(
                    &app,
                    crate::domain::batch::LifecycleAction::Terminate,
                    args,
                )
                .await
            }
            Command::InstanceTypes(args) => commands::instance_types::run(&app, args).await,
            Command::Environment(cmd) => commands::environment::run(&app, cmd),
            Command::Auth(cmd) => commands::auth::run(&app, cmd),
            Command::Config(cmd) => commands::config::run(&app, cmd),
            Command::Version => commands::version::run(&app),
        }
    }

    /// Whether `--json` was requested, for error formatting in `main`.
    #[must_use]
    pub fn wants_json(&self) -> bool {
        self.json
    }
}
