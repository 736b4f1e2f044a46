//! Application context — unified state passed to every command handler.
//!
//! Holds the output mode, the local stores and the interaction policy.
//! Network collaborators depend on the resolved environment and are built
//! by the handlers that need them.

use anyhow::Result;
use alloy::primitives::utils::format_units;

use crate::application::services::batch::describe_cost;
use crate::domain::batch::{GasEstimate, PreparedBatch};
use crate::infra::command_runner::{DEFAULT_CMD_TIMEOUT, TokioCommandRunner};
use crate::infra::config::YamlConfigStore;
use crate::infra::credential_store::FileCredentialStore;
use crate::infra::docker::DockerCli;
use crate::output::{HumanRenderer, JsonRenderer, OutputContext, Renderer, TerminalReporter};

/// Output rendering mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Human-readable terminal output (default).
    Human,
    /// Machine-readable JSON output.
    Json,
}

/// Output rendering flags.
pub struct OutputFlags {
    pub no_color: bool,
    pub quiet: bool,
    pub json: bool,
}

/// Behaviour flags.
pub struct BehaviourFlags {
    /// Skip interactive prompts (also set by `CI` / `TEECTL_YES` env vars).
    pub yes: bool,
}

/// Flags passed from the top-level CLI to `AppContext::new`.
pub struct AppFlags {
    pub output: OutputFlags,
    pub behaviour: BehaviourFlags,
}

/// Unified application context passed to every command handler.
pub struct AppContext {
    /// Terminal output context (colors, quiet mode).
    pub output: OutputContext,
    pub mode: OutputMode,
    pub config_store: YamlConfigStore,
    pub credential_store: FileCredentialStore,
    /// When `true`, skip interactive prompts and use defaults.
    ///
    /// Set when `--yes` / `-y` is passed, or when the `CI` or `TEECTL_YES`
    /// environment variables are present.
    pub non_interactive: bool,
}

impl AppContext {
    /// Construct an `AppContext` from top-level CLI flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn new(flags: &AppFlags) -> Result<Self> {
        let ci_env = std::env::var_os("CI").is_some() || std::env::var_os("TEECTL_YES").is_some();
        let non_interactive = flags.behaviour.yes || ci_env;

        let mode = if flags.output.json {
            OutputMode::Json
        } else {
            OutputMode::Human
        };

        // JSON mode keeps progress off the terminal entirely.
        let quiet = flags.output.quiet || flags.output.json;

        Ok(Self {
            output: OutputContext::new(flags.output.no_color, quiet),
            mode,
            config_store: YamlConfigStore::from_env()?,
            credential_store: FileCredentialStore::default_location()?,
            non_interactive,
        })
    }

    /// Returns `true` when JSON output mode is active.
    #[must_use]
    pub fn is_json(&self) -> bool {
        self.mode == OutputMode::Json
    }

    /// Returns the appropriate `Renderer` variant for the current output mode.
    #[must_use]
    pub fn renderer(&self) -> Renderer<'_> {
        match self.mode {
            OutputMode::Human => Renderer::Human(HumanRenderer::new(&self.output)),
            OutputMode::Json => Renderer::Json(JsonRenderer),
        }
    }

    #[must_use]
    pub fn reporter(&self) -> TerminalReporter<'_> {
        TerminalReporter::new(&self.output)
    }

    /// Docker driver whose streamed output follows the quiet setting.
    #[must_use]
    pub fn image_builder(&self) -> DockerCli<TokioCommandRunner> {
        DockerCli::new(TokioCommandRunner::new(DEFAULT_CMD_TIMEOUT).with_echo(!self.output.quiet))
    }

    /// Ask the user for confirmation.
    ///
    /// When `non_interactive` is `true` (CI, `--yes` flag, or `TEECTL_YES` env),
    /// returns `default` immediately without prompting.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails (e.g. no TTY available).
    pub fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        if self.non_interactive {
            return Ok(default);
        }
        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()?;
        Ok(confirmed)
    }

    /// Show what a batch does and what it may cost, then confirm.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal prompt fails.
    pub fn confirm_batch(&self, batch: &PreparedBatch, gas: &GasEstimate) -> Result<bool> {
        if !self.output.quiet {
            eprintln!();
            for call in batch.calls() {
                eprintln!("  • {}", call.description);
            }
            let gwei = format_units(gas.max_fee_per_gas, "gwei").unwrap_or_default();
            eprintln!(
                "  Gas limit {}, max fee {gwei} gwei, max cost {}",
                gas.gas_limit,
                describe_cost(gas)
            );
            eprintln!();
        }
        let confirmed = self.confirm("Sign and submit this transaction?", true)?;
        if !confirmed {
            self.output.warn("Cancelled; nothing was signed.");
        }
        Ok(confirmed)
    }
}
