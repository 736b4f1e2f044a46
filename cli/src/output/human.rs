//! Human-readable terminal renderer.

use std::path::Path;

use owo_colors::OwoColorize as _;
use teectl_common::{AppInfoOutput, ReleaseOutput, Sku};

use crate::domain::config::TeectlConfig;
use crate::domain::environment::EnvironmentConfig;
use crate::output::OutputContext;

/// Renders domain types as human-readable terminal output using `OutputContext`.
pub struct HumanRenderer<'a> {
    ctx: &'a OutputContext,
}

impl<'a> HumanRenderer<'a> {
    #[must_use]
    pub fn new(ctx: &'a OutputContext) -> Self {
        Self { ctx }
    }

    pub fn render_version(&self, version: &str) {
        println!("teectl {version}");
    }

    /// One-shot app snapshot for `teectl info`.
    pub fn render_app_info(&self, info: &AppInfoOutput) {
        self.ctx.header(&format!("App {}", info.app_id));
        self.ctx.kv("Environment:  ", &info.environment);
        self.ctx.kv("Status:       ", &info.status);
        self.ctx.kv("Contract:     ", &info.contract_status);
        self.ctx
            .kv("Platform:     ", info.api_status.as_deref().unwrap_or("(unknown)"));
        self.ctx.kv("IP:           ", info.ip.as_deref().unwrap_or("(none)"));
        if let Some(instance_type) = &info.instance_type {
            self.ctx.kv("Instance type:", instance_type);
        }
    }

    /// Summary printed after a deploy or upgrade.
    pub fn render_release(&self, out: &ReleaseOutput) {
        if self.ctx.quiet {
            println!("{}", out.app_id);
            return;
        }
        println!();
        self.ctx.kv("App:        ", &out.app_id);
        self.ctx.kv("Environment:", &out.environment);
        self.ctx.kv("Image:      ", &out.image);
        self.ctx.kv("Transaction:", &out.tx_hash);
        self.ctx.kv("Status:     ", &out.status);
        if let Some(ip) = &out.ip {
            self.ctx.kv("IP:         ", ip);
        }
    }

    pub fn render_environments(&self, envs: &[EnvironmentConfig], selected: &str) {
        for env in envs {
            let marker = if env.name == selected { "*" } else { " " };
            let line = format!(
                "{marker} {:<10} chain {:<10} {}",
                env.name, env.chain_id, env.default_rpc_url
            );
            if env.name == selected {
                println!("{}", line.style(self.ctx.styles.bold));
            } else {
                println!("{line}");
            }
        }
    }

    pub fn render_skus(&self, skus: &[Sku]) {
        if skus.is_empty() {
            self.ctx.warn("No instance types offered in this environment.");
            return;
        }
        for sku in skus {
            println!("  {:<24} {}", sku.sku, format_sku_detail(sku));
        }
    }

    pub fn render_config(&self, config: &TeectlConfig, path: &Path) {
        println!();
        println!(
            "  {}",
            format!("Configuration ({})", path.display()).style(self.ctx.styles.header)
        );
        println!();
        println!(
            "  {:<26} {}",
            "defaults.environment:",
            config.defaults.environment.as_deref().unwrap_or("(not set)")
        );
        println!(
            "  {:<26} {}",
            "defaults.instance_type:",
            config.defaults.instance_type.as_deref().unwrap_or("(not set)")
        );
        println!("  {:<26} {}", "watch.interval_secs:", config.watch.interval_secs);
        let transitions = config
            .watch
            .transitions
            .as_ref()
            .map_or_else(|| "(built-in)".to_string(), |t| format!("{} rule(s)", t.len()));
        println!("  {:<26} {transitions}", "watch.transitions:");
        println!();
        println!("  {}", "Environment:".style(self.ctx.styles.bold));
        for var in ["TEECTL_CONFIG", "TEECTL_ENV", "TEECTL_RPC_URL", "NO_COLOR"] {
            println!(
                "    {:<18} {}",
                format!("{var}:"),
                std::env::var(var).unwrap_or_else(|_| "(not set)".to_string())
            );
        }
        let key_state = if std::env::var_os("TEECTL_PRIVATE_KEY").is_some() {
            "(set)"
        } else {
            "(not set)"
        };
        println!("    {:<18} {key_state}", "TEECTL_PRIVATE_KEY:");
        println!();
    }

    pub fn render_identity(&self, address: &str) {
        if self.ctx.quiet {
            println!("{address}");
        } else {
            self.ctx.kv("Address:", address);
        }
    }
}

/// `"4 vCPU, 16 GB  general purpose"` from whichever fields are present.
#[must_use]
pub fn format_sku_detail(sku: &Sku) -> String {
    let mut parts = Vec::new();
    if let Some(vcpus) = sku.vcpus {
        parts.push(format!("{vcpus} vCPU"));
    }
    if let Some(mem) = sku.memory_gb {
        parts.push(format!("{mem} GB"));
    }
    let sizes = parts.join(", ");
    match (sizes.is_empty(), sku.description.as_deref()) {
        (true, Some(desc)) => desc.to_string(),
        (false, Some(desc)) => format!("{sizes}  {desc}"),
        (_, None) => sizes,
    }
}
