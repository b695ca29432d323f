//! CLI command definitions and dispatch.

pub mod call;
pub mod config;
pub mod hooks;
pub mod plugins;

use clap::{Parser, Subcommand};

use plugkit_core::PluginResult;
use plugkit_core::config::EngineConfig;
use plugkit_engine::PluginManager;

use crate::demo;
use crate::output::OutputFormat;

/// plugkit: hook-based plugin manager
#[derive(Debug, Parser)]
#[command(name = "plugkit", version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file (default: config/default.toml plus the PLUGKIT_ENV overlay)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Do not attach the plugin finder
    #[arg(long)]
    pub no_discovery: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Configuration management
    Config(config::ConfigArgs),
    /// List hooks with their specifications and implementations
    Hooks(hooks::HooksArgs),
    /// Inspect registered plugins
    Plugins(plugins::PluginsArgs),
    /// Call a hook
    Call(call::CallArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(&self, config: &EngineConfig) -> PluginResult<()> {
        match &self.command {
            Commands::Config(args) => config::execute(args, config, self.config.as_deref(), self.format),
            Commands::Hooks(args) => hooks::execute(args, &self.manager(config)?, self.format),
            Commands::Plugins(args) => plugins::execute(args, &self.manager(config)?, self.format),
            Commands::Call(args) => call::execute(args, &self.manager(config)?, self.format),
        }
    }

    fn manager(&self, config: &EngineConfig) -> PluginResult<PluginManager> {
        let pm = demo::build_manager(config, !self.no_discovery)?;
        pm.ensure_discovered();
        Ok(pm)
    }
}

/// Helper: load configuration from an explicit file or the `config/` directory
pub fn load_config(config_path: Option<&str>) -> PluginResult<EngineConfig> {
    match config_path {
        Some(path) => EngineConfig::from_file(path),
        None => {
            let env = std::env::var("PLUGKIT_ENV").unwrap_or_else(|_| "development".to_string());
            EngineConfig::load(&env)
        }
    }
}
