//! Configuration management CLI commands.

use clap::{Args, Subcommand};

use plugkit_core::PluginResult;
use plugkit_core::config::EngineConfig;

use crate::output::{self, OutputFormat};

/// Arguments for config commands
#[derive(Debug, Args)]
pub struct ConfigArgs {
    /// Config subcommand
    #[command(subcommand)]
    pub command: ConfigCommand,
}

/// Config subcommands
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show,
    /// Validate configuration and show the effective discovery switches
    Validate,
}

/// Execute config commands
pub fn execute(
    args: &ConfigArgs,
    config: &EngineConfig,
    config_path: Option<&str>,
    format: OutputFormat,
) -> PluginResult<()> {
    match &args.command {
        ConfigCommand::Show => output::print_item(config, format),
        ConfigCommand::Validate => {
            output::print_success(&format!(
                "Configuration '{}' is valid",
                config_path.unwrap_or("config/")
            ));
            let toggles = config.discovery.toggles();
            output::print_kv("Project", &config.project_name);
            output::print_kv(
                "Entry point group",
                &output::or_dash(config.discovery.entry_point_group.as_deref()),
            );
            output::print_kv(
                "Module prefix",
                &output::or_dash(config.discovery.module_prefix.as_deref()),
            );
            output::print_kv("Autodiscover", &config.discovery.autodiscover.to_string());
            output::print_kv("Ignore errors", &config.discovery.ignore_errors.to_string());
            output::print_kv("Log level", &config.logging.level);

            if toggles.all_disabled {
                output::print_warning("All plugin discovery is disabled");
            } else {
                if toggles.entrypoints_disabled {
                    output::print_warning("Entry point discovery is disabled");
                }
                if toggles.prefix_disabled {
                    output::print_warning("Prefix discovery is disabled");
                }
            }
        }
    }

    Ok(())
}
