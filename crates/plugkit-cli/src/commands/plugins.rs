//! Plugin inspection CLI commands.

use clap::{Args, Subcommand};
use serde::Serialize;
use tabled::Tabled;

use plugkit_core::PluginResult;
use plugkit_engine::PluginManager;

use crate::output::{self, OutputFormat};

/// Arguments for plugin commands
#[derive(Debug, Args)]
pub struct PluginsArgs {
    /// Plugin subcommand
    #[command(subcommand)]
    pub command: PluginsCommand,
}

/// Plugin subcommands
#[derive(Debug, Subcommand)]
pub enum PluginsCommand {
    /// List registered plugins
    List,
    /// Show one plugin's metadata and hooks
    Info {
        /// Plugin name
        name: String,
    },
    /// Show plugins that failed to load and were blocked
    Errors,
}

#[derive(Debug, Serialize, Tabled)]
struct PluginRow {
    name: String,
    package: String,
    version: String,
    hooks: String,
}

#[derive(Debug, Serialize, Tabled)]
struct ErrorRow {
    plugin: String,
    kind: String,
    message: String,
}

/// Execute plugin commands
pub fn execute(args: &PluginsArgs, pm: &PluginManager, format: OutputFormat) -> PluginResult<()> {
    match &args.command {
        PluginsCommand::List => {
            let rows: Vec<PluginRow> = pm
                .list_plugin_metadata()
                .into_iter()
                .map(|meta| PluginRow {
                    hooks: pm.hook_names_for(meta.plugin_name.as_str()).join(", "),
                    package: output::or_dash(meta.package.as_deref()),
                    version: output::or_dash(meta.version.as_deref()),
                    name: meta.plugin_name,
                })
                .collect();
            output::print_list(&rows, format);
        }
        PluginsCommand::Info { name } => {
            let meta = pm.get_metadata(name.as_str())?;
            match format {
                OutputFormat::Json => output::print_item(&meta, format),
                OutputFormat::Table => {
                    println!("{}", meta.plugin_name);
                    for key in ["package", "version", "summary", "author", "email", "license", "url"] {
                        if let Some(value) = meta.get(key) {
                            output::print_kv(key, value);
                        }
                    }
                    output::print_kv("hooks", &pm.hook_names_for(name.as_str()).join(", "));
                }
            }
        }
        PluginsCommand::Errors => {
            let rows: Vec<ErrorRow> = pm
                .get_errors(None, None)
                .into_iter()
                .map(|e| ErrorRow {
                    plugin: output::or_dash(e.plugin_name.as_deref()),
                    kind: e.kind.to_string(),
                    message: e.message,
                })
                .collect();
            output::print_list(&rows, format);
            let blocked = pm.blocked_names();
            if !blocked.is_empty() {
                output::print_warning(&format!("Blocked: {}", blocked.join(", ")));
            }
        }
    }

    Ok(())
}
