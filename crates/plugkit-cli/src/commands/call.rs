//! Hook invocation CLI command.

use std::sync::Arc;

use clap::Args;
use serde_json::Value;

use plugkit_core::{PluginError, PluginResult};
use plugkit_engine::hooks::{HookArgs, ResultCallback};
use plugkit_engine::PluginManager;

use crate::output::{self, OutputFormat};

/// Arguments for the call command
#[derive(Debug, Args)]
pub struct CallArgs {
    /// Hook name
    pub hook: String,

    /// Call argument as key=value; the value is parsed as JSON, else taken as a string
    #[arg(short, long = "arg", value_parser = parse_arg)]
    pub args: Vec<(String, Value)>,

    /// Call a historic hook; results are printed as they arrive
    #[arg(long)]
    pub historic: bool,

    /// Call only this plugin's implementation
    #[arg(long, conflicts_with = "historic")]
    pub plugin: Option<String>,
}

fn parse_arg(raw: &str) -> Result<(String, Value), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{raw}'"))?;
    if key.is_empty() {
        return Err(format!("missing key in '{raw}'"));
    }
    let value = serde_json::from_str(value).unwrap_or_else(|_| Value::String(value.to_string()));
    Ok((key.to_string(), value))
}

/// Execute the call command
pub fn execute(args: &CallArgs, pm: &PluginManager, format: OutputFormat) -> PluginResult<()> {
    let hook_args: HookArgs = args.args.iter().cloned().collect();
    let caller = pm.hook(&args.hook).ok_or_else(|| {
        PluginError::not_found(format!("No hook named '{}'", args.hook)).for_hook(&args.hook)
    })?;

    if args.historic {
        let callback: ResultCallback = Arc::new(move |value: &Value| output::print_value(value, format));
        caller.call_historic(hook_args, Some(callback))?;
        output::print_success(&format!("Historic call to '{}' recorded", args.hook));
        return Ok(());
    }

    if let Some(plugin) = &args.plugin {
        let value = caller.call_plugin(plugin, &hook_args)?;
        output::print_value(&value, format);
        return Ok(());
    }

    let result = caller.call(&hook_args)?;
    match format {
        OutputFormat::Json => output::print_item(&result, format),
        OutputFormat::Table => {
            if result.is_empty() {
                output::print_warning("No implementation returned a result");
            }
            for value in result.values() {
                output::print_value(value, format);
            }
        }
    }
    Ok(())
}
