//! Hook listing CLI command.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use plugkit_core::PluginResult;
use plugkit_engine::{HookCaller, PluginManager};

use crate::output::{self, OutputFormat};

/// Arguments for the hooks command
#[derive(Debug, Args)]
pub struct HooksArgs {
    /// Only show hooks without a specification
    #[arg(long)]
    pub unspecified: bool,
}

#[derive(Debug, Serialize, Tabled)]
struct HookRow {
    name: String,
    signature: String,
    policy: String,
    implementations: String,
    history: usize,
}

impl HookRow {
    fn from_caller(caller: &HookCaller) -> Self {
        let spec = caller.spec();
        let policy = match &spec {
            None => "unspecified",
            Some(s) if s.is_historic() => "historic",
            Some(s) if s.is_firstresult() => "firstresult",
            Some(_) => "all",
        };
        let implementations: Vec<String> = caller
            .get_hookimpls()
            .iter()
            .map(|i| {
                if i.is_wrapper() {
                    format!("{} (wrapper)", i.plugin_name())
                } else {
                    i.plugin_name().to_string()
                }
            })
            .collect();

        Self {
            name: caller.name().to_string(),
            signature: spec.map(|s| s.to_string()).unwrap_or_else(|| "-".to_string()),
            policy: policy.to_string(),
            implementations: implementations.join(", "),
            history: caller.history_len(),
        }
    }
}

/// Execute the hooks command
pub fn execute(args: &HooksArgs, pm: &PluginManager, format: OutputFormat) -> PluginResult<()> {
    let rows: Vec<HookRow> = pm
        .hooks()
        .values()
        .iter()
        .filter(|caller| !args.unspecified || !caller.has_spec())
        .map(|caller| HookRow::from_caller(caller))
        .collect();
    output::print_list(&rows, format);

    if let Err(e) = pm.check_pending() {
        output::print_warning(&e.to_string());
    }
    Ok(())
}
