//! Built-in host: the hook specifications and plugin catalog the CLI drives.

use std::sync::Arc;

use anyhow::anyhow;
use serde_json::{Value, json};
use tracing::info;

use plugkit_core::PluginResult;
use plugkit_core::config::EngineConfig;
use plugkit_engine::exports::PluginExportBuilder;
use plugkit_engine::hooks::{
    HookArgs, HookImplMarker, HookOutcome, HookReturn, HookSpecMarker, HookSpecs, HookWrapper,
};
use plugkit_engine::metadata::PluginMetadata;
use plugkit_engine::{Plugin, PluginManager, StaticCatalog};

const DEFAULT_GROUP: &str = "plugkit.plugins";
const DEFAULT_PREFIX: &str = "plugkit_";

/// Specifications the built-in host declares for `project`.
pub fn specs(project: &str) -> HookSpecs {
    let marker = HookSpecMarker::new(project);
    HookSpecs::new("HostSpecs")
        .with(marker.specification("greet").args(&["name"]).build())
        .with(
            marker
                .specification("compute")
                .args(&["arg"])
                .firstresult(true)
                .build(),
        )
        .with(
            marker
                .specification("startup")
                .args(&["config"])
                .historic(true)
                .build(),
        )
        .with(
            marker
                .specification("legacy_report")
                .args(&["arg"])
                .warn_on_impl("legacy_report is deprecated, implement compute instead")
                .build(),
        )
}

/// Upper-cases every greeting on the way out.
struct Shout;

impl HookWrapper for Shout {
    fn after(&self, _args: &HookArgs, outcome: &mut HookOutcome) -> anyhow::Result<()> {
        if let Ok(HookReturn::All(values)) = outcome.get_result() {
            let shouted = values
                .iter()
                .map(|v| match v.as_str() {
                    Some(s) => Value::String(s.to_uppercase()),
                    None => v.clone(),
                })
                .collect();
            outcome.force_result(HookReturn::All(shouted));
        }
        Ok(())
    }
}

fn hello(project: &str) -> Arc<dyn Plugin> {
    let marker = HookImplMarker::new(project);
    PluginExportBuilder::new("hello")
        .metadata(
            PluginMetadata::named("hello")
                .with_package("plugkit-hello")
                .with_version("1.0.0")
                .with_summary("Greets whoever asks")
                .with_license("MIT"),
        )
        .on(marker.implementation("greet").args(&["name"]).call(|args| {
            let name = args.get_string("name").unwrap_or("world");
            Ok(json!(format!("Hello, {name}!")))
        }))
        .on(marker
            .implementation("startup")
            .args(&["config"])
            .call(|args| {
                info!(config = ?args.get_data("config"), "hello plugin saw startup");
                Ok(json!("hello ready"))
            }))
        .into_plugin()
}

fn doubler(project: &str) -> Arc<dyn Plugin> {
    let marker = HookImplMarker::new(project);
    PluginExportBuilder::new("doubler")
        .metadata(PluginMetadata::named("doubler").with_version("0.2.0"))
        .on(marker
            .implementation("compute")
            .args(&["arg"])
            .tryfirst()
            .call(|args| {
                let arg = args
                    .require("arg")?
                    .as_i64()
                    .ok_or_else(|| anyhow!("arg must be an integer"))?;
                // Only handles even numbers; odd ones fall through.
                Ok(if arg % 2 == 0 { json!(arg * 2) } else { Value::Null })
            }))
        .into_plugin()
}

fn shouter(project: &str) -> Arc<dyn Plugin> {
    PluginExportBuilder::new("shouter")
        .on(HookImplMarker::new(project)
            .implementation("greet")
            .args(&["name"])
            .wrapper(Shout))
        .into_plugin()
}

fn squares(project: &str) -> Arc<dyn Plugin> {
    let marker = HookImplMarker::new(project);
    PluginExportBuilder::anonymous()
        .metadata(
            PluginMetadata::named("squares")
                .with_package("plugkit-squares")
                .with_version("0.4.1")
                .with_summary("Squares integers"),
        )
        .on(marker.implementation("compute").args(&["arg"]).call(|args| {
            let arg = args
                .require("arg")?
                .as_i64()
                .ok_or_else(|| anyhow!("arg must be an integer"))?;
            Ok(json!(arg * arg))
        }))
        .on(marker
            .implementation("startup")
            .args(&["config"])
            .call(|_| Ok(json!("squares ready"))))
        .into_plugin()
}

/// Discovery catalog for the configured group and prefix.
pub fn catalog(config: &EngineConfig) -> StaticCatalog {
    let project = config.project_name.as_str();
    let group = config
        .discovery
        .entry_point_group
        .as_deref()
        .unwrap_or(DEFAULT_GROUP);
    let prefix = config
        .discovery
        .module_prefix
        .as_deref()
        .unwrap_or(DEFAULT_PREFIX);

    StaticCatalog::new()
        .with_plugin_entry_point(group, "hello", "plugkit_hello:plugin", hello(project))
        .with_plugin_entry_point(group, "doubler", "plugkit_math:doubler", doubler(project))
        .with_plugin_entry_point(group, "shouter", "plugkit_shout:wrapper", shouter(project))
        .with_plugin_module(
            &format!("{prefix}squares"),
            Some("plugkit-squares"),
            squares(project),
        )
        .with_module(&format!("{prefix}native"), None, || {
            Err(anyhow!("shared library libnative.so could not be opened"))
        })
}

/// Builds the host's manager. Without `discover`, no finder is attached.
///
/// `startup` is called before the finder is attached, so discovered
/// plugins receive it through historic replay.
pub fn build_manager(config: &EngineConfig, discover: bool) -> PluginResult<PluginManager> {
    let pm = PluginManager::from_config(config);
    pm.add_hookspecs(&specs(&config.project_name))?;
    pm.call_historic(
        "startup",
        HookArgs::new().with_data("config", json!({ "project": config.project_name })),
        None,
    )?;
    if discover {
        pm.set_finder(Arc::new(catalog(config)));
    }
    Ok(pm)
}
