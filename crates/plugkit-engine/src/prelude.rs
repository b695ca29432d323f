//! Prelude for convenient imports.

pub use serde_json::{Value, json};

pub use plugkit_core::{ErrorKind, PluginError, PluginResult};

pub use crate::discovery::{DiscoverOptions, LoadedTarget, PluginFinder, StaticCatalog};
pub use crate::exports::{PluginExport, PluginExportBuilder};
pub use crate::hooks::{
    HookArgs, HookFunction, HookImplMarker, HookImplementation, HookOutcome, HookReturn,
    HookSpecMarker, HookSpecs, HookWrapper, Priority, ResultCallback,
};
pub use crate::manager::PluginManager;
pub use crate::metadata::PluginMetadata;
pub use crate::registry::Plugin;

pub use crate::hook_args;
