//! # plugkit-engine
//!
//! Hook-based plugin engine. Provides:
//!
//! - Hook specifications and implementations declared through project markers
//! - Ordered multicall with wrappers, first-result and historic hooks
//! - Plugin registration, blocking and late specification binding
//! - Lazy discovery through entry points and module prefixes
//! - Call monitoring and plugin metadata lookup

pub mod discovery;
pub mod exports;
pub mod hooks;
pub mod macros;
pub mod manager;
pub mod metadata;
pub mod monitor;
pub mod prelude;
pub mod registry;

pub use discovery::{DiscoverOptions, PluginFinder, StaticCatalog};
pub use hooks::{HookArgs, HookCaller, HookRelay, HookReturn, Priority};
pub use manager::PluginManager;
pub use monitor::{CallMonitors, MonitorHandle};
pub use registry::{Plugin, PluginKey, PluginRegistry};

#[doc(hidden)]
pub use serde_json;
