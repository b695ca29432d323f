//! Plugin manager: the top-level authority over plugins and hooks.
//!
//! The manager owns the plugin registry, the blocklist, the hook relay and
//! the call monitors. Every operation takes `&self`; internal locks are
//! released before any plugin code runs, so implementations may call back
//! into the manager.

use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use plugkit_core::config::EngineConfig;
use plugkit_core::config::discovery::DiscoveryConfig;
use plugkit_core::{ErrorKind, PluginError, PluginResult};

use crate::discovery::PluginFinder;
use crate::hooks::caller::{HookCaller, ResultCallback};
use crate::hooks::definitions::{HookArgs, HookReturn};
use crate::hooks::implementation::{HookFunction, HookImpl};
use crate::hooks::relay::HookRelay;
use crate::hooks::spec::SpecNamespace;
use crate::metadata::{DeclaredMetadata, MetadataProvider, PluginMetadata};
use crate::monitor::{AfterCall, BeforeCall, CallMonitors, MonitorHandle, tracing_monitor};
use crate::registry::{MapPlugin, Plugin, PluginId, PluginKey, PluginRegistry};

/// Manages plugin registration, hook specifications and hook calls.
pub struct PluginManager {
    project_name: String,
    pub(crate) hook: HookRelay,
    pub(crate) registry: RwLock<PluginRegistry>,
    pub(crate) errors: RwLock<Vec<PluginError>>,
    pub(crate) finder: RwLock<Option<Arc<dyn PluginFinder>>>,
    pub(crate) discovery: DiscoveryConfig,
    monitors: Arc<CallMonitors>,
    metadata: RwLock<Arc<dyn MetadataProvider>>,
}

impl PluginManager {
    /// Creates a manager for `project_name` with default discovery settings.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self::with_discovery(project_name, DiscoveryConfig::default())
    }

    /// Creates a manager from loaded configuration.
    pub fn from_config(config: &EngineConfig) -> Self {
        let manager = Self::with_discovery(config.project_name.clone(), config.discovery.clone());
        if config.logging.trace_hooks {
            // Lives as long as the manager.
            let _handle = manager.enable_tracing();
        }
        manager
    }

    /// Creates a manager with explicit discovery settings.
    pub fn with_discovery(project_name: impl Into<String>, discovery: DiscoveryConfig) -> Self {
        Self {
            project_name: project_name.into(),
            hook: HookRelay::new(false),
            registry: RwLock::new(PluginRegistry::new()),
            errors: RwLock::new(Vec::new()),
            finder: RwLock::new(None),
            discovery,
            monitors: Arc::new(CallMonitors::new()),
            metadata: RwLock::new(Arc::new(DeclaredMetadata)),
        }
    }

    /// Attaches a discovery finder and arms lazy discovery if configured.
    pub fn with_finder(self, finder: Arc<dyn PluginFinder>) -> Self {
        self.set_finder(finder);
        self
    }

    /// Replaces the metadata provider.
    pub fn with_metadata_provider(self, provider: Arc<dyn MetadataProvider>) -> Self {
        *self.metadata.write() = provider;
        self
    }

    /// Project name markers must carry.
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Discovery settings.
    pub fn discovery_config(&self) -> &DiscoveryConfig {
        &self.discovery
    }

    /// The hook relay, without triggering discovery.
    pub fn hooks(&self) -> &HookRelay {
        &self.hook
    }

    /// Looks up a hook caller, running lazy discovery first if pending.
    pub fn hook(&self, name: &str) -> Option<Arc<HookCaller>> {
        self.ensure_discovered();
        self.hook.get(name)
    }

    /// Calls the hook `name`.
    pub fn call(&self, name: &str, args: &HookArgs) -> PluginResult<HookReturn> {
        self.require_hook(name)?.call(args)
    }

    /// Calls the historic hook `name` and logs the call for later plugins.
    pub fn call_historic(
        &self,
        name: &str,
        args: HookArgs,
        callback: Option<ResultCallback>,
    ) -> PluginResult<()> {
        self.require_hook(name)?.call_historic(args, callback)
    }

    /// Calls the hook `name` with extra functions for this call only.
    pub fn call_extra(
        &self,
        name: &str,
        extras: Vec<HookFunction>,
        args: &HookArgs,
    ) -> PluginResult<HookReturn> {
        self.require_hook(name)?.call_extra(extras, args)
    }

    fn require_hook(&self, name: &str) -> PluginResult<Arc<HookCaller>> {
        self.hook(name).ok_or_else(|| {
            PluginError::not_found(format!("No hook named '{name}'")).for_hook(name)
        })
    }

    /// Registers a plugin and returns its canonical name.
    ///
    /// The name is, in order: `name`, the plugin's own name, or a generated
    /// unique token. Returns `Ok(None)` without registering if the name is
    /// blocked. Every implementation is validated against any bound
    /// specification before anything is attached; historic hooks then
    /// replay their call log into the new implementations.
    pub fn register(
        &self,
        plugin: Arc<dyn Plugin>,
        name: Option<&str>,
    ) -> PluginResult<Option<String>> {
        let plugin_name = match name.or(plugin.name()) {
            Some(name) => name.to_string(),
            None => format!("plugin-{}", Uuid::new_v4()),
        };
        let id = PluginId::of(&plugin);

        {
            let registry = self.registry.read();
            if registry.is_blocked(&plugin_name) {
                debug!(plugin_name = %plugin_name, "Plugin is blocked, skipping registration");
                return Ok(None);
            }
            registry.ensure_available(&plugin_name, id)?;
        }

        let hookimpls: Vec<Arc<HookImpl>> = plugin
            .hook_implementations()
            .into_iter()
            .filter(|declaration| declaration.project_name == self.project_name)
            .map(|declaration| Arc::new(HookImpl::new(id, &plugin_name, declaration)))
            .collect();

        for hookimpl in &hookimpls {
            if let Some(spec) = self.hook.get(hookimpl.hook_name()).and_then(|c| c.spec()) {
                spec.verify(hookimpl)?;
            }
        }

        let mut bound = Vec::with_capacity(hookimpls.len());
        {
            let mut registry = self.registry.write();
            registry.ensure_available(&plugin_name, id)?;

            let mut hookcallers: Vec<Arc<HookCaller>> = Vec::new();
            for hookimpl in hookimpls {
                let caller = self.hook.get_or_create(hookimpl.hook_name(), &self.monitors);
                caller.add_hookimpl(hookimpl.clone());
                if !hookcallers.iter().any(|c| Arc::ptr_eq(c, &caller)) {
                    hookcallers.push(caller.clone());
                }
                bound.push((caller, hookimpl));
            }
            registry.insert(&plugin_name, plugin, hookcallers);
        }

        for (caller, hookimpl) in &bound {
            if !caller.is_historic() {
                continue;
            }
            if let Err(err) = caller.apply_history(hookimpl) {
                warn!(
                    plugin_name = %plugin_name,
                    hook = %caller.name(),
                    error = %err,
                    "Historic replay failed, rolling back registration"
                );
                self.unregister(PluginKey::Id(id));
                return Err(PluginError::registration(format!(
                    "Replaying historic calls of hook '{}' into plugin '{}' failed: {}",
                    caller.name(),
                    plugin_name,
                    err
                ))
                .for_plugin(&plugin_name)
                .for_hook(caller.name())
                .caused_by(err));
            }
        }

        info!(plugin_name = %plugin_name, hooks = bound.len(), "Plugin registered");
        Ok(Some(plugin_name))
    }

    /// Registers a plain name → function mapping as a plugin.
    pub fn register_map<I>(&self, map: I, name: Option<&str>) -> PluginResult<Option<String>>
    where
        I: IntoIterator<Item = (String, HookFunction)>,
    {
        let plugin = MapPlugin::from_map(&self.project_name, name, map)?;
        self.register(Arc::new(plugin), name)
    }

    /// Unregisters a plugin by name or identity.
    ///
    /// Returns `None` and logs a warning if no such plugin is registered.
    pub fn unregister(&self, key: impl Into<PluginKey>) -> Option<Arc<dyn Plugin>> {
        let key = key.into();
        let record = self.registry.write().remove(&key);
        let Some(record) = record else {
            warn!(plugin = %key, "No plugin found to unregister");
            return None;
        };

        for caller in &record.hookcallers {
            let removed = caller.remove_plugin(record.id);
            debug!(
                plugin_name = %record.name,
                hook = %caller.name(),
                removed = removed,
                "Hook implementations removed"
            );
        }
        Some(record.plugin)
    }

    /// Adds every specification `namespace` declares for this project.
    ///
    /// A specification for a hook that already has implementations is
    /// bound to the existing caller after every implementation passes
    /// validation against it. Returns the added hook names.
    pub fn add_hookspecs(&self, namespace: &dyn SpecNamespace) -> PluginResult<Vec<String>> {
        let specs: Vec<_> = namespace
            .hook_specifications()
            .into_iter()
            .filter(|spec| spec.project_name == self.project_name)
            .collect();

        if specs.is_empty() {
            return Err(PluginError::no_hooks_found(format!(
                "Did not find any '{}' hooks in '{}'",
                self.project_name,
                namespace.namespace_name()
            )));
        }

        let mut names = Vec::with_capacity(specs.len());
        for spec in specs {
            let spec = Arc::new(spec);
            match self.hook.get(&spec.name) {
                None => {
                    self.hook.insert_with_spec(spec.clone(), &self.monitors);
                }
                Some(caller) => {
                    for hookimpl in caller.get_hookimpls() {
                        spec.verify(&hookimpl)?;
                    }
                    caller.set_specification(spec.clone())?;
                }
            }
            names.push(spec.name.clone());
        }

        info!(
            namespace = %namespace.namespace_name(),
            hooks = names.len(),
            "Hook specifications added"
        );
        Ok(names)
    }

    /// Checks whether a plugin is registered.
    pub fn is_registered(&self, key: impl Into<PluginKey>) -> bool {
        self.registry.read().contains(&key.into())
    }

    /// Checks whether a name is blocked.
    pub fn is_blocked(&self, name: &str) -> bool {
        self.registry.read().is_blocked(name)
    }

    /// Blocks or unblocks `name`. Blocking unregisters a registered plugin.
    pub fn set_blocked(&self, name: &str, blocked: bool) {
        if blocked {
            if self.registry.write().block(name) {
                info!(plugin_name = %name, "Plugin blocked");
            }
            if self.is_registered(name) {
                self.unregister(name);
            }
        } else if self.registry.write().unblock(name) {
            info!(plugin_name = %name, "Plugin unblocked");
        }
    }

    /// Blocked names, sorted.
    pub fn blocked_names(&self) -> Vec<String> {
        self.registry.read().blocked()
    }

    /// Canonical name of a registered plugin object.
    pub fn get_name(&self, plugin: &Arc<dyn Plugin>) -> Option<String> {
        self.registry
            .read()
            .resolve(&PluginKey::from(plugin))
            .map(str::to_string)
    }

    /// The plugin registered under `name`.
    pub fn get_plugin(&self, name: &str) -> Option<Arc<dyn Plugin>> {
        self.registry
            .read()
            .get(&PluginKey::from(name))
            .map(|record| record.plugin.clone())
    }

    /// Registered plugin names in registration order.
    pub fn plugin_names(&self) -> Vec<String> {
        self.registry
            .read()
            .records()
            .into_iter()
            .map(|record| record.name.clone())
            .collect()
    }

    /// Hook callers a plugin contributed to.
    pub fn get_hookcallers(&self, key: impl Into<PluginKey>) -> Option<Vec<Arc<HookCaller>>> {
        self.registry
            .read()
            .get(&key.into())
            .map(|record| record.hookcallers.clone())
    }

    /// Enables or disables every implementation of a plugin.
    pub fn set_plugin_enabled(&self, name: &str, enabled: bool) -> PluginResult<usize> {
        let callers = self.get_hookcallers(name).ok_or_else(|| {
            PluginError::not_found(format!("No plugin found with the name '{name}'")).for_plugin(name)
        })?;
        Ok(callers
            .iter()
            .map(|caller| caller.set_plugin_enabled(name, enabled))
            .sum())
    }

    /// Fails if a hook without specification has a non-optional implementation.
    pub fn check_pending(&self) -> PluginResult<()> {
        for caller in self.hook.values() {
            if caller.has_spec() {
                continue;
            }
            if let Some(hookimpl) = caller.get_hookimpls().iter().find(|i| !i.is_optional()) {
                return Err(PluginError::validation(format!(
                    "Unknown hook '{}' in plugin '{}'",
                    caller.name(),
                    hookimpl.plugin_name()
                ))
                .for_plugin(hookimpl.plugin_name())
                .for_hook(caller.name()));
            }
        }
        Ok(())
    }

    /// Installs before/after functions around every hook call.
    pub fn add_hookcall_monitoring(&self, before: BeforeCall, after: AfterCall) -> MonitorHandle {
        self.monitors.add(before, after)
    }

    /// Emits `tracing` debug events for every hook call.
    pub fn enable_tracing(&self) -> MonitorHandle {
        let (before, after) = tracing_monitor();
        self.add_hookcall_monitoring(before, after)
    }

    /// Errors recorded during discovery, optionally filtered.
    pub fn get_errors(&self, plugin_name: Option<&str>, kind: Option<ErrorKind>) -> Vec<PluginError> {
        self.errors
            .read()
            .iter()
            .filter(|e| e.matches(plugin_name, kind))
            .cloned()
            .collect()
    }

    pub(crate) fn record_error(&self, err: PluginError) {
        self.errors.write().push(err);
    }

    /// Standard metadata for a registered plugin.
    pub fn get_metadata(&self, key: impl Into<PluginKey>) -> PluginResult<PluginMetadata> {
        let key = key.into();
        let (name, plugin) = {
            let registry = self.registry.read();
            let record = registry.get(&key).ok_or_else(|| {
                PluginError::not_found(format!("No plugin found with the name '{key}'"))
            })?;
            (record.name.clone(), record.plugin.clone())
        };
        Ok(self.standard_metadata(&name, plugin.as_ref()))
    }

    /// One metadata field of a registered plugin.
    pub fn get_metadata_value(
        &self,
        key: impl Into<PluginKey>,
        field: &str,
    ) -> PluginResult<Option<String>> {
        Ok(self.get_metadata(key)?.get(field).map(str::to_string))
    }

    /// Standard metadata for every registered plugin, in registration order.
    pub fn list_plugin_metadata(&self) -> Vec<PluginMetadata> {
        let plugins: Vec<(String, Arc<dyn Plugin>)> = self
            .registry
            .read()
            .records()
            .into_iter()
            .map(|record| (record.name.clone(), record.plugin.clone()))
            .collect();
        plugins
            .iter()
            .map(|(name, plugin)| self.standard_metadata(name, plugin.as_ref()))
            .collect()
    }

    fn standard_metadata(&self, name: &str, plugin: &dyn Plugin) -> PluginMetadata {
        let provider = self.metadata.read().clone();
        let mut metadata = provider.metadata(name, plugin).unwrap_or_default();
        metadata.plugin_name = name.to_string();
        metadata
    }

    /// Hook names a plugin implements, without duplicates.
    pub fn hook_names_for(&self, key: impl Into<PluginKey>) -> Vec<String> {
        let mut seen = HashSet::new();
        self.get_hookcallers(key)
            .unwrap_or_default()
            .iter()
            .filter(|caller| seen.insert(caller.name().to_string()))
            .map(|caller| caller.name().to_string())
            .collect()
    }
}

impl fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginManager")
            .field("project_name", &self.project_name)
            .field("plugins", &self.plugin_names())
            .field("hooks", &self.hook.names())
            .field("monitors", &self.monitors.len())
            .finish()
    }
}
