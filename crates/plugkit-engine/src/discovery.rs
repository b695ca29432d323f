//! Plugin discovery through entry points and module naming prefixes.
//!
//! Discovery never touches the filesystem or a package index directly. A
//! [`PluginFinder`] enumerates candidates and loads them; the manager
//! decides what to register, blocks candidates that fail, and records the
//! failures.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use tracing::{debug, info, warn};

use plugkit_core::config::discovery::{
    DISABLE_ALL_PLUGINS, DISABLE_ENTRYPOINT_PLUGINS, DISABLE_PREFIX_PLUGINS,
};
use plugkit_core::{ErrorKind, PluginError, PluginResult};

use crate::hooks::relay::HookRelay;
use crate::manager::PluginManager;
use crate::registry::Plugin;

/// What loading a candidate produced.
#[derive(Debug, Clone)]
pub enum LoadedTarget {
    /// A plugin object ready for registration.
    Plugin(Arc<dyn Plugin>),
    /// Something that cannot be registered as a plugin.
    Unsupported {
        /// What the loader found instead.
        description: String,
    },
}

/// Loads one discovery candidate.
pub type Loader = Arc<dyn Fn() -> anyhow::Result<LoadedTarget> + Send + Sync>;

/// A named, loadable reference advertised under a group.
#[derive(Clone)]
pub struct EntryPoint {
    /// Group the entry point is advertised under.
    pub group: String,
    /// Plugin name to register under.
    pub name: String,
    /// Target reference, shown in error messages.
    pub value: String,
    loader: Loader,
}

impl EntryPoint {
    pub fn new<F>(group: &str, name: &str, value: &str, loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<LoadedTarget> + Send + Sync + 'static,
    {
        Self {
            group: group.to_string(),
            name: name.to_string(),
            value: value.to_string(),
            loader: Arc::new(loader),
        }
    }

    /// Resolves the target.
    pub fn load(&self) -> anyhow::Result<LoadedTarget> {
        (self.loader)()
    }
}

impl fmt::Debug for EntryPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntryPoint")
            .field("group", &self.group)
            .field("name", &self.name)
            .field("value", &self.value)
            .finish_non_exhaustive()
    }
}

/// A module whose name starts with a discovery prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleCandidate {
    /// Full module name.
    pub module: String,
    /// Name to register under: the distribution name when known, else the module.
    pub display_name: String,
}

/// Enumerates and loads discovery candidates.
pub trait PluginFinder: Send + Sync {
    /// Entry points advertised under `group`.
    fn entry_points(&self, group: &str) -> Vec<EntryPoint>;

    /// Loadable modules whose name starts with `prefix`.
    fn modules_with_prefix(&self, prefix: &str) -> Vec<ModuleCandidate>;

    /// Loads the module named `module`.
    fn load_module(&self, module: &str) -> anyhow::Result<LoadedTarget>;
}

#[derive(Clone)]
struct CatalogModule {
    display_name: Option<String>,
    loader: Loader,
}

/// In-memory [`PluginFinder`] assembled by the host.
#[derive(Clone, Default)]
pub struct StaticCatalog {
    entry_points: Vec<EntryPoint>,
    modules: BTreeMap<String, CatalogModule>,
}

impl StaticCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertises an entry point.
    pub fn with_entry_point<F>(mut self, group: &str, name: &str, value: &str, loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<LoadedTarget> + Send + Sync + 'static,
    {
        self.entry_points.push(EntryPoint::new(group, name, value, loader));
        self
    }

    /// Advertises an entry point that resolves to `plugin`.
    pub fn with_plugin_entry_point(
        self,
        group: &str,
        name: &str,
        value: &str,
        plugin: Arc<dyn Plugin>,
    ) -> Self {
        self.with_entry_point(group, name, value, move || {
            Ok(LoadedTarget::Plugin(plugin.clone()))
        })
    }

    /// Adds a loadable module. `distribution` overrides the registration name.
    pub fn with_module<F>(mut self, module: &str, distribution: Option<&str>, loader: F) -> Self
    where
        F: Fn() -> anyhow::Result<LoadedTarget> + Send + Sync + 'static,
    {
        self.modules.insert(
            module.to_string(),
            CatalogModule {
                display_name: distribution.map(str::to_string),
                loader: Arc::new(loader),
            },
        );
        self
    }

    /// Adds a module that loads as `plugin`.
    pub fn with_plugin_module(
        self,
        module: &str,
        distribution: Option<&str>,
        plugin: Arc<dyn Plugin>,
    ) -> Self {
        self.with_module(module, distribution, move || {
            Ok(LoadedTarget::Plugin(plugin.clone()))
        })
    }
}

impl PluginFinder for StaticCatalog {
    fn entry_points(&self, group: &str) -> Vec<EntryPoint> {
        self.entry_points
            .iter()
            .filter(|ep| ep.group == group)
            .cloned()
            .collect()
    }

    fn modules_with_prefix(&self, prefix: &str) -> Vec<ModuleCandidate> {
        self.modules
            .iter()
            .filter(|(module, _)| module.starts_with(prefix))
            .map(|(module, entry)| ModuleCandidate {
                module: module.clone(),
                display_name: entry.display_name.clone().unwrap_or_else(|| module.clone()),
            })
            .collect()
    }

    fn load_module(&self, module: &str) -> anyhow::Result<LoadedTarget> {
        let entry = self
            .modules
            .get(module)
            .ok_or_else(|| anyhow::anyhow!("No module named '{module}'"))?;
        (entry.loader)()
    }
}

impl fmt::Debug for StaticCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticCatalog")
            .field("entry_points", &self.entry_points)
            .field("modules", &self.modules.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Overrides for one [`PluginManager::discover`] pass.
///
/// Unset fields fall back to the manager's discovery configuration.
#[derive(Debug, Clone, Default)]
pub struct DiscoverOptions {
    pub entry_point: Option<String>,
    pub prefix: Option<String>,
    pub ignore_errors: Option<bool>,
}

/// Suppresses lazy discovery until dropped, then restores the previous flag.
#[must_use = "discovery resumes as soon as the guard is dropped"]
pub struct DiscoveryGuard<'a> {
    relay: &'a HookRelay,
    previous: bool,
}

impl Drop for DiscoveryGuard<'_> {
    fn drop(&mut self) {
        self.relay.set_needs_discovery(self.previous);
    }
}

/// How many plugins a pass registered and the failures it collected.
pub type DiscoveryReport = (usize, Vec<PluginError>);

enum Candidate<'a> {
    EntryPoint(&'a EntryPoint),
    Module(&'a str),
}

impl PluginManager {
    /// Attaches a finder. Arms lazy discovery when `autodiscover` is on.
    pub fn set_finder(&self, finder: Arc<dyn PluginFinder>) {
        *self.finder.write() = Some(finder);
        self.hook.set_needs_discovery(self.discovery.autodiscover);
    }

    fn current_finder(&self) -> Option<Arc<dyn PluginFinder>> {
        self.finder.read().clone()
    }

    /// Runs the pending lazy discovery pass, at most once.
    ///
    /// Returns whether a pass ran. Failures are recorded and logged.
    pub fn ensure_discovered(&self) -> bool {
        if !self.hook.take_discovery() {
            return false;
        }
        if let Err(err) = self.discover(DiscoverOptions::default()) {
            warn!(error = %err, "Lazy plugin discovery failed");
        }
        true
    }

    /// Suppresses lazy discovery while the returned guard lives.
    pub fn discovery_blocked(&self) -> DiscoveryGuard<'_> {
        let previous = self.hook.take_discovery();
        DiscoveryGuard {
            relay: &self.hook,
            previous,
        }
    }

    /// Discovers and registers plugins from entry points, then from modules.
    pub fn discover(&self, options: DiscoverOptions) -> PluginResult<DiscoveryReport> {
        self.hook.set_needs_discovery(false);

        if self.discovery.toggles().all_disabled {
            warn!("Plugin discovery disabled due to {DISABLE_ALL_PLUGINS}");
            return Ok((0, Vec::new()));
        }

        let ignore_errors = options.ignore_errors.unwrap_or(self.discovery.ignore_errors);
        let group = options
            .entry_point
            .or_else(|| self.discovery.entry_point_group.clone());
        let prefix = options
            .prefix
            .or_else(|| self.discovery.module_prefix.clone());

        let (mut count, mut errors) = match group {
            Some(group) => self.load_entrypoints(&group, None, ignore_errors)?,
            None => (0, Vec::new()),
        };
        if let Some(prefix) = prefix {
            let (loaded, failures) = self.load_modules_by_prefix(&prefix, ignore_errors)?;
            count += loaded;
            errors.extend(failures);
        }

        if count > 0 {
            info!(count = count, plugins = ?self.plugin_names(), "Discovered plugins");
        }
        Ok((count, errors))
    }

    /// Loads and registers entry points advertised under `group`.
    ///
    /// With `name`, only that entry point is considered. Registered or
    /// blocked candidates are skipped. A failing candidate is blocked and
    /// recorded; unless `ignore_errors`, its error is returned at once.
    pub fn load_entrypoints(
        &self,
        group: &str,
        name: Option<&str>,
        ignore_errors: bool,
    ) -> PluginResult<DiscoveryReport> {
        if group.is_empty() {
            return Ok((0, Vec::new()));
        }
        if self.discovery.toggles().entrypoints_disabled {
            warn!("Entry point plugins disabled due to {DISABLE_ENTRYPOINT_PLUGINS}");
            return Ok((0, Vec::new()));
        }
        let Some(finder) = self.current_finder() else {
            debug!(group = %group, "No plugin finder attached");
            return Ok((0, Vec::new()));
        };

        let mut count = 0;
        let mut errors = Vec::new();
        for entry_point in finder.entry_points(group) {
            if name.is_some_and(|n| n != entry_point.name) {
                continue;
            }
            if self.is_registered(entry_point.name.as_str()) || self.is_blocked(&entry_point.name) {
                continue;
            }

            match self.load_and_register(
                finder.as_ref(),
                Candidate::EntryPoint(&entry_point),
                &entry_point.name,
            ) {
                Ok(Some(_)) => count += 1,
                Ok(None) => {}
                Err(err) => {
                    self.fail_candidate(&entry_point.name, &err);
                    if !ignore_errors {
                        return Err(err);
                    }
                    errors.push(err);
                }
            }
        }
        Ok((count, errors))
    }

    /// Loads and registers modules whose name starts with `prefix`.
    ///
    /// Candidates register under their distribution name when known.
    /// Skipping and failure handling match [`PluginManager::load_entrypoints`].
    pub fn load_modules_by_prefix(
        &self,
        prefix: &str,
        ignore_errors: bool,
    ) -> PluginResult<DiscoveryReport> {
        if self.discovery.toggles().prefix_disabled {
            warn!("Prefix plugins disabled due to {DISABLE_PREFIX_PLUGINS}");
            return Ok((0, Vec::new()));
        }
        let Some(finder) = self.current_finder() else {
            debug!(prefix = %prefix, "No plugin finder attached");
            return Ok((0, Vec::new()));
        };

        let mut count = 0;
        let mut errors = Vec::new();
        for candidate in finder.modules_with_prefix(prefix) {
            if !candidate.module.starts_with(prefix) {
                continue;
            }
            let name = candidate.display_name.as_str();
            if self.is_registered(name) || self.is_blocked(name) {
                continue;
            }

            match self.load_and_register(
                finder.as_ref(),
                Candidate::Module(&candidate.module),
                name,
            ) {
                Ok(Some(_)) => count += 1,
                Ok(None) => {}
                Err(err) => {
                    self.fail_candidate(name, &err);
                    if !ignore_errors {
                        return Err(err);
                    }
                    errors.push(err);
                }
            }
        }
        Ok((count, errors))
    }

    fn fail_candidate(&self, name: &str, err: &PluginError) {
        warn!(plugin_name = %name, error = %err, "Plugin failed to load, blocking it");
        self.set_blocked(name, true);
        self.record_error(err.clone());
    }

    fn load_and_register(
        &self,
        finder: &dyn PluginFinder,
        candidate: Candidate<'_>,
        plugin_name: &str,
    ) -> PluginResult<Option<String>> {
        let (target, loaded) = match candidate {
            Candidate::EntryPoint(entry_point) => (entry_point.value.as_str(), entry_point.load()),
            Candidate::Module(module) => (module, finder.load_module(module)),
        };

        let loaded = match loaded {
            Ok(loaded) => loaded,
            Err(err) => {
                return Err(PluginError::import(format!(
                    "Error while importing module {target}: {err}"
                ))
                .for_plugin(plugin_name)
                .caused_by(err));
            }
        };

        let plugin = match loaded {
            LoadedTarget::Plugin(plugin) => plugin,
            LoadedTarget::Unsupported { description } => {
                return Err(PluginError::registration(format!(
                    "Plugin '{plugin_name}' declared target '{target}' which is neither a module nor a plugin ({description})"
                ))
                .for_plugin(plugin_name));
            }
        };

        if self.is_registered(&plugin) {
            return Ok(None);
        }

        self.register(plugin, Some(plugin_name)).map_err(|err| match err.kind {
            ErrorKind::Import
            | ErrorKind::Registration
            | ErrorKind::Validation
            | ErrorKind::ArgumentMismatch
            | ErrorKind::HookCall
            | ErrorKind::Call => err,
            _ => PluginError::registration(format!("Failed to register plugin '{plugin_name}': {err}"))
                .for_plugin(plugin_name)
                .caused_by(err),
        })
    }
}
