//! Plugin registry: registered plugin records, the blocklist, and the
//! plugin-side capability trait.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use tracing::info;

use plugkit_core::{PluginError, PluginResult};

use crate::hooks::caller::HookCaller;
use crate::hooks::definitions::Priority;
use crate::hooks::implementation::{Handler, HookFunction, HookImplementation};
use crate::metadata::PluginMetadata;

/// Trait that all plugins must implement.
///
/// A plugin is any value that can list its hook implementations. The
/// manager keeps only those whose project matches its own.
pub trait Plugin: Send + Sync + fmt::Debug {
    /// Preferred canonical name.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Every implementation this plugin contributes, for any project.
    fn hook_implementations(&self) -> Vec<HookImplementation>;

    /// Distribution metadata, if the plugin knows it.
    fn metadata(&self) -> Option<PluginMetadata> {
        None
    }
}

/// Identity of a registered plugin object, independent of its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PluginId(usize);

impl PluginId {
    /// Identity of the object behind `plugin`.
    ///
    /// Stable while the manager holds the `Arc`.
    pub fn of(plugin: &Arc<dyn Plugin>) -> Self {
        Self(Arc::as_ptr(plugin) as *const () as usize)
    }

    /// Identity used for temporary implementations no plugin owns.
    pub(crate) const fn detached() -> Self {
        Self(0)
    }
}

impl fmt::Display for PluginId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#x}", self.0)
    }
}

/// Looks up a plugin by name or by identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PluginKey {
    /// Canonical name.
    Name(String),
    /// Object identity.
    Id(PluginId),
}

impl From<&str> for PluginKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for PluginKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<PluginId> for PluginKey {
    fn from(id: PluginId) -> Self {
        Self::Id(id)
    }
}

impl From<&Arc<dyn Plugin>> for PluginKey {
    fn from(plugin: &Arc<dyn Plugin>) -> Self {
        Self::Id(PluginId::of(plugin))
    }
}

impl fmt::Display for PluginKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => write!(f, "{name}"),
            Self::Id(id) => write!(f, "<plugin {id}>"),
        }
    }
}

/// A registered plugin.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    /// Canonical name.
    pub name: String,
    /// Object identity.
    pub id: PluginId,
    /// The plugin object.
    pub plugin: Arc<dyn Plugin>,
    /// Hook callers this plugin contributed implementations to.
    pub hookcallers: Vec<Arc<HookCaller>>,
    seq: u64,
}

/// Registered plugins and blocked names.
#[derive(Debug, Default)]
pub struct PluginRegistry {
    plugins: HashMap<String, PluginRecord>,
    names: HashMap<PluginId, String>,
    blocked: HashSet<String>,
    next_seq: u64,
}

impl PluginRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Checks that `name` and `id` are both free.
    pub fn ensure_available(&self, name: &str, id: PluginId) -> PluginResult<()> {
        if self.plugins.contains_key(name) {
            return Err(PluginError::duplicate_name(format!(
                "Plugin name already registered: {name}"
            ))
            .for_plugin(name));
        }
        if let Some(existing) = self.names.get(&id) {
            return Err(PluginError::duplicate_identity(format!(
                "Plugin object already registered as '{existing}'"
            ))
            .for_plugin(name));
        }
        Ok(())
    }

    /// Stores a plugin. Callers must check [`PluginRegistry::ensure_available`] first.
    pub fn insert(
        &mut self,
        name: &str,
        plugin: Arc<dyn Plugin>,
        hookcallers: Vec<Arc<HookCaller>>,
    ) -> PluginId {
        let id = PluginId::of(&plugin);
        let seq = self.next_seq;
        self.next_seq += 1;

        info!(plugin_name = %name, hooks = hookcallers.len(), "Registering plugin");

        self.names.insert(id, name.to_string());
        self.plugins.insert(
            name.to_string(),
            PluginRecord {
                name: name.to_string(),
                id,
                plugin,
                hookcallers,
                seq,
            },
        );
        id
    }

    /// Removes a plugin record.
    pub fn remove(&mut self, key: &PluginKey) -> Option<PluginRecord> {
        let name = self.resolve(key)?.to_string();
        let record = self.plugins.remove(&name)?;
        self.names.remove(&record.id);
        info!(plugin_name = %name, "Plugin unregistered");
        Some(record)
    }

    /// Canonical name for a key, if registered.
    pub fn resolve(&self, key: &PluginKey) -> Option<&str> {
        match key {
            PluginKey::Name(name) => self.plugins.get_key_value(name).map(|(k, _)| k.as_str()),
            PluginKey::Id(id) => self.names.get(id).map(String::as_str),
        }
    }

    /// Gets a plugin record.
    pub fn get(&self, key: &PluginKey) -> Option<&PluginRecord> {
        let name = self.resolve(key)?;
        self.plugins.get(name)
    }

    /// Checks whether a plugin is registered.
    pub fn contains(&self, key: &PluginKey) -> bool {
        self.resolve(key).is_some()
    }

    /// Registered records in registration order.
    pub fn records(&self) -> Vec<&PluginRecord> {
        let mut records: Vec<&PluginRecord> = self.plugins.values().collect();
        records.sort_by_key(|r| r.seq);
        records
    }

    /// Returns plugin count.
    pub fn count(&self) -> usize {
        self.plugins.len()
    }

    /// Adds `name` to the blocklist. Returns `false` if it was already there.
    pub fn block(&mut self, name: &str) -> bool {
        self.blocked.insert(name.to_string())
    }

    /// Removes `name` from the blocklist. Returns `false` if it was absent.
    pub fn unblock(&mut self, name: &str) -> bool {
        self.blocked.remove(name)
    }

    /// Checks whether `name` is blocked.
    pub fn is_blocked(&self, name: &str) -> bool {
        self.blocked.contains(name)
    }

    /// Blocked names, sorted.
    pub fn blocked(&self) -> Vec<String> {
        let mut names: Vec<String> = self.blocked.iter().cloned().collect();
        names.sort();
        names
    }
}

/// Rejects mapping keys that are not identifiers.
///
/// An identifier starts with a letter or `_` and continues with letters,
/// digits or `_`.
pub fn ensure_identifier(namespace: &str, key: &str) -> PluginResult<()> {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' => chars.all(|c| c.is_alphanumeric() || c == '_'),
        _ => false,
    };
    if valid {
        Ok(())
    } else {
        Err(PluginError::invalid_namespace(format!(
            "Key '{key}' in namespace '{namespace}' is not a valid identifier"
        )))
    }
}

/// A plugin built from a plain name → function mapping.
///
/// Every key becomes the target hook name of a neutral implementation.
#[derive(Debug, Clone)]
pub struct MapPlugin {
    name: Option<String>,
    implementations: Vec<HookImplementation>,
}

impl MapPlugin {
    /// Builds a mapping plugin for `project_name`.
    pub fn from_map<I>(project_name: &str, name: Option<&str>, map: I) -> PluginResult<Self>
    where
        I: IntoIterator<Item = (String, HookFunction)>,
    {
        let namespace = name.unwrap_or("orphan");
        let mut implementations = Vec::new();
        for (key, function) in map {
            ensure_identifier(namespace, &key)?;
            implementations.push(HookImplementation {
                project_name: project_name.to_string(),
                function_name: key.clone(),
                specname: Some(key),
                argnames: function.argnames,
                optional: false,
                priority: Priority::Neutral,
                handler: Handler::Call(function.func),
            });
        }
        Ok(Self {
            name: name.map(str::to_string),
            implementations,
        })
    }
}

impl Plugin for MapPlugin {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn hook_implementations(&self) -> Vec<HookImplementation> {
        self.implementations.clone()
    }
}
