//! Export helpers for assembling plugins from closures and wrappers.

use std::sync::Arc;

use crate::hooks::implementation::HookImplementation;
use crate::metadata::PluginMetadata;
use crate::registry::Plugin;

/// A plugin assembled from individually declared implementations.
#[derive(Debug, Clone)]
pub struct PluginExport {
    /// Preferred canonical name.
    pub name: Option<String>,
    /// Declared distribution metadata.
    pub metadata: Option<PluginMetadata>,
    /// Declared implementations, for any project.
    pub implementations: Vec<HookImplementation>,
}

impl PluginExport {
    /// Wraps the export for registration.
    pub fn into_plugin(self) -> Arc<dyn Plugin> {
        Arc::new(self)
    }
}

impl Plugin for PluginExport {
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    fn hook_implementations(&self) -> Vec<HookImplementation> {
        self.implementations.clone()
    }

    fn metadata(&self) -> Option<PluginMetadata> {
        self.metadata.clone()
    }
}

/// Builder for constructing plugin exports incrementally.
#[derive(Debug, Default)]
pub struct PluginExportBuilder {
    name: Option<String>,
    metadata: Option<PluginMetadata>,
    implementations: Vec<HookImplementation>,
}

impl PluginExportBuilder {
    /// Starts a plugin that prefers `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Starts a plugin without a preferred name.
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Declares distribution metadata.
    pub fn metadata(mut self, metadata: PluginMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Adds an implementation.
    pub fn on(mut self, implementation: HookImplementation) -> Self {
        self.implementations.push(implementation);
        self
    }

    pub fn build(self) -> PluginExport {
        PluginExport {
            name: self.name,
            metadata: self.metadata,
            implementations: self.implementations,
        }
    }

    /// Builds and wraps the export for registration.
    pub fn into_plugin(self) -> Arc<dyn Plugin> {
        self.build().into_plugin()
    }
}
