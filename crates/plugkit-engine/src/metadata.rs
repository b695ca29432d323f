//! Distribution metadata for registered plugins.

use serde::{Deserialize, Serialize};

use crate::registry::Plugin;

/// Fixed-shape metadata record for one plugin.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PluginMetadata {
    /// Canonical plugin name.
    pub plugin_name: String,
    /// Distribution package name.
    pub package: Option<String>,
    /// Version string.
    pub version: Option<String>,
    /// One-line summary.
    pub summary: Option<String>,
    /// Author or maintainer.
    pub author: Option<String>,
    /// Contact email.
    pub email: Option<String>,
    /// License identifier.
    pub license: Option<String>,
    /// Project URL.
    pub url: Option<String>,
}

impl PluginMetadata {
    /// Metadata with only the plugin name set.
    pub fn named(plugin_name: impl Into<String>) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            ..Self::default()
        }
    }

    /// Sets the package name.
    pub fn with_package(mut self, package: &str) -> Self {
        self.package = Some(package.to_string());
        self
    }

    /// Sets the version.
    pub fn with_version(mut self, version: &str) -> Self {
        self.version = Some(version.to_string());
        self
    }

    /// Sets the summary.
    pub fn with_summary(mut self, summary: &str) -> Self {
        self.summary = Some(summary.to_string());
        self
    }

    /// Sets the author.
    pub fn with_author(mut self, author: &str) -> Self {
        self.author = Some(author.to_string());
        self
    }

    /// Sets the contact email.
    pub fn with_email(mut self, email: &str) -> Self {
        self.email = Some(email.to_string());
        self
    }

    /// Sets the license.
    pub fn with_license(mut self, license: &str) -> Self {
        self.license = Some(license.to_string());
        self
    }

    /// Sets the URL.
    pub fn with_url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    /// Looks up one field by its key.
    pub fn get(&self, key: &str) -> Option<&str> {
        match key {
            "plugin_name" => Some(self.plugin_name.as_str()),
            "package" => self.package.as_deref(),
            "version" => self.version.as_deref(),
            "summary" => self.summary.as_deref(),
            "author" => self.author.as_deref(),
            "email" => self.email.as_deref(),
            "license" => self.license.as_deref(),
            "url" => self.url.as_deref(),
            _ => None,
        }
    }
}

/// Source of distribution metadata for registered plugins.
pub trait MetadataProvider: Send + Sync {
    /// Metadata for `plugin`, registered as `plugin_name`.
    fn metadata(&self, plugin_name: &str, plugin: &dyn Plugin) -> Option<PluginMetadata>;
}

/// Uses whatever the plugin declares about itself.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeclaredMetadata;

impl MetadataProvider for DeclaredMetadata {
    fn metadata(&self, _plugin_name: &str, plugin: &dyn Plugin) -> Option<PluginMetadata> {
        plugin.metadata()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_by_key() {
        let meta = PluginMetadata::named("alpha")
            .with_version("1.2.0")
            .with_license("MIT");
        assert_eq!(meta.get("plugin_name"), Some("alpha"));
        assert_eq!(meta.get("version"), Some("1.2.0"));
        assert_eq!(meta.get("license"), Some("MIT"));
        assert_eq!(meta.get("author"), None);
        assert_eq!(meta.get("bogus"), None);
    }
}
