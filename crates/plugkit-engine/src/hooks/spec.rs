//! Hook specifications: the extension points a host declares.

use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use plugkit_core::{PluginError, PluginResult};

use super::implementation::HookImpl;
use crate::registry::ensure_identifier;

/// Call policy attached to a specification.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpecOptions {
    /// Stop at the first non-null result and return it alone.
    pub firstresult: bool,
    /// Log calls and replay them to implementations registered later.
    pub historic: bool,
    /// Notice logged whenever an implementation is attached.
    pub warn_on_impl: Option<String>,
}

/// A declared extension point.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HookSpecification {
    /// Project whose marker produced this specification.
    pub project_name: String,
    /// Hook name.
    pub name: String,
    /// Declared parameter names, in order.
    pub argnames: Vec<String>,
    /// Call policy.
    pub options: SpecOptions,
}

impl HookSpecification {
    /// Returns whether calls stop at the first non-null result.
    pub fn is_firstresult(&self) -> bool {
        self.options.firstresult
    }

    /// Returns whether calls are logged and replayed.
    pub fn is_historic(&self) -> bool {
        self.options.historic
    }

    /// Returns the implementation parameters this specification does not declare.
    pub fn unknown_args<'a>(&self, argnames: &'a [String]) -> Vec<&'a str> {
        argnames
            .iter()
            .filter(|name| !self.argnames.contains(*name))
            .map(String::as_str)
            .collect()
    }

    /// Returns the declared parameters missing from a call.
    pub fn missing_args<'a>(&'a self, supplied: &[&str]) -> Vec<&'a str> {
        self.argnames
            .iter()
            .map(String::as_str)
            .filter(|name| !supplied.contains(name))
            .collect()
    }

    /// Checks an implementation against this specification.
    ///
    /// Historic hooks reject wrappers, and every implementation parameter
    /// must be declared here. The `warn_on_impl` notice is logged on success
    /// and failure alike.
    pub fn verify(&self, hookimpl: &HookImpl) -> PluginResult<()> {
        if self.is_historic() && hookimpl.is_wrapper() {
            return Err(PluginError::validation(format!(
                "Plugin '{}' hook '{}': historic incompatible with hookwrapper",
                hookimpl.plugin_name(),
                self.name
            ))
            .for_plugin(hookimpl.plugin_name())
            .for_hook(&self.name));
        }

        if let Some(notice) = &self.options.warn_on_impl {
            warn!(
                plugin_name = %hookimpl.plugin_name(),
                hook = %self.name,
                "{notice}"
            );
        }

        let unknown = self.unknown_args(hookimpl.argnames());
        if !unknown.is_empty() {
            return Err(PluginError::validation(format!(
                "Plugin '{}' for hook '{}': argument(s) {:?} are declared in the \
                 implementation but can not be found in the specification {:?}",
                hookimpl.plugin_name(),
                self.name,
                unknown,
                self.argnames
            ))
            .for_plugin(hookimpl.plugin_name())
            .for_hook(&self.name));
        }

        Ok(())
    }
}

impl fmt::Display for HookSpecification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.argnames.join(", "))
    }
}

/// A source of hook specifications.
pub trait SpecNamespace: Send + Sync {
    /// Name used in diagnostics.
    fn namespace_name(&self) -> &str;

    /// Returns every specification this namespace declares, for any project.
    fn hook_specifications(&self) -> Vec<HookSpecification>;
}

/// A plain collection of specifications.
#[derive(Debug, Clone, Default)]
pub struct HookSpecs {
    name: String,
    specs: Vec<HookSpecification>,
}

impl HookSpecs {
    /// Creates an empty collection.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            specs: Vec::new(),
        }
    }

    /// Adds a specification.
    pub fn with(mut self, spec: HookSpecification) -> Self {
        self.specs.push(spec);
        self
    }

    /// Builds a collection from a name → specification mapping.
    ///
    /// Each key becomes the hook name. Keys must be valid identifiers.
    pub fn from_map<I>(name: impl Into<String>, map: I) -> PluginResult<Self>
    where
        I: IntoIterator<Item = (String, HookSpecification)>,
    {
        let name = name.into();
        let mut specs = Vec::new();
        for (key, mut spec) in map {
            ensure_identifier(&name, &key)?;
            spec.name = key;
            specs.push(spec);
        }
        Ok(Self { name, specs })
    }
}

impl SpecNamespace for HookSpecs {
    fn namespace_name(&self) -> &str {
        &self.name
    }

    fn hook_specifications(&self) -> Vec<HookSpecification> {
        self.specs.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hooks::markers::HookSpecMarker;
    use plugkit_core::ErrorKind;

    #[test]
    fn test_unknown_and_missing_args() {
        let spec = HookSpecMarker::new("demo")
            .specification("he_method1")
            .args(&["arg", "other"])
            .build();

        let declared = vec!["arg".to_string(), "bogus".to_string()];
        assert_eq!(spec.unknown_args(&declared), vec!["bogus"]);
        assert_eq!(spec.missing_args(&["arg"]), vec!["other"]);
        assert_eq!(spec.to_string(), "he_method1(arg, other)");
    }

    #[test]
    fn test_from_map_renames_and_validates_keys() {
        let marker = HookSpecMarker::new("demo");
        let specs = HookSpecs::from_map(
            "mapped",
            vec![("on_start".to_string(), marker.specification("ignored").build())],
        )
        .expect("valid keys");
        assert_eq!(specs.hook_specifications()[0].name, "on_start");

        let err = HookSpecs::from_map(
            "mapped",
            vec![("not valid".to_string(), marker.specification("x").build())],
        )
        .expect_err("invalid key");
        assert_eq!(err.kind, ErrorKind::InvalidNamespace);
    }
}
