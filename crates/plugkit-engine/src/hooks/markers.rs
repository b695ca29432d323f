//! Project-scoped markers for declaring specifications and implementations.
//!
//! A marker carries a project name; the manager only picks up declarations
//! whose project matches its own, so several hosts can share plugin types.

use std::sync::Arc;

use serde_json::Value;

use super::definitions::{HookArgs, Priority};
use super::implementation::{Handler, HookImplementation, HookWrapper};
use super::spec::{HookSpecification, SpecOptions};

/// Produces specification declarations for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookSpecMarker {
    project_name: String,
}

impl HookSpecMarker {
    /// Creates a marker for `project_name`.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
        }
    }

    /// The project this marker belongs to.
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Starts declaring the specification `name`.
    pub fn specification(&self, name: impl Into<String>) -> SpecBuilder {
        SpecBuilder {
            spec: HookSpecification {
                project_name: self.project_name.clone(),
                name: name.into(),
                argnames: Vec::new(),
                options: SpecOptions::default(),
            },
        }
    }
}

/// Builder for one specification.
#[derive(Debug, Clone)]
pub struct SpecBuilder {
    spec: HookSpecification,
}

impl SpecBuilder {
    /// Sets the declared parameter names.
    pub fn args(mut self, argnames: &[&str]) -> Self {
        self.spec.argnames = argnames.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Return only the first non-null result.
    pub fn firstresult(mut self, firstresult: bool) -> Self {
        self.spec.options.firstresult = firstresult;
        self
    }

    /// Log calls and replay them to later implementations.
    pub fn historic(mut self, historic: bool) -> Self {
        self.spec.options.historic = historic;
        self
    }

    /// Log `notice` whenever an implementation is attached.
    pub fn warn_on_impl(mut self, notice: impl Into<String>) -> Self {
        self.spec.options.warn_on_impl = Some(notice.into());
        self
    }

    /// Finishes the declaration.
    pub fn build(self) -> HookSpecification {
        self.spec
    }
}

/// Produces implementation declarations for one project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookImplMarker {
    project_name: String,
}

impl HookImplMarker {
    /// Creates a marker for `project_name`.
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            project_name: project_name.into(),
        }
    }

    /// The project this marker belongs to.
    pub fn project_name(&self) -> &str {
        &self.project_name
    }

    /// Starts declaring the function `function_name`.
    ///
    /// The function targets the hook of the same name unless
    /// [`ImplBuilder::specname`] overrides it.
    pub fn implementation(&self, function_name: impl Into<String>) -> ImplBuilder {
        ImplBuilder {
            project_name: self.project_name.clone(),
            function_name: function_name.into(),
            specname: None,
            argnames: Vec::new(),
            optional: false,
            priority: Priority::Neutral,
        }
    }
}

/// Builder for one implementation.
#[derive(Debug, Clone)]
pub struct ImplBuilder {
    project_name: String,
    function_name: String,
    specname: Option<String>,
    argnames: Vec<String>,
    optional: bool,
    priority: Priority,
}

impl ImplBuilder {
    /// Sets the declared parameter names.
    pub fn args(mut self, argnames: &[&str]) -> Self {
        self.argnames = argnames.iter().map(|s| s.to_string()).collect();
        self
    }

    /// Tolerate a hook without specification.
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Sets the ordering group.
    pub fn priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    /// Shorthand for [`Priority::First`].
    pub fn tryfirst(self) -> Self {
        self.priority(Priority::First)
    }

    /// Shorthand for [`Priority::Last`].
    pub fn trylast(self) -> Self {
        self.priority(Priority::Last)
    }

    /// Targets `specname` instead of the function name.
    pub fn specname(mut self, specname: impl Into<String>) -> Self {
        self.specname = Some(specname.into());
        self
    }

    /// Finishes the declaration with a plain callable.
    pub fn call<F>(self, func: F) -> HookImplementation
    where
        F: Fn(&HookArgs) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        self.finish(Handler::Call(Arc::new(func)))
    }

    /// Finishes the declaration with a wrapper.
    pub fn wrapper<W>(self, wrapper: W) -> HookImplementation
    where
        W: HookWrapper + 'static,
    {
        self.finish(Handler::Wrapper(Arc::new(wrapper)))
    }

    fn finish(self, handler: Handler) -> HookImplementation {
        HookImplementation {
            project_name: self.project_name,
            function_name: self.function_name,
            specname: self.specname,
            argnames: self.argnames,
            optional: self.optional,
            priority: self.priority,
            handler,
        }
    }
}
