//! Hook implementations: plain callables and two-phase wrappers.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde_json::Value;

use super::definitions::{HookArgs, Priority};
use super::dispatcher::HookOutcome;
use crate::registry::PluginId;

/// A plain hook function.
///
/// Returning `Value::Null` means "no result" and is not collected.
pub type HookFn = Arc<dyn Fn(&HookArgs) -> anyhow::Result<Value> + Send + Sync>;

/// An implementation that brackets the rest of a hook call.
///
/// `before` runs on entry, in ordering order. `after` runs on every exit
/// path in reverse entry order and may replace the outcome.
pub trait HookWrapper: Send + Sync {
    /// Runs before the inner implementations.
    fn before(&self, _args: &HookArgs) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs after the inner implementations with the in-progress outcome.
    fn after(&self, args: &HookArgs, outcome: &mut HookOutcome) -> anyhow::Result<()>;
}

/// What an implementation runs when called.
#[derive(Clone)]
pub enum Handler {
    /// A plain callable.
    Call(HookFn),
    /// A two-phase wrapper.
    Wrapper(Arc<dyn HookWrapper>),
}

impl fmt::Debug for Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Call(_) => f.write_str("Call(<closure>)"),
            Self::Wrapper(_) => f.write_str("Wrapper(<wrapper>)"),
        }
    }
}

/// A callable with the parameter names it accepts.
///
/// Used for mapping plugins and for one-off `call_extra` dispatches.
#[derive(Clone)]
pub struct HookFunction {
    /// Declared parameter names.
    pub argnames: Vec<String>,
    /// The callable.
    pub func: HookFn,
}

impl HookFunction {
    /// Creates a function declaring `argnames`.
    pub fn new<F>(argnames: &[&str], func: F) -> Self
    where
        F: Fn(&HookArgs) -> anyhow::Result<Value> + Send + Sync + 'static,
    {
        Self {
            argnames: argnames.iter().map(|s| s.to_string()).collect(),
            func: Arc::new(func),
        }
    }
}

impl fmt::Debug for HookFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookFunction")
            .field("argnames", &self.argnames)
            .field("func", &"<closure>")
            .finish()
    }
}

/// An implementation as declared by a plugin, before registration.
#[derive(Debug, Clone)]
pub struct HookImplementation {
    /// Project whose marker produced this declaration.
    pub project_name: String,
    /// Name the plugin declared the function under.
    pub function_name: String,
    /// Overrides the target hook name.
    pub specname: Option<String>,
    /// Declared parameter names.
    pub argnames: Vec<String>,
    /// Whether a missing specification is tolerated by `check_pending`.
    pub optional: bool,
    /// Ordering group.
    pub priority: Priority,
    /// What runs when the hook is called.
    pub handler: Handler,
}

impl HookImplementation {
    /// Name of the hook this declaration targets.
    pub fn hook_name(&self) -> &str {
        self.specname.as_deref().unwrap_or(&self.function_name)
    }

    /// Returns whether this declaration is a wrapper.
    pub fn is_wrapper(&self) -> bool {
        matches!(self.handler, Handler::Wrapper(_))
    }
}

/// An implementation attached to a hook caller.
pub struct HookImpl {
    plugin_id: PluginId,
    plugin_name: String,
    hook_name: String,
    function_name: String,
    argnames: Vec<String>,
    optional: bool,
    priority: Priority,
    handler: Handler,
    enabled: AtomicBool,
}

impl HookImpl {
    /// Binds a declaration to the plugin that registered it.
    pub fn new(plugin_id: PluginId, plugin_name: &str, declaration: HookImplementation) -> Self {
        let hook_name = declaration.hook_name().to_string();
        Self {
            plugin_id,
            plugin_name: plugin_name.to_string(),
            hook_name,
            function_name: declaration.function_name,
            argnames: declaration.argnames,
            optional: declaration.optional,
            priority: declaration.priority,
            handler: declaration.handler,
            enabled: AtomicBool::new(true),
        }
    }

    /// A temporary implementation not owned by any plugin.
    pub(crate) fn detached(hook_name: &str, function: HookFunction) -> Self {
        Self {
            plugin_id: PluginId::detached(),
            plugin_name: "<temp>".to_string(),
            hook_name: hook_name.to_string(),
            function_name: hook_name.to_string(),
            argnames: function.argnames,
            optional: true,
            priority: Priority::Neutral,
            handler: Handler::Call(function.func),
            enabled: AtomicBool::new(true),
        }
    }

    /// Identity of the owning plugin.
    pub fn plugin_id(&self) -> PluginId {
        self.plugin_id
    }

    /// Canonical name of the owning plugin.
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Target hook name.
    pub fn hook_name(&self) -> &str {
        &self.hook_name
    }

    /// Name the function was declared under.
    pub fn function_name(&self) -> &str {
        &self.function_name
    }

    /// Declared parameter names.
    pub fn argnames(&self) -> &[String] {
        &self.argnames
    }

    /// Whether a missing specification is tolerated.
    pub fn is_optional(&self) -> bool {
        self.optional
    }

    /// Ordering group.
    pub fn priority(&self) -> Priority {
        self.priority
    }

    /// What runs when the hook is called.
    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Whether this implementation is a wrapper.
    pub fn is_wrapper(&self) -> bool {
        matches!(self.handler, Handler::Wrapper(_))
    }

    /// Whether dispatch currently runs this implementation.
    pub fn is_enabled(&self) -> bool {
        self.enabled.load(Ordering::Acquire)
    }

    /// Turns this implementation on or off without moving it.
    pub fn set_enabled(&self, enabled: bool) {
        self.enabled.store(enabled, Ordering::Release);
    }
}

impl fmt::Debug for HookImpl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HookImpl")
            .field("plugin_name", &self.plugin_name)
            .field("hook_name", &self.hook_name)
            .field("argnames", &self.argnames)
            .field("priority", &self.priority)
            .field("wrapper", &self.is_wrapper())
            .field("optional", &self.optional)
            .field("enabled", &self.is_enabled())
            .finish()
    }
}
