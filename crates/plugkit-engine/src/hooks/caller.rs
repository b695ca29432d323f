//! Hook caller: the ordered implementations of one hook name.
//!
//! Implementations are kept in dispatch order: the `First` group, then
//! `Neutral`, then `Last`, each in reverse registration order. Every call
//! works on a snapshot of that list, so registrations made while a call is
//! running only affect later calls.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use tracing::{debug, warn};

use plugkit_core::{PluginError, PluginResult};

use super::definitions::{HookArgs, HookReturn, Priority};
use super::implementation::{HookFunction, HookImpl};
use super::spec::HookSpecification;
use crate::monitor::CallMonitors;
use crate::registry::PluginId;

/// Receives each result of a historic call, including replayed ones.
pub type ResultCallback = Arc<dyn Fn(&Value) + Send + Sync>;

#[derive(Clone)]
struct HistoricCall {
    args: HookArgs,
    callback: Option<ResultCallback>,
}

#[derive(Default)]
struct CallerState {
    spec: Option<Arc<HookSpecification>>,
    impls: Vec<Arc<HookImpl>>,
    history: Vec<HistoricCall>,
}

/// Owns the implementations, specification and call log of one hook.
pub struct HookCaller {
    name: String,
    state: RwLock<CallerState>,
    monitors: Arc<CallMonitors>,
}

impl HookCaller {
    pub(crate) fn new(name: &str, monitors: Arc<CallMonitors>) -> Self {
        Self {
            name: name.to_string(),
            state: RwLock::new(CallerState::default()),
            monitors,
        }
    }

    pub(crate) fn with_spec(spec: Arc<HookSpecification>, monitors: Arc<CallMonitors>) -> Self {
        Self {
            name: spec.name.clone(),
            state: RwLock::new(CallerState {
                spec: Some(spec),
                ..CallerState::default()
            }),
            monitors,
        }
    }

    /// Hook name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The bound specification, if any.
    pub fn spec(&self) -> Option<Arc<HookSpecification>> {
        self.state.read().spec.clone()
    }

    /// Returns whether a specification is bound.
    pub fn has_spec(&self) -> bool {
        self.state.read().spec.is_some()
    }

    /// Returns whether calls are logged and replayed.
    pub fn is_historic(&self) -> bool {
        self.state
            .read()
            .spec
            .as_ref()
            .is_some_and(|s| s.is_historic())
    }

    /// Returns whether calls stop at the first non-null result.
    pub fn is_firstresult(&self) -> bool {
        self.state
            .read()
            .spec
            .as_ref()
            .is_some_and(|s| s.is_firstresult())
    }

    /// Current implementations in dispatch order.
    pub fn get_hookimpls(&self) -> Vec<Arc<HookImpl>> {
        self.state.read().impls.clone()
    }

    /// Number of logged historic calls.
    pub fn history_len(&self) -> usize {
        self.state.read().history.len()
    }

    /// Binds a specification to a caller created without one.
    pub(crate) fn set_specification(&self, spec: Arc<HookSpecification>) -> PluginResult<()> {
        let mut state = self.state.write();
        if let Some(existing) = &state.spec {
            return Err(PluginError::validation(format!(
                "Hook '{}' already has a specification from project '{}'",
                self.name, existing.project_name
            ))
            .for_hook(&self.name));
        }
        state.spec = Some(spec);
        Ok(())
    }

    /// Inserts an implementation at the head of its priority group.
    pub(crate) fn add_hookimpl(&self, hookimpl: Arc<HookImpl>) {
        let mut state = self.state.write();
        let index = insertion_index(&state.impls, hookimpl.priority());
        debug!(
            hook = %self.name,
            plugin_name = %hookimpl.plugin_name(),
            priority = %hookimpl.priority(),
            position = index,
            "Hook implementation added"
        );
        state.impls.insert(index, hookimpl);
    }

    /// Removes every implementation owned by `plugin_id`.
    pub(crate) fn remove_plugin(&self, plugin_id: PluginId) -> usize {
        let mut state = self.state.write();
        let before = state.impls.len();
        state.impls.retain(|i| i.plugin_id() != plugin_id);
        before - state.impls.len()
    }

    /// Calls every implementation.
    ///
    /// Fails with a hook-call error on historic hooks; use
    /// [`HookCaller::call_historic`] there.
    pub fn call(&self, args: &HookArgs) -> PluginResult<HookReturn> {
        let (spec, impls) = {
            let state = self.state.read();
            (state.spec.clone(), state.impls.clone())
        };

        if spec.as_ref().is_some_and(|s| s.is_historic()) {
            return Err(PluginError::hook_call(format!(
                "Hook '{}' is historic and must be called with call_historic",
                self.name
            ))
            .for_hook(&self.name));
        }
        self.warn_missing_args(spec.as_deref(), args);

        let firstresult = spec.as_ref().is_some_and(|s| s.is_firstresult());
        self.monitors
            .execute(&self.name, &impls, args, firstresult)
            .into_result()
    }

    /// Calls a historic hook and logs the call for later implementations.
    ///
    /// `callback` receives every result in dispatch order now, and the
    /// first result of each implementation registered later.
    pub fn call_historic(
        &self,
        args: HookArgs,
        callback: Option<ResultCallback>,
    ) -> PluginResult<()> {
        // Logged before dispatch: implementations registered during this
        // call are replayed into it.
        let (spec, impls) = {
            let mut state = self.state.write();
            if !state.spec.as_ref().is_some_and(|s| s.is_historic()) {
                return Err(PluginError::hook_call(format!(
                    "Hook '{}' is not historic",
                    self.name
                ))
                .for_hook(&self.name));
            }
            state.history.push(HistoricCall {
                args: args.clone(),
                callback: callback.clone(),
            });
            (state.spec.clone(), state.impls.clone())
        };
        debug!(hook = %self.name, "Historic call recorded");
        self.warn_missing_args(spec.as_deref(), &args);

        let result = self
            .monitors
            .execute(&self.name, &impls, &args, false)
            .into_result();
        if let (Ok(values), Some(callback)) = (&result, &callback) {
            for value in values.values() {
                callback(value);
            }
        }

        result.map(|_| ())
    }

    /// Replays every logged call into a newly added implementation.
    ///
    /// A call in progress is already in the log. An implementation registered
    /// from inside that call is replayed into it at registration, so its
    /// callback result arrives before the live call's own results.
    pub(crate) fn apply_history(&self, hookimpl: &Arc<HookImpl>) -> PluginResult<()> {
        let history = self.state.read().history.clone();
        if history.is_empty() {
            return Ok(());
        }

        debug!(
            hook = %self.name,
            plugin_name = %hookimpl.plugin_name(),
            calls = history.len(),
            "Replaying historic calls"
        );

        let single = [hookimpl.clone()];
        for entry in history {
            let result = self
                .monitors
                .execute(&self.name, &single, &entry.args, false)
                .into_result()?;
            if let (Some(callback), Some(value)) = (&entry.callback, result.first()) {
                callback(value);
            }
        }
        Ok(())
    }

    /// Calls the hook with extra functions added for this call only.
    ///
    /// Extras join the end of the neutral group, after every registered
    /// neutral implementation.
    pub fn call_extra(
        &self,
        extras: Vec<HookFunction>,
        args: &HookArgs,
    ) -> PluginResult<HookReturn> {
        let (spec, mut impls) = {
            let state = self.state.read();
            (state.spec.clone(), state.impls.clone())
        };
        self.warn_missing_args(spec.as_deref(), args);

        for function in extras {
            let index = insertion_index(&impls, Priority::Last);
            impls.insert(index, Arc::new(HookImpl::detached(&self.name, function)));
        }

        let firstresult = spec.as_ref().is_some_and(|s| s.is_firstresult());
        self.monitors
            .execute(&self.name, &impls, args, firstresult)
            .into_result()
    }

    /// Calls only the implementation contributed by `plugin_name`.
    pub fn call_plugin(&self, plugin_name: &str, args: &HookArgs) -> PluginResult<Value> {
        let hookimpl = self
            .state
            .read()
            .impls
            .iter()
            .find(|i| i.plugin_name() == plugin_name && !i.is_wrapper())
            .cloned()
            .ok_or_else(|| {
                PluginError::not_found(format!(
                    "Plugin '{}' has no implementation for hook '{}'",
                    plugin_name, self.name
                ))
                .for_plugin(plugin_name)
                .for_hook(&self.name)
            })?;

        if !hookimpl.is_enabled() {
            return Err(PluginError::hook_call(format!(
                "Implementation of hook '{}' by plugin '{}' is disabled",
                self.name, plugin_name
            ))
            .for_plugin(plugin_name)
            .for_hook(&self.name));
        }

        let result = self
            .monitors
            .execute(&self.name, &[hookimpl], args, false)
            .into_result()?;
        Ok(result.into_values().into_iter().next().unwrap_or(Value::Null))
    }

    /// Enables or disables every implementation `plugin_name` contributed.
    ///
    /// Returns how many implementations changed state.
    pub fn set_plugin_enabled(&self, plugin_name: &str, enabled: bool) -> usize {
        let state = self.state.read();
        let mut changed = 0;
        for hookimpl in state.impls.iter().filter(|i| i.plugin_name() == plugin_name) {
            if hookimpl.is_enabled() != enabled {
                hookimpl.set_enabled(enabled);
                changed += 1;
            }
        }
        changed
    }

    fn warn_missing_args(&self, spec: Option<&HookSpecification>, args: &HookArgs) {
        let Some(spec) = spec else {
            return;
        };
        let missing = spec.missing_args(&args.keys());
        if !missing.is_empty() {
            warn!(
                hook = %self.name,
                missing = ?missing,
                "Argument(s) declared in the specification are not provided by this call"
            );
        }
    }
}

impl fmt::Debug for HookCaller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.state.read();
        f.debug_struct("HookCaller")
            .field("name", &self.name)
            .field("spec", &state.spec)
            .field("impls", &state.impls)
            .field("history", &state.history.len())
            .finish()
    }
}

fn insertion_index(impls: &[Arc<HookImpl>], priority: Priority) -> usize {
    let count = |p: Priority| impls.iter().filter(|i| i.priority() == p).count();
    match priority {
        Priority::First => 0,
        Priority::Neutral => count(Priority::First),
        Priority::Last => count(Priority::First) + count(Priority::Neutral),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    use crate::hooks::markers::{HookImplMarker, HookSpecMarker};

    fn hookimpl(plugin: &str, priority: Priority) -> Arc<HookImpl> {
        let value = json!(plugin);
        Arc::new(HookImpl::new(
            PluginId::detached(),
            plugin,
            HookImplMarker::new("test")
                .implementation("hook")
                .priority(priority)
                .call(move |_| Ok(value.clone())),
        ))
    }

    fn names(caller: &HookCaller) -> Vec<String> {
        caller
            .get_hookimpls()
            .iter()
            .map(|i| i.plugin_name().to_string())
            .collect()
    }

    #[test]
    fn test_ordering_groups_reverse_registration() {
        let caller = HookCaller::new("hook", Arc::new(CallMonitors::new()));
        caller.add_hookimpl(hookimpl("n1", Priority::Neutral));
        caller.add_hookimpl(hookimpl("l1", Priority::Last));
        caller.add_hookimpl(hookimpl("f1", Priority::First));
        caller.add_hookimpl(hookimpl("n2", Priority::Neutral));
        caller.add_hookimpl(hookimpl("l2", Priority::Last));
        caller.add_hookimpl(hookimpl("f2", Priority::First));

        assert_eq!(names(&caller), vec!["f2", "f1", "n2", "n1", "l2", "l1"]);
    }

    #[test]
    fn test_call_extra_does_not_mutate() {
        let caller = HookCaller::new("hook", Arc::new(CallMonitors::new()));
        caller.add_hookimpl(hookimpl("n1", Priority::Neutral));
        caller.add_hookimpl(hookimpl("l1", Priority::Last));

        let result = caller
            .call_extra(
                vec![HookFunction::new(&["arg"], |args| {
                    Ok(json!(args.get_i64("arg").unwrap_or_default() * 10))
                })],
                &HookArgs::new().with_int("arg", 1),
            )
            .expect("call succeeds");
        assert_eq!(
            result,
            HookReturn::All(vec![json!("n1"), json!(10), json!("l1")])
        );
        assert_eq!(names(&caller), vec!["n1", "l1"]);
    }

    #[test]
    fn test_historic_guards() {
        let monitors = Arc::new(CallMonitors::new());
        let plain = HookCaller::new("plain", monitors.clone());
        let err = plain
            .call_historic(HookArgs::new(), None)
            .expect_err("not historic");
        assert_eq!(err.kind, plugkit_core::ErrorKind::HookCall);

        let spec = HookSpecMarker::new("test")
            .specification("hist")
            .historic(true)
            .build();
        let historic = HookCaller::with_spec(Arc::new(spec), monitors);
        let err = historic.call(&HookArgs::new()).expect_err("historic");
        assert_eq!(err.kind, plugkit_core::ErrorKind::HookCall);

        historic
            .call_historic(HookArgs::new(), None)
            .expect("logs with no implementations");
        assert_eq!(historic.history_len(), 1);
    }

    #[test]
    fn test_set_specification_twice_fails() {
        let caller = HookCaller::new("hook", Arc::new(CallMonitors::new()));
        let spec = Arc::new(HookSpecMarker::new("test").specification("hook").build());
        caller.set_specification(spec.clone()).expect("first bind");
        assert!(caller.set_specification(spec).is_err());
    }

    #[test]
    fn test_call_plugin_and_enable_toggle() {
        let caller = HookCaller::new("hook", Arc::new(CallMonitors::new()));
        caller.add_hookimpl(hookimpl("a", Priority::Neutral));
        caller.add_hookimpl(hookimpl("b", Priority::Neutral));

        assert_eq!(
            caller.call_plugin("a", &HookArgs::new()).expect("a exists"),
            json!("a")
        );
        assert!(caller.call_plugin("zzz", &HookArgs::new()).is_err());

        assert_eq!(caller.set_plugin_enabled("b", false), 1);
        assert_eq!(
            caller.call(&HookArgs::new()).expect("call succeeds"),
            HookReturn::All(vec![json!("a")])
        );
        assert!(caller.call_plugin("b", &HookArgs::new()).is_err());
        assert_eq!(names(&caller), vec!["b", "a"]);
    }
}
