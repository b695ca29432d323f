//! Multicall dispatcher: runs an ordered implementation list for one call.
//!
//! - Wrappers are opened in ordering order (first is outermost) and closed
//!   in reverse on every exit path, including errors.
//! - Plain implementations run in ordering order with their arguments
//!   projected down to the names they declare.
//! - Non-null results are collected; with `firstresult` the loop stops at
//!   the first one.
//! - An implementation error aborts the loop and travels through every
//!   open wrapper's `after` phase.

use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use plugkit_core::{PluginError, PluginResult};

use super::definitions::{HookArgs, HookReturn};
use super::implementation::{Handler, HookImpl, HookWrapper};

/// In-progress or final outcome of a hook call.
#[derive(Debug, Clone)]
pub struct HookOutcome {
    result: Result<HookReturn, PluginError>,
    implementation: Option<String>,
}

impl HookOutcome {
    /// A successful outcome.
    pub fn from_return(value: HookReturn) -> Self {
        Self {
            result: Ok(value),
            implementation: None,
        }
    }

    /// A failed outcome.
    pub fn from_error(err: PluginError) -> Self {
        Self {
            result: Err(err),
            implementation: None,
        }
    }

    /// The result, or the error that aborted the call.
    pub fn get_result(&self) -> Result<&HookReturn, &PluginError> {
        self.result.as_ref()
    }

    /// The error that aborted the call, if any.
    pub fn error(&self) -> Option<&PluginError> {
        self.result.as_ref().err()
    }

    /// Returns whether the call failed.
    pub fn is_err(&self) -> bool {
        self.result.is_err()
    }

    /// Replaces the outcome with a successful value.
    ///
    /// Clears any error, so the caller sees success. Wrappers that already
    /// closed have seen the error.
    pub fn force_result(&mut self, value: HookReturn) {
        self.result = Ok(value);
    }

    /// Replaces the outcome with an error.
    pub fn force_error(&mut self, err: PluginError) {
        self.result = Err(err);
    }

    /// Plugin whose implementation produced a firstresult value.
    pub fn implementation(&self) -> Option<&str> {
        self.implementation.as_deref()
    }

    /// Consumes the outcome.
    pub fn into_result(self) -> PluginResult<HookReturn> {
        self.result
    }
}

/// Runs `impls` for one call of `hook_name`.
///
/// `impls` must already be in dispatch order. Disabled implementations are
/// skipped.
pub fn multicall(
    hook_name: &str,
    impls: &[Arc<HookImpl>],
    args: &HookArgs,
    firstresult: bool,
) -> HookOutcome {
    debug!(hook = %hook_name, impl_count = impls.len(), "Dispatching hook");

    let mut entered: Vec<(&HookImpl, &Arc<dyn HookWrapper>, HookArgs)> = Vec::new();
    let mut aborted = None;

    for hookimpl in impls.iter().filter(|i| i.is_enabled()) {
        let Handler::Wrapper(wrapper) = hookimpl.handler() else {
            continue;
        };
        let projected = match project_args(hook_name, hookimpl, args) {
            Ok(projected) => projected,
            Err(err) => {
                aborted = Some(HookOutcome::from_error(err));
                break;
            }
        };
        if let Err(e) = wrapper.before(&projected) {
            aborted = Some(HookOutcome::from_error(call_error(hook_name, hookimpl, e)));
            break;
        }
        entered.push((hookimpl.as_ref(), wrapper, projected));
    }

    let mut outcome = match aborted {
        Some(outcome) => outcome,
        None => run_implementations(hook_name, impls, args, firstresult),
    };

    for (hookimpl, wrapper, projected) in entered.into_iter().rev() {
        if let Err(e) = wrapper.after(&projected, &mut outcome) {
            warn!(
                hook = %hook_name,
                plugin_name = %hookimpl.plugin_name(),
                error = %e,
                "Wrapper teardown failed"
            );
            outcome.force_error(call_error(hook_name, hookimpl, e));
        }
    }

    outcome
}

fn run_implementations(
    hook_name: &str,
    impls: &[Arc<HookImpl>],
    args: &HookArgs,
    firstresult: bool,
) -> HookOutcome {
    let mut results = Vec::new();

    for hookimpl in impls.iter().filter(|i| i.is_enabled()) {
        let Handler::Call(func) = hookimpl.handler() else {
            continue;
        };
        let projected = match project_args(hook_name, hookimpl, args) {
            Ok(projected) => projected,
            Err(err) => return HookOutcome::from_error(err),
        };

        match func(&projected) {
            Ok(Value::Null) => {}
            Ok(value) if firstresult => {
                debug!(
                    hook = %hook_name,
                    plugin_name = %hookimpl.plugin_name(),
                    "First result found"
                );
                return HookOutcome {
                    result: Ok(HookReturn::First(Some(value))),
                    implementation: Some(hookimpl.plugin_name().to_string()),
                };
            }
            Ok(value) => results.push(value),
            Err(e) => return HookOutcome::from_error(call_error(hook_name, hookimpl, e)),
        }
    }

    if firstresult {
        HookOutcome::from_return(HookReturn::First(None))
    } else {
        HookOutcome::from_return(HookReturn::All(results))
    }
}

fn project_args(hook_name: &str, hookimpl: &HookImpl, args: &HookArgs) -> PluginResult<HookArgs> {
    args.project(hookimpl.argnames()).map_err(|missing| {
        PluginError::argument_mismatch(format!(
            "Hook '{}' call must provide argument(s) {:?} required by plugin '{}'",
            hook_name,
            missing,
            hookimpl.plugin_name()
        ))
        .for_plugin(hookimpl.plugin_name())
        .for_hook(hook_name)
    })
}

fn call_error(hook_name: &str, hookimpl: &HookImpl, err: anyhow::Error) -> PluginError {
    PluginError::call(format!(
        "Error in plugin '{}', hook '{}': {}",
        hookimpl.plugin_name(),
        hook_name,
        err
    ))
    .for_plugin(hookimpl.plugin_name())
    .for_hook(hook_name)
    .caused_by(err)
}

#[cfg(test)]
mod tests {
    use super::*;

    use parking_lot::Mutex;
    use serde_json::json;

    use crate::hooks::definitions::Priority;
    use crate::hooks::implementation::HookImplementation;
    use crate::hooks::markers::HookImplMarker;
    use crate::registry::PluginId;
    use plugkit_core::ErrorKind;

    fn bind(name: &str, decl: HookImplementation) -> Arc<HookImpl> {
        Arc::new(HookImpl::new(PluginId::detached(), name, decl))
    }

    fn returning(name: &str, value: Value) -> Arc<HookImpl> {
        bind(
            name,
            HookImplMarker::new("test")
                .implementation("hook")
                .args(&["arg"])
                .call(move |_| Ok(value.clone())),
        )
    }

    struct Recorder {
        label: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl HookWrapper for Recorder {
        fn before(&self, _args: &HookArgs) -> anyhow::Result<()> {
            self.log.lock().push(format!("{} before", self.label));
            Ok(())
        }

        fn after(&self, _args: &HookArgs, outcome: &mut HookOutcome) -> anyhow::Result<()> {
            let state = if outcome.is_err() { "err" } else { "ok" };
            self.log.lock().push(format!("{} after {state}", self.label));
            Ok(())
        }
    }

    fn recorder(label: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<HookImpl> {
        bind(
            label,
            HookImplMarker::new("test").implementation("hook").wrapper(Recorder {
                label,
                log: log.clone(),
            }),
        )
    }

    #[test]
    fn test_collects_non_null_results_in_order() {
        let impls = vec![
            returning("a", json!(1)),
            returning("b", Value::Null),
            returning("c", json!(3)),
        ];
        let args = HookArgs::new().with_int("arg", 0);
        let outcome = multicall("hook", &impls, &args, false);
        assert_eq!(
            outcome.into_result().expect("call succeeds"),
            HookReturn::All(vec![json!(1), json!(3)])
        );
    }

    #[test]
    fn test_firstresult_stops_at_first_non_null() {
        let impls = vec![
            returning("a", Value::Null),
            returning("b", json!(5)),
            returning("c", json!(7)),
        ];
        let args = HookArgs::new().with_int("arg", 0);
        let outcome = multicall("hook", &impls, &args, true);
        assert_eq!(outcome.implementation(), Some("b"));
        assert_eq!(
            outcome.into_result().expect("call succeeds"),
            HookReturn::First(Some(json!(5)))
        );
    }

    #[test]
    fn test_firstresult_without_values() {
        let impls = vec![returning("a", Value::Null)];
        let outcome = multicall("hook", &impls, &HookArgs::new().with_int("arg", 0), true);
        assert_eq!(
            outcome.into_result().expect("call succeeds"),
            HookReturn::First(None)
        );
    }

    #[test]
    fn test_wrappers_nest_lifo_and_see_errors() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let failing = bind(
            "boom",
            HookImplMarker::new("test")
                .implementation("hook")
                .call(|_| Err(anyhow::anyhow!("boom"))),
        );
        let impls = vec![recorder("outer", &log), failing, recorder("inner", &log)];

        let outcome = multicall("hook", &impls, &HookArgs::new(), false);
        let err = outcome.into_result().expect_err("implementation fails");
        assert_eq!(err.kind, ErrorKind::Call);
        assert_eq!(err.plugin_name.as_deref(), Some("boom"));
        assert_eq!(
            *log.lock(),
            vec![
                "outer before",
                "inner before",
                "inner after err",
                "outer after err"
            ]
        );
    }

    #[test]
    fn test_wrapper_can_force_result() {
        struct Rescue;
        impl HookWrapper for Rescue {
            fn after(&self, _args: &HookArgs, outcome: &mut HookOutcome) -> anyhow::Result<()> {
                if outcome.is_err() {
                    outcome.force_result(HookReturn::All(vec![json!("rescued")]));
                }
                Ok(())
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let impls = vec![
            recorder("outer", &log),
            bind(
                "rescue",
                HookImplMarker::new("test").implementation("hook").wrapper(Rescue),
            ),
            bind(
                "boom",
                HookImplMarker::new("test")
                    .implementation("hook")
                    .call(|_| Err(anyhow::anyhow!("boom"))),
            ),
        ];
        let outcome = multicall("hook", &impls, &HookArgs::new(), false);
        assert_eq!(
            outcome.into_result().expect("rescued"),
            HookReturn::All(vec![json!("rescued")])
        );
        assert_eq!(*log.lock(), vec!["outer before", "outer after ok"]);
    }

    #[test]
    fn test_failing_before_only_tears_down_entered_wrappers() {
        struct Refuse;
        impl HookWrapper for Refuse {
            fn before(&self, _args: &HookArgs) -> anyhow::Result<()> {
                anyhow::bail!("refused")
            }
            fn after(&self, _args: &HookArgs, _outcome: &mut HookOutcome) -> anyhow::Result<()> {
                panic!("after must not run for a wrapper that never entered");
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let called = Arc::new(Mutex::new(false));
        let flag = called.clone();
        let impls = vec![
            recorder("outer", &log),
            bind(
                "refuse",
                HookImplMarker::new("test").implementation("hook").wrapper(Refuse),
            ),
            recorder("never", &log),
            bind(
                "plain",
                HookImplMarker::new("test").implementation("hook").call(move |_| {
                    *flag.lock() = true;
                    Ok(json!(1))
                }),
            ),
        ];
        let outcome = multicall("hook", &impls, &HookArgs::new(), false);
        assert!(outcome.is_err());
        assert!(!*called.lock());
        assert_eq!(*log.lock(), vec!["outer before", "outer after err"]);
    }

    #[test]
    fn test_failing_after_replaces_outcome() {
        struct BadTeardown;
        impl HookWrapper for BadTeardown {
            fn after(&self, _args: &HookArgs, _outcome: &mut HookOutcome) -> anyhow::Result<()> {
                anyhow::bail!("teardown failed")
            }
        }

        let log = Arc::new(Mutex::new(Vec::new()));
        let impls = vec![
            recorder("outer", &log),
            bind(
                "bad",
                HookImplMarker::new("test").implementation("hook").wrapper(BadTeardown),
            ),
            returning("a", json!(1)),
        ];
        let outcome = multicall("hook", &impls, &HookArgs::new().with_int("arg", 1), false);
        assert_eq!(outcome.error().map(|e| e.kind), Some(ErrorKind::Call));
        assert_eq!(*log.lock(), vec!["outer before", "outer after err"]);
    }

    #[test]
    fn test_argument_mismatch_is_per_implementation() {
        let calls = Arc::new(Mutex::new(Vec::new()));
        let (first, second) = (calls.clone(), calls.clone());
        let impls = vec![
            bind(
                "needs_arg",
                HookImplMarker::new("test")
                    .implementation("hook")
                    .args(&["arg"])
                    .call(move |_| {
                        first.lock().push("needs_arg");
                        Ok(json!(1))
                    }),
            ),
            bind(
                "needs_extra",
                HookImplMarker::new("test")
                    .implementation("hook")
                    .args(&["arg", "extra"])
                    .priority(Priority::Neutral)
                    .call(move |_| {
                        second.lock().push("needs_extra");
                        Ok(json!(2))
                    }),
            ),
        ];
        let outcome = multicall("hook", &impls, &HookArgs::new().with_int("arg", 1), false);
        let err = outcome.into_result().expect_err("extra is missing");
        assert_eq!(err.kind, ErrorKind::ArgumentMismatch);
        assert_eq!(err.plugin_name.as_deref(), Some("needs_extra"));
        assert_eq!(*calls.lock(), vec!["needs_arg"]);
    }

    #[test]
    fn test_disabled_implementation_is_skipped() {
        let a = returning("a", json!(1));
        let b = returning("b", json!(2));
        b.set_enabled(false);
        let outcome = multicall("hook", &[a, b], &HookArgs::new().with_int("arg", 0), false);
        assert_eq!(
            outcome.into_result().expect("call succeeds"),
            HookReturn::All(vec![json!(1)])
        );
    }
}
