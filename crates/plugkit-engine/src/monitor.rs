//! Hook call monitoring.
//!
//! Monitors wrap every dispatch that goes through a hook caller. The newest
//! monitor is the outermost: its `before` runs first and its `after` last.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::debug;

use crate::hooks::definitions::HookArgs;
use crate::hooks::dispatcher::{HookOutcome, multicall};
use crate::hooks::implementation::HookImpl;

/// Called ahead of every hook call with the hook name, implementations and arguments.
pub type BeforeCall = Arc<dyn Fn(&str, &[Arc<HookImpl>], &HookArgs) + Send + Sync>;

/// Called after every hook call with the outcome, hook name, implementations and arguments.
pub type AfterCall = Arc<dyn Fn(&HookOutcome, &str, &[Arc<HookImpl>], &HookArgs) + Send + Sync>;

#[derive(Clone)]
struct Monitor {
    id: u64,
    before: BeforeCall,
    after: AfterCall,
}

/// The set of active call monitors shared by every hook caller of a manager.
#[derive(Default)]
pub struct CallMonitors {
    monitors: RwLock<Vec<Monitor>>,
    next_id: AtomicU64,
}

impl CallMonitors {
    /// Creates an empty monitor set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs a monitor and returns the handle that removes it.
    pub fn add(self: &Arc<Self>, before: BeforeCall, after: AfterCall) -> MonitorHandle {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.monitors.write().push(Monitor { id, before, after });
        debug!(monitor_id = id, "Hook call monitor added");
        MonitorHandle {
            id,
            monitors: Arc::downgrade(self),
        }
    }

    /// Number of installed monitors.
    pub fn len(&self) -> usize {
        self.monitors.read().len()
    }

    /// Returns whether no monitor is installed.
    pub fn is_empty(&self) -> bool {
        self.monitors.read().is_empty()
    }

    fn remove(&self, id: u64) -> bool {
        let mut monitors = self.monitors.write();
        let before = monitors.len();
        monitors.retain(|m| m.id != id);
        before != monitors.len()
    }

    /// Runs one dispatch inside every installed monitor.
    pub(crate) fn execute(
        &self,
        hook_name: &str,
        impls: &[Arc<HookImpl>],
        args: &HookArgs,
        firstresult: bool,
    ) -> HookOutcome {
        let monitors = self.monitors.read().clone();

        for monitor in monitors.iter().rev() {
            (monitor.before)(hook_name, impls, args);
        }

        let outcome = multicall(hook_name, impls, args, firstresult);

        for monitor in &monitors {
            (monitor.after)(&outcome, hook_name, impls, args);
        }

        outcome
    }
}

/// Removes the monitor it was returned for.
#[derive(Debug)]
pub struct MonitorHandle {
    id: u64,
    monitors: Weak<CallMonitors>,
}

impl MonitorHandle {
    /// Removes the monitor. Returns `false` if it was already gone.
    pub fn undo(self) -> bool {
        match self.monitors.upgrade() {
            Some(monitors) => {
                let removed = monitors.remove(self.id);
                debug!(monitor_id = self.id, "Hook call monitor removed");
                removed
            }
            None => false,
        }
    }
}

/// Monitor callbacks that emit `tracing` events for every hook call.
pub fn tracing_monitor() -> (BeforeCall, AfterCall) {
    let before: BeforeCall =
        Arc::new(|hook_name: &str, impls: &[Arc<HookImpl>], args: &HookArgs| {
            debug!(
                hook = %hook_name,
                impl_count = impls.len(),
                args = ?args.data,
                "hook call"
            );
        });
    let after: AfterCall = Arc::new(
        |outcome: &HookOutcome, hook_name: &str, _impls: &[Arc<HookImpl>], _args: &HookArgs| {
            match outcome.get_result() {
                Ok(result) => debug!(hook = %hook_name, result = ?result, "hook finish"),
                Err(e) => debug!(hook = %hook_name, error = %e, "hook failed"),
            }
        },
    );
    (before, after)
}
