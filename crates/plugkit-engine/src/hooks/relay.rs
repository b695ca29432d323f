//! Hook relay: the name → caller namespace of one manager.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::caller::HookCaller;
use super::spec::HookSpecification;
use crate::monitor::CallMonitors;

/// Named access to hook callers, with a one-shot discovery flag.
#[derive(Debug)]
pub struct HookRelay {
    callers: RwLock<BTreeMap<String, Arc<HookCaller>>>,
    needs_discovery: AtomicBool,
}

impl HookRelay {
    pub(crate) fn new(needs_discovery: bool) -> Self {
        Self {
            callers: RwLock::new(BTreeMap::new()),
            needs_discovery: AtomicBool::new(needs_discovery),
        }
    }

    /// Looks up a caller without triggering discovery.
    pub fn get(&self, name: &str) -> Option<Arc<HookCaller>> {
        self.callers.read().get(name).cloned()
    }

    /// Returns whether a caller exists for `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.callers.read().contains_key(name)
    }

    /// Hook names, sorted.
    pub fn names(&self) -> Vec<String> {
        self.callers.read().keys().cloned().collect()
    }

    /// Every `(name, caller)` pair, sorted by name.
    pub fn items(&self) -> Vec<(String, Arc<HookCaller>)> {
        self.callers
            .read()
            .iter()
            .map(|(name, caller)| (name.clone(), caller.clone()))
            .collect()
    }

    /// Every caller, sorted by name.
    pub fn values(&self) -> Vec<Arc<HookCaller>> {
        self.callers.read().values().cloned().collect()
    }

    pub(crate) fn get_or_create(&self, name: &str, monitors: &Arc<CallMonitors>) -> Arc<HookCaller> {
        self.callers
            .write()
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(HookCaller::new(name, monitors.clone())))
            .clone()
    }

    pub(crate) fn insert_with_spec(
        &self,
        spec: Arc<HookSpecification>,
        monitors: &Arc<CallMonitors>,
    ) -> Arc<HookCaller> {
        let caller = Arc::new(HookCaller::with_spec(spec, monitors.clone()));
        self.callers
            .write()
            .insert(caller.name().to_string(), caller.clone());
        caller
    }

    /// Returns whether the next hook lookup will run discovery.
    pub fn needs_discovery(&self) -> bool {
        self.needs_discovery.load(Ordering::Acquire)
    }

    /// Clears the flag, returning whether it was set.
    pub(crate) fn take_discovery(&self) -> bool {
        self.needs_discovery.swap(false, Ordering::AcqRel)
    }

    pub(crate) fn set_needs_discovery(&self, value: bool) {
        self.needs_discovery.store(value, Ordering::Release);
    }
}
