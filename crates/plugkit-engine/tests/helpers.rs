//! Shared test helpers for engine integration tests.
#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use plugkit_engine::exports::PluginExportBuilder;
use plugkit_engine::hooks::{
    HookArgs, HookImplMarker, HookOutcome, HookReturn, HookSpecMarker, HookSpecs, HookWrapper,
};
use plugkit_engine::{Plugin, PluginManager};

/// Project name every test marker uses.
pub const PROJECT: &str = "example";

/// Append-only log shared between a test and its plugins.
pub type Log = Arc<Mutex<Vec<Value>>>;

pub fn new_log() -> Log {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn implementations() -> HookImplMarker {
    HookImplMarker::new(PROJECT)
}

/// The specifications most tests run against.
pub fn specs() -> HookSpecs {
    let marker = HookSpecMarker::new(PROJECT);
    HookSpecs::new("ExampleSpecs")
        .with(marker.specification("he_method1").args(&["arg"]).build())
        .with(
            marker
                .specification("he_first")
                .args(&["arg"])
                .firstresult(true)
                .build(),
        )
        .with(
            marker
                .specification("he_historic")
                .args(&["arg"])
                .historic(true)
                .build(),
        )
}

/// A manager with [`specs`] already added.
pub fn manager() -> PluginManager {
    let pm = PluginManager::new(PROJECT);
    pm.add_hookspecs(&specs()).expect("Failed to add specs");
    pm
}

pub fn args(arg: i64) -> HookArgs {
    HookArgs::new().with_int("arg", arg)
}

/// A plugin implementing `hook` as `arg * factor`.
pub fn multiplier(name: &str, hook: &str, factor: i64) -> Arc<dyn Plugin> {
    PluginExportBuilder::new(name)
        .on(implementations()
            .implementation(hook)
            .args(&["arg"])
            .call(move |args| {
                let arg = args.require("arg")?.as_i64().unwrap_or_default();
                Ok(json!(arg * factor))
            }))
        .into_plugin()
}

/// Like [`multiplier`], but also appends every result to `log`.
pub fn recording_multiplier(name: &str, hook: &str, factor: i64, log: &Log) -> Arc<dyn Plugin> {
    let log = log.clone();
    PluginExportBuilder::new(name)
        .on(implementations()
            .implementation(hook)
            .args(&["arg"])
            .call(move |args| {
                let arg = args.require("arg")?.as_i64().unwrap_or_default();
                let result = json!(arg * factor);
                log.lock().push(result.clone());
                Ok(result)
            }))
        .into_plugin()
}

/// A plugin implementing `hook` with a fixed return value.
pub fn returning(name: &str, hook: &str, value: Value) -> Arc<dyn Plugin> {
    PluginExportBuilder::new(name)
        .on(implementations()
            .implementation(hook)
            .args(&["arg"])
            .call(move |_| Ok(value.clone())))
        .into_plugin()
}

/// A plugin whose implementation of `hook` always fails.
pub fn failing(name: &str, hook: &str) -> Arc<dyn Plugin> {
    PluginExportBuilder::new(name)
        .on(implementations()
            .implementation(hook)
            .args(&["arg"])
            .call(|_| Err(anyhow::anyhow!("boom"))))
        .into_plugin()
}

/// Wrapper that logs `before`/`after` events and the outcome it saw.
pub struct RecordingWrapper {
    pub label: &'static str,
    pub log: Log,
}

impl HookWrapper for RecordingWrapper {
    fn before(&self, args: &HookArgs) -> anyhow::Result<()> {
        self.log
            .lock()
            .push(json!(format!("{}:before:{}", self.label, args.get_i64("arg").unwrap_or_default())));
        Ok(())
    }

    fn after(&self, _args: &HookArgs, outcome: &mut HookOutcome) -> anyhow::Result<()> {
        let seen = match outcome.get_result() {
            Ok(result) => json!(result).to_string(),
            Err(err) => err.kind.to_string(),
        };
        self.log
            .lock()
            .push(json!(format!("{}:after:{}", self.label, seen)));
        Ok(())
    }
}

pub fn wrapper_plugin(name: &str, hook: &str, label: &'static str, log: &Log) -> Arc<dyn Plugin> {
    PluginExportBuilder::new(name)
        .on(implementations()
            .implementation(hook)
            .args(&["arg"])
            .wrapper(RecordingWrapper {
                label,
                log: log.clone(),
            }))
        .into_plugin()
}

/// Unwraps a collected result into its values.
pub fn values(result: HookReturn) -> Vec<Value> {
    match result {
        HookReturn::All(values) => values,
        HookReturn::First(value) => value.into_iter().collect(),
    }
}

pub fn logged(log: &Log) -> Vec<Value> {
    log.lock().clone()
}

/// A `tracing` event seen by [`capture_events`].
#[derive(Debug, Clone)]
pub struct CapturedEvent {
    pub level: tracing::Level,
    pub fields: BTreeMap<String, String>,
}

#[derive(Clone, Default)]
struct CaptureLayer {
    events: Arc<Mutex<Vec<CapturedEvent>>>,
}

struct FieldVisitor<'a> {
    fields: &'a mut BTreeMap<String, String>,
}

impl tracing::field::Visit for FieldVisitor<'_> {
    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        self.fields.insert(field.name().to_string(), value.to_string());
    }

    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        self.fields
            .insert(field.name().to_string(), format!("{value:?}"));
    }
}

impl<S: tracing::Subscriber> tracing_subscriber::Layer<S> for CaptureLayer {
    fn on_event(
        &self,
        event: &tracing::Event<'_>,
        _ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        let mut fields = BTreeMap::new();
        event.record(&mut FieldVisitor {
            fields: &mut fields,
        });
        self.events.lock().push(CapturedEvent {
            level: *event.metadata().level(),
            fields,
        });
    }
}

/// Runs `f` with a subscriber that records every event on this thread.
pub fn capture_events<T>(f: impl FnOnce() -> T) -> (T, Vec<CapturedEvent>) {
    use tracing_subscriber::layer::SubscriberExt as _;

    let capture = CaptureLayer::default();
    let subscriber = tracing_subscriber::registry().with(capture.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    let events = capture.events.lock().clone();
    (result, events)
}
