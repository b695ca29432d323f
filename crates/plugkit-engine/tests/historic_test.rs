//! Integration tests for historic hooks and replay.

mod helpers;

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::{Value, json};

use plugkit_core::ErrorKind;
use plugkit_engine::PluginManager;
use plugkit_engine::exports::PluginExportBuilder;
use plugkit_engine::hooks::ResultCallback;

fn collecting_callback() -> (ResultCallback, Arc<Mutex<Vec<Value>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let callback: ResultCallback = Arc::new(move |value: &Value| sink.lock().push(value.clone()));
    (callback, seen)
}

#[test]
fn test_registration_replays_logged_calls() {
    let pm = helpers::manager();
    let log = helpers::new_log();

    pm.call_historic("he_historic", helpers::args(1), None)
        .expect("no implementations yet");
    assert_eq!(pm.hook("he_historic").expect("caller").history_len(), 1);

    pm.register(helpers::recording_multiplier("identity", "he_historic", 1, &log), None)
        .expect("registers");
    assert_eq!(helpers::logged(&log), vec![json!(1)]);

    pm.register(helpers::recording_multiplier("times_ten", "he_historic", 10, &log), None)
        .expect("registers");
    assert_eq!(helpers::logged(&log), vec![json!(1), json!(10)]);

    pm.call_historic("he_historic", helpers::args(12), None)
        .expect("live call");
    assert_eq!(
        helpers::logged(&log),
        vec![json!(1), json!(10), json!(120), json!(12)]
    );
}

#[test]
fn test_result_callback_receives_live_and_replayed_results() {
    let pm = helpers::manager();
    let (callback, seen) = collecting_callback();

    pm.register(helpers::multiplier("times_ten", "he_historic", 10), None)
        .expect("registers");
    pm.call_historic("he_historic", helpers::args(1), Some(callback))
        .expect("live call");
    assert_eq!(seen.lock().clone(), vec![json!(10)]);

    pm.register(helpers::multiplier("times_twenty", "he_historic", 20), None)
        .expect("registers");
    pm.register(helpers::multiplier("times_thirty", "he_historic", 30), None)
        .expect("registers");
    assert_eq!(seen.lock().clone(), vec![json!(10), json!(20), json!(30)]);
}

#[test]
fn test_historic_hook_rejects_wrappers() {
    let pm = helpers::manager();
    let log = helpers::new_log();
    let err = pm
        .register(helpers::wrapper_plugin("wrap", "he_historic", "w", &log), None)
        .expect_err("wrappers cannot be historic");
    assert_eq!(err.kind, ErrorKind::Validation);
    assert!(!pm.is_registered("wrap"));
}

#[test]
fn test_failed_replay_rolls_back_registration() {
    let pm = helpers::manager();
    pm.call_historic("he_historic", helpers::args(1), None)
        .expect("no implementations yet");

    let err = pm
        .register(helpers::failing("broken", "he_historic"), None)
        .expect_err("replay fails");
    assert_eq!(err.kind, ErrorKind::Registration);
    assert_eq!(err.plugin_name.as_deref(), Some("broken"));
    assert!(!pm.is_registered("broken"));
    assert!(pm.hook("he_historic").expect("caller").get_hookimpls().is_empty());
}

#[test]
fn test_failed_live_call_is_still_logged() {
    let pm = helpers::manager();
    pm.register(helpers::failing("broken", "he_historic"), None)
        .expect("nothing to replay");

    let err = pm
        .call_historic("he_historic", helpers::args(1), None)
        .expect_err("implementation fails");
    assert_eq!(err.kind, ErrorKind::Call);
    assert_eq!(pm.hook("he_historic").expect("caller").history_len(), 1);
}

#[test]
fn test_plugin_registered_during_historic_call_receives_it() {
    let pm = Arc::new(helpers::manager());
    let log = helpers::new_log();
    let (callback, seen) = collecting_callback();

    let manager = Arc::downgrade(&pm);
    let late_log = log.clone();
    let starter = PluginExportBuilder::new("starter")
        .on(helpers::implementations()
            .implementation("he_historic")
            .args(&["arg"])
            .call(move |args| {
                let pm: Arc<PluginManager> = manager
                    .upgrade()
                    .ok_or_else(|| anyhow::anyhow!("manager dropped"))?;
                pm.register(
                    helpers::recording_multiplier("late", "he_historic", 10, &late_log),
                    None,
                )?;
                Ok(args.require("arg")?.clone())
            }))
        .into_plugin();
    pm.register(starter, None).expect("registers");

    pm.call_historic("he_historic", helpers::args(1), Some(callback))
        .expect("live call");

    assert!(pm.is_registered("late"));
    assert_eq!(helpers::logged(&log), vec![json!(10)]);
    // The late plugin is replayed while the live call is still running.
    assert_eq!(seen.lock().clone(), vec![json!(10), json!(1)]);
    assert_eq!(pm.hook("he_historic").expect("caller").history_len(), 1);
}
