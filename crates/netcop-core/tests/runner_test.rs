//! ShellRunner against a real shell in a temporary directory.
#![cfg(unix)]
#![allow(clippy::unwrap_used)]

use std::os::unix::fs::PermissionsExt;

use chrono::{Local, TimeDelta};
use netcop_core::{
    CoreError, DispatchConfig, DispatchOutcome, DispatchState, Dispatcher, EntityId, MacAddress,
    MemoryStore, Policy, ScriptRunner, ShellRunner, ShellScriptRenderer, Target, TargetRole,
};

fn runner(dir: &tempfile::TempDir) -> ShellRunner {
    ShellRunner::new(dir.path().join("dispatch.sh"), "/bin/sh")
}

#[tokio::test]
async fn writes_executes_and_records_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(&dir);
    let marker = dir.path().join("ran");

    assert_eq!(runner.last_dispatch().unwrap(), None);

    let script = format!("#!/bin/sh\necho applied > '{}'\n", marker.display());
    runner.apply(&script).await.unwrap();

    assert_eq!(std::fs::read_to_string(&marker).unwrap(), "applied\n");
    assert_eq!(std::fs::read_to_string(runner.script_path()).unwrap(), script);
    assert!(runner.last_dispatch().unwrap().is_some());

    let mode = std::fs::metadata(runner.script_path()).unwrap().permissions().mode();
    assert_eq!(mode & 0o777, 0o755);
    assert!(!dir.path().join("dispatch.sh.tmp").exists());
}

#[tokio::test]
async fn failing_script_reports_status_and_stderr() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(&dir);

    let err = runner
        .apply("echo 'no such chain' >&2\nexit 3\n")
        .await
        .unwrap_err();
    match err {
        CoreError::ScriptFailed { status, stderr } => {
            assert!(status.contains('3'), "status was {status}");
            assert_eq!(stderr, "no such chain");
        }
        other => panic!("expected ScriptFailed, got {other:?}"),
    }
    // A failed run is not a dispatch.
    assert!(!runner.script_path().exists());
    assert!(!dir.path().join("dispatch.sh.tmp").exists());
    assert_eq!(runner.last_dispatch().unwrap(), None);
}

#[tokio::test]
async fn failure_keeps_the_previous_dispatch() {
    let dir = tempfile::tempdir().unwrap();
    let runner = runner(&dir);

    runner.apply("true\n").await.unwrap();
    let recorded = runner.last_dispatch().unwrap();
    assert!(recorded.is_some());

    runner.apply("exit 1\n").await.unwrap_err();
    assert_eq!(runner.last_dispatch().unwrap(), recorded);
    assert_eq!(std::fs::read_to_string(runner.script_path()).unwrap(), "true\n");
}

#[tokio::test]
async fn failed_cycle_is_retried_next_tick() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("dispatch.sh");
    let store = MemoryStore::new()
        .with_policy(Policy::new(1, "always"))
        .with_target(Target {
            id: EntityId::new(1),
            policy_id: EntityId::new(1),
            role: TargetRole::Source,
            class_id: None,
            mac: Some(MacAddress::parse("00:00:00:00:00:01").unwrap()),
        });
    let now = Local::now().naive_local();

    let failing = Dispatcher::with_parts(
        DispatchConfig::default(),
        ShellScriptRenderer,
        ShellRunner::new(&path, "/bin/false"),
    );
    let err = failing.run_cycle(&store, now, false).await.unwrap_err();
    assert!(matches!(err, CoreError::ScriptFailed { .. }));
    assert_eq!(
        failing.evaluate(&store, now + TimeDelta::minutes(1)).unwrap(),
        DispatchState::NoPriorDispatch
    );

    let working = Dispatcher::with_parts(
        DispatchConfig::default(),
        ShellScriptRenderer,
        ShellRunner::new(&path, "/bin/true"),
    );
    let outcome = working
        .run_cycle(&store, now + TimeDelta::minutes(1), false)
        .await
        .unwrap();
    assert_eq!(outcome, DispatchOutcome::Applied { policies: 1, rules: 1 });
    assert!(path.exists());
}

#[tokio::test]
async fn unwritable_location_is_a_write_error() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ShellRunner::new(dir.path().join("missing").join("dispatch.sh"), "/bin/sh");

    let err = runner.apply("true\n").await.unwrap_err();
    assert!(matches!(err, CoreError::ScriptWrite { .. }));
    assert_eq!(runner.last_dispatch().unwrap(), None);
}

#[tokio::test]
async fn missing_shell_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let runner = ShellRunner::new(dir.path().join("dispatch.sh"), dir.path().join("no-shell"));

    let err = runner.apply("true\n").await.unwrap_err();
    assert!(matches!(err, CoreError::ScriptFailed { .. }));
}
