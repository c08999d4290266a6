// tests/cli_run.rs

#![cfg(unix)]

use std::io::Write;
use std::path::Path;

use flowgraph::cli::CliArgs;
use flowgraph::run;
use flowgraph::types::RunState;
use flowgraph_test_utils::{init_tracing, with_timeout};
use tempfile::NamedTempFile;

fn args(config: &NamedTempFile, state: &Path) -> CliArgs {
    CliArgs {
        config: Some(config.path().to_path_buf()),
        state: Some(state.to_path_buf()),
        run_key: Some("test".to_string()),
        fresh: false,
        log_level: None,
        dry_run: false,
    }
}

fn config_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{contents}").unwrap();
    file
}

#[tokio::test]
async fn shell_steps_run_in_dependency_order() {
    init_tracing();
    let out_dir = tempfile::tempdir().unwrap();
    let out = out_dir.path().join("order.txt");
    let file = config_file(&format!(
        r#"
[flow]
name = "shell"
poll_interval = "50ms"

[step.first]
cmd = "echo first >> {out}"

[step.second]
cmd = "echo second >> {out}"
after = ["first"]
"#,
        out = out.display()
    ));

    let state = out_dir.path().join("state.toml");
    let outcome = with_timeout(run(args(&file, &state))).await.unwrap().expect("not a dry run");

    assert_eq!(outcome.state, RunState::Processed);
    assert_eq!(outcome.dispatched, ["first", "second"]);
    let written = std::fs::read_to_string(&out).unwrap();
    assert_eq!(written.lines().collect::<Vec<_>>(), ["first", "second"]);
}

#[tokio::test]
async fn non_zero_exit_invalidates_the_run() {
    let file = config_file(
        r#"
[flow]
name = "shell"
poll_interval = "50ms"

[step.broken]
cmd = "exit 7"

[step.after_broken]
cmd = "true"
after = ["broken"]
"#,
    );

    let state_dir = tempfile::tempdir().unwrap();
    let state = state_dir.path().join("state.toml");
    let outcome = with_timeout(run(args(&file, &state))).await.unwrap().expect("not a dry run");

    assert_eq!(outcome.state, RunState::Invalid);
    assert_eq!(outcome.failed, ["broken"]);
    assert_eq!(outcome.skipped, ["after_broken"]);
}

#[tokio::test]
async fn dry_run_executes_nothing() {
    let out_dir = tempfile::tempdir().unwrap();
    let marker = out_dir.path().join("ran");
    let file = config_file(&format!(
        r#"
[flow]
name = "shell"

[step.touch]
cmd = "touch {marker}"
"#,
        marker = marker.display()
    ));

    let state = out_dir.path().join("state.toml");
    let mut dry = args(&file, &state);
    dry.dry_run = true;

    assert!(run(dry).await.unwrap().is_none());
    assert!(!marker.exists());
    assert!(!state.exists());
}

fn resumable_flow(out: &Path, gate: &Path) -> NamedTempFile {
    config_file(&format!(
        r#"
[flow]
name = "resumable"
poll_interval = "50ms"

[step.first]
cmd = "echo first >> {out}"

[step.second]
cmd = "test -f {gate} && echo second >> {out}"
after = ["first"]
"#,
        out = out.display(),
        gate = gate.display()
    ))
}

fn lines(path: &Path) -> Vec<String> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect()
}

#[tokio::test]
async fn failed_run_resumes_from_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("order.txt");
    let gate = dir.path().join("gate");
    let state = dir.path().join("state").join("flow.toml");
    let file = resumable_flow(&out, &gate);

    let first = with_timeout(run(args(&file, &state))).await.unwrap().expect("not a dry run");
    assert_eq!(first.state, RunState::Invalid);
    assert_eq!(first.failed, ["second"]);
    assert!(state.exists());

    std::fs::write(&gate, "").unwrap();
    let second = with_timeout(run(args(&file, &state))).await.unwrap().expect("not a dry run");

    assert_eq!(second.state, RunState::Processed);
    assert_eq!(second.dispatched, ["second"]);
    assert_eq!(lines(&out), ["first", "second"]);
}

#[tokio::test]
async fn fresh_run_ignores_state_file() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("order.txt");
    let gate = dir.path().join("gate");
    std::fs::write(&gate, "").unwrap();
    let state = dir.path().join("state.toml");
    let file = resumable_flow(&out, &gate);

    let first = with_timeout(run(args(&file, &state))).await.unwrap().expect("not a dry run");
    assert_eq!(first.dispatched, ["first", "second"]);

    let resumed = with_timeout(run(args(&file, &state))).await.unwrap().expect("not a dry run");
    assert!(resumed.dispatched.is_empty());
    assert!(resumed.is_success());

    let mut fresh = args(&file, &state);
    fresh.fresh = true;
    let rerun = with_timeout(run(fresh)).await.unwrap().expect("not a dry run");
    assert_eq!(rerun.dispatched, ["first", "second"]);
    assert_eq!(lines(&out), ["first", "second", "first", "second"]);
}
