// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{run_checked, CommandRunner, Invocation, SystemRunner};
use crate::error::ErrorCode;
use crate::test_support::FakeRunner;

#[test]
fn display_omits_environment() {
    let inv = Invocation::new("ssh-add", ["/tmp/key"])
        .with_env(vec![("GERRIT_FETCH_KEY_PASSPHRASE".to_owned(), "hunter2".to_owned())]);
    assert_eq!(inv.to_string(), "ssh-add /tmp/key");
}

#[test]
fn system_runner_combines_output() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let inv = Invocation::new("sh", ["-c", "echo out; echo err >&2; pwd; exit 3"])
        .with_dir(dir.path())
        .with_env(vec![("UNUSED".to_owned(), "1".to_owned())]);
    let out = SystemRunner.run(&inv)?;
    assert_eq!(out.status, Some(3));
    assert!(!out.success());
    assert!(out.output.contains("out\n"));
    assert!(out.output.contains("err\n"));
    Ok(())
}

#[test]
fn system_runner_passes_env() -> anyhow::Result<()> {
    let inv = Invocation::new("sh", ["-c", "printf %s \"$GERRIT_FETCH_PROBE\""])
        .with_env(vec![("GERRIT_FETCH_PROBE".to_owned(), "visible".to_owned())]);
    let out = SystemRunner.run(&inv)?;
    assert!(out.success());
    assert_eq!(out.output, "visible");
    Ok(())
}

#[test]
fn run_checked_reports_exit_status() {
    let runner = FakeRunner::new().respond("git", "fetch", 128, "fatal: couldn't find remote ref\n");
    let err = run_checked(&runner, &Invocation::new("git", ["fetch", "origin", "refs/x"])).err();
    let err = match err {
        Some(e) => e,
        None => panic!("expected failure"),
    };
    assert_eq!(err.code(), ErrorCode::Resource);
    assert_eq!(
        err.to_string(),
        "git fetch origin refs/x failed (exit status 128): fatal: couldn't find remote ref"
    );
}

#[test]
fn run_checked_reports_spawn_failure() {
    let runner = FakeRunner::new().fail_spawn("ssh-agent", "-s");
    crate::assert_err_contains!(
        run_checked(&runner, &Invocation::new("ssh-agent", ["-s"])),
        "failed to run ssh-agent"
    );
}
