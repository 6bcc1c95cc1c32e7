// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end: request JSON + revision file -> broker -> checkout commands,
//! with the generated git config exercised through a real shell.

use std::sync::Arc;

use parking_lot::Mutex;

use gerrit_fetch::broker::env::MemoryEnv;
use gerrit_fetch::broker::{SecretBroker, CREDENTIAL_HELPER_KEY};
use gerrit_fetch::config::FetchRequest;
use gerrit_fetch::exec::{CommandRunner, Invocation, SystemRunner};
use gerrit_fetch::revision::FileRevisionSource;
use gerrit_fetch::run::run_in;
use gerrit_fetch::test_support::FakeRunner;

const REVISION: &str = r#")]}'
{
  "_number": 3,
  "ref": "refs/changes/34/1234/3",
  "fetch": {
    "anonymous http": { "url": "https://review.example.com/proj", "ref": "refs/changes/34/1234/3" }
  }
}"#;

fn request(source: serde_json::Value) -> anyhow::Result<FetchRequest> {
    Ok(serde_json::from_value(serde_json::json!({
        "source": source,
        "version": { "change_id": "proj~1234", "revision": "deadbeef" },
        "params": { "fetch": true },
    }))?)
}

#[test]
fn credential_helper_prints_credentials() -> anyhow::Result<()> {
    let secrets = tempfile::tempdir()?;
    let req = request(serde_json::json!({ "username": "ci bot", "password": "p4ss word" }))?;
    let mut broker = SecretBroker::new(
        &req.source,
        secrets.path(),
        Arc::new(SystemRunner),
        Box::new(MemoryEnv::new()),
    );

    let entries = broker.vcs_config_entries()?;
    let helper = entries
        .get(CREDENTIAL_HELPER_KEY)
        .and_then(|h| h.strip_prefix('!'))
        .ok_or_else(|| anyhow::anyhow!("no shell credential helper"))?;

    // git runs `!`-helpers through the shell; do the same.
    let out = SystemRunner.run(&Invocation::new("sh", ["-c", helper]))?;
    assert!(out.success(), "{}", out.output);
    assert_eq!(out.output, "username=ci bot\npassword=p4ss word\n");

    broker.cleanup();
    assert_eq!(std::fs::read_dir(secrets.path())?.count(), 0);
    Ok(())
}

#[test]
fn in_step_with_cookies_and_revision_file() -> anyhow::Result<()> {
    let secrets = tempfile::tempdir()?;
    let work = tempfile::tempdir()?;
    let revision_path = work.path().join("revision.json");
    std::fs::write(&revision_path, REVISION)?;

    let req = request(serde_json::json!({
        "url": "https://review.example.com",
        "cookies": "review.example.com\tFALSE\t/\tTRUE\t0\to\tgit-ci=1//x\n",
        "skip_submodules": ["vendor"],
    }))?;
    let runner = Arc::new(FakeRunner::new());
    let broker = Mutex::new(SecretBroker::new(
        &req.source,
        secrets.path(),
        runner.clone(),
        Box::new(MemoryEnv::new()),
    ));
    let dest = work.path().join("repo");

    let outcome = run_in(&req, &dest, &broker, &FileRevisionSource::new(&revision_path), runner.as_ref())?;

    assert_eq!(outcome.revision.id, "deadbeef");
    assert_eq!(outcome.link.as_deref(), Some("https://review.example.com/c/1234/3"));
    let target = outcome.target.ok_or_else(|| anyhow::anyhow!("no fetch target"))?;
    assert_eq!(target.reference, "refs/changes/34/1234/3");

    let commands = runner.commands();
    let cookie_cmd = commands
        .iter()
        .find(|c| c.contains("config http.cookieFile "))
        .ok_or_else(|| anyhow::anyhow!("cookie file not configured: {commands:?}"))?;
    let cookie_path = cookie_cmd.rsplit(' ').next().unwrap_or_default().to_owned();
    assert!(std::path::Path::new(&cookie_path).starts_with(secrets.path()));
    assert!(!std::path::Path::new(&cookie_path).starts_with(&dest));

    broker.lock().cleanup();
    assert!(!std::path::Path::new(&cookie_path).exists());
    Ok(())
}
