// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use serde_json::json;

use super::{Config, FetchRequest, InParams, Source, TransportAuth};

fn parse(args: &[&str]) -> Config {
    Config::parse_from(args)
}

fn source(value: serde_json::Value) -> anyhow::Result<Source> {
    Ok(serde_json::from_value(value)?)
}

#[test]
fn config_defaults() -> anyhow::Result<()> {
    let config = parse(&["gerrit-fetch", "--revision", "rev.json", "/tmp/out"]);
    config.validate()?;
    assert_eq!(config.log_format, "text");
    assert_eq!(config.log_level, "info");
    assert_eq!(config.dir.to_str(), Some("/tmp/out"));
    assert_eq!(config.secret_root(), std::env::temp_dir());
    Ok(())
}

#[test]
fn temp_dir_threads_into_secret_root() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let root = dir.path().to_str().ok_or_else(|| anyhow::anyhow!("path"))?;
    let config = parse(&["gerrit-fetch", "--revision", "r", "--temp-dir", root, "out"]);
    config.validate()?;
    assert_eq!(config.secret_root(), dir.path());
    Ok(())
}

#[yare::parameterized(
    missing_temp_dir = { &["gerrit-fetch", "--revision", "r", "--temp-dir", "/nonexistent/secret", "out"],
                         "is not a directory" },
    bad_log_format   = { &["gerrit-fetch", "--revision", "r", "--log-format", "xml", "out"],
                         "invalid log format" },
)]
fn invalid_config(args: &[&str], expected_substr: &str) {
    let config = parse(args);
    crate::assert_err_contains!(config.validate(), expected_substr);
}

#[test]
fn source_fields_default_when_absent() -> anyhow::Result<()> {
    let src = source(json!({ "url": "https://review.example.com" }))?;
    assert_eq!(src.url, "https://review.example.com");
    assert!(!src.digest_auth);
    assert_eq!(src.depth, 0);
    assert!(src.skip_submodules.is_empty());
    assert_eq!(src.transport_auth(), TransportAuth::Anonymous);
    Ok(())
}

#[test]
fn empty_strings_count_as_absent() -> anyhow::Result<()> {
    let src = source(json!({ "username": "", "password": "", "private_key": "", "cookies": "" }))?;
    assert!(src.username().is_none());
    assert!(src.password().is_none());
    assert!(src.cookies().is_none());
    assert_eq!(src.transport_auth(), TransportAuth::Anonymous);
    Ok(())
}

#[test]
fn ssh_key_wins_over_username() -> anyhow::Result<()> {
    let src = source(json!({
        "username": "u",
        "password": "p",
        "private_key": "KEY",
        "private_key_passphrase": "secret",
        "known_hosts": "host ssh-ed25519 AAAA",
    }))?;
    assert_eq!(
        src.transport_auth(),
        TransportAuth::SshKey {
            key: "KEY".to_owned(),
            passphrase: Some("secret".to_owned()),
            known_hosts: Some("host ssh-ed25519 AAAA".to_owned()),
        }
    );
    Ok(())
}

#[test]
fn username_selects_credential_helper() -> anyhow::Result<()> {
    let src = source(json!({ "username": "u" }))?;
    assert_eq!(
        src.transport_auth(),
        TransportAuth::CredentialHelper { username: "u".to_owned(), password: String::new() }
    );
    Ok(())
}

#[yare::parameterized(
    neither        = { None, None, false },
    source_only    = { Some(true), None, true },
    params_only    = { None, Some(true), true },
    params_disable = { Some(true), Some(false), false },
    params_enable  = { Some(false), Some(true), true },
)]
fn fetch_flag_precedence(source_fetch: Option<bool>, params_fetch: Option<bool>, expected: bool) {
    let src = Source { fetch: source_fetch, ..Source::default() };
    let params = InParams { fetch: params_fetch, sparse: None };
    assert_eq!(src.should_fetch(&params), expected);
}

#[test]
fn request_decodes_from_pipeline_json() -> anyhow::Result<()> {
    let request: FetchRequest = serde_json::from_value(json!({
        "source": { "url": "https://review.example.com", "skip_submodules": ["vendor/big"], "depth": 1 },
        "version": { "change_id": "proj~1234", "revision": "abc123" },
        "params": { "fetch": true, "sparse": ["docs"] },
    }))?;
    assert_eq!(request.source.skip_submodules, vec!["vendor/big"]);
    assert_eq!(request.source.depth, 1);
    assert_eq!(request.version.change_number(), Some(1234));
    assert_eq!(request.params.sparse, Some(vec!["docs".to_owned()]));
    Ok(())
}
