// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{decode_gerrit_json, revision_link, FileRevisionSource, RevisionSource, Version};
use crate::broker::AuthMechanism;
use crate::error::ErrorCode;

const REVISION_JSON: &str = r#"{
  "kind": "REWORK",
  "_number": 2,
  "ref": "refs/changes/34/1234/2",
  "fetch": {
    "http": { "url": "https://review.example.com/proj", "ref": "refs/changes/34/1234/2" },
    "ssh": { "url": "ssh://review.example.com:29418/proj", "ref": "refs/changes/34/1234/2" }
  }
}"#;

#[test]
fn decodes_revision_info() -> anyhow::Result<()> {
    let rev = decode_gerrit_json(REVISION_JSON)?;
    assert_eq!(rev.default_ref, "refs/changes/34/1234/2");
    assert_eq!(rev.patch_set, Some(2));
    assert_eq!(rev.fetch_info.len(), 2);
    assert_eq!(rev.fetch_info["ssh"].url, "ssh://review.example.com:29418/proj");
    assert!(rev.id.is_empty());
    Ok(())
}

#[test]
fn strips_xssi_guard() -> anyhow::Result<()> {
    let body = format!(")]}}'\n{REVISION_JSON}");
    let rev = decode_gerrit_json(&body)?;
    assert_eq!(rev.fetch_info["http"].reference, "refs/changes/34/1234/2");
    Ok(())
}

#[test]
fn fetch_map_is_optional() -> anyhow::Result<()> {
    let rev = decode_gerrit_json(r#"{"ref": "refs/changes/01/1/1"}"#)?;
    assert!(rev.fetch_info.is_empty());
    Ok(())
}

#[yare::parameterized(
    truncated  = { "{not json" },
    guard_only = { ")]}'\n" },
    wrong_type = { r#"{"fetch": []}"# },
)]
fn malformed_body_is_not_retryable(body: &str) {
    let err = decode_gerrit_json(body).err();
    let code = err.map(|e| e.code());
    assert_eq!(code, Some(ErrorCode::Validation));
    assert_eq!(code.map(|c| c.is_retryable()), Some(false));
}

#[yare::parameterized(
    plain      = { "proj~1234", Some(1234) },
    nested     = { "team/proj~branch~77", Some(77) },
    no_tilde   = { "1234", None },
    not_number = { "proj~Iabc", None },
)]
fn change_number(change_id: &str, expected: Option<u64>) {
    let version = Version { change_id: change_id.to_owned(), revision: String::new() };
    assert_eq!(version.change_number(), expected);
}

#[yare::parameterized(
    bare           = { "https://review.example.com", "https://review.example.com/c/1234/2" },
    trailing_slash = { "https://review.example.com/", "https://review.example.com/c/1234/2" },
    with_path      = { "https://example.com/gerrit", "https://example.com/gerrit/c/1234/2" },
)]
fn link(base: &str, expected: &str) {
    assert_eq!(revision_link(base, 1234, 2), expected);
}

#[test]
fn file_source_fills_id_from_version() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let path = dir.path().join("revision.json");
    std::fs::write(&path, REVISION_JSON)?;

    let version = Version { change_id: "proj~1234".to_owned(), revision: "abc123".to_owned() };
    let rev = FileRevisionSource::new(&path).revision(&AuthMechanism::None, &version)?;
    assert_eq!(rev.id, "abc123");
    Ok(())
}

#[test]
fn file_source_missing_file() {
    let source = FileRevisionSource::new("/nonexistent/revision.json");
    crate::assert_err_contains!(
        source.revision(&AuthMechanism::None, &Version::default()),
        "failed to read revision file"
    );
}
