// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Revision descriptors published by the review server.
//!
//! The REST client that produces these lives outside this crate; it is
//! reached through [`RevisionSource`], which receives the authentication
//! mechanism chosen by the broker.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::broker::AuthMechanism;
use crate::error::{FetchError, Result};

/// Prefix Gerrit prepends to every JSON response body.
const XSSI_GUARD: &str = ")]}'";

/// One transport's coordinates for a revision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FetchInfo {
    pub url: String,
    #[serde(rename = "ref")]
    pub reference: String,
}

/// How to fetch a single patch set, keyed by protocol name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevisionDescriptor {
    /// Commit id of the revision.
    #[serde(default)]
    pub id: String,
    #[serde(rename = "ref")]
    pub default_ref: String,
    #[serde(rename = "fetch", default)]
    pub fetch_info: BTreeMap<String, FetchInfo>,
    #[serde(rename = "_number", default, skip_serializing_if = "Option::is_none")]
    pub patch_set: Option<u32>,
}

/// Pipeline version identifying a revision.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    /// `<project>~<change number>`.
    #[serde(default)]
    pub change_id: String,
    #[serde(default)]
    pub revision: String,
}

impl Version {
    /// Numeric change id from the `<project>~<number>` form.
    pub fn change_number(&self) -> Option<u64> {
        let (_, number) = self.change_id.rsplit_once('~')?;
        number.parse().ok()
    }
}

/// Data source for revision descriptors (the review server's REST API).
pub trait RevisionSource {
    fn revision(&self, auth: &AuthMechanism, version: &Version) -> Result<RevisionDescriptor>;
}

/// Reads a descriptor saved from the REST API to disk.
pub struct FileRevisionSource {
    path: PathBuf,
}

impl FileRevisionSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RevisionSource for FileRevisionSource {
    fn revision(&self, auth: &AuthMechanism, version: &Version) -> Result<RevisionDescriptor> {
        debug!(path = %self.path.display(), auth = auth.kind(), "loading revision descriptor");
        let text = std::fs::read_to_string(&self.path).map_err(|e| {
            FetchError::io(format!("failed to read revision file {}", self.path.display()), e)
        })?;
        let mut descriptor = decode_gerrit_json(&text)?;
        if descriptor.id.is_empty() {
            descriptor.id = version.revision.clone();
        }
        Ok(descriptor)
    }
}

/// Decode a RevisionInfo body, tolerating the XSSI guard line.
pub fn decode_gerrit_json(text: &str) -> Result<RevisionDescriptor> {
    let body = text.trim_start().strip_prefix(XSSI_GUARD).unwrap_or(text);
    serde_json::from_str(body)
        .map_err(|e| FetchError::validation(format!("failed to decode revision descriptor: {e}")))
}

/// Web link to a patch set: `<base>/c/<change>/<patch set>`.
pub fn revision_link(base_url: &str, change: u64, patch_set: u32) -> String {
    format!("{}/c/{change}/{patch_set}", base_url.trim_end_matches('/'))
}

#[cfg(test)]
#[path = "revision_tests.rs"]
mod tests;
