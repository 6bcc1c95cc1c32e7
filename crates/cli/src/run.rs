// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The `in` step: look up the requested revision and optionally check it out.

use std::path::Path;

use parking_lot::Mutex;
use tracing::info;

use crate::broker::SecretBroker;
use crate::checkout::{fetch_revision, Git};
use crate::config::FetchRequest;
use crate::error::{FetchError, Result};
use crate::exec::CommandRunner;
use crate::resolve::{resolve, FetchTarget};
use crate::revision::{revision_link, RevisionDescriptor, RevisionSource, Version};

/// What `in` did.
#[derive(Debug, Clone)]
pub struct InOutcome {
    /// The requested version, echoed back to the pipeline.
    pub version: Version,
    pub revision: RevisionDescriptor,
    /// `None` when fetching was disabled.
    pub target: Option<FetchTarget>,
    pub link: Option<String>,
}

impl InOutcome {
    /// JSON written to stdout for the pipeline.
    pub fn response(&self) -> serde_json::Value {
        serde_json::json!({ "version": self.version })
    }
}

/// Run one `in` step against `dir`.
///
/// The broker is only locked around broker calls, so a signal handler can
/// take it to run cleanup while git is running. The caller owns cleanup.
pub fn run_in(
    request: &FetchRequest,
    dir: &Path,
    broker: &Mutex<SecretBroker>,
    revisions: &dyn RevisionSource,
    runner: &dyn CommandRunner,
) -> Result<InOutcome> {
    let source = &request.source;
    let auth = broker.lock().rest_auth_mechanism()?;
    let revision = revisions.revision(&auth, &request.version)?;

    let link = match (request.version.change_number(), revision.patch_set) {
        (Some(change), Some(patch_set)) if !source.url.is_empty() => {
            Some(revision_link(&source.url, change, patch_set))
        }
        _ => None,
    };

    if !source.should_fetch(&request.params) {
        std::fs::create_dir_all(dir)
            .map_err(|e| FetchError::io(format!("failed to create {}", dir.display()), e))?;
        return Ok(InOutcome { version: request.version.clone(), revision, target: None, link });
    }

    let target = resolve(source, &revision)?;
    info!(
        url = %target.url,
        reference = %target.reference,
        ssh_key_len = source.private_key().map_or(0, str::len),
        "fetching revision {}",
        revision.id
    );

    let entries = broker.lock().vcs_config_entries()?;
    info!("applying git config {:?}", entries.keys().collect::<Vec<_>>());
    fetch_revision(&Git::new(runner, dir), source, &request.params, &target, &entries)?;

    Ok(InOutcome { version: request.version.clone(), revision, target: Some(target), link })
}

#[cfg(test)]
#[path = "run_tests.rs"]
mod tests;
