// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fetch target resolution: which URL and ref to hand to `git fetch`.
//!
//! Pure over the source configuration and a revision descriptor, so it is
//! safe to call speculatively (for logging) before any secret exists.

use crate::config::Source;
use crate::error::{FetchError, Result};
use crate::revision::RevisionDescriptor;

/// Protocols tried in order when none is configured.
pub const DEFAULT_FETCH_PROTOCOLS: [&str; 2] = ["http", "anonymous http"];

const SSH_SCHEME: &str = "ssh://";

/// Concrete transport URL and ref for one fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
    pub reference: String,
}

pub fn resolve(source: &Source, revision: &RevisionDescriptor) -> Result<FetchTarget> {
    let mut url = source.fetch_url().map(str::to_owned);

    if let Some(user) = source.private_key_user() {
        let base = url.as_deref().unwrap_or_default();
        url = Some(inject_ssh_user(base, user)?);
    }

    if let Some(url) = url {
        return Ok(FetchTarget { url, reference: revision.default_ref.clone() });
    }

    let protocol = match source.fetch_protocol() {
        Some(protocol) => protocol,
        None => DEFAULT_FETCH_PROTOCOLS
            .iter()
            .copied()
            .find(|p| revision.fetch_info.contains_key(*p))
            .ok_or_else(|| {
                FetchError::not_found(format!(
                    "no fetch info for protocol {:?} or {:?}",
                    DEFAULT_FETCH_PROTOCOLS[0], DEFAULT_FETCH_PROTOCOLS[1]
                ))
            })?,
    };

    let info = revision
        .fetch_info
        .get(protocol)
        .ok_or_else(|| FetchError::not_found(format!("no fetch info for protocol {protocol:?}")))?;
    Ok(FetchTarget { url: info.url.clone(), reference: info.reference.clone() })
}

/// Rewrite `ssh://host/path` to `ssh://user@host/path`.
pub fn inject_ssh_user(url: &str, user: &str) -> Result<String> {
    if !url.starts_with(SSH_SCHEME) {
        return Err(FetchError::validation(format!(
            "fetch url {url:?} is not an ssh url but an ssh user was given"
        )));
    }
    if user.chars().any(|c| c == '@' || c == '/' || c == ':' || c.is_whitespace() || c.is_control())
    {
        return Err(FetchError::validation(format!("invalid ssh user {user:?}")));
    }
    match url.split_once(SSH_SCHEME) {
        Some(("", rest)) => Ok(format!("{SSH_SCHEME}{user}@{rest}")),
        _ => Err(FetchError::internal(format!("unable to split {url:?} to insert the ssh user"))),
    }
}

#[cfg(test)]
#[path = "resolve_tests.rs"]
mod tests;
