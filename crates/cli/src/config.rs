// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;
use serde::{Deserialize, Serialize};

use crate::revision::Version;

/// Authenticated fetch of a Gerrit revision into a working directory.
#[derive(Debug, Parser)]
#[command(name = "gerrit-fetch", version, about)]
pub struct Config {
    /// Revision descriptor (Gerrit RevisionInfo JSON) to fetch.
    #[arg(long, env = "GERRIT_FETCH_REVISION")]
    pub revision: PathBuf,

    /// Root directory for ephemeral secret files (defaults to the OS temp dir).
    #[arg(long, env = "GERRIT_FETCH_TEMP_DIR")]
    pub temp_dir: Option<PathBuf>,

    /// Log format (json or text).
    #[arg(long, env = "GERRIT_FETCH_LOG_FORMAT", default_value = "text")]
    pub log_format: String,

    /// Log level (trace, debug, info, warn, error).
    #[arg(long, env = "GERRIT_FETCH_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Destination directory for the checkout.
    pub dir: PathBuf,
}

impl Config {
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(ref dir) = self.temp_dir {
            if !dir.is_dir() {
                anyhow::bail!("--temp-dir {} is not a directory", dir.display());
            }
        }
        match self.log_format.as_str() {
            "json" | "text" => {}
            other => anyhow::bail!("invalid log format: {other}"),
        }
        Ok(())
    }

    /// Secret files live here, never inside the checkout.
    pub fn secret_root(&self) -> PathBuf {
        self.temp_dir.clone().unwrap_or_else(std::env::temp_dir)
    }
}

/// Pipeline request read from stdin.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FetchRequest {
    pub source: Source,
    #[serde(default)]
    pub version: Version,
    #[serde(default)]
    pub params: InParams,
}

/// Resource configuration; immutable for the duration of one operation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Source {
    /// Review server base URL.
    pub url: String,
    /// Change search query (check only).
    pub query: Option<String>,
    /// Netscape-format cookie jar.
    pub cookies: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub digest_auth: bool,
    pub private_key: Option<String>,
    pub private_key_passphrase: Option<String>,
    /// Login injected into `ssh://` fetch URLs.
    pub private_key_user: Option<String>,
    /// known_hosts lines used to pin the server's host key.
    pub known_hosts: Option<String>,
    pub fetch_protocol: Option<String>,
    pub fetch_url: Option<String>,
    pub skip_submodules: Vec<String>,
    /// Fetch depth; 0 fetches full history.
    pub depth: u32,
    pub fetch: Option<bool>,
}

/// Per-step parameters for `in`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct InParams {
    pub fetch: Option<bool>,
    pub sparse: Option<Vec<String>>,
}

/// How git itself authenticates against the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportAuth {
    Anonymous,
    CredentialHelper { username: String, password: String },
    SshKey { key: String, passphrase: Option<String>, known_hosts: Option<String> },
}

impl Source {
    pub fn cookies(&self) -> Option<&str> {
        non_empty(&self.cookies)
    }

    pub fn username(&self) -> Option<&str> {
        non_empty(&self.username)
    }

    pub fn password(&self) -> Option<&str> {
        non_empty(&self.password)
    }

    pub fn private_key(&self) -> Option<&str> {
        non_empty(&self.private_key)
    }

    pub fn private_key_user(&self) -> Option<&str> {
        non_empty(&self.private_key_user)
    }

    pub fn fetch_protocol(&self) -> Option<&str> {
        non_empty(&self.fetch_protocol)
    }

    pub fn fetch_url(&self) -> Option<&str> {
        non_empty(&self.fetch_url)
    }

    /// Primary transport mechanism. An SSH key wins over a username; cookies
    /// are layered on top of either and are not represented here.
    pub fn transport_auth(&self) -> TransportAuth {
        if let Some(key) = self.private_key() {
            return TransportAuth::SshKey {
                key: key.to_owned(),
                passphrase: non_empty(&self.private_key_passphrase).map(str::to_owned),
                known_hosts: non_empty(&self.known_hosts).map(str::to_owned),
            };
        }
        match self.username() {
            Some(username) => TransportAuth::CredentialHelper {
                username: username.to_owned(),
                password: self.password().unwrap_or_default().to_owned(),
            },
            None => TransportAuth::Anonymous,
        }
    }

    /// Whether `in` should fetch the revision; step params override the source.
    pub fn should_fetch(&self, params: &InParams) -> bool {
        params.fetch.or(self.fetch).unwrap_or(false)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
