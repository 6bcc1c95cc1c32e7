// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Secret material broker.
//!
//! Turns the overlapping authentication options of a [`Source`] into the
//! ephemeral files, agent process and git config needed for one operation,
//! and releases all of it in [`SecretBroker::cleanup`]. Every artifact is
//! created lazily, at most once, and recorded so cleanup can find it.
//!
//! Precedence differs per consumer:
//!
//! - REST client: username (basic/digest) > cookie file > none. The SSH key
//!   never affects REST.
//! - git transport: SSH key > credential helper > anonymous. Cookies are
//!   layered on top of any of these via `http.cookieFile`.

pub mod agent;
pub mod artifact;
pub mod env;

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::config::{Source, TransportAuth};
use crate::error::{FetchError, Result};
use crate::exec::CommandRunner;

use self::agent::{SshAgent, ASKPASS_SCRIPT};
use self::artifact::{ArtifactSlot, SCRIPT_MODE, SECRET_MODE};
use self::env::EnvContext;

pub const SSH_COMMAND_KEY: &str = "core.sshCommand";
pub const CREDENTIAL_HELPER_KEY: &str = "credential.helper";
pub const COOKIE_FILE_KEY: &str = "http.cookieFile";

/// Authentication handed to the REST client.
#[derive(Clone, PartialEq, Eq)]
pub enum AuthMechanism {
    None,
    Basic { username: String, password: String },
    Digest { username: String, password: String },
    CookieFile(PathBuf),
}

impl AuthMechanism {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Basic { .. } => "basic",
            Self::Digest { .. } => "digest",
            Self::CookieFile(_) => "cookie",
        }
    }
}

/// Passwords are never printed.
impl fmt::Debug for AuthMechanism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Basic { username, .. } => {
                f.debug_struct("Basic").field("username", username).finish_non_exhaustive()
            }
            Self::Digest { username, .. } => {
                f.debug_struct("Digest").field("username", username).finish_non_exhaustive()
            }
            Self::CookieFile(path) => f.debug_tuple("CookieFile").field(path).finish(),
        }
    }
}

/// Owns every secret artifact for the lifetime of one operation.
///
/// Not safe to drive from two threads at once: starting an agent writes to
/// the process environment through the [`EnvContext`].
pub struct SecretBroker {
    cookies: Option<String>,
    username: Option<String>,
    password: Option<String>,
    digest: bool,
    transport: TransportAuth,
    temp_root: PathBuf,
    runner: Arc<dyn CommandRunner>,
    env: Box<dyn EnvContext>,
    cookie_file: ArtifactSlot,
    /// Credentials file or private key, depending on `transport`.
    transport_file: ArtifactSlot,
    known_hosts_file: ArtifactSlot,
    askpass_script: ArtifactSlot,
    agent: Option<SshAgent>,
    /// Set by [`SecretBroker::cleanup`]; no artifact is created afterwards.
    closed: bool,
}

impl SecretBroker {
    pub fn new(
        source: &Source,
        temp_root: impl Into<PathBuf>,
        runner: Arc<dyn CommandRunner>,
        env: Box<dyn EnvContext>,
    ) -> Self {
        let transport = source.transport_auth();
        let transport_prefix = match transport {
            TransportAuth::SshKey { .. } => "gerrit-fetch-key-",
            _ => "gerrit-fetch-creds-",
        };
        Self {
            cookies: source.cookies().map(str::to_owned),
            username: source.username().map(str::to_owned),
            password: source.password().map(str::to_owned),
            digest: source.digest_auth,
            transport,
            temp_root: temp_root.into(),
            runner,
            env,
            cookie_file: ArtifactSlot::new("gerrit-fetch-cookies-"),
            transport_file: ArtifactSlot::new(transport_prefix),
            known_hosts_file: ArtifactSlot::new("gerrit-fetch-known-hosts-"),
            askpass_script: ArtifactSlot::new("gerrit-fetch-askpass-"),
            agent: None,
            closed: false,
        }
    }

    /// Mechanism for the REST client.
    pub fn rest_auth_mechanism(&mut self) -> Result<AuthMechanism> {
        self.ensure_open()?;
        if let Some(ref username) = self.username {
            let username = username.clone();
            let password = self.password.clone().unwrap_or_default();
            return Ok(if self.digest {
                AuthMechanism::Digest { username, password }
            } else {
                AuthMechanism::Basic { username, password }
            });
        }
        if self.password.is_some() {
            return Err(FetchError::config("password without username"));
        }
        match self.cookie_file()? {
            Some(path) => Ok(AuthMechanism::CookieFile(path)),
            None => Ok(AuthMechanism::None),
        }
    }

    /// Git config to apply before any network-touching git command.
    pub fn vcs_config_entries(&mut self) -> Result<BTreeMap<String, String>> {
        self.ensure_open()?;
        self.validate_credentials()?;

        let mut entries = BTreeMap::new();
        match self.transport.clone() {
            TransportAuth::SshKey { key, passphrase, known_hosts } => {
                let command = self.prepare_ssh(&key, passphrase.as_deref(), known_hosts.as_deref())?;
                entries.insert(SSH_COMMAND_KEY.to_owned(), command);
            }
            TransportAuth::CredentialHelper { .. } => {
                if let Some(path) = self.credentials_file()? {
                    entries.insert(
                        CREDENTIAL_HELPER_KEY.to_owned(),
                        format!("!cat {}", quote_path(&path)?),
                    );
                }
            }
            TransportAuth::Anonymous => {}
        }

        if let Some(path) = self.cookie_file()? {
            entries.insert(COOKIE_FILE_KEY.to_owned(), utf8_path(&path)?.to_owned());
        }
        Ok(entries)
    }

    /// Materialize the cookie jar, if cookies are configured.
    pub fn cookie_file(&mut self) -> Result<Option<PathBuf>> {
        self.ensure_open()?;
        let Some(ref cookies) = self.cookies else {
            return Ok(None);
        };
        self.cookie_file.get_or_create(&self.temp_root, cookies, SECRET_MODE).map(Some)
    }

    /// Materialize the git credential file (`username=...\npassword=...\n`).
    /// Absent when git authenticates with an SSH key or anonymously.
    pub fn credentials_file(&mut self) -> Result<Option<PathBuf>> {
        self.ensure_open()?;
        let TransportAuth::CredentialHelper { ref username, ref password } = self.transport else {
            return Ok(None);
        };
        check_credential_field("username", username)?;
        check_credential_field("password", password)?;
        let contents = format!("username={username}\npassword={password}\n");
        self.transport_file.get_or_create(&self.temp_root, &contents, SECRET_MODE).map(Some)
    }

    /// Paths of every artifact currently on disk.
    pub fn artifact_paths(&self) -> Vec<PathBuf> {
        [&self.cookie_file, &self.transport_file, &self.known_hosts_file, &self.askpass_script]
            .into_iter()
            .filter_map(|slot| slot.path().map(Path::to_path_buf))
            .collect()
    }

    pub fn agent(&self) -> Option<&SshAgent> {
        self.agent.as_ref()
    }

    /// Delete every artifact and stop the agent. Idempotent; failures are
    /// logged so one bad artifact never blocks release of the others.
    ///
    /// The broker is closed afterwards: a caller still holding it (a fetch
    /// racing a signal handler) gets an error instead of fresh secrets.
    pub fn cleanup(&mut self) {
        self.closed = true;
        self.cookie_file.release();
        self.transport_file.release();
        self.known_hosts_file.release();
        self.askpass_script.release();

        if let Some(agent) = self.agent.take() {
            if let Err(e) = agent.kill(self.runner.as_ref()) {
                warn!("error stopping ssh-agent: {e}");
            }
            for (name, _) in agent.vars() {
                self.env.remove(name);
            }
        }
    }

    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            return Err(closed_error());
        }
        Ok(())
    }

    fn validate_credentials(&self) -> Result<()> {
        if let Some(ref username) = self.username {
            check_credential_field("username", username)?;
        }
        if let Some(ref password) = self.password {
            check_credential_field("password", password)?;
        }
        Ok(())
    }

    /// Key file, optional known_hosts, running agent with the key loaded.
    /// Returns the `core.sshCommand` value.
    fn prepare_ssh(
        &mut self,
        key: &str,
        passphrase: Option<&str>,
        known_hosts: Option<&str>,
    ) -> Result<String> {
        // ssh-add rejects key files without a trailing newline.
        let key_contents =
            if key.ends_with('\n') { key.to_owned() } else { format!("{key}\n") };
        let key_path =
            self.transport_file.get_or_create(&self.temp_root, &key_contents, SECRET_MODE)?;

        let known_hosts_path = match known_hosts {
            Some(lines) => {
                let lines = if lines.ends_with('\n') { lines.to_owned() } else { format!("{lines}\n") };
                Some(self.known_hosts_file.get_or_create(&self.temp_root, &lines, SECRET_MODE)?)
            }
            None => None,
        };

        if self.agent.is_none() {
            let agent = SshAgent::start(self.runner.as_ref())?;
            for (name, value) in agent.vars() {
                self.env.set(name, value);
            }
            // Registered before ssh-add so a failed add still stops the agent.
            self.agent = Some(agent);

            let askpass = match passphrase {
                Some(passphrase) => Some((
                    self.askpass_script.get_or_create(&self.temp_root, ASKPASS_SCRIPT, SCRIPT_MODE)?,
                    passphrase,
                )),
                None => None,
            };
            info!(key_len = key.len(), passphrase = askpass.is_some(), "adding ssh key to agent");
            if let Some(ref agent) = self.agent {
                agent.add_key(
                    self.runner.as_ref(),
                    &key_path,
                    askpass.as_ref().map(|(script, pass)| (script.as_path(), *pass)),
                )?;
            }
        }

        let mut command = format!(
            "ssh -F /dev/null -i {} -o IdentitiesOnly=yes",
            quote_path(&key_path)?
        );
        match known_hosts_path {
            Some(path) => {
                command.push_str(" -o StrictHostKeyChecking=yes -o UserKnownHostsFile=");
                command.push_str(&quote_path(&path)?);
            }
            None => {
                // TODO: require known_hosts once every pipeline provides one.
                warn!("no known_hosts configured, ssh host key verification is disabled");
                command.push_str(" -o StrictHostKeyChecking=no");
            }
        }
        Ok(command)
    }
}

impl Drop for SecretBroker {
    fn drop(&mut self) {
        self.cleanup();
    }
}

/// NUL or newline would corrupt the git credential wire format and could
/// smuggle extra attributes to the helper's consumer.
fn check_credential_field(field: &str, value: &str) -> Result<()> {
    if value.contains(['\0', '\n']) {
        return Err(FetchError::validation(format!("invalid character in {field}")));
    }
    Ok(())
}

fn closed_error() -> FetchError {
    FetchError::resource("secret broker already cleaned up")
}

/// Git config values are strings; a lossy conversion would name another file.
fn utf8_path(path: &Path) -> Result<&str> {
    path.to_str()
        .ok_or_else(|| FetchError::internal(format!("non UTF-8 temp path {}", path.display())))
}

/// Shell-quote a path for use inside a git config command string.
fn quote_path(path: &Path) -> Result<String> {
    let text = utf8_path(path)?;
    shlex::try_quote(text)
        .map(|quoted| quoted.into_owned())
        .map_err(|e| FetchError::internal(format!("cannot quote {text}: {e}")))
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
