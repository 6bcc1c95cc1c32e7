// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! ssh-agent lifecycle.
//!
//! `ssh-agent -s` prints Bourne-shell assignments, for example:
//!
//! ```text
//! SSH_AUTH_SOCK=/tmp/ssh-ozasB2N7ff0j/agent.111798; export SSH_AUTH_SOCK;
//! SSH_AGENT_PID=111799; export SSH_AGENT_PID;
//! echo Agent pid 111799;
//! ```
//!
//! Only the `NAME=value` part before the first `;` of each line is kept.

use std::path::Path;

use tracing::{debug, info};

use crate::error::{FetchError, Result};
use crate::exec::{run_checked, CommandRunner, Invocation};

pub const AUTH_SOCK_VAR: &str = "SSH_AUTH_SOCK";
pub const AGENT_PID_VAR: &str = "SSH_AGENT_PID";

/// Variable the askpass helper echoes back to ssh-add.
pub const PASSPHRASE_VAR: &str = "GERRIT_FETCH_KEY_PASSPHRASE";

/// Askpass helper body. Holds no secret; the passphrase arrives via
/// [`PASSPHRASE_VAR`] in ssh-add's environment only.
pub const ASKPASS_SCRIPT: &str = "#!/bin/sh\nprintf '%s\\n' \"$GERRIT_FETCH_KEY_PASSPHRASE\"\n";

/// Extract `NAME=value` assignments from `ssh-agent -s` output.
pub fn parse_agent_output(output: &str) -> Vec<(String, String)> {
    output
        .lines()
        .filter_map(|line| {
            let assignment = line.split(';').next()?.trim();
            let (name, value) = assignment.split_once('=')?;
            is_var_name(name).then(|| (name.to_owned(), value.to_owned()))
        })
        .collect()
}

fn is_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c == '_' || c.is_ascii_alphabetic())
        && chars.all(|c| c == '_' || c.is_ascii_alphanumeric())
}

/// A running agent, identified by the variables it published.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshAgent {
    vars: Vec<(String, String)>,
}

impl SshAgent {
    /// Start a fresh agent and capture its variables.
    pub fn start(runner: &dyn CommandRunner) -> Result<Self> {
        info!("starting ssh-agent");
        let out = run_checked(runner, &Invocation::new("ssh-agent", ["-s"]))?;
        let agent = Self::from_output(&out.output)?;
        debug!(pid = agent.var(AGENT_PID_VAR).unwrap_or("?"), "ssh-agent started");
        Ok(agent)
    }

    /// Build from captured startup output; the socket variable is required.
    pub fn from_output(output: &str) -> Result<Self> {
        let vars = parse_agent_output(output);
        if !vars.iter().any(|(name, _)| name == AUTH_SOCK_VAR) {
            return Err(FetchError::resource(format!(
                "ssh-agent did not publish {AUTH_SOCK_VAR}"
            )));
        }
        Ok(Self { vars })
    }

    pub fn vars(&self) -> &[(String, String)] {
        &self.vars
    }

    pub fn var(&self, name: &str) -> Option<&str> {
        self.vars.iter().find(|(n, _)| n == name).map(|(_, v)| v.as_str())
    }

    /// `ssh-add <key>`. With an askpass helper the passphrase is supplied
    /// non-interactively; it is only ever placed in ssh-add's environment.
    pub fn add_key(
        &self,
        runner: &dyn CommandRunner,
        key_path: &Path,
        askpass: Option<(&Path, &str)>,
    ) -> Result<()> {
        let mut env = self.vars.clone();
        if let Some((script, passphrase)) = askpass {
            env.extend([
                (PASSPHRASE_VAR.to_owned(), passphrase.to_owned()),
                ("SSH_ASKPASS_REQUIRE".to_owned(), "force".to_owned()),
                ("SSH_ASKPASS".to_owned(), script.display().to_string()),
                ("DISPLAY".to_owned(), String::new()),
            ]);
        }
        let invocation =
            Invocation::new("ssh-add", [key_path.display().to_string()]).with_env(env);
        run_checked(runner, &invocation)?;
        Ok(())
    }

    /// `ssh-agent -k` against this agent.
    pub fn kill(&self, runner: &dyn CommandRunner) -> Result<()> {
        let invocation = Invocation::new("ssh-agent", ["-k"]).with_env(self.vars.clone());
        run_checked(runner, &invocation)?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "agent_tests.rs"]
mod tests;
