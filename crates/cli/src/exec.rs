// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Synchronous command execution.
//!
//! Every subprocess (git, ssh-agent, ssh-add) goes through [`CommandRunner`]
//! so the broker and checkout sequence can be driven without real binaries.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;

use tracing::debug;

use crate::error::{FetchError, Result};

/// A single command to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub dir: Option<PathBuf>,
    /// Extra variables layered over the inherited environment.
    pub env: Vec<(String, String)>,
}

impl Invocation {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            dir: None,
            env: vec![],
        }
    }

    pub fn with_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, env: Vec<(String, String)>) -> Self {
        self.env.extend(env);
        self
    }
}

/// Environment values are deliberately left out; they may carry secrets.
impl fmt::Display for Invocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Exit status plus stdout followed by stderr.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    /// `None` when the process was killed by a signal.
    pub status: Option<i32>,
    pub output: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.status == Some(0)
    }
}

pub trait CommandRunner: Send + Sync {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput>;
}

/// Runs commands with [`std::process::Command`], blocking until exit.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl CommandRunner for SystemRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        let mut cmd = std::process::Command::new(&invocation.program);
        cmd.args(&invocation.args).stdin(Stdio::null());
        if let Some(ref dir) = invocation.dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        let out = cmd.output()?;
        let mut output = String::from_utf8_lossy(&out.stdout).into_owned();
        output.push_str(&String::from_utf8_lossy(&out.stderr));
        Ok(CommandOutput { status: out.status.code(), output })
    }
}

/// Run and require a zero exit status. Failures become resource errors.
pub fn run_checked(runner: &dyn CommandRunner, invocation: &Invocation) -> Result<CommandOutput> {
    let out = runner
        .run(invocation)
        .map_err(|e| FetchError::io(format!("failed to run {}", invocation.program), e))?;
    debug!(command = %invocation, "output:\n{}", out.output);
    if !out.success() {
        let status = out.status.map_or_else(|| "signal".to_owned(), |c| c.to_string());
        return Err(FetchError::resource(format!(
            "{} failed (exit status {status}): {}",
            invocation,
            out.output.trim_end()
        )));
    }
    Ok(out)
}

#[cfg(test)]
#[path = "exec_tests.rs"]
mod tests;
