// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Checkout of a resolved fetch target into the destination directory.
//!
//! Ordering is load-bearing: every broker config entry is applied before
//! the first command that touches the network (`remote add` is followed by
//! `fetch`), and `submodule.<path>.update none` is written before the
//! recursive submodule update so excluded submodules are never fetched.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::config::{InParams, Source};
use crate::error::Result;
use crate::exec::{run_checked, CommandOutput, CommandRunner, Invocation};
use crate::resolve::FetchTarget;

/// `git -C <dir> ...` runner.
pub struct Git<'a> {
    runner: &'a dyn CommandRunner,
    dir: PathBuf,
}

impl<'a> Git<'a> {
    pub fn new(runner: &'a dyn CommandRunner, dir: impl Into<PathBuf>) -> Self {
        Self { runner, dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn run<I, S>(&self, args: I) -> Result<CommandOutput>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut full = vec!["-C".to_owned(), self.dir.display().to_string()];
        full.extend(args.into_iter().map(Into::into));
        let invocation = Invocation::new("git", full);
        info!("{invocation}");
        run_checked(self.runner, &invocation)
    }
}

/// Append `--depth=N` for shallow fetches.
pub fn fetch_flags(depth: u32, args: &[&str]) -> Vec<String> {
    let mut flags: Vec<String> = args.iter().map(|a| (*a).to_owned()).collect();
    if depth > 0 {
        flags.push(format!("--depth={depth}"));
    }
    flags
}

/// Initialize `git.dir()`, apply `config_entries`, fetch `target` and check it out.
pub fn fetch_revision(
    git: &Git<'_>,
    source: &Source,
    params: &InParams,
    target: &FetchTarget,
    config_entries: &BTreeMap<String, String>,
) -> Result<()> {
    info!("checking out in {}", git.dir().display());
    git.run(["init"])?;
    git.run(["--version"])?;
    git.run(["config", "color.ui", "always"])?;
    git.run(["config", "advice.detachedHead", "false"])?;

    for (key, value) in config_entries {
        git.run(["config", key.as_str(), value.as_str()])?;
    }

    if let Some(ref sparse) = params.sparse {
        let mut args = vec!["sparse-checkout".to_owned(), "set".to_owned()];
        args.extend(sparse.iter().cloned());
        git.run(args)?;
    }

    git.run(["remote", "add", "origin", target.url.as_str()])?;
    git.run(fetch_flags(source.depth, &["fetch", "origin", target.reference.as_str()]))?;
    git.run(["checkout", "FETCH_HEAD"])?;

    let dir = git.dir().display().to_string();
    git.run(["config", "--global", "--add", "safe.directory", dir.as_str()])?;

    if !source.skip_submodules.is_empty() {
        info!("skipping submodules {:?}", source.skip_submodules);
    }
    for path in &source.skip_submodules {
        git.run(["config".to_owned(), format!("submodule.{path}.update"), "none".to_owned()])?;
    }

    git.run(fetch_flags(source.depth, &["submodule", "update", "--init", "--recursive"]))?;
    Ok(())
}

#[cfg(test)]
#[path = "checkout_tests.rs"]
mod tests;
