// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Environment mutation seam.
//!
//! When an ssh-agent is started its socket and PID variables must be
//! visible to every later child process (git, ssh), which means writing
//! them into the current process environment. The broker does that only
//! through [`EnvContext`], so it is the single writer of those variables
//! and tests can observe the writes without touching the real table.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::Mutex;

pub trait EnvContext: Send {
    fn set(&mut self, name: &str, value: &str);
    fn remove(&mut self, name: &str);
}

/// The real process environment.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessEnv;

impl EnvContext for ProcessEnv {
    fn set(&mut self, name: &str, value: &str) {
        std::env::set_var(name, value);
    }

    fn remove(&mut self, name: &str) {
        std::env::remove_var(name);
    }
}

/// In-memory environment. Clones share the same table.
#[derive(Debug, Default, Clone)]
pub struct MemoryEnv {
    vars: Arc<Mutex<BTreeMap<String, String>>>,
}

impl MemoryEnv {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<String> {
        self.vars.lock().get(name).cloned()
    }

    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.vars.lock().clone()
    }
}

impl EnvContext for MemoryEnv {
    fn set(&mut self, name: &str, value: &str) {
        self.vars.lock().insert(name.to_owned(), value.to_owned());
    }

    fn remove(&mut self, name: &str) {
        self.vars.lock().remove(name);
    }
}
