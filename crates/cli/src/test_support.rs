// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test infrastructure: fakes and assertion helpers.

use std::io::ErrorKind;

use parking_lot::Mutex;

use crate::exec::{CommandOutput, CommandRunner, Invocation};

/// Captured `ssh-agent -s` output.
pub const AGENT_OUTPUT: &str = "SSH_AUTH_SOCK=/tmp/ssh-ozasB2N7ff0j/agent.111798; export SSH_AUTH_SOCK;\n\
SSH_AGENT_PID=111799; export SSH_AGENT_PID;\n\
echo Agent pid 111799;\n";

#[derive(Debug, Clone)]
enum Reply {
    Output(CommandOutput),
    SpawnError(ErrorKind),
}

#[derive(Debug, Clone)]
struct Rule {
    program: String,
    needle: String,
    reply: Reply,
}

/// Scripted [`CommandRunner`] that records every invocation.
///
/// A rule matches when the program is equal and `needle` occurs in the
/// space-joined arguments. Unmatched commands succeed with no output.
#[derive(Debug, Default)]
pub struct FakeRunner {
    rules: Vec<Rule>,
    calls: Mutex<Vec<Invocation>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runner whose `ssh-agent -s` prints [`AGENT_OUTPUT`].
    pub fn with_agent() -> Self {
        Self::new().respond("ssh-agent", "-s", 0, AGENT_OUTPUT)
    }

    pub fn respond(mut self, program: &str, needle: &str, status: i32, output: &str) -> Self {
        self.rules.push(Rule {
            program: program.to_owned(),
            needle: needle.to_owned(),
            reply: Reply::Output(CommandOutput { status: Some(status), output: output.to_owned() }),
        });
        self
    }

    pub fn fail_spawn(mut self, program: &str, needle: &str) -> Self {
        self.rules.push(Rule {
            program: program.to_owned(),
            needle: needle.to_owned(),
            reply: Reply::SpawnError(ErrorKind::NotFound),
        });
        self
    }

    pub fn calls(&self) -> Vec<Invocation> {
        self.calls.lock().clone()
    }

    /// Display form of every call, in order.
    pub fn commands(&self) -> Vec<String> {
        self.calls.lock().iter().map(ToString::to_string).collect()
    }
}

impl CommandRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> std::io::Result<CommandOutput> {
        self.calls.lock().push(invocation.clone());
        let joined = invocation.args.join(" ");
        let rule = self
            .rules
            .iter()
            .find(|r| r.program == invocation.program && joined.contains(&r.needle));
        match rule.map(|r| &r.reply) {
            Some(Reply::Output(out)) => Ok(out.clone()),
            Some(Reply::SpawnError(kind)) => Err(std::io::Error::new(*kind, "scripted failure")),
            None => Ok(CommandOutput { status: Some(0), output: String::new() }),
        }
    }
}

/// Assert that `$expr` is `Err` and its message contains `$substr`.
#[macro_export]
macro_rules! assert_err_contains {
    ($expr:expr, $substr:expr) => {{
        let result = $expr;
        let err = result.expect_err(concat!("expected Err for: ", stringify!($expr)));
        let msg = err.to_string();
        assert!(msg.contains($substr), "expected error containing {:?}, got: {msg:?}", $substr);
    }};
}
