//! Deterministic fakes for the ports, shared by unit tests.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use parking_lot::Mutex;

use crate::error::{Error, Result};
use crate::ports::{CommandOutput, CommandRunner, KillSignal, SignalPort};

/// A `CommandRunner` that replays canned outputs and records invocations.
#[derive(Default)]
pub struct FakeRunner {
    installed: HashSet<String>,
    responses: HashMap<String, CommandOutput>,
    calls: Mutex<Vec<String>>,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `program` as present on the search path.
    pub fn installed(mut self, program: &str) -> Self {
        self.installed.insert(program.to_string());
        self
    }

    /// Reply to `command line` (program and args joined by spaces) with `output`.
    pub fn respond(mut self, command_line: &str, output: CommandOutput) -> Self {
        self.responses.insert(command_line.to_string(), output);
        self
    }

    /// Every command line run so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl CommandRunner for FakeRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<CommandOutput> {
        let mut line = program.to_string();
        for arg in args {
            line.push(' ');
            line.push_str(arg);
        }
        self.calls.lock().push(line.clone());

        match self.responses.get(&line) {
            Some(output) => Ok(output.clone()),
            None if self.installed.contains(program) => Ok(CommandOutput::failed("no such object")),
            None => Err(Error::CommandFailed(format!("{}: not found", program))),
        }
    }

    fn lookup(&self, program: &str) -> Option<PathBuf> {
        self.installed
            .contains(program)
            .then(|| PathBuf::from(format!("/usr/bin/{}", program)))
    }
}

/// A `SignalPort` that records signals instead of delivering them.
#[derive(Default)]
pub struct FakeSignaller {
    running: HashSet<u32>,
    denied: HashSet<u32>,
    sent: Mutex<Vec<(u32, KillSignal)>>,
}

impl FakeSignaller {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn running(mut self, pid: u32) -> Self {
        self.running.insert(pid);
        self
    }

    /// Signals to `pid` fail with permission denied.
    pub fn denied(mut self, pid: u32) -> Self {
        self.running.insert(pid);
        self.denied.insert(pid);
        self
    }

    pub fn sent(&self) -> Vec<(u32, KillSignal)> {
        self.sent.lock().clone()
    }
}

impl SignalPort for FakeSignaller {
    fn send(&self, pid: u32, signal: KillSignal) -> Result<()> {
        if self.denied.contains(&pid) {
            return Err(Error::PermissionDenied(format!("PID {}", pid)));
        }
        if !self.running.contains(&pid) {
            return Err(Error::ProcessNotFound(pid));
        }
        self.sent.lock().push((pid, signal));
        Ok(())
    }

    fn is_running(&self, pid: u32) -> bool {
        self.running.contains(&pid)
    }
}
