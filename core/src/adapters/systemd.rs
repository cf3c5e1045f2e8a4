//! Systemd unit detection.
//!
//! The cgroup record is authoritative when it names a service. Otherwise
//! `systemctl status <pid>` is consulted, and its answer is only trusted when
//! the pid is the unit's main process.

use std::path::PathBuf;

use tracing::debug;

use crate::domain::cgroup::{is_infrastructure_unit, parse_systemd_unit};
use crate::ports::{CommandRunner, SystemdDetectorPort};

pub struct SystemdDetector<R> {
    root: PathBuf,
    runner: R,
}

impl<R: CommandRunner> SystemdDetector<R> {
    pub fn new(root: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            root: root.into(),
            runner,
        }
    }

    /// Whether `systemctl` is installed.
    pub fn is_available(&self) -> bool {
        self.runner.is_available("systemctl")
    }

    async fn from_cgroup(&self, pid: u32) -> Option<String> {
        let path = self.root.join(pid.to_string()).join("cgroup");
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => parse_systemd_unit(&content),
            Err(e) => {
                debug!(pid = pid, error = %e, "cgroup record unavailable");
                None
            }
        }
    }

    async fn from_systemctl(&self, pid: u32) -> Option<String> {
        let pid_arg = pid.to_string();
        let output = self
            .runner
            .run("systemctl", &["status", pid_arg.as_str()])
            .await
            .ok()?;
        if !output.success {
            return None;
        }

        let unit = parse_status_unit(&output.stdout)?;
        if is_infrastructure_unit(&unit) {
            debug!(pid = pid, unit = %unit, "Ignoring infrastructure unit");
            return None;
        }

        if self.main_pid(&unit).await != Some(pid) {
            debug!(pid = pid, unit = %unit, "Process is not the unit's main process");
            return None;
        }

        Some(unit)
    }

    async fn main_pid(&self, unit: &str) -> Option<u32> {
        let output = self
            .runner
            .run("systemctl", &["show", "--property=MainPID", unit])
            .await
            .ok()?;
        if !output.success {
            return None;
        }
        output
            .stdout
            .trim()
            .strip_prefix("MainPID=")?
            .parse()
            .ok()
    }
}

impl<R: CommandRunner> SystemdDetectorPort for SystemdDetector<R> {
    async fn detect(&self, pid: u32) -> Option<String> {
        if let Some(unit) = self.from_cgroup(pid).await {
            debug!(pid = pid, unit = %unit, "Unit found in cgroup");
            return Some(unit);
        }

        if !self.is_available() {
            return None;
        }
        self.from_systemctl(pid).await
    }
}

/// The unit named on the first line of `systemctl status`, e.g.
/// `● nginx.service - A high performance web server`.
fn parse_status_unit(output: &str) -> Option<String> {
    let line = output.lines().find(|l| !l.trim().is_empty())?;
    let line = line.trim_start_matches(|c: char| c == '●' || c == '*' || c.is_whitespace());
    let token = line.split_whitespace().next()?;
    token.ends_with(".service").then(|| token.to_string())
}
