//! Process domain models.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ContainerInfo;

/// Metadata about a running process.
///
/// Fields that could not be read keep their zero value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessInfo {
    pub pid: u32,
    /// Full argv joined with spaces.
    pub command: String,
    /// Resolved path of the executable.
    pub executable: String,
    /// User name, or the numeric uid when it has no name.
    pub user: String,
    pub uid: u32,
    /// Resident set size in kB.
    pub memory_kb: u64,
    pub start_time: Option<DateTime<Utc>>,
    pub parent_pid: u32,
    pub children: Vec<u32>,
}

impl ProcessInfo {
    pub fn new(pid: u32) -> Self {
        Self {
            pid,
            ..Self::default()
        }
    }

    /// Time elapsed since the process started, zero when unknown.
    pub fn uptime(&self) -> Duration {
        self.start_time
            .and_then(|start| (Utc::now() - start).to_std().ok())
            .unwrap_or_default()
    }

    /// Whether a caller with `caller_euid` likely needs elevated privileges
    /// to terminate this process.
    pub fn is_privileged_for(&self, caller_euid: u32) -> bool {
        self.uid != caller_euid && caller_euid != 0
    }

    /// [`Self::is_privileged_for`] evaluated for the current process.
    #[cfg(unix)]
    pub fn is_privileged(&self) -> bool {
        self.is_privileged_for(nix::unistd::geteuid().as_raw())
    }

    #[cfg(not(unix))]
    pub fn is_privileged(&self) -> bool {
        false
    }
}

/// A process together with whatever supervises it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessContext {
    pub info: ProcessInfo,
    /// `None` means the process is not containerized.
    pub container: Option<ContainerInfo>,
    /// Owning systemd unit, if any.
    pub systemd_unit: Option<String>,
}

impl ProcessContext {
    /// Context for an unsupervised process.
    pub fn bare(info: ProcessInfo) -> Self {
        Self {
            info,
            container: None,
            systemd_unit: None,
        }
    }

    pub fn with_container(mut self, container: ContainerInfo) -> Self {
        self.container = Some(container);
        self
    }

    pub fn with_systemd_unit(mut self, unit: impl Into<String>) -> Self {
        self.systemd_unit = Some(unit.into());
        self
    }

    pub fn pid(&self) -> u32 {
        self.info.pid
    }

    pub fn is_containerized(&self) -> bool {
        self.container.is_some()
    }

    pub fn is_systemd_managed(&self) -> bool {
        self.systemd_unit.as_deref().is_some_and(|u| !u.is_empty())
    }

    /// Short label of the supervisor, e.g. `docker:myapp` or `systemd:nginx.service`.
    pub fn supervisor(&self) -> Option<String> {
        if let Some(c) = &self.container {
            return Some(format!("{}:{}", c.runtime, c.display_name()));
        }
        self.systemd_unit
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| format!("systemd:{}", u))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Runtime;

    #[test]
    fn test_is_privileged_for() {
        let mut info = ProcessInfo::new(10);
        info.uid = 0;
        assert!(info.is_privileged_for(1000));
        assert!(!info.is_privileged_for(0));

        info.uid = 1000;
        assert!(!info.is_privileged_for(1000));
        assert!(info.is_privileged_for(1001));
    }

    #[test]
    fn test_context_flags() {
        let ctx = ProcessContext::bare(ProcessInfo::new(1));
        assert!(!ctx.is_containerized());
        assert!(!ctx.is_systemd_managed());
        assert_eq!(ctx.supervisor(), None);

        let ctx = ctx.with_systemd_unit("");
        assert!(!ctx.is_systemd_managed());

        let ctx = ctx.with_systemd_unit("nginx.service");
        assert!(ctx.is_systemd_managed());
        assert_eq!(ctx.supervisor().as_deref(), Some("systemd:nginx.service"));

        let ctx = ctx.with_container(ContainerInfo::new("abc", "web", Runtime::Docker));
        assert!(ctx.is_containerized());
        assert_eq!(ctx.supervisor().as_deref(), Some("docker:web"));
    }

    #[test]
    fn test_uptime_unknown_is_zero() {
        assert_eq!(ProcessInfo::new(1).uptime(), Duration::ZERO);

        let mut info = ProcessInfo::new(1);
        info.start_time = Some(Utc::now() - chrono::Duration::seconds(120));
        assert!(info.uptime() >= Duration::from_secs(119));
    }
}
