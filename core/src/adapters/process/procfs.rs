//! Process metadata from the proc filesystem.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::domain::ProcessInfo;
use crate::error::{Error, Result};
use crate::ports::ProcessInfoPort;

use super::user_name;

/// Kernel clock ticks per second used for `stat` start times.
const CLOCK_TICKS: u64 = 100;

/// Reads `<root>/<pid>/*` records.
#[derive(Debug, Clone)]
pub struct ProcGatherer {
    root: PathBuf,
}

#[derive(Debug, Default, PartialEq, Eq)]
struct StatusFields {
    parent_pid: u32,
    uid: Option<u32>,
    memory_kb: u64,
}

impl ProcGatherer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Whether the host exposes a per-process proc tree under `root`.
    pub fn is_supported(root: &Path) -> bool {
        root.join("self").exists()
    }

    fn pid_dir(&self, pid: u32) -> PathBuf {
        self.root.join(pid.to_string())
    }

    async fn read_command(&self, pid: u32) -> String {
        match tokio::fs::read(self.pid_dir(pid).join("cmdline")).await {
            Ok(raw) => parse_cmdline(&raw),
            Err(e) => {
                debug!(pid = pid, error = %e, "cmdline unreadable");
                String::new()
            }
        }
    }

    async fn read_executable(&self, pid: u32) -> String {
        tokio::fs::read_link(self.pid_dir(pid).join("exe"))
            .await
            .map(|p| p.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    async fn read_start_time(&self, pid: u32) -> Option<DateTime<Utc>> {
        let stat = tokio::fs::read_to_string(self.pid_dir(pid).join("stat")).await.ok()?;
        let ticks = parse_start_ticks(&stat)?;
        let system_stat = tokio::fs::read_to_string(self.root.join("stat")).await.ok()?;
        let btime = parse_btime(&system_stat)?;

        let secs = btime.checked_add(i64::try_from(ticks / CLOCK_TICKS).ok()?)?;
        DateTime::from_timestamp(secs, 0)
    }

    /// Direct children of `pid`, from the kernel's children record or, when
    /// that is missing, by scanning every process's parent pid.
    async fn read_children(&self, pid: u32) -> Vec<u32> {
        let record = self
            .pid_dir(pid)
            .join("task")
            .join(pid.to_string())
            .join("children");
        if let Ok(content) = tokio::fs::read_to_string(&record).await {
            return content
                .split_whitespace()
                .filter_map(|s| s.parse().ok())
                .collect();
        }

        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut children: Vec<u32> = entries
            .flatten()
            .filter_map(|entry| entry.file_name().to_str()?.parse::<u32>().ok())
            .filter(|&child| child != pid)
            .filter(|&child| {
                std::fs::read_to_string(self.pid_dir(child).join("status"))
                    .map(|status| parse_status(&status).parent_pid == pid)
                    .unwrap_or(false)
            })
            .collect();
        children.sort_unstable();
        children
    }
}

impl ProcessInfoPort for ProcGatherer {
    async fn gather(&self, pid: u32) -> Result<ProcessInfo> {
        if let Err(e) = tokio::fs::metadata(self.pid_dir(pid)).await {
            if e.kind() == std::io::ErrorKind::PermissionDenied {
                return Err(Error::DetectionUnavailable(format!("process {}: {}", pid, e)));
            }
            return Err(Error::ProcessNotFound(pid));
        }

        let mut info = ProcessInfo::new(pid);
        info.command = self.read_command(pid).await;
        info.executable = self.read_executable(pid).await;

        if let Ok(status) = tokio::fs::read_to_string(self.pid_dir(pid).join("status")).await {
            let fields = parse_status(&status);
            info.parent_pid = fields.parent_pid;
            info.memory_kb = fields.memory_kb;
            if let Some(uid) = fields.uid {
                info.uid = uid;
                info.user = user_name(uid);
            }
        }

        info.start_time = self.read_start_time(pid).await;
        info.children = self.read_children(pid).await;

        Ok(info)
    }
}

/// Join NUL-separated argv, dropping empty tokens.
fn parse_cmdline(raw: &[u8]) -> String {
    String::from_utf8_lossy(raw)
        .split('\0')
        .filter(|s| !s.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

fn parse_status(content: &str) -> StatusFields {
    let mut fields = StatusFields::default();

    for line in content.lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let first = value.split_whitespace().next();
        match key {
            "PPid" => fields.parent_pid = first.and_then(|v| v.parse().ok()).unwrap_or(0),
            "Uid" => fields.uid = first.and_then(|v| v.parse().ok()),
            "VmRSS" => fields.memory_kb = first.and_then(|v| v.parse().ok()).unwrap_or(0),
            _ => {}
        }
    }

    fields
}

/// Start time in clock ticks: field 22 of `stat`, i.e. the 20th after the
/// parenthesised command name (which may itself contain spaces).
fn parse_start_ticks(stat: &str) -> Option<u64> {
    let rest = &stat[stat.rfind(')')? + 1..];
    rest.split_whitespace().nth(19)?.parse().ok()
}

fn parse_btime(system_stat: &str) -> Option<i64> {
    system_stat
        .lines()
        .find_map(|line| line.strip_prefix("btime "))
        .and_then(|v| v.trim().parse().ok())
}
