//! Process metadata from `ps`, for hosts without a proc filesystem.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use tracing::debug;

use crate::domain::ProcessInfo;
use crate::error::{Error, Result};
use crate::ports::{CommandRunner, ProcessInfoPort, SignalPort};

use super::user_name;

/// `ps -o lstart=` layout, e.g. `Fri Feb 27 10:30:00 2026`.
const LSTART_FORMAT: &str = "%a %b %e %H:%M:%S %Y";

pub struct PsGatherer<R, K> {
    runner: R,
    signaller: K,
}

impl<R: CommandRunner, K: SignalPort> PsGatherer<R, K> {
    pub fn new(runner: R, signaller: K) -> Self {
        Self { runner, signaller }
    }

    async fn read_start_time(&self, pid_arg: &str) -> Option<DateTime<Utc>> {
        let output = self.runner.run("ps", &["-p", pid_arg, "-o", "lstart="]).await.ok()?;
        if !output.success {
            return None;
        }
        parse_lstart(output.stdout.trim())
    }

    async fn read_children(&self, pid: u32) -> Vec<u32> {
        match self.runner.run("ps", &["-ax", "-o", "pid=,ppid="]).await {
            Ok(output) if output.success => parse_children(&output.stdout, pid),
            Ok(output) => {
                debug!(pid = pid, stderr = %output.stderr.trim(), "ps process table unavailable");
                Vec::new()
            }
            Err(e) => {
                debug!(pid = pid, error = %e, "ps process table unavailable");
                Vec::new()
            }
        }
    }
}

impl<R: CommandRunner, K: SignalPort> ProcessInfoPort for PsGatherer<R, K> {
    async fn gather(&self, pid: u32) -> Result<ProcessInfo> {
        if !self.signaller.is_running(pid) {
            return Err(Error::ProcessNotFound(pid));
        }

        let pid_arg = pid.to_string();
        let mut info = ProcessInfo::new(pid);

        match self
            .runner
            .run("ps", &["-p", pid_arg.as_str(), "-o", "ppid=,uid=,rss=,command="])
            .await
        {
            Ok(output) if output.success => apply_basic_fields(&mut info, &output.stdout),
            Ok(_) => debug!(pid = pid, "ps returned no row"),
            Err(e) => debug!(pid = pid, error = %e, "ps unavailable"),
        }

        info.start_time = self.read_start_time(&pid_arg).await;
        info.children = self.read_children(pid).await;

        Ok(info)
    }
}

/// Fill ppid, uid, user, rss and command from one `ps` row.
fn apply_basic_fields(info: &mut ProcessInfo, row: &str) {
    let fields: Vec<&str> = row.split_whitespace().collect();
    if fields.len() < 4 {
        return;
    }

    if let Ok(ppid) = fields[0].parse() {
        info.parent_pid = ppid;
    }
    if let Ok(uid) = fields[1].parse() {
        info.uid = uid;
        info.user = user_name(uid);
    }
    if let Ok(rss) = fields[2].parse() {
        info.memory_kb = rss;
    }
    info.command = fields[3..].join(" ");
}

/// Parse an `lstart` timestamp in the host's local time zone.
fn parse_lstart(s: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(s, LSTART_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
}

fn parse_children(table: &str, pid: u32) -> Vec<u32> {
    table
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let child: u32 = fields.next()?.parse().ok()?;
            let parent: u32 = fields.next()?.parse().ok()?;
            (parent == pid).then_some(child)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use crate::ports::CommandOutput;
    use crate::testing::{FakeRunner, FakeSignaller};

    fn runner() -> FakeRunner {
        FakeRunner::new()
            .installed("ps")
            .respond(
                "ps -p 812 -o ppid=,uid=,rss=,command=",
                CommandOutput::ok("    1   501  20480 /usr/local/bin/node server.js\n"),
            )
            .respond(
                "ps -p 812 -o lstart=",
                CommandOutput::ok("Thu Feb  5 10:30:00 2026\n"),
            )
            .respond(
                "ps -ax -o pid=,ppid=",
                CommandOutput::ok("    1     0\n  812     1\n  900   812\n  901   812\n  950   900\n"),
            )
    }

    #[test]
    fn test_parse_lstart_local_time() {
        let parsed = parse_lstart("Fri Feb 27 10:30:00 2026").unwrap();
        let local = parsed.with_timezone(&Local);
        assert_eq!((local.year(), local.month(), local.day()), (2026, 2, 27));
        assert_eq!((local.hour(), local.minute()), (10, 30));
        assert!(parse_lstart("yesterday").is_none());
        // Weekday must agree with the date.
        assert!(parse_lstart("Thu Feb 27 10:30:00 2026").is_none());
    }

    #[test]
    fn test_parse_children() {
        let table = "  1 0\n 10 1\n 11 1\n 12 10\nbogus\n";
        assert_eq!(parse_children(table, 1), vec![10, 11]);
        assert!(parse_children(table, 12).is_empty());
    }

    #[tokio::test]
    async fn test_gather_with_ps() {
        let gatherer = PsGatherer::new(runner(), FakeSignaller::new().running(812));
        let info = gatherer.gather(812).await.unwrap();

        assert_eq!(info.parent_pid, 1);
        assert_eq!(info.uid, 501);
        assert!(!info.user.is_empty());
        assert_eq!(info.memory_kb, 20480);
        assert_eq!(info.command, "/usr/local/bin/node server.js");
        assert_eq!(info.children, vec![900, 901]);
        assert_eq!(info.start_time.map(|t| t.with_timezone(&Local).day()), Some(5));
    }

    #[tokio::test]
    async fn test_gather_missing_process() {
        let gatherer = PsGatherer::new(runner(), FakeSignaller::new());
        let err = gatherer.gather(812).await.unwrap_err();
        assert!(matches!(err, Error::ProcessNotFound(812)));
        assert!(gatherer.runner.calls().is_empty());
    }
}
