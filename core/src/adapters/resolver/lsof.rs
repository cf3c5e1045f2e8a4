//! Listener resolver using `lsof`, for hosts without procfs or iproute2.

use std::collections::HashSet;

use tracing::debug;

use crate::domain::{sort_listeners, Listener, Protocol, Query};
use crate::error::Result;
use crate::ports::{CommandRunner, ListenerResolverPort};

use super::utils::parse_address;

const LSOF_ARGS: [&str; 6] = ["-iTCP", "-sTCP:LISTEN", "-n", "-P", "-F", "pcn"];

/// TCP-only resolver driven by `lsof -F` field output.
pub struct LsofResolver<R> {
    runner: R,
}

impl<R: CommandRunner> LsofResolver<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Parse `lsof -F pcn` records.
    ///
    /// Each line starts with a field tag: `p` opens a process set, `n` names
    /// one of its files. Other tags are ignored.
    fn parse_lsof_output(&self, output: &str, query: &Query) -> Vec<Listener> {
        let mut listeners = Vec::new();
        // A dual-stack socket lists once per address family; keep the first.
        let mut seen: HashSet<(u32, u16)> = HashSet::new();
        let mut current_pid: Option<u32> = None;

        for line in output.lines() {
            let Some(tag) = line.chars().next() else {
                continue;
            };
            let value = &line[tag.len_utf8()..];

            match tag {
                'p' => current_pid = value.parse().ok(),
                'n' => {
                    let Some(pid) = current_pid else {
                        continue;
                    };
                    // Connected sockets print as "local->remote".
                    if value.contains("->") {
                        continue;
                    }
                    let Some(local) = parse_address(value) else {
                        continue;
                    };
                    if !query.matches(&local.address, local.port) {
                        continue;
                    }

                    let protocol = if local.ipv6 { Protocol::Tcp6 } else { Protocol::Tcp };
                    if !seen.insert((pid, local.port)) {
                        continue;
                    }

                    listeners.push(Listener::new(pid, local.port, protocol, local.address));
                }
                _ => {}
            }
        }

        sort_listeners(&mut listeners);
        listeners
    }
}

impl<R: CommandRunner> ListenerResolverPort for LsofResolver<R> {
    async fn resolve(&self, query: &Query) -> Result<Vec<Listener>> {
        let output = self.runner.run("lsof", &LSOF_ARGS).await?;

        // lsof exits 1 when nothing matched.
        if !output.success && output.stdout.trim().is_empty() {
            debug!(stderr = %output.stderr.trim(), "lsof reported no listeners");
            return Ok(Vec::new());
        }

        let listeners = self.parse_lsof_output(&output.stdout, query);
        debug!(count = listeners.len(), query = %query, "Parsed lsof output");
        Ok(listeners)
    }

    fn backend(&self) -> &'static str {
        "lsof"
    }
}
