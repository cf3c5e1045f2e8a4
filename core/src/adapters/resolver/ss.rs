//! Listener resolver using `ss` from iproute2.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

use crate::domain::{sort_listeners, Listener, Protocol, Query};
use crate::error::{Error, Result};
use crate::ports::{CommandRunner, ListenerResolverPort};

use super::utils::parse_address;

/// Matches one `("name",pid=N,fd=M)` entry of the `users:` column.
static USER_ENTRY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\("(.*?)",pid=(\d+),fd=(\d+)\)"#).unwrap());

/// Resolver for Linux hosts without readable kernel tables.
pub struct SsResolver<R> {
    runner: R,
}

impl<R: CommandRunner> SsResolver<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }

    /// Parse `ss -Htulnp` output.
    ///
    /// Columns: netid, state, recv-q, send-q, local, peer, process. A socket
    /// shared by several processes lists every owner in the process column.
    fn parse_ss_output(&self, output: &str, query: &Query) -> Vec<Listener> {
        let mut listeners = Vec::new();
        // A dual-stack socket lists once per address family; keep the first.
        let mut seen: HashSet<(u32, u16)> = HashSet::new();

        for line in output.lines() {
            if line.is_empty() {
                continue;
            }

            let components: Vec<&str> = line.split_whitespace().collect();
            if components.len() < 7 {
                continue;
            }

            let netid = components[0];
            if netid == "tcp" && components[1] != "LISTEN" {
                continue;
            }

            let Some(local) = parse_address(components[4]) else {
                continue;
            };
            let Some(protocol) = Protocol::from_parts(netid, local.ipv6) else {
                continue;
            };
            if !query.matches(&local.address, local.port) {
                continue;
            }

            let process_column = components[6..].join(" ");
            for caps in USER_ENTRY.captures_iter(&process_column) {
                let pid: u32 = match caps[2].parse() {
                    Ok(p) => p,
                    Err(_) => continue,
                };

                if !seen.insert((pid, local.port)) {
                    continue;
                }

                listeners.push(Listener::new(pid, local.port, protocol, local.address.clone()));
            }
        }

        sort_listeners(&mut listeners);
        listeners
    }
}

impl<R: CommandRunner> ListenerResolverPort for SsResolver<R> {
    async fn resolve(&self, query: &Query) -> Result<Vec<Listener>> {
        let output = self.runner.run("ss", &["-Htulnp"]).await?;
        if !output.success {
            return Err(Error::CommandFailed(format!(
                "ss exited with an error: {}",
                output.stderr.trim()
            )));
        }

        let listeners = self.parse_ss_output(&output.stdout, query);
        debug!(count = listeners.len(), query = %query, "Parsed ss output");
        Ok(listeners)
    }

    fn backend(&self) -> &'static str {
        "ss"
    }
}
