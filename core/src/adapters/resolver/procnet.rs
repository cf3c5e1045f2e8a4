//! Kernel-table listener resolver.
//!
//! Reads `/proc/net/{tcp,tcp6,udp,udp6}` for listening sockets, then walks
//! every `/proc/<pid>/fd` to find which process holds each socket inode.

use std::collections::{HashMap, HashSet};
use std::net::{Ipv4Addr, Ipv6Addr};
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::{sort_listeners, Listener, Protocol, Query};
use crate::error::Result;
use crate::ports::ListenerResolverPort;

/// `st` value of a TCP socket in the LISTEN state.
const TCP_LISTEN: u8 = 0x0A;

/// One row of a `/proc/net` socket table.
#[derive(Debug, Clone, PartialEq, Eq)]
struct SocketRow {
    address: String,
    port: u16,
    state: u8,
    inode: u64,
}

/// The retained part of a socket row, keyed by inode.
#[derive(Debug, Clone)]
struct SocketInfo {
    port: u16,
    protocol: Protocol,
    address: String,
}

/// Linux resolver joining kernel socket tables with process fd tables.
#[derive(Debug, Clone)]
pub struct ProcNetResolver {
    proc_root: PathBuf,
}

impl ProcNetResolver {
    pub fn new(proc_root: impl Into<PathBuf>) -> Self {
        Self {
            proc_root: proc_root.into(),
        }
    }

    /// Whether the host exposes kernel socket tables under `proc_root`.
    pub fn is_supported(proc_root: &Path) -> bool {
        proc_root.join("net").join("tcp").is_file()
    }

    /// Collect matching listening sockets from every table, keyed by inode.
    fn listening_sockets(&self, query: &Query) -> HashMap<u64, SocketInfo> {
        let mut sockets = HashMap::new();

        for protocol in Protocol::ALL {
            let path = self.proc_root.join("net").join(protocol.as_str());
            let content = match std::fs::read_to_string(&path) {
                Ok(c) => c,
                Err(e) => {
                    debug!(path = %path.display(), error = %e, "Socket table unavailable");
                    continue;
                }
            };

            for row in parse_socket_table(&content) {
                if !protocol.is_udp() && row.state != TCP_LISTEN {
                    continue;
                }
                if !query.matches(&row.address, row.port) {
                    continue;
                }
                sockets.insert(
                    row.inode,
                    SocketInfo {
                        port: row.port,
                        protocol,
                        address: row.address,
                    },
                );
            }
        }

        sockets
    }

    /// Walk every process's fd table and match socket inodes.
    ///
    /// Yields between processes so that dropping the future aborts the walk.
    async fn find_owners(&self, sockets: &HashMap<u64, SocketInfo>) -> Vec<Listener> {
        let mut listeners = Vec::new();
        let mut seen: HashSet<(u32, u16, Protocol)> = HashSet::new();

        let entries = match std::fs::read_dir(&self.proc_root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(error = %e, "Process table unavailable");
                return listeners;
            }
        };

        for entry in entries.flatten() {
            let Some(pid) = entry.file_name().to_str().and_then(|s| s.parse::<u32>().ok()) else {
                continue;
            };

            let Ok(fds) = std::fs::read_dir(entry.path().join("fd")) else {
                continue;
            };

            for fd in fds.flatten() {
                let Ok(link) = std::fs::read_link(fd.path()) else {
                    continue;
                };
                let Some(inode) = link.to_str().and_then(parse_socket_link) else {
                    continue;
                };
                let Some(info) = sockets.get(&inode) else {
                    continue;
                };

                if !seen.insert((pid, info.port, info.protocol)) {
                    continue;
                }

                listeners.push(Listener::new(pid, info.port, info.protocol, info.address.clone()));
            }

            tokio::task::yield_now().await;
        }

        listeners
    }
}

impl ListenerResolverPort for ProcNetResolver {
    async fn resolve(&self, query: &Query) -> Result<Vec<Listener>> {
        let sockets = self.listening_sockets(query);
        debug!(sockets = sockets.len(), query = %query, "Matched socket table rows");
        if sockets.is_empty() {
            return Ok(Vec::new());
        }

        let mut listeners = self.find_owners(&sockets).await;
        sort_listeners(&mut listeners);
        Ok(listeners)
    }

    fn backend(&self) -> &'static str {
        "procfs"
    }
}

/// Parse a `/proc/net/{tcp,udp}[6]` table, skipping the header and bad rows.
fn parse_socket_table(content: &str) -> Vec<SocketRow> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let fields: Vec<&str> = line.split_whitespace().collect();
            if fields.len() < 10 {
                return None;
            }
            let (address, port) = parse_hex_addr(fields[1])?;
            let state = u8::from_str_radix(fields[3], 16).ok()?;
            let inode = fields[9].parse().ok()?;
            Some(SocketRow {
                address,
                port,
                state,
                inode,
            })
        })
        .collect()
}

/// Decode a kernel `HEXADDR:HEXPORT` pair.
///
/// Addresses are written as native-endian 32-bit words, i.e. little-endian
/// byte order per word on every host the tables are read on.
fn parse_hex_addr(s: &str) -> Option<(String, u16)> {
    let (hex_addr, hex_port) = s.split_once(':')?;
    let port = u16::from_str_radix(hex_port, 16).ok()?;

    let address = match hex_addr.len() {
        8 => {
            let word = u32::from_str_radix(hex_addr, 16).ok()?;
            Ipv4Addr::from(word.to_le_bytes()).to_string()
        }
        32 => {
            let mut bytes = [0u8; 16];
            for (i, chunk) in bytes.chunks_mut(4).enumerate() {
                let word = u32::from_str_radix(&hex_addr[i * 8..i * 8 + 8], 16).ok()?;
                chunk.copy_from_slice(&word.to_le_bytes());
            }
            Ipv6Addr::from(bytes).to_string()
        }
        _ => hex_addr.to_string(),
    };

    Some((address, port))
}

/// Extract the inode from an fd link target of the form `socket:[12345]`.
fn parse_socket_link(target: &str) -> Option<u64> {
    target
        .strip_prefix("socket:[")?
        .strip_suffix(']')?
        .parse()
        .ok()
}
