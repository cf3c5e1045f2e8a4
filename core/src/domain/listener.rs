//! Listening socket observations.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// Socket family as reported by the kernel tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Tcp6,
    Udp,
    Udp6,
}

impl Protocol {
    /// Every protocol, in the order the kernel tables are read.
    pub const ALL: [Protocol; 4] = [Protocol::Tcp, Protocol::Tcp6, Protocol::Udp, Protocol::Udp6];

    /// Name of the protocol (also the `/proc/net` table name).
    pub fn as_str(&self) -> &'static str {
        match self {
            Protocol::Tcp => "tcp",
            Protocol::Tcp6 => "tcp6",
            Protocol::Udp => "udp",
            Protocol::Udp6 => "udp6",
        }
    }

    /// UDP has no listen state; every bound socket counts.
    pub fn is_udp(&self) -> bool {
        matches!(self, Protocol::Udp | Protocol::Udp6)
    }

    /// Build from a base name (`tcp`/`udp`) and address family.
    pub fn from_parts(base: &str, ipv6: bool) -> Option<Self> {
        match (base, ipv6) {
            ("tcp", false) => Some(Protocol::Tcp),
            ("tcp", true) => Some(Protocol::Tcp6),
            ("udp", false) => Some(Protocol::Udp),
            ("udp", true) => Some(Protocol::Udp6),
            _ => None,
        }
    }
}

impl std::fmt::Display for Protocol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A process observed listening on a port.
///
/// This is a snapshot taken at resolution time, not a live handle: the
/// process may have exited by the time anything acts on it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Listener {
    pub pid: u32,
    pub port: u16,
    pub protocol: Protocol,
    /// Bound local address.
    pub interface: String,
}

impl Listener {
    pub fn new(pid: u32, port: u16, protocol: Protocol, interface: impl Into<String>) -> Self {
        Self {
            pid,
            port,
            protocol,
            interface: interface.into(),
        }
    }
}

impl std::fmt::Display for Listener {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{}/{} (PID: {})",
            self.interface, self.port, self.protocol, self.pid
        )
    }
}

/// Keep the first listener of every pid, preserving order.
///
/// Enrichment and strategy selection are per process, while a process may
/// hold many matching sockets.
pub fn dedup_by_pid(listeners: &[Listener]) -> Vec<Listener> {
    let mut seen = HashSet::new();
    listeners
        .iter()
        .filter(|l| seen.insert(l.pid))
        .cloned()
        .collect()
}

/// Sort listeners by port, then pid.
pub fn sort_listeners(listeners: &mut [Listener]) {
    listeners.sort_by(|a, b| (a.port, a.pid, a.protocol).cmp(&(b.port, b.pid, b.protocol)));
}
