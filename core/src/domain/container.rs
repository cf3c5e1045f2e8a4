//! Container domain model.

use serde::{Deserialize, Serialize};

/// Length of the display form of a container id.
pub const SHORT_ID_LEN: usize = 12;

/// Container runtime CLI that owns a container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Runtime {
    Docker,
    Podman,
}

impl Runtime {
    /// Name of the runtime executable.
    pub fn binary(&self) -> &'static str {
        match self {
            Runtime::Docker => "docker",
            Runtime::Podman => "podman",
        }
    }
}

impl std::fmt::Display for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.binary())
    }
}

/// A container confining a process.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// Opaque runtime id (64 hex characters when read from cgroups).
    pub id: String,
    /// Human label; empty when the runtime could not name it.
    pub name: String,
    pub runtime: Runtime,
}

impl ContainerInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>, runtime: Runtime) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            runtime,
        }
    }

    /// The name, or the short id when the name is unknown.
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            short_id(&self.id)
        } else {
            &self.name
        }
    }
}

impl std::fmt::Display for ContainerInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} container {}", self.runtime, self.display_name())
    }
}

/// First 12 characters of a container id, or the whole id if shorter.
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(SHORT_ID_LEN) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}
