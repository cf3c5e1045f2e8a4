//! Container detection from cgroup membership.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::domain::cgroup::parse_container_id;
use crate::domain::{short_id, ContainerInfo, Runtime, SHORT_ID_LEN};
use crate::ports::{CommandRunner, ContainerDetectorPort};

/// Reads `<root>/<pid>/cgroup` and asks the runtime CLI for the name.
pub struct CgroupContainerDetector<R> {
    root: PathBuf,
    runner: R,
}

impl<R: CommandRunner> CgroupContainerDetector<R> {
    pub fn new(root: impl Into<PathBuf>, runner: R) -> Self {
        Self {
            root: root.into(),
            runner,
        }
    }

    /// Whether processes under `root` expose cgroup records.
    pub fn is_supported(root: &Path) -> bool {
        root.join("self").join("cgroup").exists()
    }

    /// Pick the runtime that can actually act on the container.
    ///
    /// A podman hint wins when podman is installed; otherwise prefer docker,
    /// then podman, and keep the hint when neither is installed.
    fn resolve_runtime(&self, hint: Runtime) -> Runtime {
        if hint == Runtime::Podman && self.runner.is_available("podman") {
            return Runtime::Podman;
        }
        if self.runner.is_available("docker") {
            return Runtime::Docker;
        }
        if self.runner.is_available("podman") {
            return Runtime::Podman;
        }
        hint
    }

    /// Ask the runtime for the container name, retrying once with the short id.
    async fn container_name(&self, id: &str, runtime: Runtime) -> String {
        if let Some(name) = self.inspect_name(id, runtime).await {
            return name;
        }
        if id.len() > SHORT_ID_LEN {
            if let Some(name) = self.inspect_name(short_id(id), runtime).await {
                return name;
            }
        }
        debug!(id = short_id(id), runtime = %runtime, "Container name unavailable");
        String::new()
    }

    async fn inspect_name(&self, id: &str, runtime: Runtime) -> Option<String> {
        let output = self
            .runner
            .run(runtime.binary(), &["inspect", "--format", "{{.Name}}", id])
            .await
            .ok()?;
        if !output.success {
            return None;
        }
        let name = output.stdout.trim();
        Some(name.strip_prefix('/').unwrap_or(name).to_string())
    }
}

impl<R: CommandRunner> ContainerDetectorPort for CgroupContainerDetector<R> {
    async fn detect(&self, pid: u32, _port: Option<u16>) -> Option<ContainerInfo> {
        let path = self.root.join(pid.to_string()).join("cgroup");
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) => {
                debug!(pid = pid, error = %e, "cgroup record unavailable");
                return None;
            }
        };

        let (id, hint) = parse_container_id(&content)?;
        let runtime = self.resolve_runtime(hint);
        let name = self.container_name(&id, runtime).await;

        debug!(pid = pid, id = short_id(&id), runtime = %runtime, "Process is containerized");
        Some(ContainerInfo::new(id, name, runtime))
    }
}
