//! Container detection by published port.
//!
//! Used where the runtime runs containers inside a VM and host cgroups say
//! nothing about them.

use serde::Deserialize;
use tracing::debug;

use crate::domain::{ContainerInfo, Runtime};
use crate::ports::{CommandRunner, ContainerDetectorPort};

/// One line of `<runtime> ps --format {{json .}}`.
#[derive(Debug, Deserialize)]
struct PsEntry {
    #[serde(rename = "ID", alias = "Id")]
    id: String,
    #[serde(rename = "Names", default)]
    names: Names,
    #[serde(rename = "Ports", default)]
    ports: Option<Ports>,
}

impl PsEntry {
    fn publishes(&self, port: u16) -> bool {
        self.ports.as_ref().is_some_and(|p| p.publishes(port))
    }
}

/// Docker prints one name; podman prints a list.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Names {
    One(String),
    Many(Vec<String>),
}

impl Default for Names {
    fn default() -> Self {
        Names::One(String::new())
    }
}

impl Names {
    fn first(&self) -> &str {
        let name = match self {
            Names::One(name) => name.as_str(),
            Names::Many(names) => names.first().map(String::as_str).unwrap_or(""),
        };
        name.strip_prefix('/').unwrap_or(name)
    }
}

/// Docker prints a summary string; podman prints structured mappings.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Ports {
    /// e.g. `0.0.0.0:3000->3000/tcp, :::3000->3000/tcp`
    Text(String),
    Mappings(Vec<PortMapping>),
}

/// A podman mapping of `range` consecutive host ports starting at `host_port`.
#[derive(Debug, Deserialize)]
struct PortMapping {
    host_port: u16,
    #[serde(default)]
    range: u16,
}

impl Ports {
    fn publishes(&self, port: u16) -> bool {
        match self {
            Ports::Text(text) => text.contains(&format!(":{}->", port)),
            Ports::Mappings(mappings) => mappings.iter().any(|m| {
                let last = u32::from(m.host_port) + u32::from(m.range.max(1)) - 1;
                m.host_port != 0 && (u32::from(m.host_port)..=last).contains(&u32::from(port))
            }),
        }
    }
}

/// Matches a port against the port mappings of running containers.
pub struct PortContainerDetector<R> {
    runner: R,
    runtimes: Vec<Runtime>,
}

impl<R: CommandRunner> PortContainerDetector<R> {
    /// `runtimes` are queried in order; the first match wins.
    pub fn new(runner: R, runtimes: Vec<Runtime>) -> Self {
        Self { runner, runtimes }
    }

    async fn find_in(&self, runtime: Runtime, port: u16) -> Option<ContainerInfo> {
        let output = match self
            .runner
            .run(runtime.binary(), &["ps", "--format", "{{json .}}"])
            .await
        {
            Ok(output) if output.success => output,
            Ok(output) => {
                debug!(
                    runtime = %runtime,
                    stderr = %output.stderr.trim(),
                    "Container listing failed"
                );
                return None;
            }
            Err(e) => {
                debug!(runtime = %runtime, error = %e, "Container listing failed");
                return None;
            }
        };

        output
            .stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<PsEntry>(line) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    debug!(runtime = %runtime, error = %e, "Skipping unparseable container entry");
                    None
                }
            })
            .find(|entry| entry.publishes(port))
            .map(|entry| ContainerInfo::new(entry.id.clone(), entry.names.first(), runtime))
    }
}

impl<R: CommandRunner> ContainerDetectorPort for PortContainerDetector<R> {
    async fn detect(&self, pid: u32, port: Option<u16>) -> Option<ContainerInfo> {
        let port = port?;

        for &runtime in &self.runtimes {
            if !self.runner.is_available(runtime.binary()) {
                continue;
            }
            if let Some(info) = self.find_in(runtime, port).await {
                debug!(pid = pid, port = port, container = %info, "Port published by container");
                return Some(info);
            }
        }

        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::CommandOutput;
    use crate::testing::FakeRunner;

    const DOCKER_PS: &str = r#"{"Command":"\"nginx -g…\"","ID":"a1b2c3d4e5f6","Image":"nginx","Names":"proxy","Ports":"0.0.0.0:8080->80/tcp, :::8080->80/tcp"}
not json
{"ID":"0f0e0d0c0b0a","Names":"api","Ports":"0.0.0.0:3000->3000/tcp"}
"#;

    const PODMAN_PS: &str = r#"{"AutoRemove":false,"Command":["redis-server"],"Id":"ffeeddccbbaa","Image":"docker.io/library/redis:7","Names":["cache"],"Ports":[{"host_ip":"","container_port":6379,"host_port":6379,"range":1,"protocol":"tcp"}],"State":"running"}
{"Id":"998877665544","Names":["workers"],"Ports":[{"host_ip":"127.0.0.1","container_port":9000,"host_port":9100,"range":3,"protocol":"tcp"}]}
{"Id":"112233445566","Names":["sidecar"],"Ports":null}
"#;

    fn runner() -> FakeRunner {
        FakeRunner::new()
            .installed("docker")
            .installed("podman")
            .respond("docker ps --format {{json .}}", CommandOutput::ok(DOCKER_PS))
            .respond("podman ps --format {{json .}}", CommandOutput::ok(PODMAN_PS))
    }

    #[tokio::test]
    async fn test_detect_by_port() {
        let detector = PortContainerDetector::new(runner(), vec![Runtime::Docker, Runtime::Podman]);

        let info = detector.detect(1, Some(3000)).await.unwrap();
        assert_eq!(info, ContainerInfo::new("0f0e0d0c0b0a", "api", Runtime::Docker));

        let info = detector.detect(1, Some(6379)).await.unwrap();
        assert_eq!(info, ContainerInfo::new("ffeeddccbbaa", "cache", Runtime::Podman));
    }

    #[tokio::test]
    async fn test_port_must_be_a_host_mapping() {
        let detector = PortContainerDetector::new(runner(), vec![Runtime::Docker, Runtime::Podman]);
        // 80 only appears as a container-side port.
        assert_eq!(detector.detect(1, Some(80)).await, None);
    }

    #[tokio::test]
    async fn test_no_port_no_lookup() {
        let detector = PortContainerDetector::new(runner(), vec![Runtime::Docker]);
        assert_eq!(detector.detect(1, None).await, None);
        assert!(detector.runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_missing_runtime_skipped() {
        let runner = FakeRunner::new()
            .installed("podman")
            .respond("podman ps --format {{json .}}", CommandOutput::ok(PODMAN_PS));
        let detector = PortContainerDetector::new(runner, vec![Runtime::Docker, Runtime::Podman]);

        assert!(detector.detect(1, Some(6379)).await.is_some());
        assert_eq!(detector.runner.calls(), vec!["podman ps --format {{json .}}"]);
    }

    #[tokio::test]
    async fn test_podman_port_ranges() {
        let runner = FakeRunner::new()
            .installed("podman")
            .respond("podman ps --format {{json .}}", CommandOutput::ok(PODMAN_PS));
        let detector = PortContainerDetector::new(runner, vec![Runtime::Podman]);

        let info = detector.detect(1, Some(9102)).await.unwrap();
        assert_eq!(info, ContainerInfo::new("998877665544", "workers", Runtime::Podman));
        // Container-side port only.
        assert_eq!(detector.detect(1, Some(9000)).await, None);
        assert_eq!(detector.detect(1, Some(9103)).await, None);
    }
}
