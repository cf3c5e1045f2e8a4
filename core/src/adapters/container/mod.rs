//! Container detector adapters.

mod cgroup;
mod ports;

use std::path::Path;

pub use cgroup::CgroupContainerDetector;
pub use ports::PortContainerDetector;

use crate::domain::{ContainerInfo, Runtime};
use crate::ports::{CommandRunner, ContainerDetectorPort};

/// The container detector chosen for this host.
pub enum ContainerDetector<R> {
    Cgroup(CgroupContainerDetector<R>),
    Port(PortContainerDetector<R>),
}

impl<R: CommandRunner> ContainerDetector<R> {
    /// Use cgroup records when processes expose them, published ports otherwise.
    pub fn detect(proc_root: &Path, runner: R, runtimes: Vec<Runtime>) -> Self {
        if CgroupContainerDetector::<R>::is_supported(proc_root) {
            Self::Cgroup(CgroupContainerDetector::new(proc_root, runner))
        } else {
            Self::Port(PortContainerDetector::new(runner, runtimes))
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Cgroup(_) => "cgroup",
            Self::Port(_) => "port",
        }
    }
}

impl<R: CommandRunner> ContainerDetectorPort for ContainerDetector<R> {
    async fn detect(&self, pid: u32, port: Option<u16>) -> Option<ContainerInfo> {
        match self {
            Self::Cgroup(inner) => inner.detect(pid, port).await,
            Self::Port(inner) => inner.detect(pid, port).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeRunner;

    #[test]
    fn test_detect_backend() {
        let dir = tempfile::tempdir().unwrap();
        let detector =
            ContainerDetector::detect(dir.path(), FakeRunner::new(), vec![Runtime::Docker]);
        assert_eq!(detector.backend(), "port");

        std::fs::create_dir(dir.path().join("self")).unwrap();
        std::fs::write(dir.path().join("self/cgroup"), "0::/\n").unwrap();
        let detector =
            ContainerDetector::detect(dir.path(), FakeRunner::new(), vec![Runtime::Docker]);
        assert_eq!(detector.backend(), "cgroup");
    }
}
