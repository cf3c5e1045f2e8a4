//! Supervisor detector ports (interfaces).

use crate::domain::ContainerInfo;

/// Port for detecting container confinement.
pub trait ContainerDetectorPort: Send + Sync {
    /// Find the container running `pid`.
    ///
    /// `port` is only consulted by backends that cannot see cgroups. Every
    /// failure degrades to `None`.
    fn detect(
        &self,
        pid: u32,
        port: Option<u16>,
    ) -> impl std::future::Future<Output = Option<ContainerInfo>> + Send;
}

/// Port for detecting the systemd unit that owns a process.
pub trait SystemdDetectorPort: Send + Sync {
    /// The unit whose main process is `pid`, excluding infrastructure units.
    fn detect(&self, pid: u32) -> impl std::future::Future<Output = Option<String>> + Send;
}
