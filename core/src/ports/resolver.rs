//! Listener resolver port (interface).

use crate::domain::{Listener, Query};
use crate::error::Result;

/// Port for discovering listening sockets and their owning processes.
///
/// Implementations handle platform-specific details (kernel tables, ss, lsof).
/// A single unreadable data source contributes nothing instead of failing
/// the whole call.
pub trait ListenerResolverPort: Send + Sync {
    /// Resolve every listener matching `query`.
    ///
    /// Results are unique per (pid, port) but a pid may appear several times.
    fn resolve(
        &self,
        query: &Query,
    ) -> impl std::future::Future<Output = Result<Vec<Listener>>> + Send;

    /// Resolve listeners on every port and interface.
    fn resolve_all(&self) -> impl std::future::Future<Output = Result<Vec<Listener>>> + Send {
        async { self.resolve(&Query::all()).await }
    }

    /// Short name of the backend, used in logs.
    fn backend(&self) -> &'static str;
}
