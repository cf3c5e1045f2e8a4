//! Process information port (interface).

use crate::domain::ProcessInfo;
use crate::error::Result;

/// Port for reading metadata about a process.
pub trait ProcessInfoPort: Send + Sync {
    /// Gather metadata for `pid`.
    ///
    /// Fails with [`crate::Error::ProcessNotFound`] when the process does not
    /// exist. Individual fields that cannot be read keep their zero value.
    fn gather(&self, pid: u32) -> impl std::future::Future<Output = Result<ProcessInfo>> + Send;
}
