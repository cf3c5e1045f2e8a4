//! Process info gatherer adapters.

mod procfs;
mod ps;

use std::path::Path;

pub use procfs::ProcGatherer;
pub use ps::PsGatherer;

use crate::domain::ProcessInfo;
use crate::error::Result;
use crate::ports::{CommandRunner, ProcessInfoPort, SignalPort};

/// The gatherer chosen for this host.
pub enum ProcessGatherer<R, K> {
    Proc(ProcGatherer),
    Ps(PsGatherer<R, K>),
}

impl<R: CommandRunner, K: SignalPort> ProcessGatherer<R, K> {
    /// Use the proc filesystem when `proc_root` has one, `ps` otherwise.
    pub fn detect(proc_root: &Path, runner: R, signaller: K) -> Self {
        if ProcGatherer::is_supported(proc_root) {
            Self::Proc(ProcGatherer::new(proc_root))
        } else {
            Self::Ps(PsGatherer::new(runner, signaller))
        }
    }

    pub fn backend(&self) -> &'static str {
        match self {
            Self::Proc(_) => "procfs",
            Self::Ps(_) => "ps",
        }
    }
}

impl<R: CommandRunner, K: SignalPort> ProcessInfoPort for ProcessGatherer<R, K> {
    async fn gather(&self, pid: u32) -> Result<ProcessInfo> {
        match self {
            Self::Proc(inner) => inner.gather(pid).await,
            Self::Ps(inner) => inner.gather(pid).await,
        }
    }
}

/// Resolve a uid through the user database, falling back to the number.
#[cfg(unix)]
pub(crate) fn user_name(uid: u32) -> String {
    use nix::unistd::{Uid, User};

    match User::from_uid(Uid::from_raw(uid)) {
        Ok(Some(user)) => user.name,
        _ => uid.to_string(),
    }
}

#[cfg(not(unix))]
pub(crate) fn user_name(uid: u32) -> String {
    uid.to_string()
}
