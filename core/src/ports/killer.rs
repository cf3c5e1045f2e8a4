//! Signal delivery port (interface).

use crate::error::Result;

/// Termination signals zap sends directly to a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KillSignal {
    /// Graceful termination request.
    Term,
    /// Immediate termination.
    Kill,
}

impl KillSignal {
    pub fn for_force(force: bool) -> Self {
        if force {
            KillSignal::Kill
        } else {
            KillSignal::Term
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            KillSignal::Term => "SIGTERM",
            KillSignal::Kill => "SIGKILL",
        }
    }
}

/// Port for sending signals to processes.
///
/// Implementations handle platform-specific signal delivery.
pub trait SignalPort: Send + Sync {
    /// Deliver `signal` to `pid`.
    fn send(&self, pid: u32, signal: KillSignal) -> Result<()>;

    /// Check whether a process exists (signal 0).
    fn is_running(&self, pid: u32) -> bool;
}

impl<T: SignalPort> SignalPort for std::sync::Arc<T> {
    fn send(&self, pid: u32, signal: KillSignal) -> Result<()> {
        (**self).send(pid, signal)
    }

    fn is_running(&self, pid: u32) -> bool {
        (**self).is_running(pid)
    }
}
