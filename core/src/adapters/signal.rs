//! Signal delivery through `kill(2)`.

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::ports::{KillSignal, SignalPort};

/// Sends signals with `nix::sys::signal::kill`.
#[derive(Debug, Default, Clone, Copy)]
pub struct NixSignaller;

impl NixSignaller {
    pub fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
impl SignalPort for NixSignaller {
    fn send(&self, pid: u32, signal: KillSignal) -> Result<()> {
        use nix::errno::Errno;
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        let sig = match signal {
            KillSignal::Term => Signal::SIGTERM,
            KillSignal::Kill => Signal::SIGKILL,
        };
        let raw = i32::try_from(pid).map_err(|_| Error::ProcessNotFound(pid))?;

        debug!(pid = pid, signal = signal.name(), "Sending signal to process");

        match kill(Pid::from_raw(raw), sig) {
            Ok(()) => Ok(()),
            Err(Errno::ESRCH) => {
                debug!(pid = pid, "Process not found");
                Err(Error::ProcessNotFound(pid))
            }
            Err(Errno::EPERM) => {
                warn!(pid = pid, "Permission denied to kill process");
                Err(Error::PermissionDenied(format!(
                    "cannot send {} to PID {}",
                    signal.name(),
                    pid
                )))
            }
            Err(e) => Err(Error::KillFailed {
                target: format!("PID {}", pid),
                reason: e.desc().to_string(),
            }),
        }
    }

    fn is_running(&self, pid: u32) -> bool {
        use nix::errno::Errno;
        use nix::sys::signal::kill;
        use nix::unistd::Pid;

        let Ok(raw) = i32::try_from(pid) else {
            return false;
        };
        // EPERM means the process exists but belongs to someone else.
        matches!(kill(Pid::from_raw(raw), None), Ok(()) | Err(Errno::EPERM))
    }
}

#[cfg(not(unix))]
impl SignalPort for NixSignaller {
    fn send(&self, _pid: u32, _signal: KillSignal) -> Result<()> {
        Err(Error::UnsupportedPlatform(
            "signal delivery requires a unix host".to_string(),
        ))
    }

    fn is_running(&self, _pid: u32) -> bool {
        false
    }
}
