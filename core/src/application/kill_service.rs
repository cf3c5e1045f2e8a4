//! Action execution service.

use tracing::{debug, info, warn};

use crate::domain::{Action, Strategy};
use crate::error::{Error, Result};
use crate::ports::{CommandOutput, CommandRunner, KillSignal, SignalPort};

/// Carries out a chosen [`Action`].
///
/// Failures are returned as-is. Falling back to a different strategy is a
/// caller decision.
pub struct KillService<R, K> {
    runner: R,
    signaller: K,
}

impl<R: CommandRunner, K: SignalPort> KillService<R, K> {
    pub fn new(runner: R, signaller: K) -> Self {
        Self { runner, signaller }
    }

    /// Execute `action`.
    pub async fn execute(&self, action: &Action) -> Result<()> {
        let ctx = action.context();
        debug!(
            pid = ctx.pid(),
            strategy = %action.strategy(),
            force = action.force(),
            "Executing action"
        );

        let result = match action.strategy() {
            Strategy::Signal => self
                .signaller
                .send(ctx.pid(), KillSignal::for_force(action.force())),
            Strategy::Container => {
                let container = ctx
                    .container
                    .as_ref()
                    .ok_or(Error::StrategyUnavailable(Strategy::Container))?;
                let verb = if action.force() { "kill" } else { "stop" };
                let target = container.to_string();
                let output = self
                    .runner
                    .run(container.runtime.binary(), &[verb, container.id.as_str()])
                    .await;
                check_output(&target, output)
            }
            Strategy::Systemd => {
                let unit = ctx
                    .systemd_unit
                    .as_deref()
                    .filter(|u| !u.is_empty())
                    .ok_or(Error::StrategyUnavailable(Strategy::Systemd))?;
                let output = self.runner.run("systemctl", &["stop", unit]).await;
                check_output(unit, output)
            }
        };

        match &result {
            Ok(()) => info!(pid = ctx.pid(), action = %action.describe(), "Action executed"),
            Err(e) => warn!(
                pid = ctx.pid(),
                action = %action.describe(),
                error = %e,
                "Action failed"
            ),
        }
        result
    }
}

/// Turn a runtime / service manager invocation into a kill result.
fn check_output(target: &str, output: Result<CommandOutput>) -> Result<()> {
    let output = output.map_err(|e| Error::KillFailed {
        target: target.to_string(),
        reason: e.to_string(),
    })?;
    if output.success {
        return Ok(());
    }

    let reason = output.stderr.trim().to_string();
    if reason.contains("Access denied")
        || reason.contains("permission denied")
        || reason.contains("authentication required")
    {
        return Err(Error::PermissionDenied(format!("{}: {}", target, reason)));
    }
    Err(Error::KillFailed {
        target: target.to_string(),
        reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::domain::{ContainerInfo, ProcessContext, ProcessInfo, Runtime};
    use crate::testing::{FakeRunner, FakeSignaller};

    const ID: &str = "4f2a1c9e8b7d6a5f4e3d2c1b0a9f8e7d6c5b4a3f2e1d0c9b8a7f6e5d4c3b2a1f";

    #[tokio::test]
    async fn test_bare_process_gets_sigterm_only() {
        let runner = Arc::new(FakeRunner::new());
        let signaller = Arc::new(FakeSignaller::new().running(4242));
        let service = KillService::new(Arc::clone(&runner), Arc::clone(&signaller));

        let action = Action::recommended(ProcessContext::bare(ProcessInfo::new(4242)), false);
        assert_eq!(action.describe(), "kill -SIGTERM 4242");

        service.execute(&action).await.unwrap();
        assert_eq!(signaller.sent(), vec![(4242, KillSignal::Term)]);
        assert!(runner.calls().is_empty());
    }

    #[tokio::test]
    async fn test_forced_signal_is_sigkill() {
        let signaller = Arc::new(FakeSignaller::new().running(7));
        let service = KillService::new(FakeRunner::new(), Arc::clone(&signaller));

        let action = Action::recommended(ProcessContext::bare(ProcessInfo::new(7)), true);
        service.execute(&action).await.unwrap();
        assert_eq!(signaller.sent(), vec![(7, KillSignal::Kill)]);
    }

    #[tokio::test]
    async fn test_container_uses_full_id() {
        let runner = Arc::new(
            FakeRunner::new()
                .installed("docker")
                .respond(&format!("docker stop {}", ID), crate::ports::CommandOutput::ok(ID)),
        );
        let signaller = Arc::new(FakeSignaller::new().running(10));
        let service = KillService::new(Arc::clone(&runner), Arc::clone(&signaller));

        let ctx = ProcessContext::bare(ProcessInfo::new(10))
            .with_container(ContainerInfo::new(ID, "web", Runtime::Docker));
        let action = Action::recommended(ctx, false);
        assert_eq!(action.describe(), "docker stop web");

        service.execute(&action).await.unwrap();
        assert_eq!(runner.calls(), vec![format!("docker stop {}", ID)]);
        assert!(signaller.sent().is_empty());
    }

    #[tokio::test]
    async fn test_forced_container_is_killed_by_full_id() {
        let runner = Arc::new(
            FakeRunner::new()
                .installed("docker")
                .respond(&format!("docker kill {}", ID), crate::ports::CommandOutput::ok(ID)),
        );
        let signaller = Arc::new(FakeSignaller::new().running(10));
        let service = KillService::new(Arc::clone(&runner), Arc::clone(&signaller));

        let ctx = ProcessContext::bare(ProcessInfo::new(10))
            .with_container(ContainerInfo::new(ID, "web", Runtime::Docker));
        service.execute(&Action::recommended(ctx, true)).await.unwrap();

        assert_eq!(runner.calls(), vec![format!("docker kill {}", ID)]);
        assert!(signaller.sent().is_empty());
    }

    #[tokio::test]
    async fn test_systemd_ignores_force() {
        let runner = Arc::new(
            FakeRunner::new()
                .installed("systemctl")
                .respond("systemctl stop nginx.service", crate::ports::CommandOutput::ok("")),
        );
        let service = KillService::new(Arc::clone(&runner), FakeSignaller::new());

        let ctx = ProcessContext::bare(ProcessInfo::new(30)).with_systemd_unit("nginx.service");
        service.execute(&Action::recommended(ctx, true)).await.unwrap();
        assert_eq!(runner.calls(), vec!["systemctl stop nginx.service"]);
    }

    #[tokio::test]
    async fn test_failure_is_not_retried() {
        let runner = Arc::new(FakeRunner::new().installed("podman"));
        let signaller = Arc::new(FakeSignaller::new().running(10));
        let service = KillService::new(Arc::clone(&runner), Arc::clone(&signaller));

        let ctx = ProcessContext::bare(ProcessInfo::new(10))
            .with_container(ContainerInfo::new(ID, "", Runtime::Podman));
        let err = service.execute(&Action::recommended(ctx, true)).await.unwrap_err();

        assert!(matches!(err, Error::KillFailed { .. }));
        assert_eq!(runner.calls(), vec![format!("podman kill {}", ID)]);
        assert!(signaller.sent().is_empty());
    }

    #[tokio::test]
    async fn test_signal_errors_pass_through() {
        let service = KillService::new(FakeRunner::new(), FakeSignaller::new().denied(1));

        let err = service
            .execute(&Action::recommended(ProcessContext::bare(ProcessInfo::new(1)), false))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));

        let err = service
            .execute(&Action::recommended(ProcessContext::bare(ProcessInfo::new(2)), false))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::ProcessNotFound(2)));
    }

    #[test]
    fn test_check_output_permission() {
        let err = check_output(
            "nginx.service",
            Ok(CommandOutput::failed("Failed to stop nginx.service: Access denied")),
        )
        .unwrap_err();
        assert!(matches!(err, Error::PermissionDenied(_)));
    }
}
