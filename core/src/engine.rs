//! Zap Engine - facade over the application services, with backends chosen per host.
//!
//! The engine picks one backend per concern when it is built and then
//! exposes every core operation: resolve, enrich, decide, describe, execute.

use tracing::info;

use crate::adapters::{
    ContainerDetector, ListenerResolver, NixSignaller, ProcessGatherer, SystemCommandRunner,
    SystemdDetector,
};
use crate::application::{ContextService, Enrichment, KillService, ListenerService};
use crate::config::Config;
use crate::domain::{self, Action, Listener, ProcessContext, Query, Strategy};
use crate::error::Result;
use crate::ports::{CommandRunner, SignalPort};

type Contexts<R, K> =
    ContextService<ProcessGatherer<R, K>, ContainerDetector<R>, SystemdDetector<R>>;

/// The main zap engine.
///
/// Generic over the command runner and signaller so that tests can drive a
/// fake host; [`Engine::detect`] builds the real one.
pub struct Engine<R = SystemCommandRunner, K = NixSignaller> {
    listeners: ListenerService<ListenerResolver<R>>,
    contexts: Contexts<R, K>,
    killer: KillService<R, K>,
    gatherer_backend: &'static str,
    container_backend: &'static str,
}

impl Engine {
    /// Inspect the host and build an engine with the real adapters.
    pub fn detect(config: &Config) -> Result<Self> {
        Self::with_adapters(
            config,
            SystemCommandRunner::with_timeout(config.command_timeout()),
            NixSignaller::new(),
        )
    }
}

impl<R, K> Engine<R, K>
where
    R: CommandRunner + Clone + 'static,
    K: SignalPort + Clone + 'static,
{
    /// Build an engine on top of the given runner and signaller, probing
    /// `config.proc_root` for the kernel-backed sources.
    pub fn with_adapters(config: &Config, runner: R, signaller: K) -> Result<Self> {
        let root = config.proc_root.as_path();

        let resolver = ListenerResolver::detect(root, runner.clone())?;
        let gatherer = ProcessGatherer::detect(root, runner.clone(), signaller.clone());
        let containers = ContainerDetector::detect(root, runner.clone(), config.runtimes.clone());
        let systemd = SystemdDetector::new(root, runner.clone());

        let gatherer_backend = gatherer.backend();
        let container_backend = containers.backend();

        let engine = Self {
            listeners: ListenerService::new(resolver),
            contexts: ContextService::new(gatherer, containers, systemd),
            killer: KillService::new(runner, signaller),
            gatherer_backend,
            container_backend,
        };

        info!(
            resolver = engine.listeners.backend(),
            gatherer = gatherer_backend,
            containers = container_backend,
            "Engine ready"
        );
        Ok(engine)
    }

    /// Selected backends as (resolver, gatherer, container detector).
    pub fn backends(&self) -> (&'static str, &'static str, &'static str) {
        (self.listeners.backend(), self.gatherer_backend, self.container_backend)
    }

    // =========================================================================
    // Discovery
    // =========================================================================

    /// Every listener matching `query`.
    pub async fn resolve(&self, query: &Query) -> Result<Vec<Listener>> {
        self.listeners.resolve(query).await
    }

    /// Every listener on the host.
    pub async fn resolve_all(&self) -> Result<Vec<Listener>> {
        self.listeners.resolve_all().await
    }

    /// One listener per process matching `query`.
    pub async fn resolve_targets(&self, query: &Query) -> Result<Vec<Listener>> {
        self.listeners.resolve_targets(query).await
    }

    /// Full context of one process.
    pub async fn gather_context(&self, pid: u32, port: Option<u16>) -> Result<ProcessContext> {
        self.contexts.gather_context(pid, port).await
    }

    /// Contexts for every distinct pid of `listeners`.
    pub async fn enrich(&self, listeners: &[Listener]) -> Result<Enrichment> {
        self.contexts.enrich(listeners).await
    }

    // =========================================================================
    // Decision
    // =========================================================================

    pub fn recommend(&self, ctx: &ProcessContext) -> Strategy {
        domain::recommend(ctx)
    }

    pub fn available_strategies(&self, ctx: &ProcessContext) -> Vec<Strategy> {
        domain::available_strategies(ctx)
    }

    pub fn describe(&self, action: &Action) -> String {
        domain::describe(action)
    }

    /// Carry out `action`. Failures are not retried with another strategy.
    pub async fn execute(&self, action: &Action) -> Result<()> {
        self.killer.execute(action).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;
    use std::sync::Arc;

    use crate::domain::Protocol;
    use crate::error::Error;
    use crate::ports::KillSignal;
    use crate::testing::{FakeRunner, FakeSignaller};

    const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode";

    /// A host with one bare `node` process listening on 0.0.0.0:3000.
    fn fake_host() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join("net")).unwrap();
        fs::create_dir_all(root.join("self")).unwrap();
        fs::write(root.join("self/cgroup"), "0::/\n").unwrap();
        fs::write(
            root.join("net/tcp"),
            format!(
                "{}\n   0: 00000000:0BB8 00000000:0000 0A 00000000:00000000 00:00000000 00000000  1000        0 777 1 0 100 0 0 10 0\n",
                HEADER
            ),
        )
        .unwrap();

        let pid_dir = root.join("4242");
        fs::create_dir_all(pid_dir.join("fd")).unwrap();
        symlink("socket:[777]", pid_dir.join("fd/3")).unwrap();
        fs::write(pid_dir.join("cmdline"), b"node\0server.js\0").unwrap();
        fs::write(pid_dir.join("status"), "PPid:\t1\nUid:\t1000\t1000\t1000\t1000\n").unwrap();
        fs::write(
            pid_dir.join("cgroup"),
            "0::/user.slice/user-1000.slice/session-2.scope\n",
        )
        .unwrap();
        dir
    }

    fn engine(
        root: &std::path::Path,
        signaller: Arc<FakeSignaller>,
    ) -> Engine<Arc<FakeRunner>, Arc<FakeSignaller>> {
        let config = Config {
            proc_root: root.to_path_buf(),
            ..Config::default()
        };
        Engine::with_adapters(&config, Arc::new(FakeRunner::new()), signaller).unwrap()
    }

    #[tokio::test]
    async fn test_bare_process_end_to_end() {
        let host = fake_host();
        let signaller = Arc::new(FakeSignaller::new().running(4242));
        let engine = engine(host.path(), Arc::clone(&signaller));
        assert_eq!(engine.backends(), ("procfs", "procfs", "cgroup"));

        let listeners = engine.resolve(&Query::parse(":3000").unwrap()).await.unwrap();
        assert_eq!(listeners, vec![Listener::new(4242, 3000, Protocol::Tcp, "0.0.0.0")]);

        let enrichment = engine.enrich(&listeners).await.unwrap();
        let ctx = enrichment.entries[0].context.clone();
        assert_eq!(ctx.info.command, "node server.js");
        assert!(!ctx.is_containerized());
        assert!(!ctx.is_systemd_managed());

        assert_eq!(engine.recommend(&ctx), Strategy::Signal);
        assert_eq!(engine.available_strategies(&ctx), vec![Strategy::Signal]);

        let action = Action::recommended(ctx, false);
        assert_eq!(engine.describe(&action), "kill -SIGTERM 4242");

        engine.execute(&action).await.unwrap();
        assert_eq!(signaller.sent(), vec![(4242, KillSignal::Term)]);
    }

    #[tokio::test]
    async fn test_unknown_pid_is_not_found() {
        let host = fake_host();
        let engine = engine(host.path(), Arc::new(FakeSignaller::new()));
        assert!(matches!(
            engine.gather_context(9999, None).await,
            Err(Error::ProcessNotFound(9999))
        ));
        assert!(engine.resolve(&Query::port(80)).await.unwrap().is_empty());
    }

    #[test]
    fn test_no_backend_is_unsupported() {
        let empty = tempfile::tempdir().unwrap();
        let config = Config {
            proc_root: empty.path().to_path_buf(),
            ..Config::default()
        };
        let result = Engine::with_adapters(
            &config,
            Arc::new(FakeRunner::new()),
            Arc::new(FakeSignaller::new()),
        );
        assert!(matches!(result, Err(Error::UnsupportedPlatform(_))));
    }
}
