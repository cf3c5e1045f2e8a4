//! Process context enrichment service.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, warn};

use crate::domain::{dedup_by_pid, Listener, ProcessContext};
use crate::error::Result;
use crate::ports::{ContainerDetectorPort, ProcessInfoPort, SystemdDetectorPort};

/// A kill target: one listener of a process and that process's context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichedListener {
    pub listener: Listener,
    pub context: ProcessContext,
}

/// A pid skipped during enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrichWarning {
    pub pid: u32,
    pub port: u16,
    pub message: String,
}

impl std::fmt::Display for EnrichWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "port {} (PID {}): {}", self.port, self.pid, self.message)
    }
}

/// Result of enriching a set of listeners.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Enrichment {
    /// One entry per pid, in input order.
    pub entries: Vec<EnrichedListener>,
    pub warnings: Vec<EnrichWarning>,
}

impl Enrichment {
    /// The context gathered for `pid`, if it was enriched.
    pub fn context_for(&self, pid: u32) -> Option<&ProcessContext> {
        self.entries
            .iter()
            .find(|e| e.listener.pid == pid)
            .map(|e| &e.context)
    }
}

/// Upper bound on processes inspected at once.
const MAX_CONCURRENT_GATHERS: usize = 16;

struct Detectors<P, C, S> {
    gatherer: P,
    containers: C,
    systemd: S,
}

impl<P, C, S> Detectors<P, C, S>
where
    P: ProcessInfoPort,
    C: ContainerDetectorPort,
    S: SystemdDetectorPort,
{
    async fn gather_context(&self, pid: u32, port: Option<u16>) -> Result<ProcessContext> {
        let info = self.gatherer.gather(pid).await?;
        let (container, systemd_unit) = tokio::join!(
            self.containers.detect(pid, port),
            self.systemd.detect(pid)
        );

        Ok(ProcessContext {
            info,
            container,
            systemd_unit,
        })
    }
}

/// Builds a `ProcessContext` for each pid from the three per-pid sources.
pub struct ContextService<P, C, S> {
    inner: Arc<Detectors<P, C, S>>,
}

impl<P, C, S> ContextService<P, C, S>
where
    P: ProcessInfoPort + 'static,
    C: ContainerDetectorPort + 'static,
    S: SystemdDetectorPort + 'static,
{
    pub fn new(gatherer: P, containers: C, systemd: S) -> Self {
        Self {
            inner: Arc::new(Detectors {
                gatherer,
                containers,
                systemd,
            }),
        }
    }

    /// Gather the full context of one process.
    ///
    /// `port` lets port-based container detection find the container.
    pub async fn gather_context(&self, pid: u32, port: Option<u16>) -> Result<ProcessContext> {
        self.inner.gather_context(pid, port).await
    }

    /// Enrich every distinct pid of `listeners` concurrently.
    ///
    /// Processes that vanished since resolution, or whose inspection task
    /// died, are reported as warnings; any other failure aborts the call.
    pub async fn enrich(&self, listeners: &[Listener]) -> Result<Enrichment> {
        let targets = dedup_by_pid(listeners);
        let limit = Arc::new(Semaphore::new(MAX_CONCURRENT_GATHERS));
        let mut tasks = JoinSet::new();

        for (index, listener) in targets.iter().cloned().enumerate() {
            let inner = Arc::clone(&self.inner);
            let limit = Arc::clone(&limit);
            tasks.spawn(async move {
                let _permit = limit.acquire_owned().await.ok();
                let result = inner.gather_context(listener.pid, Some(listener.port)).await;
                (index, listener, result)
            });
        }

        let mut finished = vec![false; targets.len()];
        let mut entries = Vec::new();
        let mut warnings = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            let (index, listener, result) = match joined {
                Ok(done) => done,
                Err(e) => {
                    warn!(error = %e, "Enrichment task failed");
                    continue;
                }
            };
            finished[index] = true;

            match result {
                Ok(context) => entries.push((index, EnrichedListener { listener, context })),
                Err(e) if e.is_soft() => {
                    debug!(pid = listener.pid, error = %e, "Process skipped during enrichment");
                    warnings.push(EnrichWarning {
                        pid: listener.pid,
                        port: listener.port,
                        message: e.to_string(),
                    });
                }
                Err(e) => return Err(e),
            }
        }

        // A task that never reported back panicked or was cancelled.
        for (listener, _) in targets.iter().zip(&finished).filter(|(_, done)| !**done) {
            warnings.push(EnrichWarning {
                pid: listener.pid,
                port: listener.port,
                message: "process inspection did not complete".to_string(),
            });
        }

        entries.sort_by_key(|(index, _)| *index);
        warnings.sort_by_key(|w| (w.port, w.pid));

        Ok(Enrichment {
            entries: entries.into_iter().map(|(_, entry)| entry).collect(),
            warnings,
        })
    }
}

impl<P, C, S> Clone for ContextService<P, C, S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}
