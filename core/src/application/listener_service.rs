//! Listener resolution application service.

use tracing::debug;

use crate::domain::{dedup_by_pid, Listener, Query};
use crate::error::Result;
use crate::ports::ListenerResolverPort;

/// Application service for listener discovery.
///
/// It uses the `ListenerResolverPort` trait for the actual resolution,
/// allowing different implementations to be injected.
pub struct ListenerService<S> {
    resolver: S,
}

impl<S: ListenerResolverPort> ListenerService<S> {
    /// Create a new listener service with the given resolver.
    pub fn new(resolver: S) -> Self {
        Self { resolver }
    }

    /// Every listener matching `query`, possibly several per pid.
    pub async fn resolve(&self, query: &Query) -> Result<Vec<Listener>> {
        let listeners = self.resolver.resolve(query).await?;
        debug!(
            backend = self.resolver.backend(),
            query = %query,
            count = listeners.len(),
            "Resolved listeners"
        );
        Ok(listeners)
    }

    /// Every listener on the host.
    pub async fn resolve_all(&self) -> Result<Vec<Listener>> {
        self.resolve(&Query::all()).await
    }

    /// One listener per process matching `query`: the kill targets.
    pub async fn resolve_targets(&self, query: &Query) -> Result<Vec<Listener>> {
        Ok(dedup_by_pid(&self.resolve(query).await?))
    }

    /// Short name of the resolver backend in use.
    pub fn backend(&self) -> &'static str {
        self.resolver.backend()
    }
}
