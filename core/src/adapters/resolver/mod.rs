//! Listener resolver adapters.
//!
//! Host-specific implementations of listener discovery.

mod lsof;
mod procnet;
mod ss;
mod utils;

use std::path::Path;

use tracing::debug;

pub use lsof::LsofResolver;
pub use procnet::ProcNetResolver;
pub use ss::SsResolver;

use crate::domain::{Listener, Query};
use crate::error::{Error, Result};
use crate::ports::{CommandRunner, ListenerResolverPort};

/// The listener resolver chosen for this host.
pub enum ListenerResolver<R> {
    ProcNet(ProcNetResolver),
    Ss(SsResolver<R>),
    Lsof(LsofResolver<R>),
}

impl<R: CommandRunner> ListenerResolver<R> {
    /// Pick a backend: kernel tables first, then `ss`, then `lsof`.
    pub fn detect(proc_root: &Path, runner: R) -> Result<Self> {
        let resolver = if ProcNetResolver::is_supported(proc_root) {
            Self::ProcNet(ProcNetResolver::new(proc_root))
        } else if runner.is_available("ss") {
            Self::Ss(SsResolver::new(runner))
        } else if runner.is_available("lsof") {
            Self::Lsof(LsofResolver::new(runner))
        } else {
            return Err(Error::UnsupportedPlatform(format!(
                "no socket tables under {} and neither ss nor lsof is installed",
                proc_root.display()
            )));
        };

        debug!(backend = resolver.backend(), "Selected listener resolver");
        Ok(resolver)
    }
}

impl<R: CommandRunner> ListenerResolverPort for ListenerResolver<R> {
    async fn resolve(&self, query: &Query) -> Result<Vec<Listener>> {
        match self {
            Self::ProcNet(inner) => inner.resolve(query).await,
            Self::Ss(inner) => inner.resolve(query).await,
            Self::Lsof(inner) => inner.resolve(query).await,
        }
    }

    fn backend(&self) -> &'static str {
        match self {
            Self::ProcNet(inner) => inner.backend(),
            Self::Ss(inner) => inner.backend(),
            Self::Lsof(inner) => inner.backend(),
        }
    }
}
