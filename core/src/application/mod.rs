//! Application layer - Use case services.
//!
//! This module contains application services that orchestrate
//! domain logic and adapter interactions.
//!
//! Services are designed to be thin orchestrators that:
//! - Accept domain types as inputs
//! - Use ports (traits) for external dependencies
//! - Return domain types as outputs

mod context_service;
mod kill_service;
mod listener_service;

pub use context_service::{ContextService, EnrichWarning, EnrichedListener, Enrichment};
pub use kill_service::KillService;
pub use listener_service::ListenerService;
