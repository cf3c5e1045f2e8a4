//! Zap Core Library
//!
//! Finds which process owns a listening port and stops it the right way.
//! Provides functionality to:
//! - Resolve TCP/UDP listeners matching a port query to their owning pids
//! - Gather process metadata (command, user, memory, start time, children)
//! - Detect container and systemd supervision
//! - Pick, describe and execute a kill strategy (signal, container, systemd)
//!
//! # Architecture
//! This library follows hexagonal architecture (ports & adapters):
//! - `domain`: Pure business logic and data models
//! - `ports`: Trait definitions (interfaces)
//! - `adapters`: External system implementations
//! - `application`: Use case services
//!
//! # Platform Support
//! - Linux: reads `/proc` directly, falls back to `ss`
//! - macOS and other unix hosts: uses `lsof` and `ps`

// Hexagonal architecture layers
pub mod adapters;
pub mod application;
pub mod domain;
pub mod ports;

pub mod config;
pub mod engine;
pub mod error;

#[cfg(test)]
mod testing;

// Re-export domain types (primary API)
pub use domain::{
    Action, ContainerInfo, Listener, ProcessContext, ProcessInfo, Protocol, Query, Runtime,
    Strategy,
};

// Re-export other commonly used types
pub use application::{EnrichWarning, EnrichedListener, Enrichment};
pub use config::{Config, ConfigStore};
pub use engine::Engine;
pub use error::{Error, Result};
