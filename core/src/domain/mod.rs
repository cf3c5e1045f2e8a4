//! Domain layer - Pure business logic and data models.
//!
//! This module contains domain entities that represent core business concepts.
//! These types have no I/O dependencies and can be tested in isolation.

pub mod cgroup;
mod container;
mod listener;
mod process;
mod query;
mod strategy;

// Re-export all domain types
pub use container::{short_id, ContainerInfo, Runtime, SHORT_ID_LEN};
pub use listener::{dedup_by_pid, sort_listeners, Listener, Protocol};
pub use process::{ProcessContext, ProcessInfo};
pub use query::{is_wildcard, Query};
pub use strategy::{available_strategies, describe, recommend, Action, Strategy};
