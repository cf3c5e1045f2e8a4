//! Adapters layer - External system implementations.
//!
//! This module contains implementations of the port traits defined in `ports`.
//! Each adapter handles communication with one external system: the proc
//! filesystem, a CLI tool, or the kernel's signal interface.

mod command;
pub mod container;
pub mod process;
pub mod resolver;
mod signal;
mod systemd;

// Re-export main types for convenience
pub use command::{SystemCommandRunner, DEFAULT_COMMAND_TIMEOUT};
pub use container::ContainerDetector;
pub use process::ProcessGatherer;
pub use resolver::ListenerResolver;
pub use signal::NixSignaller;
pub use systemd::SystemdDetector;
