//! Ports layer - Trait definitions (interfaces).
//!
//! This module defines the interfaces that the application layer uses
//! to interact with external systems. Implementations live in `adapters`.

mod command;
mod detector;
mod gatherer;
mod killer;
mod resolver;

pub use command::{CommandOutput, CommandRunner};
pub use detector::{ContainerDetectorPort, SystemdDetectorPort};
pub use gatherer::ProcessInfoPort;
pub use killer::{KillSignal, SignalPort};
pub use resolver::ListenerResolverPort;
