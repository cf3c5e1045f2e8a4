//! Kill strategy selection and description.
//!
//! A decision table, not a stateful component: the supervisor of a process
//! (container runtime, then systemd) is preferred over a raw signal because
//! supervisors restart processes that are signalled behind their back.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

use super::ProcessContext;

/// How a process gets stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// SIGTERM, or SIGKILL when forced.
    Signal,
    /// `<runtime> stop`, or `<runtime> kill` when forced.
    Container,
    /// `systemctl stop <unit>`.
    Systemd,
}

impl Strategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::Signal => "signal",
            Strategy::Container => "container",
            Strategy::Systemd => "systemd",
        }
    }

    /// Whether this strategy can act on `ctx`.
    pub fn applies_to(&self, ctx: &ProcessContext) -> bool {
        match self {
            Strategy::Signal => true,
            Strategy::Container => ctx.is_containerized(),
            Strategy::Systemd => ctx.is_systemd_managed(),
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "signal" => Ok(Strategy::Signal),
            "container" => Ok(Strategy::Container),
            "systemd" => Ok(Strategy::Systemd),
            other => Err(Error::Config(format!("unknown strategy: {}", other))),
        }
    }
}

/// Pick the best strategy for a process: container, then systemd, then signal.
pub fn recommend(ctx: &ProcessContext) -> Strategy {
    if ctx.is_containerized() {
        Strategy::Container
    } else if ctx.is_systemd_managed() {
        Strategy::Systemd
    } else {
        Strategy::Signal
    }
}

/// Every applicable strategy, in priority order. Signal is always last.
pub fn available_strategies(ctx: &ProcessContext) -> Vec<Strategy> {
    [Strategy::Container, Strategy::Systemd, Strategy::Signal]
        .into_iter()
        .filter(|s| s.applies_to(ctx))
        .collect()
}

/// A fully-determined termination request.
///
/// The context is captured when the action is built; executing it never
/// re-reads the process list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Action {
    strategy: Strategy,
    context: ProcessContext,
    force: bool,
}

impl Action {
    /// Action using the recommended strategy for `context`.
    pub fn recommended(context: ProcessContext, force: bool) -> Self {
        Self {
            strategy: recommend(&context),
            context,
            force,
        }
    }

    /// Action using an explicitly chosen strategy.
    pub fn with_strategy(context: ProcessContext, strategy: Strategy, force: bool) -> Result<Self> {
        if !strategy.applies_to(&context) {
            return Err(Error::StrategyUnavailable(strategy));
        }
        Ok(Self {
            strategy,
            context,
            force,
        })
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    pub fn context(&self) -> &ProcessContext {
        &self.context
    }

    pub fn force(&self) -> bool {
        self.force
    }

    /// Canonical description of exactly what executing this action does.
    pub fn describe(&self) -> String {
        match self.strategy {
            Strategy::Signal => {
                let sig = if self.force { "SIGKILL" } else { "SIGTERM" };
                format!("kill -{} {}", sig, self.context.info.pid)
            }
            Strategy::Container => {
                let verb = if self.force { "kill" } else { "stop" };
                match &self.context.container {
                    Some(c) => format!("{} {} {}", c.runtime, verb, c.display_name()),
                    None => format!("container {} (none)", verb),
                }
            }
            Strategy::Systemd => format!(
                "systemctl stop {}",
                self.context.systemd_unit.as_deref().unwrap_or_default()
            ),
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Free-function form of [`Action::describe`].
pub fn describe(action: &Action) -> String {
    action.describe()
}
