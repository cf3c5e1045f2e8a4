//! Kill command - stop whatever is listening on the given ports.

use std::collections::HashSet;
use std::io::{self, BufRead, Write};

use anyhow::Result;
use serde::Serialize;
use tracing::{debug, warn};
use zap_core::{Action, Engine, Listener, ProcessContext, Query, Strategy};

use crate::output::{context_summary, format_memory, format_started};

pub struct KillOptions {
    pub force: bool,
    pub dry_run: bool,
    pub yes: bool,
    pub strategy: Option<Strategy>,
    pub json: bool,
}

/// A planned (and possibly executed) action, as reported with `--json`.
#[derive(Serialize)]
struct PlanEntry<'a> {
    action: String,
    strategy: Strategy,
    force: bool,
    listener: &'a Listener,
    context: &'a ProcessContext,
    executed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

struct Target {
    listener: Listener,
    action: Action,
}

/// Returns `false` when any query matched nothing or any action failed.
pub async fn run(engine: &Engine, queries: &[Query], opts: &KillOptions) -> Result<bool> {
    let mut success = true;
    let mut handled = HashSet::new();
    let mut targets = Vec::new();

    for query in queries {
        let listeners = engine.resolve_targets(query).await?;
        if listeners.is_empty() {
            eprintln!("No process listening on {}", query);
            success = false;
            continue;
        }

        let fresh: Vec<Listener> = listeners
            .into_iter()
            .filter(|l| !handled.contains(&l.pid))
            .collect();
        let enrichment = engine.enrich(&fresh).await?;
        for warning in &enrichment.warnings {
            eprintln!("warning: {}", warning);
        }

        for entry in enrichment.entries {
            if !handled.insert(entry.listener.pid) {
                continue;
            }
            let action = match opts.strategy {
                Some(strategy) => match Action::with_strategy(entry.context, strategy, opts.force) {
                    Ok(action) => action,
                    Err(e) => {
                        eprintln!("PID {}: {}", entry.listener.pid, e);
                        success = false;
                        continue;
                    }
                },
                None => Action::recommended(entry.context, opts.force),
            };
            debug!(pid = entry.listener.pid, action = %action, "Planned");
            targets.push(Target {
                listener: entry.listener,
                action,
            });
        }
    }

    if targets.is_empty() {
        return Ok(success);
    }

    if opts.dry_run {
        if opts.json {
            let plan: Vec<PlanEntry> = targets.iter().map(|t| plan_entry(t, false, None)).collect();
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            for target in &targets {
                print_dry_run(target);
            }
        }
        return Ok(success);
    }

    if !opts.json {
        for target in &targets {
            println!("{}", plan_line(target));
        }
    }
    for target in &targets {
        if target.action.context().info.is_privileged() {
            eprintln!(
                "note: PID {} belongs to {}; this may need elevated privileges",
                target.action.context().pid(),
                owner(target.action.context())
            );
        }
    }

    if !opts.yes && !confirm(targets.len())? {
        eprintln!("Aborted.");
        return Ok(false);
    }

    let mut report = Vec::new();
    for target in &targets {
        match engine.execute(&target.action).await {
            Ok(()) => {
                if !opts.json {
                    println!("Done: {}", target.action.describe());
                }
                report.push(plan_entry(target, true, None));
            }
            Err(e) => {
                warn!(pid = target.listener.pid, error = %e, "Kill failed");
                if !opts.json {
                    eprintln!("Failed: {}: {}", target.action.describe(), e);
                }
                success = false;
                report.push(plan_entry(target, false, Some(e.to_string())));
            }
        }
    }

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    }
    Ok(success)
}

fn plan_entry(target: &Target, executed: bool, error: Option<String>) -> PlanEntry<'_> {
    PlanEntry {
        action: target.action.describe(),
        strategy: target.action.strategy(),
        force: target.action.force(),
        listener: &target.listener,
        context: target.action.context(),
        executed,
        error,
    }
}

/// `docker stop web (PID 42, port 3000/tcp, node server.js, docker container web)`
fn plan_line(target: &Target) -> String {
    format!(
        "{} {}",
        target.action.describe(),
        context_summary(&target.listener, target.action.context())
    )
}

fn owner(ctx: &ProcessContext) -> String {
    if ctx.info.user.is_empty() {
        ctx.info.uid.to_string()
    } else {
        ctx.info.user.clone()
    }
}

fn print_dry_run(target: &Target) {
    let info = &target.action.context().info;
    println!("[dry-run] {}", plan_line(target));
    println!("          user: {}", owner(target.action.context()));
    println!("          started: {}", format_started(info.start_time, info.uptime()));
    if info.memory_kb > 0 {
        println!("          memory: {}", format_memory(info.memory_kb));
    }
    if !info.children.is_empty() {
        let children: Vec<String> = info.children.iter().map(u32::to_string).collect();
        println!("          children: {}", children.join(", "));
    }
}

fn confirm(count: usize) -> Result<bool> {
    let noun = if count == 1 { "process" } else { "processes" };
    eprint!("Stop {} {}? [y/N] ", count, noun);
    io::stderr().flush()?;

    let mut input = String::new();
    io::stdin().lock().read_line(&mut input)?;
    Ok(is_yes(&input))
}

fn is_yes(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "y" | "yes")
}
