//! Example: show what would be done to stop whatever listens on a port.
//!
//! Usage:
//!   cargo run --example inspect_port 3000
//!   cargo run --example inspect_port localhost:8080-8090

use std::env;

use zap_core::{Action, Config, Engine, Query};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let Some(arg) = env::args().nth(1) else {
        eprintln!("Usage: inspect_port <port|range|iface:port>");
        return;
    };

    let query = match Query::parse(&arg) {
        Ok(query) => query,
        Err(e) => {
            eprintln!("{}", e);
            return;
        }
    };

    let engine = match Engine::detect(&Config::default()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Error: {}", e);
            return;
        }
    };
    let (resolver, gatherer, containers) = engine.backends();
    println!("Backends: resolver={} gatherer={} containers={}\n", resolver, gatherer, containers);

    let listeners = match engine.resolve_targets(&query).await {
        Ok(listeners) => listeners,
        Err(e) => {
            eprintln!("Error resolving {}: {}", query, e);
            return;
        }
    };
    if listeners.is_empty() {
        println!("Nothing listening on {}", query);
        return;
    }

    let enrichment = match engine.enrich(&listeners).await {
        Ok(enrichment) => enrichment,
        Err(e) => {
            eprintln!("Error inspecting processes: {}", e);
            return;
        }
    };

    for entry in enrichment.entries {
        let ctx = &entry.context;
        println!("{}", entry.listener);
        println!("  command:    {}", ctx.info.command);
        println!("  user:       {}", ctx.info.user);
        if let Some(container) = &ctx.container {
            println!("  container:  {} ({})", container, container.id);
        }
        if let Some(unit) = &ctx.systemd_unit {
            println!("  systemd:    {}", unit);
        }
        let strategies: Vec<String> = engine
            .available_strategies(ctx)
            .iter()
            .map(|s| s.to_string())
            .collect();
        println!("  strategies: {}", strategies.join(", "));
        println!("  would run:  {}\n", Action::recommended(entry.context.clone(), false));
    }

    for warning in enrichment.warnings {
        println!("skipped {}", warning);
    }
}
