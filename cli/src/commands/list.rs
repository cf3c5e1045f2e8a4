//! List command - show every listening socket and what supervises it.

use anyhow::Result;
use zap_core::domain::sort_listeners;
use zap_core::{EnrichWarning, EnrichedListener, Engine, Enrichment, Listener, Protocol};

use crate::output::{command_label, truncate};

pub async fn run(engine: &Engine, json: bool) -> Result<bool> {
    let (rows, warnings) = load(engine).await?;
    for warning in &warnings {
        eprintln!("warning: {}", warning);
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(true);
    }

    if rows.is_empty() {
        println!("No listening ports found.");
        return Ok(true);
    }

    for line in group_lines(&rows) {
        println!("{}", line);
    }

    println!("\nTotal: {} listeners", rows.len());
    Ok(true)
}

/// One line per (port, protocol), e.g.
/// `:3000/tcp  PID 42 (node server.js) [docker:web], PID 43 (node)`.
fn group_lines(rows: &[EnrichedListener]) -> Vec<String> {
    let mut groups: Vec<((u16, Protocol), Vec<String>)> = Vec::new();

    for row in rows {
        let key = (row.listener.port, row.listener.protocol);
        let owner = owner_label(row);
        match groups.iter_mut().find(|(k, _)| *k == key) {
            Some((_, owners)) => owners.push(owner),
            None => groups.push((key, vec![owner])),
        }
    }

    groups
        .into_iter()
        .map(|((port, protocol), owners)| format!(":{}/{}  {}", port, protocol, owners.join(", ")))
        .collect()
}

/// `PID 42 (node server.js) [docker:web]`
fn owner_label(row: &EnrichedListener) -> String {
    let ctx = &row.context;
    let mut label = format!("PID {} ({})", row.listener.pid, truncate(command_label(ctx), 60));
    if let Some(supervisor) = ctx.supervisor() {
        label.push_str(&format!(" [{}]", supervisor));
    }
    label
}

/// Every listener on the host, sorted by port, with its process context.
pub async fn load(
    engine: &Engine,
) -> zap_core::Result<(Vec<EnrichedListener>, Vec<EnrichWarning>)> {
    let mut listeners = engine.resolve_all().await?;
    sort_listeners(&mut listeners);

    let enrichment = engine.enrich(&listeners).await?;
    Ok((rows(&listeners, &enrichment), enrichment.warnings))
}

/// One row per listener whose process could be enriched.
fn rows(listeners: &[Listener], enrichment: &Enrichment) -> Vec<EnrichedListener> {
    listeners
        .iter()
        .filter_map(|listener| {
            enrichment
                .context_for(listener.pid)
                .map(|context| EnrichedListener {
                    listener: listener.clone(),
                    context: context.clone(),
                })
        })
        .collect()
}
