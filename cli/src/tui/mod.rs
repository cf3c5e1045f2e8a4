//! Interactive listener view with auto-refresh.

mod app;
mod ui;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinHandle};
use tokio::time::MissedTickBehavior;
use tracing::debug;
use zap_core::{EnrichedListener, Engine};

use crate::commands::list;
use app::{App, AppCommand};

type Snapshot = zap_core::Result<Vec<EnrichedListener>>;

pub async fn run(engine: Engine, refresh: Duration, force: bool) -> Result<()> {
    let engine = Arc::new(engine);
    let mut terminal = ratatui::try_init()?;
    let result = event_loop(&mut terminal, engine, refresh, force).await;
    ratatui::restore();
    result
}

async fn event_loop(
    terminal: &mut DefaultTerminal,
    engine: Arc<Engine>,
    refresh: Duration,
    force: bool,
) -> Result<()> {
    let mut app = App::new(force);
    let mut events = spawn_input();
    let mut ticker = tokio::time::interval(refresh);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut loading: Option<JoinHandle<Snapshot>> = None;

    loop {
        terminal.draw(|f| ui::draw(f, &app))?;

        tokio::select! {
            _ = ticker.tick() => {
                if loading.is_none() {
                    loading = Some(spawn_refresh(&engine));
                }
            }
            joined = join_pending(&mut loading) => {
                loading = None;
                match joined {
                    Ok(Ok(rows)) => {
                        if !app.apply_refresh(rows) {
                            debug!("Refresh discarded while confirming");
                        }
                    }
                    Ok(Err(e)) => app.set_status(format!("Refresh failed: {}", e)),
                    Err(e) => app.set_status(format!("Refresh failed: {}", e)),
                }
            }
            Some(event) = events.recv() => {
                let Event::Key(key) = event else {
                    continue;
                };
                if key.kind != KeyEventKind::Press {
                    continue;
                }
                match app.handle_key(key) {
                    AppCommand::Quit => break,
                    AppCommand::Refresh => {
                        if loading.is_none() {
                            loading = Some(spawn_refresh(&engine));
                        }
                    }
                    AppCommand::Execute(action) => {
                        terminal.draw(|f| ui::draw(f, &app))?;
                        let result = engine.execute(&action).await;
                        app.finish_execution(&action, result);
                        if loading.is_none() {
                            loading = Some(spawn_refresh(&engine));
                        }
                    }
                    AppCommand::None => {}
                }
            }
        }
    }

    if let Some(handle) = loading {
        handle.abort();
    }
    Ok(())
}

/// Terminal events are read on a dedicated thread so the runtime stays free
/// for refreshes.
fn spawn_input() -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel();
    std::thread::spawn(move || {
        while let Ok(event) = event::read() {
            if tx.send(event).is_err() {
                break;
            }
        }
    });
    rx
}

fn spawn_refresh(engine: &Arc<Engine>) -> JoinHandle<Snapshot> {
    let engine = Arc::clone(engine);
    tokio::spawn(async move {
        let (rows, warnings) = list::load(&engine).await?;
        for warning in &warnings {
            debug!(%warning, "Skipped during refresh");
        }
        Ok(rows)
    })
}

/// Resolves with the running refresh, or never when none is running.
async fn join_pending(
    loading: &mut Option<JoinHandle<Snapshot>>,
) -> std::result::Result<Snapshot, JoinError> {
    match loading {
        Some(handle) => handle.await,
        None => std::future::pending().await,
    }
}
