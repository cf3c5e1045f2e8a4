//! Text formatting shared by the commands and the TUI.

use std::time::Duration;

use chrono::{DateTime, Local, Utc};
use zap_core::{Listener, ProcessContext};

/// Shorten `s` to at most `max` characters, marking the cut with an ellipsis.
pub fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let kept: String = s.chars().take(max.saturating_sub(1)).collect();
    format!("{}…", kept)
}

/// Command line of a process, falling back to its executable.
pub fn command_label(ctx: &ProcessContext) -> &str {
    if !ctx.info.command.is_empty() {
        &ctx.info.command
    } else if !ctx.info.executable.is_empty() {
        &ctx.info.executable
    } else {
        "?"
    }
}

/// `(PID 42, port 3000/tcp, node server.js, docker container web)`
pub fn context_summary(listener: &Listener, ctx: &ProcessContext) -> String {
    let mut parts = vec![
        format!("PID {}", ctx.pid()),
        format!("port {}/{}", listener.port, listener.protocol),
        truncate(command_label(ctx), 60),
    ];
    if let Some(container) = &ctx.container {
        parts.push(container.to_string());
    }
    if let Some(unit) = ctx.systemd_unit.as_deref().filter(|u| !u.is_empty()) {
        parts.push(format!("systemd {}", unit));
    }
    format!("({})", parts.join(", "))
}

pub fn format_uptime(uptime: Duration) -> String {
    let secs = uptime.as_secs();
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m{}s", secs / 60, secs % 60),
        3600..=86_399 => format!("{}h{}m", secs / 3600, (secs % 3600) / 60),
        _ => format!("{}d{}h", secs / 86_400, (secs % 86_400) / 3600),
    }
}

/// Start time in local time with the uptime, or `unknown`.
pub fn format_started(start: Option<DateTime<Utc>>, uptime: Duration) -> String {
    match start {
        Some(start) => format!(
            "{} (up {})",
            start.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
            format_uptime(uptime)
        ),
        None => "unknown".to_string(),
    }
}

pub fn format_memory(kb: u64) -> String {
    if kb >= 1024 * 1024 {
        format!("{:.1} GiB", kb as f64 / (1024.0 * 1024.0))
    } else if kb >= 1024 {
        format!("{:.1} MiB", kb as f64 / 1024.0)
    } else {
        format!("{} KiB", kb)
    }
}
