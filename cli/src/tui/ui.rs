//! TUI rendering.

use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use super::app::App;
use crate::output::{command_label, context_summary, truncate};

pub fn draw(f: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Table
            Constraint::Length(6), // Details
            Constraint::Length(3), // Footer
        ])
        .split(f.area());

    draw_header(f, app, chunks[0]);
    draw_table(f, app, chunks[1]);
    draw_details(f, app, chunks[2]);
    draw_footer(f, app, chunks[3]);

    if app.pending().is_some() {
        draw_confirm(f, app);
    }
}

fn draw_header(f: &mut Frame, app: &App, area: Rect) {
    let force = if app.force { " | FORCE" } else { "" };
    let title = if app.is_searching() {
        format!("zap | Search: {}_", app.search_query)
    } else {
        format!("zap | {} listeners{}", app.filtered_rows().len(), force)
    };

    let header = Paragraph::new(title)
        .style(Style::default().fg(Color::Cyan).bold())
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );

    f.render_widget(header, area);
}

fn draw_table(f: &mut Frame, app: &App, area: Rect) {
    let header_cells = ["PORT", "PROTO", "PID", "USER", "SUPERVISOR", "COMMAND"]
        .iter()
        .map(|h| Cell::from(*h).style(Style::default().fg(Color::Yellow).bold()));
    let header = Row::new(header_cells).height(1).bottom_margin(1);

    let filtered = app.filtered_rows();
    let rows = filtered.iter().enumerate().map(|(i, row)| {
        let ctx = &row.context;
        let supervisor = ctx.supervisor().unwrap_or_else(|| "-".to_string());

        let supervisor_color = if ctx.is_containerized() {
            Color::Blue
        } else if ctx.is_systemd_managed() {
            Color::Magenta
        } else {
            Color::DarkGray
        };

        let cells = vec![
            Cell::from(row.listener.port.to_string()),
            Cell::from(row.listener.protocol.to_string()),
            Cell::from(row.listener.pid.to_string()),
            Cell::from(truncate(&ctx.info.user, 10)),
            Cell::from(truncate(&supervisor, 28)).style(Style::default().fg(supervisor_color)),
            Cell::from(command_label(ctx).to_string()),
        ];

        let style = if i == app.selected {
            Style::default().bg(Color::DarkGray).fg(Color::White)
        } else {
            Style::default()
        };

        Row::new(cells).style(style)
    });

    let widths = [
        Constraint::Length(6),
        Constraint::Length(5),
        Constraint::Length(8),
        Constraint::Length(10),
        Constraint::Length(28),
        Constraint::Min(10),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray))
                .title(" Listeners "),
        )
        .row_highlight_style(Style::default().add_modifier(Modifier::BOLD));

    let mut state = TableState::default();
    state.select(Some(app.selected));

    f.render_stateful_widget(table, area, &mut state);
}

fn draw_details(f: &mut Frame, app: &App, area: Rect) {
    let lines = match app.details() {
        Some(details) => {
            let mut tags: Vec<Span> = Vec::new();
            for tag in &details.tags {
                let color = if tag == "sudo" { Color::Red } else { Color::Blue };
                tags.push(Span::styled(format!("[{}]", tag), Style::default().fg(color)));
                tags.push(Span::raw(" "));
            }
            tags.push(Span::styled(
                format!("x: {}", details.action),
                Style::default().fg(Color::Green),
            ));

            vec![
                Line::from(details.summary),
                Line::from(tags),
                Line::from(details.warnings.join(" | ")).style(Style::default().fg(Color::Yellow)),
            ]
        }
        None => vec![
            Line::from("No listener selected").style(Style::default().fg(Color::DarkGray)),
        ],
    };

    let panel = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray))
            .title(" Details "),
    );

    f.render_widget(panel, area);
}

fn draw_footer(f: &mut Frame, app: &App, area: Rect) {
    let status = app.get_status().unwrap_or("");

    let help = if app.pending().is_some() {
        "y/Enter: confirm | F: toggle force | n/Esc: cancel"
    } else if app.is_searching() {
        "Type to search | Enter: done | Esc: cancel"
    } else {
        "j/k: navigate | x: kill | F: force | /: search | r: refresh | q: quit"
    };

    let footer_text = if status.is_empty() {
        help.to_string()
    } else {
        format!("{} | {}", status, help)
    };

    let footer = Paragraph::new(footer_text)
        .style(Style::default().fg(Color::DarkGray))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        );

    f.render_widget(footer, area);
}

fn draw_confirm(f: &mut Frame, app: &App) {
    let Some(action) = app.pending() else {
        return;
    };
    let ctx = action.context();

    let mut lines = vec![
        Line::from(action.describe()).style(Style::default().fg(Color::Red).bold()),
        Line::from(""),
    ];
    if let Some(row) = app.filtered_rows().into_iter().find(|r| r.listener.pid == ctx.pid()) {
        lines.push(Line::from(context_summary(&row.listener, ctx)));
    }
    if ctx.info.is_privileged() {
        lines.push(
            Line::from(format!("Owned by {}: may need elevated privileges", ctx.info.user))
                .style(Style::default().fg(Color::Yellow)),
        );
    }

    let area = centered(f.area(), 70, 8);
    let dialog = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Red))
            .title(" Confirm "),
    );

    f.render_widget(Clear, area);
    f.render_widget(dialog, area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width - width) / 2,
        y: area.y + (area.height - height) / 2,
        width,
        height,
    }
}
