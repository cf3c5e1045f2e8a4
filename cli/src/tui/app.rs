//! TUI application state.

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use zap_core::{Action, EnrichedListener};

use crate::output::{format_memory, format_started};

/// What the event loop should do after a key press.
#[derive(Debug, PartialEq, Eq)]
pub enum AppCommand {
    None,
    Refresh,
    Execute(Action),
    Quit,
}

/// Detail panel content for the selected row.
#[derive(Debug, PartialEq, Eq)]
pub struct Details {
    pub summary: String,
    /// What `x` would do right now.
    pub action: String,
    pub tags: Vec<String>,
    pub warnings: Vec<String>,
}

impl Details {
    fn new(row: &EnrichedListener, force: bool, privileged: bool) -> Self {
        let ctx = &row.context;
        let info = &ctx.info;

        let summary = format!(
            "User {} (uid {}) | Memory {} | Started {} | Children {}",
            info.user,
            info.uid,
            format_memory(info.memory_kb),
            format_started(info.start_time, info.uptime()),
            info.children.len()
        );

        let mut tags = Vec::new();
        if let Some(container) = &ctx.container {
            tags.push(container.to_string());
        }
        if let Some(unit) = &ctx.systemd_unit {
            tags.push(format!("systemd {}", unit));
        }
        if privileged {
            tags.push("sudo".to_string());
        }

        let mut warnings = Vec::new();
        if privileged {
            warnings.push(format!("owned by {}: needs sudo", info.user));
        }
        match info.children.len() {
            0 => {}
            1 => warnings.push("1 child affected".to_string()),
            n => warnings.push(format!("{} children affected", n)),
        }
        if force {
            warnings.push("FORCE mode".to_string());
        }

        Self {
            summary,
            action: Action::recommended(ctx.clone(), force).describe(),
            tags,
            warnings,
        }
    }
}

pub struct App {
    rows: Vec<EnrichedListener>,
    pub selected: usize,
    pub search_query: String,
    searching: bool,
    /// Default force flag for new actions.
    pub force: bool,
    /// Action awaiting confirmation. Its context is fixed when it is built.
    pending: Option<Action>,
    status: Option<String>,
}

impl App {
    pub fn new(force: bool) -> Self {
        Self {
            rows: Vec::new(),
            selected: 0,
            search_query: String::new(),
            searching: false,
            force,
            pending: None,
            status: None,
        }
    }

    pub fn is_searching(&self) -> bool {
        self.searching
    }

    pub fn pending(&self) -> Option<&Action> {
        self.pending.as_ref()
    }

    pub fn get_status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn set_status(&mut self, status: impl Into<String>) {
        self.status = Some(status.into());
    }

    /// Rows matching the search query on port, command, user or supervisor.
    pub fn filtered_rows(&self) -> Vec<&EnrichedListener> {
        if self.search_query.is_empty() {
            return self.rows.iter().collect();
        }
        let needle = self.search_query.to_lowercase();
        self.rows
            .iter()
            .filter(|row| {
                let ctx = &row.context;
                row.listener.port.to_string().contains(&needle)
                    || ctx.info.command.to_lowercase().contains(&needle)
                    || ctx.info.user.to_lowercase().contains(&needle)
                    || ctx
                        .supervisor()
                        .is_some_and(|s| s.to_lowercase().contains(&needle))
            })
            .collect()
    }

    pub fn selected_row(&self) -> Option<&EnrichedListener> {
        self.filtered_rows().get(self.selected).copied()
    }

    pub fn details(&self) -> Option<Details> {
        self.selected_row()
            .map(|row| Details::new(row, self.force, row.context.info.is_privileged()))
    }

    /// Replace the rows with a fresh snapshot, keeping the cursor on the same
    /// process when it is still listed.
    ///
    /// Returns `false` and keeps the old rows while a confirmation is open.
    pub fn apply_refresh(&mut self, rows: Vec<EnrichedListener>) -> bool {
        if self.pending.is_some() {
            return false;
        }

        let selected_pid = self.selected_row().map(|r| r.listener.pid);
        self.rows = rows;

        let filtered = self.filtered_rows();
        self.selected = selected_pid
            .and_then(|pid| filtered.iter().position(|r| r.listener.pid == pid))
            .unwrap_or(self.selected);
        self.clamp_selection();
        true
    }

    /// Record the outcome of an executed action.
    pub fn finish_execution(&mut self, action: &Action, result: zap_core::Result<()>) {
        match result {
            Ok(()) => self.set_status(format!("Done: {}", action.describe())),
            Err(e) => self.set_status(format!("Failed: {}", e)),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> AppCommand {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return AppCommand::Quit;
        }

        if self.pending.is_some() {
            return self.handle_confirm_key(key);
        }

        if self.searching {
            self.handle_search_key(key);
            return AppCommand::None;
        }

        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => return AppCommand::Quit,
            KeyCode::Char('j') | KeyCode::Down => self.next(),
            KeyCode::Char('k') | KeyCode::Up => self.previous(),
            KeyCode::Char('g') | KeyCode::Home => self.selected = 0,
            KeyCode::Char('G') | KeyCode::End => {
                self.selected = self.filtered_rows().len().saturating_sub(1)
            }
            KeyCode::Char('/') => {
                self.searching = true;
                self.status = None;
            }
            KeyCode::Char('r') => {
                self.set_status("Refreshing...");
                return AppCommand::Refresh;
            }
            KeyCode::Char('F') => {
                self.force = !self.force;
                let mode = if self.force { "on" } else { "off" };
                self.set_status(format!("Force {}", mode));
            }
            KeyCode::Char('x') | KeyCode::Char('d') | KeyCode::Enter => self.request_kill(),
            _ => {}
        }
        AppCommand::None
    }

    fn handle_confirm_key(&mut self, key: KeyEvent) -> AppCommand {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                if let Some(action) = self.pending.take() {
                    self.set_status(format!("Running: {}", action.describe()));
                    return AppCommand::Execute(action);
                }
            }
            KeyCode::Char('F') | KeyCode::Char('f') => {
                if let Some(action) = self.pending.take() {
                    let toggled = Action::with_strategy(
                        action.context().clone(),
                        action.strategy(),
                        !action.force(),
                    );
                    self.pending = Some(toggled.unwrap_or(action));
                }
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Char('q') | KeyCode::Esc => {
                self.pending = None;
                self.set_status("Cancelled");
            }
            _ => {}
        }
        AppCommand::None
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Enter => self.searching = false,
            KeyCode::Esc => {
                self.searching = false;
                self.search_query.clear();
            }
            KeyCode::Backspace => {
                self.search_query.pop();
            }
            KeyCode::Char(c) => self.search_query.push(c),
            _ => return,
        }
        self.clamp_selection();
    }

    fn request_kill(&mut self) {
        let Some(row) = self.selected_row() else {
            return;
        };
        let action = Action::recommended(row.context.clone(), self.force);
        self.pending = Some(action);
    }

    fn next(&mut self) {
        let len = self.filtered_rows().len();
        if len > 0 {
            self.selected = (self.selected + 1) % len;
        }
    }

    fn previous(&mut self) {
        let len = self.filtered_rows().len();
        if len > 0 {
            self.selected = self.selected.checked_sub(1).unwrap_or(len - 1);
        }
    }

    fn clamp_selection(&mut self) {
        let len = self.filtered_rows().len();
        if self.selected >= len {
            self.selected = len.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zap_core::{
        ContainerInfo, Listener, ProcessContext, ProcessInfo, Protocol, Runtime, Strategy,
    };

    fn row(pid: u32, port: u16, command: &str) -> EnrichedListener {
        EnrichedListener {
            listener: Listener::new(pid, port, Protocol::Tcp, "0.0.0.0"),
            context: ProcessContext::bare(ProcessInfo {
                pid,
                command: command.to_string(),
                user: "dev".to_string(),
                ..ProcessInfo::default()
            }),
        }
    }

    fn key(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::NONE)
    }

    fn app() -> App {
        let mut app = App::new(false);
        app.apply_refresh(vec![
            row(10, 3000, "node server.js"),
            row(20, 5432, "postgres"),
            row(30, 8080, "python -m http.server"),
        ]);
        app
    }

    #[test]
    fn test_details_of_plain_process() {
        let details = Details::new(&row(10, 3000, "node server.js"), false, false);
        assert_eq!(
            details.summary,
            "User dev (uid 0) | Memory 0 KiB | Started unknown | Children 0"
        );
        assert_eq!(details.action, "kill -SIGTERM 10");
        assert!(details.tags.is_empty());
        assert!(details.warnings.is_empty());
    }

    #[test]
    fn test_details_warnings_and_tags() {
        let mut row = row(20, 8080, "gunicorn app:app");
        row.context.info.memory_kb = 2048;
        row.context.info.children = vec![21, 22, 23];
        row.context = row
            .context
            .with_container(ContainerInfo::new("0123456789abcdef", "web", Runtime::Docker))
            .with_systemd_unit("docker.service");

        let details = Details::new(&row, true, true);
        assert!(details.summary.contains("Memory 2.0 MiB"));
        assert!(details.summary.ends_with("Children 3"));
        assert_eq!(details.action, "docker kill web");
        assert_eq!(
            details.tags,
            vec!["docker container web", "systemd docker.service", "sudo"]
        );
        assert_eq!(
            details.warnings,
            vec!["owned by dev: needs sudo", "3 children affected", "FORCE mode"]
        );
    }

    #[test]
    fn test_details_follow_selection_and_force() {
        let mut app = app();
        app.handle_key(key('j'));
        assert_eq!(app.details().unwrap().action, "kill -SIGTERM 20");

        app.handle_key(key('F'));
        let details = app.details().unwrap();
        assert_eq!(details.action, "kill -SIGKILL 20");
        assert!(details.warnings.contains(&"FORCE mode".to_string()));

        assert!(App::new(false).details().is_none());
    }

    #[test]
    fn test_navigation_wraps() {
        let mut app = app();
        app.handle_key(key('k'));
        assert_eq!(app.selected, 2);
        app.handle_key(key('j'));
        assert_eq!(app.selected, 0);
        app.handle_key(key('G'));
        assert_eq!(app.selected, 2);
    }

    #[test]
    fn test_search_filters_and_clamps() {
        let mut app = app();
        app.handle_key(key('G'));
        app.handle_key(key('/'));
        assert!(app.is_searching());
        for c in "post".chars() {
            app.handle_key(key(c));
        }
        assert_eq!(app.filtered_rows().len(), 1);
        assert_eq!(app.selected, 0);

        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert!(!app.is_searching());
        assert_eq!(app.filtered_rows().len(), 3);
    }

    #[test]
    fn test_kill_requires_confirmation() {
        let mut app = app();
        app.handle_key(key('j'));
        assert_eq!(app.handle_key(key('x')), AppCommand::None);
        let pending = app.pending().unwrap();
        assert_eq!(pending.describe(), "kill -SIGTERM 20");

        match app.handle_key(key('y')) {
            AppCommand::Execute(action) => assert_eq!(action.context().pid(), 20),
            other => panic!("unexpected {:?}", other),
        }
        assert!(app.pending().is_none());
    }

    #[test]
    fn test_confirm_force_toggle_keeps_context() {
        let mut app = App::new(false);
        let mut supervised = row(40, 80, "nginx");
        supervised.context = supervised
            .context
            .with_container(ContainerInfo::new("0123456789abcdef", "web", Runtime::Docker));
        app.apply_refresh(vec![supervised]);

        app.handle_key(key('x'));
        app.handle_key(key('F'));
        let pending = app.pending().unwrap();
        assert_eq!(pending.strategy(), Strategy::Container);
        assert!(pending.force());
        assert_eq!(pending.describe(), "docker kill web");
    }

    #[test]
    fn test_cancel_confirmation() {
        let mut app = app();
        app.handle_key(key('x'));
        assert_eq!(app.handle_key(key('n')), AppCommand::None);
        assert!(app.pending().is_none());
        assert_eq!(app.get_status(), Some("Cancelled"));
    }

    #[test]
    fn test_refresh_is_held_while_confirming() {
        let mut app = app();
        app.handle_key(key('x'));
        assert!(!app.apply_refresh(vec![row(99, 9999, "other")]));
        assert_eq!(app.filtered_rows().len(), 3);
        assert_eq!(app.pending().unwrap().context().pid(), 10);
    }

    #[test]
    fn test_refresh_keeps_cursor_on_pid() {
        let mut app = app();
        app.handle_key(key('j'));
        app.handle_key(key('j'));
        assert!(app.apply_refresh(vec![row(30, 8080, "python"), row(10, 3000, "node")]));
        assert_eq!(app.selected_row().unwrap().listener.pid, 30);
        assert_eq!(app.selected, 0);
    }

    #[test]
    fn test_force_toggle_and_quit() {
        let mut app = app();
        app.handle_key(key('F'));
        assert!(app.force);
        app.handle_key(key('x'));
        assert!(app.pending().unwrap().force());
        app.handle_key(KeyEvent::new(KeyCode::Esc, KeyModifiers::NONE));
        assert_eq!(app.handle_key(key('q')), AppCommand::Quit);
        assert_eq!(
            app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            AppCommand::Quit
        );
    }

    #[test]
    fn test_finish_execution_status() {
        let mut app = app();
        app.handle_key(key('x'));
        let AppCommand::Execute(action) = app.handle_key(key('y')) else {
            panic!("expected execute");
        };
        app.finish_execution(&action, Ok(()));
        assert_eq!(app.get_status(), Some("Done: kill -SIGTERM 10"));
        app.finish_execution(&action, Err(zap_core::Error::ProcessNotFound(10)));
        assert_eq!(app.get_status(), Some("Failed: Process 10 not found"));
    }
}
