//! State and key handling for the tree view.
//!
//! Nothing in here touches the terminal, so the whole interaction model can
//! be driven from tests.

use crate::cmd::PlanSession;
use crate::host::JsonLinesHost;
use anyhow::Result;
use casemap_core::User;
use casemap_core::mode::Transition;
use casemap_core::overlay::ClickOutcome;
use casemap_core::render::VisualHandle;
use casemap_core::save::{Notice, Notifier, SaveGateway, TriggerState};
use casemap_core::session::{LoadReport, OutlineRow};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashSet;
use std::time::{Duration, Instant};
use tokio::runtime::Runtime;
use tracing::debug;

const TOAST_TTL: Duration = Duration::from_secs(3);

/// Most recent notice, shown in the status bar until it expires.
#[derive(Debug, Default)]
pub struct Toast {
    message: Option<(String, Instant)>,
}

impl Toast {
    pub fn set(&mut self, message: impl Into<String>) {
        self.message = Some((message.into(), Instant::now()));
    }

    pub fn current(&self) -> Option<&str> {
        self.message
            .as_ref()
            .filter(|(_, at)| at.elapsed() < TOAST_TTL)
            .map(|(msg, _)| msg.as_str())
    }
}

impl Notifier for Toast {
    fn notify(&mut self, notice: Notice) {
        self.set(notice.text());
    }
}

pub struct App {
    session: PlanSession,
    gateway: SaveGateway<JsonLinesHost>,
    runtime: Runtime,
    versions: Vec<String>,
    users: Vec<String>,
    cursor: usize,
    collapsed: HashSet<VisualHandle>,
    toast: Toast,
    should_quit: bool,
}

impl App {
    /// Build the view and run the first load.
    pub fn new(
        session: PlanSession,
        gateway: SaveGateway<JsonLinesHost>,
        runtime: Runtime,
        versions: Vec<String>,
        users: Vec<String>,
    ) -> Self {
        let mut app = Self {
            session,
            gateway,
            runtime,
            versions,
            users,
            cursor: 0,
            collapsed: HashSet::new(),
            toast: Toast::default(),
            should_quit: false,
        };
        app.reload();
        app
    }

    pub const fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub const fn session(&self) -> &PlanSession {
        &self.session
    }

    pub const fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn toast(&self) -> Option<&str> {
        self.toast.current()
    }

    pub const fn save_state(&self) -> TriggerState {
        self.gateway.trigger()
    }

    pub const fn has_host(&self) -> bool {
        self.gateway.has_host()
    }

    /// Rows currently drawn: descendants of collapsed rows are hidden.
    pub fn visible_rows(&self) -> Vec<OutlineRow> {
        let mut hidden_below: Option<usize> = None;
        let mut rows = Vec::new();
        for row in self.session.outline() {
            if let Some(depth) = hidden_below {
                if row.depth > depth {
                    continue;
                }
                hidden_below = None;
            }
            if row.has_children && self.collapsed.contains(&row.handle) {
                hidden_below = Some(row.depth);
            }
            rows.push(row);
        }
        rows
    }

    pub fn is_collapsed(&self, handle: VisualHandle) -> bool {
        self.collapsed.contains(&handle)
    }

    /// Re-enable the save control once its delay has passed.
    pub fn tick(&mut self) {
        self.gateway
            .settle(tokio::time::Instant::now(), &mut self.toast);
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Result<()> {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('q') | KeyCode::Esc => self.should_quit = true,
            KeyCode::Char('c') if ctrl => self.should_quit = true,

            KeyCode::Char('j') | KeyCode::Down => self.move_cursor(1),
            KeyCode::Char('k') | KeyCode::Up => self.move_cursor(-1),
            KeyCode::Char('g') | KeyCode::Home => self.cursor = 0,
            KeyCode::Char('G') | KeyCode::End => {
                self.cursor = self.visible_rows().len().saturating_sub(1);
            }

            KeyCode::Enter | KeyCode::Char(' ') => self.click_selected(),
            KeyCode::Char('z') | KeyCode::Left | KeyCode::Right => self.toggle_collapse(),

            KeyCode::Char('e') => self.toggle_edit(),
            KeyCode::Char('s') => self.save(),
            KeyCode::Char('v') => self.next_version(),
            KeyCode::Char('u') => self.next_user(),
            KeyCode::Char('r') => self.reload(),
            _ => {}
        }
        Ok(())
    }

    fn move_cursor(&mut self, delta: isize) {
        let len = self.visible_rows().len();
        if len == 0 {
            self.cursor = 0;
            return;
        }
        self.cursor = self.cursor.saturating_add_signed(delta).min(len - 1);
    }

    fn selected(&self) -> Option<OutlineRow> {
        self.visible_rows().into_iter().nth(self.cursor)
    }

    fn click_selected(&mut self) {
        let Some(row) = self.selected() else {
            return;
        };
        match self.session.click(row.handle) {
            Ok(ClickOutcome::Cycled {
                case_id, status, ..
            }) => self
                .toast
                .set(format!("{case_id} {} {}", status.glyph(), status.name())),
            Ok(ClickOutcome::Ignored) => {
                if row.case_id.is_some() && !self.session.selection().edit_mode {
                    self.toast.set("Press e to enter edit mode");
                }
            }
            Err(err) => self.toast.set(err.to_string()),
        }
    }

    fn toggle_collapse(&mut self) {
        let Some(row) = self.selected() else {
            return;
        };
        if !row.has_children {
            return;
        }
        if !self.collapsed.remove(&row.handle) {
            self.collapsed.insert(row.handle);
        }
    }

    fn toggle_edit(&mut self) {
        if self.session.selection().user.is_default() {
            self.toast.notify(Notice::SelectTester);
            return;
        }
        self.session.toggle_edit_mode();
    }

    fn save(&mut self) {
        if !self.session.selection().save_visible() {
            self.toast.set("Saving is available in edit mode");
            return;
        }
        let content = self.session.store().snapshot();
        self.gateway
            .dispatch(self.session.selection(), content, &mut self.toast);
    }

    fn next_version(&mut self) {
        let Some(next) = next_choice(&self.versions, &self.session.selection().version) else {
            return;
        };
        let transition = self.runtime.block_on(self.session.select_version(&next));
        self.after_switch(transition);
    }

    fn next_user(&mut self) {
        let Some(next) = next_choice(&self.users, self.session.selection().user.as_str()) else {
            return;
        };
        let transition = self.runtime.block_on(self.session.select_user(User::new(next)));
        self.after_switch(transition);
    }

    fn reload(&mut self) {
        let report = self.runtime.block_on(self.session.load());
        self.report(&report);
        self.after_reload();
    }

    fn after_switch(&mut self, transition: Transition) {
        if let (Transition::Reload, Some(report)) =
            (transition, self.session.last_report().cloned())
        {
            self.report(&report);
        }
        self.after_reload();
    }

    fn report(&mut self, report: &LoadReport) {
        debug!(
            version = %report.version,
            user = %report.user,
            statuses = report.statuses,
            "loaded"
        );
        if let Some(failure) = &report.failure {
            self.toast.set(failure.clone());
        }
    }

    // Handles from the previous render are stale after a reload.
    fn after_reload(&mut self) {
        self.collapsed.clear();
        let len = self.visible_rows().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}

/// The entry after `current` in `choices`, wrapping around. `None` when there
/// is nothing else to pick.
fn next_choice(choices: &[String], current: &str) -> Option<String> {
    if choices.is_empty() {
        return None;
    }
    let next = choices
        .iter()
        .position(|c| c == current)
        .map_or(0, |i| (i + 1) % choices.len());
    let choice = &choices[next];
    (choice != current).then(|| choice.clone())
}
