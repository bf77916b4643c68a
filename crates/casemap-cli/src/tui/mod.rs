//! Terminal user interface for browsing and editing a test plan.
//!
//! ## Entry points
//!
//! - [`run`]: collapsible tree view with edit mode and save.

pub mod app;

use anyhow::Result;
use app::App;
use casemap_core::save::TriggerState;
use crossterm::{
    event::{self, Event, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    prelude::*,
    symbols::border,
    widgets::{Block, Borders, List, ListItem, ListState, Paragraph},
};
use std::io;
use std::time::Duration;

const POLL_INTERVAL: Duration = Duration::from_millis(250);

pub fn run(mut app: App) -> Result<()> {
    let mut terminal = TerminalSession::new()?;

    while !app.should_quit() {
        app.tick();
        terminal.draw(|frame| draw(frame, &app))?;

        if event::poll(POLL_INTERVAL)? {
            match event::read()? {
                Event::Key(key) if key.kind == KeyEventKind::Press => app.handle_key(key)?,
                _ => {}
            }
        }
    }
    Ok(())
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(frame.area());

    let rows = app.visible_rows();
    let items: Vec<ListItem<'_>> = rows
        .iter()
        .map(|row| {
            let marker = if !row.has_children {
                "  "
            } else if app.is_collapsed(row.handle) {
                "▸ "
            } else {
                "▾ "
            };
            let style = if row.interactive {
                Style::default().fg(Color::White)
            } else if row.case_id.is_some() {
                Style::default().fg(Color::Gray)
            } else {
                Style::default().fg(Color::DarkGray)
            };
            ListItem::new(Line::from(vec![
                Span::raw("  ".repeat(row.depth)),
                Span::styled(marker, Style::default().fg(Color::DarkGray)),
                Span::styled(row.label.clone(), style),
            ]))
        })
        .collect();

    let selection = app.session().selection();
    let title = format!(" cmap · {} · {} ", selection.version, selection.user);
    let border_color = if selection.edit_mode {
        Color::Yellow
    } else {
        Color::Green
    };
    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_set(border::ROUNDED)
                .border_style(Style::default().fg(border_color))
                .title(title)
                .title_style(Style::default().add_modifier(Modifier::BOLD)),
        )
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    if !rows.is_empty() {
        state.select(Some(app.cursor()));
    }
    frame.render_stateful_widget(list, chunks[0], &mut state);
    frame.render_widget(Paragraph::new(status_line(app)), chunks[1]);
}

fn status_line(app: &App) -> Line<'static> {
    if let Some(toast) = app.toast() {
        return Line::from(Span::styled(
            toast.to_string(),
            Style::default().fg(Color::Cyan),
        ));
    }

    let key = Style::default().fg(Color::Cyan);
    let dim = Style::default().fg(Color::DarkGray);
    let selection = app.session().selection();

    let mut spans = vec![
        Span::styled(
            if selection.edit_mode { "EDIT" } else { "VIEW" },
            Style::default().add_modifier(Modifier::BOLD),
        ),
        Span::styled("  ", dim),
    ];
    if selection.save_visible() {
        let label = match app.save_state() {
            TriggerState::Busy { .. } => "saving…",
            TriggerState::Ready if app.has_host() => "save ready",
            TriggerState::Ready => "save (no host)",
        };
        spans.push(Span::styled(label, Style::default().fg(Color::Yellow)));
        spans.push(Span::styled("  ", dim));
    }
    for (k, label) in [
        ("j/k", " move  "),
        ("enter", " click  "),
        ("z", " fold  "),
        ("e", " edit  "),
        ("s", " save  "),
        ("v", " version  "),
        ("u", " tester  "),
        ("r", " reload  "),
        ("q", " quit"),
    ] {
        spans.push(Span::styled(k, key));
        spans.push(Span::styled(label, dim));
    }
    Line::from(spans)
}

struct TerminalSession {
    terminal: Terminal<CrosstermBackend<io::Stdout>>,
}

impl TerminalSession {
    fn new() -> io::Result<Self> {
        enable_raw_mode()?;

        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen).inspect_err(|_| teardown_terminal())?;

        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend).inspect_err(|_| teardown_terminal())?;
        terminal.clear().inspect_err(|_| teardown_terminal())?;

        Ok(Self { terminal })
    }

    fn draw(&mut self, draw_fn: impl FnOnce(&mut Frame<'_>)) -> io::Result<()> {
        self.terminal.draw(draw_fn)?;
        Ok(())
    }
}

impl Drop for TerminalSession {
    fn drop(&mut self) {
        let _ = self.terminal.show_cursor();
        teardown_terminal();
    }
}

fn teardown_terminal() {
    let _ = disable_raw_mode();
    let mut stdout = io::stdout();
    let _ = execute!(stdout, LeaveAlternateScreen);
}
