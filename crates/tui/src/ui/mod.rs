//! Frame rendering.
//!
//! Responsibilities:
//! - Lay out the pane row (input pane toggleable, output pane) above a
//!   one-line filter input, and draw the suggestion popup and the
//!   error overlay on top.
//! - Convert raw pane bytes (ANSI escapes included) into styled text.
//!
//! Does NOT handle:
//! - Any state changes; the single mutation is reporting the rendered
//!   pane viewport back to the app so paging distances stay accurate.

use ansi_to_tui::IntoText;
use ratatui::{
    Frame,
    layout::{Constraint, Direction, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::Text,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Wrap},
};

use crate::app::{App, Focus, SessionState};
use crate::pane::PaneHandle;

const MAX_SUGGESTION_ROWS: u16 = 8;

pub fn render(frame: &mut Frame, app: &mut App) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(1), Constraint::Length(3)])
        .split(frame.area());

    render_panes(frame, app, rows[0]);
    render_filter_input(frame, app, rows[1]);
    render_suggestions(frame, app, rows[0]);

    if app.state() == SessionState::Error {
        render_error_overlay(frame, app, rows[0]);
    }
}

fn render_panes(frame: &mut Frame, app: &mut App, area: Rect) {
    let output_area = if app.show_input_pane() {
        let halves = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);
        render_pane(
            frame,
            app.input_pane(),
            halves[0],
            "Input",
            app.focus() == Focus::InputPane,
            app.input_scroll(),
        );
        halves[1]
    } else {
        area
    };

    render_pane(
        frame,
        app.output_pane(),
        output_area,
        "Output",
        app.focus() == Focus::OutputPane,
        app.output_scroll(),
    );

    // Paging distances track the inner output viewport.
    app.set_pane_viewport(
        output_area.width.saturating_sub(2),
        output_area.height.saturating_sub(2),
    );
}

fn render_pane(
    frame: &mut Frame,
    pane: &PaneHandle,
    area: Rect,
    title: &str,
    focused: bool,
    scroll: (u16, u16),
) {
    let text = pane_text(pane);
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(focused));
    let paragraph = Paragraph::new(text).block(block).scroll(scroll);
    frame.render_widget(paragraph, area);
}

/// Subprocess output arrives as raw bytes with ANSI color escapes.
/// Chunk boundaries may split escape sequences or UTF-8 characters, so
/// parsing happens over the whole buffer at render time, falling back
/// to a lossy plain rendering when the escape parser rejects the input.
fn pane_text(pane: &PaneHandle) -> Text<'static> {
    let buffer = pane.lock();
    match buffer.bytes().to_vec().into_text() {
        Ok(text) => text,
        Err(_) => Text::raw(buffer.text().into_owned()),
    }
}

fn render_filter_input(frame: &mut Frame, app: &App, area: Rect) {
    let (title, style) = match app.state() {
        SessionState::Error => ("Filter (error)", Style::default().fg(Color::Red)),
        SessionState::Pending | SessionState::Running => ("Filter …", Style::default()),
        _ => ("Filter", Style::default()),
    };
    let focused = app.focus() == Focus::FilterInput;
    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(border_style(focused));

    let inner_width = usize::from(area.width.saturating_sub(2));
    let input = app.filter_input();
    let scroll = input.visual_scroll(inner_width.saturating_sub(1).max(1));
    let paragraph = Paragraph::new(input.value())
        .style(style)
        .scroll((0, scroll as u16))
        .block(block);
    frame.render_widget(paragraph, area);

    if focused {
        let cursor = input.visual_cursor().max(scroll) - scroll;
        frame.set_cursor_position(Position::new(area.x + cursor as u16 + 1, area.y + 1));
    }
}

fn render_suggestions(frame: &mut Frame, app: &App, pane_area: Rect) {
    if app.focus() != Focus::FilterInput {
        return;
    }
    let Some(suggestions) = app.suggestions() else {
        return;
    };
    if suggestions.is_empty() {
        return;
    }

    let rows = (suggestions.len() as u16).min(MAX_SUGGESTION_ROWS);
    let height = (rows + 2).min(pane_area.height);
    let width = suggestions
        .iter()
        .map(|s| s.chars().count() as u16 + 2)
        .max()
        .unwrap_or(0)
        .clamp(20, pane_area.width);
    // Anchored just above the filter input, flush left.
    let area = Rect {
        x: pane_area.x,
        y: pane_area.bottom().saturating_sub(height),
        width,
        height,
    };

    let items: Vec<ListItem> = suggestions
        .iter()
        .map(|s| ListItem::new(s.as_str()))
        .collect();
    let list = List::new(items)
        .block(
            Block::default()
                .title("Suggestions")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(
            Style::default()
                .fg(Color::Black)
                .bg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        );

    let mut state = ListState::default();
    state.select(app.selected_suggestion());

    frame.render_widget(Clear, area);
    frame.render_stateful_widget(list, area, &mut state);
}

fn render_error_overlay(frame: &mut Frame, app: &App, pane_area: Rect) {
    let Some(error) = app.error_text() else {
        return;
    };
    let height = (pane_area.height / 3).clamp(3, pane_area.height);
    let area = Rect {
        x: pane_area.x,
        y: pane_area.bottom().saturating_sub(height),
        width: pane_area.width,
        height,
    };
    let paragraph = Paragraph::new(error)
        .wrap(Wrap { trim: false })
        .block(
            Block::default()
                .title("Error")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Red)),
        );
    frame.render_widget(Clear, area);
    frame.render_widget(paragraph, area);
}

fn border_style(focused: bool) -> Style {
    if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default()
    }
}
