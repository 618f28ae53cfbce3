//! Application state machine.
//!
//! Responsibilities:
//! - Hold everything the renderer reads: focus, filter input widget,
//!   session state, error text, suggestion list, scroll offsets.
//! - Translate normalized key events into state changes and
//!   [`Command`]s for the main loop, in a fixed dispatch order:
//!   plain-character editing first, then submit, then navigation and
//!   focus bindings, then scrolling (pane focus) or editing fallthrough
//!   (filter focus).
//!
//! Does NOT handle:
//! - Drawing (see `ui`), subprocess execution, or terminal IO.
//!
//! Invariants:
//! - A plain printable character with the filter input focused always
//!   edits the filter, even if a scroll binding claims the same key.
//! - Once `Submitted`, further key events are ignored; the main loop
//!   is already tearing down.

use crossterm::event::{Event as CrosstermEvent, KeyCode, KeyEvent, KeyModifiers};
use tui_input::Input;
use tui_input::InputRequest;
use tui_input::backend::crossterm::to_input_request;

use jq_config::{Keymap, normalize_key_event};
use jq_filter::FilterError;

use crate::action::Action;
use crate::pane::PaneHandle;

/// Which widget receives navigation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    InputPane,
    OutputPane,
    FilterInput,
}

/// Lifecycle of the filter text relative to the output pane.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Output pane reflects the current filter.
    Idle,
    /// Filter edited; a run is queued but not yet picked up.
    Pending,
    /// An execution is in flight.
    Running,
    /// Last completed run failed; output pane shows stale output.
    Error,
    /// Submit requested; the session is winding down.
    Submitted,
}

/// Work the main loop performs on the app's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Filter text changed: queue a run and refresh suggestions.
    Refilter(String),
    /// A suggestion was selected: queue a run, leave suggestions as-is.
    ApplySuggestion(String),
    /// Wake the renderer and re-query the suggestion source.
    RefreshSuggestions,
    /// Accept the current filter and leave the interface.
    Submit(String),
    /// Abandon the session.
    Quit,
}

pub struct App {
    keymap: Keymap,
    focus: Focus,
    show_input_pane: bool,
    filter_input: Input,
    state: SessionState,
    error_text: Option<String>,
    suggestions: Option<Vec<String>>,
    selected_suggestion: Option<usize>,
    input_pane: PaneHandle,
    output_pane: PaneHandle,
    /// (row, column) offsets, one pair per pane.
    input_scroll: (u16, u16),
    output_scroll: (u16, u16),
    /// Last rendered pane viewport, used for paging distances.
    pane_width: u16,
    pane_height: u16,
}

impl App {
    pub fn new(
        keymap: Keymap,
        initial_filter: &str,
        show_input_pane: bool,
        input_pane: PaneHandle,
        output_pane: PaneHandle,
    ) -> Self {
        Self {
            keymap,
            focus: Focus::FilterInput,
            show_input_pane,
            filter_input: Input::new(initial_filter.to_string()),
            // The initial filter is queued before the loop starts.
            state: SessionState::Pending,
            error_text: None,
            suggestions: None,
            selected_suggestion: None,
            input_pane,
            output_pane,
            input_scroll: (0, 0),
            output_scroll: (0, 0),
            pane_width: 0,
            pane_height: 0,
        }
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn show_input_pane(&self) -> bool {
        self.show_input_pane
    }

    pub fn filter_input(&self) -> &Input {
        &self.filter_input
    }

    pub fn filter_text(&self) -> &str {
        self.filter_input.value()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn error_text(&self) -> Option<&str> {
        self.error_text.as_deref()
    }

    pub fn suggestions(&self) -> Option<&[String]> {
        self.suggestions.as_deref()
    }

    pub fn selected_suggestion(&self) -> Option<usize> {
        self.selected_suggestion
    }

    pub fn set_suggestions(&mut self, suggestions: Option<Vec<String>>) {
        self.suggestions = suggestions;
        self.selected_suggestion = None;
    }

    pub fn input_pane(&self) -> &PaneHandle {
        &self.input_pane
    }

    pub fn output_pane(&self) -> &PaneHandle {
        &self.output_pane
    }

    pub fn input_scroll(&self) -> (u16, u16) {
        self.input_scroll
    }

    pub fn output_scroll(&self) -> (u16, u16) {
        self.output_scroll
    }

    /// Called by the renderer each frame so paging distances track the
    /// actual pane size.
    pub fn set_pane_viewport(&mut self, width: u16, height: u16) {
        self.pane_width = width;
        self.pane_height = height;
    }

    pub fn handle_action(&mut self, action: Action) -> Option<Command> {
        match action {
            Action::Input(key) => self.handle_key(key),
            Action::FilterStarted => {
                if self.state == SessionState::Pending {
                    self.state = SessionState::Running;
                }
                None
            }
            Action::FilterFinished(result) => {
                self.apply_result(result);
                None
            }
            Action::SuggestionsReady => Some(Command::RefreshSuggestions),
            Action::Redraw | Action::Resize(..) => None,
        }
    }

    fn apply_result(&mut self, result: Result<u64, FilterError>) {
        match result {
            Ok(bytes) => {
                if self.state != SessionState::Submitted {
                    self.state = SessionState::Idle;
                }
                self.error_text = None;
                // Fresh output starts at the top.
                self.output_scroll = (0, 0);
                tracing::debug!(bytes, "filter run finished");
            }
            Err(err) if err.is_cancelled() => {}
            Err(err) => {
                if self.state != SessionState::Submitted {
                    self.state = SessionState::Error;
                }
                self.error_text = Some(match err.stderr_text() {
                    Some(text) if !text.trim().is_empty() => text.trim_end().to_string(),
                    _ => err.to_string(),
                });
            }
        }
    }

    fn handle_key(&mut self, key: KeyEvent) -> Option<Command> {
        if self.state == SessionState::Submitted {
            return None;
        }
        let key = normalize_key_event(key);

        // Ctrl+C always abandons the session, regardless of focus.
        if key.code == KeyCode::Char('c') && key.modifiers == KeyModifiers::CONTROL {
            return Some(Command::Quit);
        }

        // Plain printable characters always edit the focused filter,
        // shadowing any single-character scroll bindings.
        if self.focus == Focus::FilterInput
            && matches!(key.code, KeyCode::Char(_))
            && key.modifiers.is_empty()
        {
            return self.edit_filter(key);
        }

        if self.keymap.submit_filter.matches(&key) {
            self.state = SessionState::Submitted;
            return Some(Command::Submit(self.filter_input.value().to_string()));
        }

        if self.keymap.next_focus.matches(&key) {
            self.cycle_focus(1);
            return None;
        }
        if self.keymap.previous_focus.matches(&key) {
            self.cycle_focus(-1);
            return None;
        }
        if self.keymap.toggle_input_pane.matches(&key) {
            self.toggle_input_pane();
            return None;
        }
        if self.keymap.focus_input_pane_up.matches(&key)
            || self.keymap.focus_input_pane_left.matches(&key)
        {
            if self.show_input_pane {
                self.focus = Focus::InputPane;
            }
            return None;
        }
        if self.keymap.focus_output_pane.matches(&key) {
            self.focus = Focus::OutputPane;
            return None;
        }
        if self.keymap.focus_filter_input.matches(&key) {
            self.focus = Focus::FilterInput;
            return None;
        }

        // Down/up cycle suggestions with the filter focused, scroll
        // otherwise.
        if self.keymap.move_down.matches(&key) {
            return self.move_selection(1);
        }
        if self.keymap.move_up.matches(&key) {
            return self.move_selection(-1);
        }
        if self.keymap.page_down.matches(&key) {
            self.scroll_focused_pane(self.page_distance());
            return None;
        }

        if self.focus == Focus::FilterInput {
            self.handle_filter_key(key)
        } else {
            self.handle_pane_key(key);
            None
        }
    }

    fn handle_filter_key(&mut self, key: KeyEvent) -> Option<Command> {
        if self.keymap.filter_cursor_left.matches(&key) {
            self.filter_input.handle(InputRequest::GoToPrevChar);
            return None;
        }
        if self.keymap.filter_cursor_right.matches(&key) {
            self.filter_input.handle(InputRequest::GoToNextChar);
            return None;
        }
        if self.keymap.line_start.matches(&key) {
            self.filter_input.handle(InputRequest::GoToStart);
            return None;
        }
        if self.keymap.line_end.matches(&key) {
            self.filter_input.handle(InputRequest::GoToEnd);
            return None;
        }
        self.edit_filter(key)
    }

    fn handle_pane_key(&mut self, key: KeyEvent) {
        let half = (self.page_distance() / 2).max(1);
        let full = self.page_distance();
        if self.keymap.half_page_up.matches(&key) {
            self.scroll_focused_pane(-half);
        } else if self.keymap.half_page_down.matches(&key) {
            self.scroll_focused_pane(half);
        } else if self.keymap.textview_page_up.matches(&key)
            || self.keymap.textview_page_up_alt.matches(&key)
        {
            self.scroll_focused_pane(-full);
        } else if self.keymap.textview_page_down.matches(&key) {
            self.scroll_focused_pane(full);
        } else if self.keymap.textview_end.matches(&key) {
            self.scroll_focused_pane_to_end();
        } else if self.keymap.line_start.matches(&key) {
            self.focused_scroll_mut().1 = 0;
        } else if self.keymap.line_end.matches(&key) {
            self.scroll_focused_pane_to_line_end();
        } else if key.code == KeyCode::Down {
            self.scroll_focused_pane(1);
        } else if key.code == KeyCode::Up {
            self.scroll_focused_pane(-1);
        }
    }

    fn edit_filter(&mut self, key: KeyEvent) -> Option<Command> {
        let event = CrosstermEvent::Key(key);
        let request = to_input_request(&event)?;
        let changed = self.filter_input.handle(request)?;
        if !changed.value {
            return None;
        }
        self.selected_suggestion = None;
        self.state = SessionState::Pending;
        Some(Command::Refilter(self.filter_input.value().to_string()))
    }

    fn move_selection(&mut self, delta: i32) -> Option<Command> {
        if self.focus == Focus::FilterInput {
            self.cycle_suggestion(delta)
        } else {
            self.scroll_focused_pane(delta);
            None
        }
    }

    fn cycle_suggestion(&mut self, delta: i32) -> Option<Command> {
        let suggestions = self.suggestions.as_ref()?;
        if suggestions.is_empty() {
            return None;
        }
        let len = suggestions.len() as i32;
        let next = match self.selected_suggestion {
            None if delta > 0 => 0,
            None => len - 1,
            Some(current) => (current as i32 + delta).rem_euclid(len),
        };
        let value = suggestions[next as usize].clone();
        self.selected_suggestion = Some(next as usize);
        self.filter_input = Input::new(value.clone());
        self.state = SessionState::Pending;
        Some(Command::ApplySuggestion(value))
    }

    fn cycle_focus(&mut self, delta: i32) {
        let order: &[Focus] = if self.show_input_pane {
            &[Focus::InputPane, Focus::OutputPane, Focus::FilterInput]
        } else {
            &[Focus::OutputPane, Focus::FilterInput]
        };
        let current = order
            .iter()
            .position(|focus| *focus == self.focus)
            .unwrap_or(0);
        let next = (current as i32 + delta).rem_euclid(order.len() as i32);
        self.focus = order[next as usize];
    }

    fn toggle_input_pane(&mut self) {
        self.show_input_pane = !self.show_input_pane;
        if !self.show_input_pane && self.focus == Focus::InputPane {
            self.focus = Focus::OutputPane;
        }
    }

    fn page_distance(&self) -> i32 {
        i32::from(self.pane_height.max(1))
    }

    fn focused_pane(&self) -> &PaneHandle {
        match self.focus {
            Focus::InputPane => &self.input_pane,
            _ => &self.output_pane,
        }
    }

    fn focused_scroll_mut(&mut self) -> &mut (u16, u16) {
        match self.focus {
            Focus::InputPane => &mut self.input_scroll,
            _ => &mut self.output_scroll,
        }
    }

    fn scroll_focused_pane(&mut self, delta: i32) {
        let max = self.focused_pane().lock().line_count().saturating_sub(1) as i32;
        let scroll = self.focused_scroll_mut();
        let next = (i32::from(scroll.0) + delta).clamp(0, max.max(0));
        scroll.0 = next as u16;
    }

    fn scroll_focused_pane_to_end(&mut self) {
        let lines = self.focused_pane().lock().line_count() as i32;
        let bottom = (lines - self.page_distance()).max(0);
        self.focused_scroll_mut().0 = bottom as u16;
    }

    fn scroll_focused_pane_to_line_end(&mut self) {
        let longest = self
            .focused_pane()
            .lock()
            .text()
            .lines()
            .map(|line| line.chars().count())
            .max()
            .unwrap_or(0) as u16;
        let width = self.pane_width.max(1);
        self.focused_scroll_mut().1 = longest.saturating_sub(width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn app() -> App {
        App::new(
            Keymap::default(),
            ".",
            true,
            PaneHandle::default(),
            PaneHandle::default(),
        )
    }

    fn press(code: KeyCode, modifiers: KeyModifiers) -> Action {
        let mut key = KeyEvent::new(code, modifiers);
        key.kind = KeyEventKind::Press;
        Action::Input(key)
    }

    #[test]
    fn plain_chars_edit_the_filter_even_when_bound_to_scrolling() {
        let mut app = app();
        // 'd' is half-page-down for panes but must type into the filter.
        let command = app.handle_action(press(KeyCode::Char('d'), KeyModifiers::NONE));
        assert_eq!(command, Some(Command::Refilter(".d".to_string())));
        assert_eq!(app.state(), SessionState::Pending);
    }

    #[test]
    fn same_key_scrolls_when_a_pane_has_focus() {
        let mut app = app();
        app.output_pane().lock().set_text("a\nb\nc\nd\ne\n");
        app.set_pane_viewport(80, 2);
        app.handle_action(press(KeyCode::Right, KeyModifiers::SHIFT));
        assert_eq!(app.focus(), Focus::OutputPane);

        let command = app.handle_action(press(KeyCode::Char('d'), KeyModifiers::NONE));
        assert_eq!(command, None);
        assert_eq!(app.output_scroll().0, 1);
    }

    #[test]
    fn submit_captures_the_current_filter() {
        let mut app = app();
        app.handle_action(press(KeyCode::Char('x'), KeyModifiers::NONE));
        let command = app.handle_action(press(KeyCode::Enter, KeyModifiers::NONE));
        assert_eq!(command, Some(Command::Submit(".x".to_string())));
        assert_eq!(app.state(), SessionState::Submitted);

        // After submit, input is inert.
        assert_eq!(
            app.handle_action(press(KeyCode::Char('y'), KeyModifiers::NONE)),
            None
        );
    }

    #[test]
    fn ctrl_c_quits_from_any_focus() {
        let mut app = app();
        assert_eq!(
            app.handle_action(press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
        app.handle_action(press(KeyCode::Right, KeyModifiers::SHIFT));
        assert_eq!(
            app.handle_action(press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            Some(Command::Quit)
        );
    }

    #[test]
    fn successful_result_clears_error_and_settles_idle() {
        let mut app = app();
        app.handle_action(Action::FilterFinished(Err(
            jq_filter::FilterError::Failed {
                stderr: b"jq: error: oops".to_vec(),
                code: Some(3),
            },
        )));
        assert_eq!(app.state(), SessionState::Error);
        assert_eq!(app.error_text(), Some("jq: error: oops"));

        app.handle_action(Action::FilterFinished(Ok(42)));
        assert_eq!(app.state(), SessionState::Idle);
        assert_eq!(app.error_text(), None);
    }

    #[test]
    fn run_lifecycle_walks_pending_running_idle() {
        let mut app = app();
        assert_eq!(app.state(), SessionState::Pending);
        app.handle_action(Action::FilterStarted);
        assert_eq!(app.state(), SessionState::Running);
        app.handle_action(Action::FilterFinished(Ok(1)));
        assert_eq!(app.state(), SessionState::Idle);

        // A stale start notification never leaves Idle.
        app.handle_action(Action::FilterStarted);
        assert_eq!(app.state(), SessionState::Idle);
    }

    #[test]
    fn cancelled_results_change_nothing() {
        let mut app = app();
        app.handle_action(Action::FilterFinished(Ok(1)));
        app.handle_action(Action::FilterFinished(Err(
            jq_filter::FilterError::Cancelled,
        )));
        assert_eq!(app.state(), SessionState::Idle);
        assert_eq!(app.error_text(), None);
    }

    #[test]
    fn suggestion_cycling_replaces_the_filter_without_refetching() {
        let mut app = app();
        app.set_suggestions(Some(vec![".alpha".to_string(), ".beta".to_string()]));

        let first = app.handle_action(press(KeyCode::Char('n'), KeyModifiers::CONTROL));
        assert_eq!(first, Some(Command::ApplySuggestion(".alpha".to_string())));
        assert_eq!(app.filter_text(), ".alpha");
        assert_eq!(app.selected_suggestion(), Some(0));

        let second = app.handle_action(press(KeyCode::Char('n'), KeyModifiers::CONTROL));
        assert_eq!(second, Some(Command::ApplySuggestion(".beta".to_string())));

        // Wraps around going up from the top.
        app.set_suggestions(Some(vec![".a".to_string(), ".b".to_string()]));
        let up = app.handle_action(press(KeyCode::Char('p'), KeyModifiers::CONTROL));
        assert_eq!(up, Some(Command::ApplySuggestion(".b".to_string())));
    }

    #[test]
    fn toggling_the_input_pane_moves_focus_off_it() {
        let mut app = app();
        app.handle_action(press(KeyCode::Up, KeyModifiers::SHIFT));
        assert_eq!(app.focus(), Focus::InputPane);
        app.handle_action(press(KeyCode::Char('o'), KeyModifiers::CONTROL));
        assert!(!app.show_input_pane());
        assert_eq!(app.focus(), Focus::OutputPane);
    }

    #[test]
    fn tab_cycles_focus_through_visible_widgets() {
        let mut app = app();
        assert_eq!(app.focus(), Focus::FilterInput);
        app.handle_action(press(KeyCode::Tab, KeyModifiers::NONE));
        assert_eq!(app.focus(), Focus::InputPane);
        app.handle_action(press(KeyCode::Tab, KeyModifiers::NONE));
        assert_eq!(app.focus(), Focus::OutputPane);
        app.handle_action(press(KeyCode::BackTab, KeyModifiers::NONE));
        assert_eq!(app.focus(), Focus::InputPane);
    }
}
