//! Action-to-binding keymap.
//!
//! Maps named actions to one or more key bindings. The keymap is read
//! once from the `[keymaps]` config table at startup and never changes
//! afterwards; actions left out of the config keep their defaults.

use crossterm::event::{KeyCode, KeyModifiers};
use serde::Deserialize;

use crate::keybind::{KeyBinding, KeyBindings};

/// The full set of bindable actions.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "kebab-case", deny_unknown_fields)]
pub struct Keymap {
    pub submit_filter: KeyBindings,
    pub move_down: KeyBindings,
    pub move_up: KeyBindings,
    pub page_down: KeyBindings,
    pub line_start: KeyBindings,
    pub line_end: KeyBindings,
    pub half_page_up: KeyBindings,
    pub half_page_down: KeyBindings,

    pub filter_cursor_right: KeyBindings,
    pub filter_cursor_left: KeyBindings,

    pub focus_input_pane_up: KeyBindings,
    pub focus_input_pane_left: KeyBindings,
    pub focus_output_pane: KeyBindings,
    pub focus_filter_input: KeyBindings,
    pub next_focus: KeyBindings,
    pub previous_focus: KeyBindings,
    pub toggle_input_pane: KeyBindings,

    pub textview_page_up: KeyBindings,
    pub textview_page_up_alt: KeyBindings,
    pub textview_page_down: KeyBindings,
    pub textview_end: KeyBindings,
}

impl Default for Keymap {
    fn default() -> Self {
        Self {
            submit_filter: plain(KeyCode::Enter).into(),
            move_down: ctrl('n').into(),
            move_up: ctrl('p').into(),
            page_down: ctrl('v').into(),
            line_start: KeyBindings::new(vec![ctrl('a'), chr('0')]),
            line_end: KeyBindings::new(vec![ctrl('e'), chr('$')]),
            half_page_up: KeyBindings::new(vec![ctrl('u'), chr('u')]),
            half_page_down: KeyBindings::new(vec![ctrl('d'), chr('d')]),

            filter_cursor_right: ctrl('f').into(),
            filter_cursor_left: ctrl('b').into(),

            focus_input_pane_up: shifted(KeyCode::Up).into(),
            focus_input_pane_left: shifted(KeyCode::Left).into(),
            focus_output_pane: shifted(KeyCode::Right).into(),
            focus_filter_input: shifted(KeyCode::Down).into(),
            next_focus: plain(KeyCode::Tab).into(),
            previous_focus: plain(KeyCode::BackTab).into(),
            toggle_input_pane: ctrl('o').into(),

            textview_page_up: chr('b').into(),
            textview_page_up_alt: KeyBinding::with_modifiers(
                KeyCode::Char('v'),
                KeyModifiers::ALT,
            )
            .into(),
            textview_page_down: chr('f').into(),
            textview_end: chr('G').into(),
        }
    }
}

fn plain(code: KeyCode) -> KeyBinding {
    KeyBinding::plain(code)
}

fn chr(c: char) -> KeyBinding {
    KeyBinding::plain(KeyCode::Char(c))
}

fn ctrl(c: char) -> KeyBinding {
    KeyBinding::with_modifiers(KeyCode::Char(c), KeyModifiers::CONTROL)
}

fn shifted(code: KeyCode) -> KeyBinding {
    KeyBinding::with_modifiers(code, KeyModifiers::SHIFT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEvent;

    #[test]
    fn defaults_cover_submit_and_navigation() {
        let keymap = Keymap::default();
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert!(keymap.submit_filter.matches(&enter));

        let ctrl_n = KeyEvent::new(KeyCode::Char('n'), KeyModifiers::CONTROL);
        assert!(keymap.move_down.matches(&ctrl_n));
        assert!(!keymap.move_up.matches(&ctrl_n));
    }

    #[test]
    fn multiple_bindings_per_action() {
        let keymap = Keymap::default();
        let ctrl_u = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL);
        let plain_u = KeyEvent::new(KeyCode::Char('u'), KeyModifiers::NONE);
        assert!(keymap.half_page_up.matches(&ctrl_u));
        assert!(keymap.half_page_up.matches(&plain_u));
    }

    #[test]
    fn deserializes_overrides_and_keeps_defaults() {
        let keymap: Keymap = toml::from_str(
            r#"
            submit-filter = "Ctrl+J"
            half-page-up = ["Ctrl+U", "K"]
            "#,
        )
        .unwrap();

        let ctrl_j = KeyEvent::new(KeyCode::Char('j'), KeyModifiers::CONTROL);
        assert!(keymap.submit_filter.matches(&ctrl_j));
        let enter = KeyEvent::new(KeyCode::Enter, KeyModifiers::NONE);
        assert!(!keymap.submit_filter.matches(&enter));

        let upper_k = KeyEvent::new(KeyCode::Char('K'), KeyModifiers::NONE);
        assert!(keymap.half_page_up.matches(&upper_k));

        // Untouched actions keep their defaults.
        assert_eq!(keymap.move_down, Keymap::default().move_down);
    }

    #[test]
    fn bad_descriptor_in_config_is_an_error() {
        let result = toml::from_str::<Keymap>(r#"submit-filter = "Hyper+a""#);
        let err = result.unwrap_err().to_string();
        assert!(err.contains("Hyper"), "error should name the modifier: {err}");
    }
}
