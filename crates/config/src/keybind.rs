//! Key-binding parsing and event matching.
//!
//! Responsibilities:
//! - Parse human-readable binding descriptors ("Ctrl+N", "Shift-Up",
//!   "Alt+Shift+a") into structured bindings.
//! - Match live crossterm key events against parsed bindings.
//!
//! Does NOT handle:
//! - Mapping bindings to actions (see `keymap`).
//! - Deciding dispatch order between bindings (TUI crate).
//!
//! Invariants:
//! - Matching is exact: key code and full modifier set must both be
//!   equal. There is no prefix or case-insensitive matching.
//! - A `Shift` modifier on a single letter is absorbed into the
//!   letter's case at parse time: "Shift+g" produces the character 'G'
//!   with no residual Shift modifier.

use std::fmt;
use std::str::FromStr;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use serde::de::{self, Deserializer, SeqAccess, Visitor};
use serde::Deserialize;
use thiserror::Error;

/// Errors produced while parsing a binding descriptor.
///
/// The offending descriptor is retained so startup diagnostics can name
/// the exact config value that failed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum KeybindError {
    /// The descriptor was empty or whitespace-only.
    #[error("key binding cannot be empty")]
    EmptyBinding,

    /// The descriptor had modifiers but no trailing key ("Ctrl+").
    #[error("key binding '{descriptor}' is missing a key")]
    MissingKey {
        /// The descriptor that failed to parse.
        descriptor: String,
    },

    /// A modifier segment was not one of shift/alt/ctrl/control/meta.
    #[error("unknown modifier '{modifier}' in key binding '{descriptor}'")]
    UnknownModifier {
        /// The descriptor that failed to parse.
        descriptor: String,
        /// The unrecognized modifier segment.
        modifier: String,
    },

    /// The base key was not a named key or a single character.
    #[error("unknown key '{name}' in key binding '{descriptor}'")]
    UnknownKey {
        /// The descriptor that failed to parse.
        descriptor: String,
        /// The unrecognized base key.
        name: String,
    },
}

/// A parsed key combination: a key code plus an exact modifier set.
///
/// Character bindings carry the character inside the key code, so code
/// equality already implies character equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyBinding {
    /// The logical key code (character keys use `KeyCode::Char`).
    pub code: KeyCode,
    /// The modifier set the event must carry exactly.
    pub modifiers: KeyModifiers,
}

impl KeyBinding {
    /// Binding with no modifiers.
    pub const fn plain(code: KeyCode) -> Self {
        Self {
            code,
            modifiers: KeyModifiers::NONE,
        }
    }

    /// Binding with an explicit modifier set.
    pub const fn with_modifiers(code: KeyCode, modifiers: KeyModifiers) -> Self {
        Self { code, modifiers }
    }

    /// True when `event` carries exactly this key code and modifier set.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        event.code == self.code && event.modifiers == self.modifiers
    }
}

impl FromStr for KeyBinding {
    type Err = KeybindError;

    fn from_str(descriptor: &str) -> Result<Self, Self::Err> {
        parse(descriptor)
    }
}

impl fmt::Display for KeyBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (flag, name) in [
            (KeyModifiers::CONTROL, "Ctrl"),
            (KeyModifiers::ALT, "Alt"),
            (KeyModifiers::SHIFT, "Shift"),
            (KeyModifiers::META, "Meta"),
        ] {
            if self.modifiers.contains(flag) {
                write!(f, "{name}+")?;
            }
        }
        match self.code {
            KeyCode::Char(' ') => write!(f, "Space"),
            KeyCode::Char(c) => write!(f, "{c}"),
            KeyCode::F(n) => write!(f, "F{n}"),
            other => write!(f, "{other:?}"),
        }
    }
}

/// An ordered list of bindings for one action.
///
/// The list matches an event when any member matches.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeyBindings(Vec<KeyBinding>);

impl KeyBindings {
    /// Wrap a list of bindings.
    pub fn new(bindings: Vec<KeyBinding>) -> Self {
        Self(bindings)
    }

    /// True when any member binding matches `event`.
    pub fn matches(&self, event: &KeyEvent) -> bool {
        self.0.iter().any(|binding| binding.matches(event))
    }

    /// The member bindings, in declaration order.
    pub fn bindings(&self) -> &[KeyBinding] {
        &self.0
    }
}

impl From<KeyBinding> for KeyBindings {
    fn from(binding: KeyBinding) -> Self {
        Self(vec![binding])
    }
}

impl<'de> Deserialize<'de> for KeyBindings {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct BindingsVisitor;

        impl<'de> Visitor<'de> for BindingsVisitor {
            type Value = KeyBindings;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a key binding string or a list of key binding strings")
            }

            fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
            where
                E: de::Error,
            {
                let binding = parse(value).map_err(de::Error::custom)?;
                Ok(KeyBindings(vec![binding]))
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: SeqAccess<'de>,
            {
                let mut bindings = Vec::new();
                while let Some(descriptor) = seq.next_element::<String>()? {
                    bindings.push(parse(&descriptor).map_err(de::Error::custom)?);
                }
                Ok(KeyBindings(bindings))
            }
        }

        deserializer.deserialize_any(BindingsVisitor)
    }
}

/// Parse a binding descriptor into a [`KeyBinding`].
///
/// Both `+` and `-` are accepted as modifier separators. The whole
/// descriptor is tried against the named-key table first, so "Shift-Tab"
/// resolves as a named key rather than a Shift modifier on Tab.
pub fn parse(descriptor: &str) -> Result<KeyBinding, KeybindError> {
    let trimmed = descriptor.trim();
    if trimmed.is_empty() {
        return Err(KeybindError::EmptyBinding);
    }

    let (mods_part, base) = split_descriptor(trimmed);
    if base.is_empty() {
        return Err(KeybindError::MissingKey {
            descriptor: trimmed.to_string(),
        });
    }

    let mut modifiers = KeyModifiers::NONE;
    if !mods_part.is_empty() {
        for segment in mods_part.split('+') {
            let segment = segment.trim();
            match segment.to_ascii_lowercase().as_str() {
                "shift" => modifiers |= KeyModifiers::SHIFT,
                "alt" => modifiers |= KeyModifiers::ALT,
                "ctrl" | "control" => modifiers |= KeyModifiers::CONTROL,
                "meta" => modifiers |= KeyModifiers::META,
                _ => {
                    return Err(KeybindError::UnknownModifier {
                        descriptor: trimmed.to_string(),
                        modifier: segment.to_string(),
                    });
                }
            }
        }
    }

    let base = base.trim();
    let lower = base.to_ascii_lowercase();
    if let Some((code, implied)) = named_key(&lower) {
        return Ok(KeyBinding {
            code,
            modifiers: modifiers | implied,
        });
    }

    // Control-letter key names ("Ctrl+Space" and friends) live in the
    // named table under a synthesized "ctrl-" prefix; the explicit Ctrl
    // modifier folds into the table entry.
    if modifiers.contains(KeyModifiers::CONTROL) {
        let ctrl_name = format!("ctrl-{lower}");
        if let Some((code, implied)) = named_key(&ctrl_name) {
            modifiers.remove(KeyModifiers::CONTROL);
            return Ok(KeyBinding {
                code,
                modifiers: modifiers | implied,
            });
        }
    }

    let mut chars = base.chars();
    if let (Some(first), None) = (chars.next(), chars.next()) {
        let mut ch = first;
        if modifiers.contains(KeyModifiers::SHIFT) {
            let mut upper = ch.to_uppercase();
            if let (Some(u), None) = (upper.next(), upper.next())
                && u != ch
            {
                ch = u;
                modifiers.remove(KeyModifiers::SHIFT);
            }
        }
        return Ok(KeyBinding {
            code: KeyCode::Char(ch),
            modifiers,
        });
    }

    Err(KeybindError::UnknownKey {
        descriptor: trimmed.to_string(),
        name: base.to_string(),
    })
}

/// Drop the Shift modifier from events that already encode it.
///
/// Crossterm reports shifted characters with the shifted character AND
/// the SHIFT flag (Shift+g arrives as `Char('G')` + SHIFT), and
/// Shift+Tab as `BackTab` + SHIFT. Bindings carry the case (or the
/// BackTab code) themselves, so the flag must go before matching.
pub fn normalize_key_event(mut event: KeyEvent) -> KeyEvent {
    if matches!(event.code, KeyCode::Char(_) | KeyCode::BackTab) {
        event.modifiers.remove(KeyModifiers::SHIFT);
    }
    event
}

/// Split a descriptor into a modifier prefix and a base key token.
///
/// A lone `+` and a trailing doubled separator both mean a literal plus
/// character. When no `+` separator exists, `-` is accepted between
/// modifiers and the key, but only if every leading segment really is a
/// modifier (so "shift-tab" stays a named key and "e-mail" stays
/// unsplit).
fn split_descriptor(value: &str) -> (String, String) {
    if value == "+" {
        return (String::new(), "+".to_string());
    }

    if let Some(stripped) = value.strip_suffix("++") {
        return (stripped.trim().to_string(), "+".to_string());
    }

    if let Some(idx) = value.rfind('+') {
        return (
            value[..idx].trim().to_string(),
            value[idx + 1..].trim().to_string(),
        );
    }

    if named_key(&value.to_ascii_lowercase()).is_some() {
        return (String::new(), value.to_string());
    }

    let parts: Vec<&str> = value.split('-').collect();
    if parts.len() < 2 {
        return (String::new(), value.to_string());
    }

    let mut modifiers = Vec::with_capacity(parts.len() - 1);
    for part in &parts[..parts.len() - 1] {
        let modifier = part.trim();
        if !is_modifier(modifier) {
            return (String::new(), value.to_string());
        }
        modifiers.push(modifier);
    }

    (
        modifiers.join("+"),
        parts[parts.len() - 1].trim().to_string(),
    )
}

fn is_modifier(value: &str) -> bool {
    matches!(
        value.to_ascii_lowercase().as_str(),
        "shift" | "alt" | "ctrl" | "control" | "meta"
    )
}

/// Look up a named key (lowercase). Returns the key code plus any
/// modifiers implied by the name itself.
fn named_key(name: &str) -> Option<(KeyCode, KeyModifiers)> {
    let code = match name {
        "up" => KeyCode::Up,
        "down" => KeyCode::Down,
        "left" => KeyCode::Left,
        "right" => KeyCode::Right,
        "enter" | "return" => KeyCode::Enter,
        "tab" => KeyCode::Tab,
        "backtab" | "shift-tab" => KeyCode::BackTab,
        "esc" | "escape" => KeyCode::Esc,
        "backspace" => KeyCode::Backspace,
        "delete" | "del" => KeyCode::Delete,
        "insert" | "ins" => KeyCode::Insert,
        "home" => KeyCode::Home,
        "end" => KeyCode::End,
        "pageup" | "pgup" => KeyCode::PageUp,
        "pagedown" | "pgdown" | "pgdn" => KeyCode::PageDown,
        "space" => KeyCode::Char(' '),
        _ => {
            if let Some(rest) = name.strip_prefix("ctrl-") {
                if rest == "space" {
                    return Some((KeyCode::Char(' '), KeyModifiers::CONTROL));
                }
                let mut chars = rest.chars();
                if let (Some(c), None) = (chars.next(), chars.next())
                    && c.is_ascii_lowercase()
                {
                    return Some((KeyCode::Char(c), KeyModifiers::CONTROL));
                }
                return None;
            }
            if let Some(num) = name.strip_prefix('f')
                && let Ok(n) = num.parse::<u8>()
                && (1..=12).contains(&n)
            {
                return Some((KeyCode::F(n), KeyModifiers::NONE));
            }
            return None;
        }
    };
    Some((code, KeyModifiers::NONE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn parses_ctrl_combo_and_matches_exactly() {
        let binding = parse("Ctrl+N").unwrap();
        assert!(binding.matches(&event(KeyCode::Char('n'), KeyModifiers::CONTROL)));
        assert!(!binding.matches(&event(
            KeyCode::Char('n'),
            KeyModifiers::CONTROL | KeyModifiers::SHIFT
        )));
    }

    #[test]
    fn shift_letter_absorbs_into_case() {
        let binding = parse("Shift+g").unwrap();
        assert_eq!(binding.code, KeyCode::Char('G'));
        assert_eq!(binding.modifiers, KeyModifiers::NONE);
        assert!(binding.matches(&event(KeyCode::Char('G'), KeyModifiers::NONE)));
        assert!(!binding.matches(&event(KeyCode::Char('g'), KeyModifiers::NONE)));
    }

    #[test]
    fn alt_shift_letter_keeps_alt_only() {
        let binding = parse("Alt+Shift+a").unwrap();
        assert_eq!(binding.code, KeyCode::Char('A'));
        assert_eq!(binding.modifiers, KeyModifiers::ALT);
        assert!(binding.matches(&event(KeyCode::Char('A'), KeyModifiers::ALT)));
    }

    #[test]
    fn shift_on_non_letter_is_kept() {
        // The case transform only applies when it changes the character.
        let binding = parse("Shift+1").unwrap();
        assert_eq!(binding.code, KeyCode::Char('1'));
        assert_eq!(binding.modifiers, KeyModifiers::SHIFT);
    }

    #[test]
    fn dash_separator_parses_modifiers() {
        let binding = parse("Shift-Up").unwrap();
        assert_eq!(binding.code, KeyCode::Up);
        assert_eq!(binding.modifiers, KeyModifiers::SHIFT);
    }

    #[test]
    fn shift_tab_is_a_named_key() {
        let binding = parse("Shift-Tab").unwrap();
        assert_eq!(binding.code, KeyCode::BackTab);
        assert_eq!(binding.modifiers, KeyModifiers::NONE);
    }

    #[test]
    fn named_keys_are_case_insensitive() {
        assert_eq!(parse("PageDown").unwrap().code, KeyCode::PageDown);
        assert_eq!(parse("pagedown").unwrap().code, KeyCode::PageDown);
        assert_eq!(parse("Return").unwrap().code, KeyCode::Enter);
        assert_eq!(parse("F5").unwrap().code, KeyCode::F(5));
    }

    #[test]
    fn lone_plus_is_a_literal_plus() {
        let binding = parse("+").unwrap();
        assert_eq!(binding.code, KeyCode::Char('+'));
        assert_eq!(binding.modifiers, KeyModifiers::NONE);
    }

    #[test]
    fn doubled_separator_is_a_literal_plus() {
        let binding = parse("Ctrl++").unwrap();
        assert_eq!(binding.code, KeyCode::Char('+'));
        assert_eq!(binding.modifiers, KeyModifiers::CONTROL);
    }

    #[test]
    fn control_synonym_is_accepted() {
        let binding = parse("Control+x").unwrap();
        assert_eq!(binding.code, KeyCode::Char('x'));
        assert_eq!(binding.modifiers, KeyModifiers::CONTROL);
    }

    #[test]
    fn ctrl_named_key_lookup_folds_the_modifier() {
        let binding = parse("Ctrl+Space").unwrap();
        assert_eq!(binding.code, KeyCode::Char(' '));
        assert_eq!(binding.modifiers, KeyModifiers::CONTROL);
    }

    #[test]
    fn empty_descriptor_fails() {
        assert_eq!(parse(" "), Err(KeybindError::EmptyBinding));
        assert_eq!(parse(""), Err(KeybindError::EmptyBinding));
    }

    #[test]
    fn modifier_without_key_fails() {
        assert!(matches!(
            parse("Ctrl+"),
            Err(KeybindError::MissingKey { .. })
        ));
    }

    #[test]
    fn unknown_modifier_fails_with_segment() {
        match parse("Hyper+a") {
            Err(KeybindError::UnknownModifier {
                descriptor,
                modifier,
            }) => {
                assert_eq!(descriptor, "Hyper+a");
                assert_eq!(modifier, "Hyper");
            }
            other => panic!("expected UnknownModifier, got {other:?}"),
        }
    }

    #[test]
    fn unknown_named_key_fails() {
        assert!(matches!(
            parse("Ctrl+Bogus"),
            Err(KeybindError::UnknownKey { .. })
        ));
    }

    #[test]
    fn bindings_list_matches_any_member() {
        let bindings = KeyBindings::new(vec![
            parse("Ctrl+A").unwrap(),
            parse("0").unwrap(),
        ]);
        assert!(bindings.matches(&event(KeyCode::Char('0'), KeyModifiers::NONE)));
        assert!(bindings.matches(&event(KeyCode::Char('a'), KeyModifiers::CONTROL)));
        assert!(!bindings.matches(&event(KeyCode::Char('a'), KeyModifiers::NONE)));
    }

    #[test]
    fn normalize_drops_shift_on_characters_only() {
        let shifted = event(KeyCode::Char('G'), KeyModifiers::SHIFT);
        assert_eq!(
            normalize_key_event(shifted).modifiers,
            KeyModifiers::NONE
        );

        let arrow = event(KeyCode::Up, KeyModifiers::SHIFT);
        assert_eq!(normalize_key_event(arrow).modifiers, KeyModifiers::SHIFT);
    }
}
