//! Configuration management for jq-tui.
//!
//! This crate provides key-binding parsing, the action keymap, the
//! persistent filter history, and the config-file loader.

pub mod history;
pub mod keybind;
pub mod keymap;
mod loader;

pub use history::{History, HistoryError};
pub use keybind::{KeyBinding, KeyBindings, KeybindError, normalize_key_event};
pub use keymap::Keymap;
pub use loader::{Config, ConfigError, default_config_path, default_history_path};
