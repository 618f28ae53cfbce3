//! jq-tui library.
//!
//! Core application logic for the interactive jq front end: the action
//! channel, the live-session state machine, the output panes written by
//! the filter executor, and the rendering layer.

pub mod action;
pub mod app;
pub mod cli;
pub mod pane;
pub mod session;
pub mod terminal;
pub mod ui;

pub use action::Action;
pub use app::{App, Command, Focus, SessionState};
pub use pane::{PaneDestination, PaneHandle};
pub use session::{FilterSnapshot, SessionController};
