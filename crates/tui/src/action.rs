//! Action enum for the TUI event system.
//!
//! UI events and async results are both expressed as actions on one
//! bounded channel, consumed by the single-writer main loop. Nothing
//! else mutates application state.

use crossterm::event::KeyEvent;
use jq_filter::FilterError;

/// A message for the main loop.
#[derive(Debug)]
pub enum Action {
    /// A key press from the terminal.
    Input(KeyEvent),
    /// Terminal resize.
    Resize(u16, u16),
    /// A pane buffer changed; repaint.
    Redraw,
    /// The execution loop picked up the latest snapshot and started a
    /// run.
    FilterStarted,
    /// The in-flight filter execution completed. Cancelled runs are
    /// swallowed by the execution loop and never arrive here.
    FilterFinished(Result<u64, FilterError>),
    /// The autocomplete cache gained an entry; ask it again.
    SuggestionsReady,
}
