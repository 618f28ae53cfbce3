//! Terminal state management and cleanup.
//!
//! Responsibilities:
//! - Put the terminal into raw mode on the alternate screen, drawing on
//!   stderr so stdout stays free for the final filter output.
//! - Restore terminal state on exit, even during panics, via Drop.
//!
//! Does NOT handle:
//! - Rendering (see `ui`) or event reading (done in `main.rs`).
//!
//! Invariants:
//! - The interface lives entirely on stderr; nothing here touches
//!   stdout.
//! - Drop implementation must not panic.

use std::io::{self, Stderr};

use crossterm::{
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

/// Guard that restores the terminal when dropped.
///
/// Created after setup succeeds; must outlive the interface session.
/// The explicit restore in `main()` runs first on normal exit, this is
/// the safety net for panics and early returns.
pub struct TerminalGuard;

impl TerminalGuard {
    /// Enter raw mode and the alternate screen on stderr, returning a
    /// ratatui terminal plus the cleanup guard.
    pub fn enter() -> io::Result<(Terminal<CrosstermBackend<Stderr>>, Self)> {
        enable_raw_mode()?;
        let mut stderr = io::stderr();
        if let Err(err) = execute!(stderr, EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(err);
        }
        let terminal = Terminal::new(CrosstermBackend::new(stderr))?;
        Ok((terminal, Self))
    }

    /// Explicit restore for the normal exit path, so errors can be
    /// logged instead of swallowed.
    pub fn restore() -> io::Result<()> {
        disable_raw_mode()?;
        execute!(io::stderr(), LeaveAlternateScreen)?;
        Ok(())
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        // Ignore errors: drop must not panic, and the explicit restore
        // already ran on the normal path.
        let _ = disable_raw_mode();
        let _ = execute!(io::stderr(), LeaveAlternateScreen);
    }
}
