//! Persistent filter-expression history.
//!
//! Responsibilities:
//! - Load past filter expressions from a flat, newline-delimited file.
//! - Append newly submitted expressions, deduplicated verbatim against
//!   the entire loaded list.
//!
//! Does NOT handle:
//! - Choosing the history path (see `loader`).
//! - Deciding when to record an expression (session controller).
//!
//! Invariants:
//! - Strict insertion order; never sorted, truncated, or rewritten.
//! - An absent backing file is an empty history, not an error.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::PathBuf;

use thiserror::Error;

/// Errors from history load/append operations.
#[derive(Debug, Error)]
pub enum HistoryError {
    /// `add` was called with a nonempty expression but no backing path
    /// is configured.
    #[error("history has no backing file configured")]
    EmptyPath,

    /// The backing file exists but could not be read.
    #[error("error reading history: {0}")]
    Read(#[source] io::Error),

    /// The backing file could not be opened or appended to.
    #[error("error writing history: {0}")]
    Write(#[source] io::Error),
}

/// Append-only, deduplicated list of past filter expressions.
#[derive(Debug, Default)]
pub struct History {
    path: Option<PathBuf>,
    entries: Vec<String>,
}

impl History {
    /// Load history from `path`. `None` disables persistence; the
    /// in-memory list starts empty either way.
    pub fn load(path: Option<PathBuf>) -> Result<Self, HistoryError> {
        let mut history = Self {
            path,
            entries: Vec::new(),
        };

        if let Some(path) = &history.path {
            match fs::read_to_string(path) {
                Ok(contents) => {
                    history.entries = contents.lines().map(str::to_string).collect();
                }
                Err(err) if err.kind() == io::ErrorKind::NotFound => {}
                Err(err) => return Err(HistoryError::Read(err)),
            }
        }

        Ok(history)
    }

    /// Past expressions in insertion order.
    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    /// Record `expression`.
    ///
    /// Empty (after trimming) and already-present expressions are silent
    /// no-ops that never touch disk. A nonempty expression with no
    /// configured path is [`HistoryError::EmptyPath`]. Otherwise the
    /// expression is appended to the file as one newline-terminated
    /// line, creating parent directories as needed, and then to the
    /// in-memory list.
    pub fn add(&mut self, expression: &str) -> Result<(), HistoryError> {
        let expression = expression.trim();
        if expression.is_empty() {
            return Ok(());
        }

        if self.entries.iter().any(|entry| entry == expression) {
            return Ok(());
        }

        let Some(path) = &self.path else {
            return Err(HistoryError::EmptyPath);
        };

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(HistoryError::Write)?;
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(HistoryError::Write)?;
        writeln!(file, "{expression}").map_err(HistoryError::Write)?;

        self.entries.push(expression.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_history() -> (tempfile::TempDir, History) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let history = History::load(Some(path)).unwrap();
        (dir, history)
    }

    #[test]
    fn absent_file_is_empty_history() {
        let (_dir, history) = temp_history();
        assert!(history.entries().is_empty());
    }

    #[test]
    fn preserves_insertion_order() {
        let (_dir, mut history) = temp_history();
        history.add(".foo").unwrap();
        history.add(".bar").unwrap();
        assert_eq!(history.entries(), [".foo", ".bar"]);
    }

    #[test]
    fn duplicate_add_is_idempotent() {
        let (_dir, mut history) = temp_history();
        history.add(".foo").unwrap();
        history.add(".foo").unwrap();
        assert_eq!(history.entries(), [".foo"]);
    }

    #[test]
    fn empty_expression_never_creates_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        let mut history = History::load(Some(path.clone())).unwrap();
        history.add("").unwrap();
        history.add("   ").unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn unconfigured_path_rejects_nonempty_add_only() {
        let mut history = History::load(None).unwrap();
        history.add("").unwrap();
        assert!(matches!(history.add(".foo"), Err(HistoryError::EmptyPath)));
        assert!(history.entries().is_empty());
    }

    #[test]
    fn round_trips_through_the_backing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("history");

        let mut history = History::load(Some(path.clone())).unwrap();
        history.add(".a").unwrap();
        history.add(".b | keys").unwrap();
        history.add(".c").unwrap();

        let reloaded = History::load(Some(path)).unwrap();
        assert_eq!(reloaded.entries(), [".a", ".b | keys", ".c"]);
    }

    #[test]
    fn dedup_checks_the_entire_loaded_history() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history");
        fs::write(&path, ".old\n.newer\n").unwrap();

        let mut history = History::load(Some(path.clone())).unwrap();
        history.add(".old").unwrap();
        assert_eq!(history.entries(), [".old", ".newer"]);
        assert_eq!(fs::read_to_string(&path).unwrap(), ".old\n.newer\n");
    }
}
