//! Error taxonomy for filter executions.

use std::io;

use thiserror::Error;

/// Outcome of a failed (or superseded) filter execution.
#[derive(Debug, Error)]
pub enum FilterError {
    /// The filter binary could not be started at all.
    #[error("failed to start '{program}': {source}")]
    Spawn {
        /// The configured program name or path.
        program: String,
        #[source]
        source: io::Error,
    },

    /// The subprocess exited nonzero. Carries its captured stderr and
    /// exit code for the error pane.
    #[error("filter exited with status {code:?}: {}", String::from_utf8_lossy(.stderr).trim_end())]
    Failed {
        /// Captured standard-error bytes, verbatim.
        stderr: Vec<u8>,
        /// Exit code, when the process exited normally.
        code: Option<i32>,
    },

    /// The run was superseded and its subprocess killed. Not an error
    /// in the session sense; callers discard it silently.
    #[error("filter run cancelled")]
    Cancelled,

    /// I/O failure while streaming to or from the subprocess.
    #[error("filter i/o error: {0}")]
    Io(#[from] io::Error),
}

impl FilterError {
    /// True for the expected superseded-run outcome.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// The captured stderr as text, when there is any.
    pub fn stderr_text(&self) -> Option<String> {
        match self {
            Self::Failed { stderr, .. } => {
                Some(String::from_utf8_lossy(stderr).into_owned())
            }
            _ => None,
        }
    }

    /// The subprocess exit code to report on final submission.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Failed { code, .. } => code.unwrap_or(1),
            _ => 1,
        }
    }
}
