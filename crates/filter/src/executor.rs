//! Cancellable subprocess execution of the external filter tool.
//!
//! Responsibilities:
//! - Spawn the filter binary with flags serialized from the document's
//!   options and the expression as the final positional argument.
//! - Stream the payload in and the output out concurrently, so neither
//!   side deadlocks on pipe buffers for large documents.
//! - Kill the subprocess on cancellation rather than merely stopping
//!   reads, so rapid typing cannot accumulate runaway processes.
//!
//! Does NOT handle:
//! - Scheduling or superseding runs (session controller).
//! - Rendering output (destinations).
//!
//! Invariants:
//! - The stdin writer, stderr drain, and child are all joined before a
//!   run is considered complete.
//! - Cancellation is decided by the caller's token, never by guessing
//!   at exit-code sentinels.
//! - Output streams to the destination as it arrives; a run that fails
//!   after emitting bytes leaves those bytes in the destination. The
//!   usual failure (a filter that does not compile) emits nothing, so
//!   the pane keeps its previous contents.

use std::io;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::destination::Destination;
use crate::document::Document;
use crate::error::FilterError;

/// Handle to the configured filter binary.
///
/// Each [`run`](FilterExecutor::run) spawns its own process over its
/// own snapshot of document and options; concurrent runs with different
/// expressions share nothing mutable.
#[derive(Debug, Clone)]
pub struct FilterExecutor {
    program: PathBuf,
}

impl FilterExecutor {
    /// Use `program` (name or path) as the filter binary.
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// The configured binary.
    pub fn program(&self) -> &Path {
        &self.program
    }

    /// Run `filter` over `document`, writing output into `destination`.
    ///
    /// Returns the number of bytes written on success. Interactive
    /// destinations get the pretty/colorized option overrides; plain
    /// sinks get the document's options verbatim.
    pub async fn run<D: Destination>(
        &self,
        document: &Document,
        filter: &str,
        destination: &mut D,
        cancel: &CancellationToken,
    ) -> Result<u64, FilterError> {
        let options = if destination.interactive() {
            document.options().for_interactive()
        } else {
            document.options().clone()
        };

        let mut command = Command::new(&self.program);
        command
            .args(options.to_args())
            .arg(filter)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program.display(), filter, "spawning filter");
        let mut child = command.spawn().map_err(|source| FilterError::Spawn {
            program: self.program.display().to_string(),
            source,
        })?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| io::Error::other("child stdin was not piped"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| io::Error::other("child stderr was not piped"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| io::Error::other("child stdout was not piped"))?;

        // Feed the payload concurrently with draining output. The filter
        // may exit without consuming all of its input; a broken pipe here
        // is expected and ignored.
        let payload = document.contents_arc();
        let stdin_task = tokio::spawn(async move {
            let _ = stdin.write_all(payload.as_bytes()).await;
            let _ = stdin.shutdown().await;
        });

        let stderr_task = tokio::spawn(async move {
            let mut captured = Vec::new();
            let _ = stderr.read_to_end(&mut captured).await;
            captured
        });

        destination.mark_dirty();

        let mut written: u64 = 0;
        let mut buf = [0u8; 8192];
        let mut stream_error: Option<io::Error> = None;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                read = stdout.read(&mut buf) => match read {
                    Ok(0) => break,
                    Ok(n) => {
                        if let Err(err) = destination.write_chunk(&buf[..n]) {
                            stream_error = Some(err);
                            break;
                        }
                        written += n as u64;
                    }
                    Err(err) => {
                        stream_error = Some(err);
                        break;
                    }
                },
            }
        }

        // Once we stop draining stdout the child can block forever on a
        // full pipe; kill it before joining anything, whether the drain
        // stopped for cancellation or for a failed destination write.
        if cancel.is_cancelled() || stream_error.is_some() {
            let _ = child.start_kill();
        }

        let _ = stdin_task.await;
        let stderr_bytes = stderr_task.await.unwrap_or_default();
        let status = child.wait().await?;

        if cancel.is_cancelled() {
            debug!(filter, "filter run superseded");
            return Err(FilterError::Cancelled);
        }

        if let Some(err) = stream_error {
            return Err(err.into());
        }

        if !status.success() {
            return Err(FilterError::Failed {
                stderr: stderr_bytes,
                code: status.code(),
            });
        }

        if written == 0 {
            destination.force_clear();
        }

        Ok(written)
    }
}
