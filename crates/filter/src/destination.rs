//! Output destinations for filter executions.
//!
//! The executor decides option overrides from an explicit capability
//! (`interactive`) declared by the destination the caller passed in,
//! never by inspecting the concrete type at runtime.

use std::io::{self, Write};

/// A sink for filter output.
///
/// Display panes implement the dirty/lazy-clear protocol: the executor
/// calls [`mark_dirty`](Destination::mark_dirty) before any output, the
/// pane clears its previous contents on the first byte actually
/// written, and [`force_clear`](Destination::force_clear) handles the
/// run-produced-nothing case. Plain sinks ignore all of that.
pub trait Destination: Send {
    /// Whether this is a live display pane (forces pretty, colorized
    /// rendering) rather than a plain byte sink.
    fn interactive(&self) -> bool {
        false
    }

    /// A run is about to write; a stateful pane should clear lazily on
    /// the first byte that follows.
    fn mark_dirty(&mut self) {}

    /// Receive one chunk of filter output.
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()>;

    /// The run completed successfully without writing anything; a pane
    /// must drop its stale contents now.
    fn force_clear(&mut self) {}
}

impl Destination for Vec<u8> {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.extend_from_slice(chunk);
        Ok(())
    }
}

/// Plain sink over any writer, used for the final stdout write.
#[derive(Debug)]
pub struct WriterDestination<W: Write + Send> {
    inner: W,
}

impl<W: Write + Send> WriterDestination<W> {
    pub fn new(inner: W) -> Self {
        Self { inner }
    }

    /// Flush and hand the writer back.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write + Send> Destination for WriterDestination<W> {
    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        self.inner.write_all(chunk)
    }
}
