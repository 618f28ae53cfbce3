//! Shared pane buffers and the executor-facing pane destination.
//!
//! Responsibilities:
//! - Hold the bytes shown in the input and output panes.
//! - Implement the dirty/lazy-clear protocol: a superseded run that
//!   never wrote leaves the previous contents visible instead of
//!   flashing blank.
//!
//! Invariants:
//! - A pane is single-writer: only one execution loop writes into a
//!   given pane destination, and a cancelled run's writer is torn down
//!   before the next run starts.

use std::borrow::Cow;
use std::io;
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc::Sender;

use jq_filter::Destination;

use crate::action::Action;

/// Contents of one display pane.
#[derive(Debug, Default)]
pub struct PaneBuffer {
    bytes: Vec<u8>,
    dirty: bool,
}

impl PaneBuffer {
    /// Pane contents as text (raw ANSI included).
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Raw pane bytes, for ANSI-aware rendering.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Number of lines currently held, counting a trailing line that
    /// has no terminator yet.
    pub fn line_count(&self) -> usize {
        let newlines = self.bytes.iter().filter(|b| **b == b'\n').count();
        match self.bytes.last() {
            Some(b'\n') | None => newlines,
            Some(_) => newlines + 1,
        }
    }

    #[cfg(test)]
    pub(crate) fn set_text(&mut self, text: &str) {
        self.bytes = text.as_bytes().to_vec();
        self.dirty = false;
    }
}

/// Cheaply cloneable handle to a pane buffer.
#[derive(Debug, Clone, Default)]
pub struct PaneHandle(Arc<Mutex<PaneBuffer>>);

impl PaneHandle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the buffer for reading (rendering) or direct mutation.
    pub fn lock(&self) -> MutexGuard<'_, PaneBuffer> {
        match self.0.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Build the executor-facing destination for this pane.
    pub fn destination(&self, redraw: Sender<Action>) -> PaneDestination {
        PaneDestination {
            pane: self.clone(),
            redraw,
        }
    }
}

/// Interactive destination writing into a shared pane buffer.
///
/// Repaints are requested with `try_send`; a full channel just means a
/// repaint is already queued.
#[derive(Debug, Clone)]
pub struct PaneDestination {
    pane: PaneHandle,
    redraw: Sender<Action>,
}

impl PaneDestination {
    fn request_redraw(&self) {
        let _ = self.redraw.try_send(Action::Redraw);
    }
}

impl Destination for PaneDestination {
    fn interactive(&self) -> bool {
        true
    }

    fn mark_dirty(&mut self) {
        self.pane.lock().dirty = true;
    }

    fn write_chunk(&mut self, chunk: &[u8]) -> io::Result<()> {
        {
            let mut pane = self.pane.lock();
            if pane.dirty {
                pane.bytes.clear();
                pane.dirty = false;
            }
            pane.bytes.extend_from_slice(chunk);
        }
        self.request_redraw();
        Ok(())
    }

    fn force_clear(&mut self) {
        {
            let mut pane = self.pane.lock();
            pane.bytes.clear();
            pane.dirty = false;
        }
        self.request_redraw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc::channel;

    #[test]
    fn previous_contents_survive_until_first_byte() {
        let (tx, _rx) = channel(4);
        let pane = PaneHandle::new();
        let mut dest = pane.destination(tx);

        dest.write_chunk(b"old output\n").unwrap();
        assert_eq!(pane.lock().text(), "old output\n");

        // A new run marks dirty but produces nothing before being
        // superseded: the old contents stay visible.
        dest.mark_dirty();
        assert_eq!(pane.lock().text(), "old output\n");

        // The next run's first byte performs the clear.
        dest.mark_dirty();
        dest.write_chunk(b"new").unwrap();
        dest.write_chunk(b" output\n").unwrap();
        assert_eq!(pane.lock().text(), "new output\n");
    }

    #[test]
    fn force_clear_empties_the_pane() {
        let (tx, _rx) = channel(4);
        let pane = PaneHandle::new();
        let mut dest = pane.destination(tx);

        dest.write_chunk(b"stale\n").unwrap();
        dest.mark_dirty();
        dest.force_clear();
        assert_eq!(pane.lock().text(), "");
    }

    #[test]
    fn line_count_includes_an_unterminated_final_line() {
        let (tx, _rx) = channel(4);
        let pane = PaneHandle::new();
        let mut dest = pane.destination(tx);

        assert_eq!(pane.lock().line_count(), 0);

        // Raw subprocess output often lacks a final newline.
        dest.write_chunk(b"a\nb\nc").unwrap();
        assert_eq!(pane.lock().line_count(), 3);

        dest.write_chunk(b"\n").unwrap();
        assert_eq!(pane.lock().line_count(), 3);
    }

    #[test]
    fn redraws_are_coalesced_not_lost() {
        let (tx, mut rx) = channel(1);
        let pane = PaneHandle::new();
        let mut dest = pane.destination(tx);

        dest.write_chunk(b"a").unwrap();
        dest.write_chunk(b"b").unwrap();
        dest.write_chunk(b"c").unwrap();

        assert!(matches!(rx.try_recv(), Ok(Action::Redraw)));
        // Only one redraw was queued; the rest were coalesced.
        assert!(rx.try_recv().is_err());
        assert_eq!(pane.lock().text(), "abc");
    }
}
