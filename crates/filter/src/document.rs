//! The loaded input payload plus its filter options.

use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;
use std::sync::Arc;

use crate::options::FilterOptions;

/// Immutable input payload and the options it is filtered with.
///
/// A `Document` is a value: the session controller snapshots a fresh
/// one for every filter change, so concurrent executions never observe
/// a payload mutating underneath them. The payload is an `Arc<str>` and
/// snapshots are cheap.
#[derive(Debug, Clone)]
pub struct Document {
    contents: Arc<str>,
    options: FilterOptions,
}

impl Document {
    /// Wrap an already-loaded payload.
    pub fn new(contents: impl Into<Arc<str>>, options: FilterOptions) -> Self {
        Self {
            contents: contents.into(),
            options,
        }
    }

    /// Read the payload from `paths`, or from `stdin` when no paths are
    /// given. Under null-input mode nothing is read at all.
    pub fn read(
        paths: &[PathBuf],
        stdin: &mut impl Read,
        options: FilterOptions,
    ) -> io::Result<Self> {
        if options.null_input {
            return Ok(Self::new("", options));
        }

        let mut contents = String::new();
        if paths.is_empty() {
            stdin.read_to_string(&mut contents)?;
        } else {
            for path in paths {
                contents.push_str(&fs::read_to_string(path)?);
            }
        }

        Ok(Self::new(contents, options))
    }

    /// The raw payload text.
    pub fn contents(&self) -> &str {
        &self.contents
    }

    /// Shared handle to the payload, for feeding a subprocess.
    pub fn contents_arc(&self) -> Arc<str> {
        Arc::clone(&self.contents)
    }

    /// The options this document is filtered with.
    pub fn options(&self) -> &FilterOptions {
        &self.options
    }

    /// The same payload under different options (a new value; the
    /// original is untouched).
    pub fn with_options(&self, options: FilterOptions) -> Self {
        Self {
            contents: Arc::clone(&self.contents),
            options,
        }
    }
}
