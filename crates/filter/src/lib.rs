//! External jq process boundary for jq-tui.
//!
//! This crate owns everything that talks to the external filter binary:
//! the immutable input document, the flag model, the cancellable
//! subprocess executor, the destination abstraction it writes into, and
//! the structural-key autocomplete engine built on top of the executor.
//!
//! It knows nothing about terminals, widgets, or configuration files.

pub mod autocomplete;
pub mod destination;
pub mod document;
pub mod error;
pub mod executor;
pub mod options;

pub use autocomplete::Autocomplete;
pub use destination::{Destination, WriterDestination};
pub use document::Document;
pub use error::FilterError;
pub use executor::FilterExecutor;
pub use options::FilterOptions;

pub use tokio_util::sync::CancellationToken;
