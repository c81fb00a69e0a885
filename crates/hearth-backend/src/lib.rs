//! Hearth backend.
//!
//! Opens every store from a data directory, resolves session tokens to
//! actors, and runs the background persistence tasks: one debounced flusher
//! per store plus the periodic autosave, all stopped by a single shutdown
//! that ends with a final flush.

pub mod autosave;
pub mod backend;
pub mod config;
pub mod error;

pub use autosave::{flush_each, AutosaveHandle, AutosaveScheduler, FlushOutcome};
pub use backend::{Backend, LoadReport, Stores};
pub use config::{BackendConfig, ACCOUNTS_FILE, BLOGS_FILE, TODOS_FILE};
pub use error::{BackendError, BackendResult};
