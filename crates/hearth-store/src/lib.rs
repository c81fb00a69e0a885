//! In-memory durable stores for Hearth.
//!
//! Each store owns one collection behind a single lock and mirrors it to a
//! snapshot file. The in-memory state is authoritative; snapshots are
//! best-effort and written off the request path.
//!
//! # Stores
//!
//! - [`AccountStore`] -- accounts plus the embedded [`SessionRegistry`]
//! - [`TodoStore`] -- todo items with two-phase deletion
//! - [`BlogStore`] -- posts with privacy and per-post comments
//!
//! All three are built on [`DurableStore`] and implement [`Flush`].
//!
//! # Design Rules
//!
//! 1. Every read and write of a collection happens under that store's lock.
//! 2. No file I/O happens while a store lock is held.
//! 3. Mutations request a flush through a [`FlushTrigger`]; bursts coalesce.
//! 4. Persistence failures are logged, never surfaced to the mutation.
//! 5. No two store locks are ever held at once.
//! 6. Access decisions come from the pure functions in [`policy`].

pub mod accounts;
pub mod blogs;
pub mod codec;
pub mod durable;
pub mod error;
pub mod flush;
pub mod policy;
pub mod sessions;
pub mod todos;
pub mod traits;

// Re-export primary types at crate root for ergonomic imports.
pub use accounts::{AccountStore, AccountStoreOptions, AccountsState, BootstrapAdmin};
pub use blogs::{BlogStore, BlogsState};
pub use codec::{LoadStatus, SnapshotFile, SnapshotState};
pub use durable::DurableStore;
pub use error::{ErrorKind, PersistError, PersistResult, StoreError, StoreResult};
pub use flush::{flush_in_background, flush_logged, run_flusher, FlushTrigger};
pub use policy::Access;
pub use sessions::SessionRegistry;
pub use todos::{TodoStore, TodosState};
pub use traits::{AccountDirectory, Flush};
