use hearth_types::{AccountId, UNKNOWN_ACCOUNT_NAME};

use crate::error::PersistResult;
use crate::flush::FlushTrigger;

/// A store whose in-memory state can be written to its snapshot file.
///
/// Implementations must satisfy these invariants:
/// - `flush` always encodes the latest in-memory state, taken under the
///   store's lock at the moment the flush runs.
/// - The store's lock is released before any file I/O begins.
/// - Concurrent flushes of the same store are serialized, so an older
///   encode never replaces a newer one on disk.
/// - A store without a backing file flushes successfully as a no-op.
pub trait Flush: Send + Sync {
    /// Short name used in logs.
    fn label(&self) -> &'static str;

    /// Write the current state to the backing file.
    fn flush(&self) -> PersistResult<()>;

    /// Handle mutations use to request an asynchronous flush.
    fn flush_trigger(&self) -> FlushTrigger;
}

/// Display-name lookup used to denormalize owner names onto new records.
///
/// Stores resolve names through this seam before taking their own lock, so
/// no two store locks are ever held at once.
pub trait AccountDirectory: Send + Sync {
    /// The account's display name, or `None` if the id does not resolve.
    fn display_name(&self, id: AccountId) -> Option<String>;

    /// The display name, falling back to a placeholder for unknown ids.
    fn display_name_or_unknown(&self, id: AccountId) -> String {
        self.display_name(id)
            .unwrap_or_else(|| UNKNOWN_ACCOUNT_NAME.to_string())
    }
}
