use std::io;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, warn};

use crate::codec::{self, LoadStatus, SnapshotFile, SnapshotState};
use crate::error::{PersistError, PersistResult, StoreResult};
use crate::flush::FlushTrigger;

/// An in-memory collection guarded by one lock and mirrored to a snapshot
/// file.
///
/// The in-memory state is the source of truth. Mutations commit under the
/// lock, release it, then request a flush; the flush re-takes the lock only
/// long enough to encode, and writes the file with the lock released.
///
/// Lock order is always `write_guard` then `state`.
pub struct DurableStore<S: SnapshotState> {
    state: Mutex<S>,
    file: Option<SnapshotFile>,
    /// `true` while an unusable snapshot still occupies the file path.
    write_guard: Mutex<bool>,
    trigger: FlushTrigger,
}

impl<S: SnapshotState> DurableStore<S> {
    /// Load a store from its snapshot file. Never fails; see
    /// [`codec::load_state`].
    pub fn open(file: SnapshotFile) -> (Self, LoadStatus) {
        let (state, status) = codec::load_state::<S>(&file);
        let store = Self {
            state: Mutex::new(state),
            file: Some(file),
            write_guard: Mutex::new(status.left_in_place()),
            trigger: FlushTrigger::new(),
        };
        (store, status)
    }

    /// A store with no backing file. Flushes are no-ops.
    pub fn in_memory(state: S) -> Self {
        Self {
            state: Mutex::new(state),
            file: None,
            write_guard: Mutex::new(false),
            trigger: FlushTrigger::new(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        // A panic mid-mutation leaves whatever was committed; the in-memory
        // state stays authoritative.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Run `f` against the state under the lock.
    pub fn read<R>(&self, f: impl FnOnce(&S) -> R) -> R {
        f(&self.lock())
    }

    /// Run `f` against the state under the lock and request a flush if it
    /// succeeds.
    pub fn mutate<R>(&self, f: impl FnOnce(&mut S) -> StoreResult<R>) -> StoreResult<R> {
        let result = {
            let mut state = self.lock();
            f(&mut state)
        };
        if result.is_ok() {
            self.trigger.request();
        }
        result
    }

    /// Run `f` under the lock without requesting a flush. For state that is
    /// never persisted.
    pub fn mutate_volatile<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.lock())
    }

    /// Encode the current state and write it to the snapshot file.
    ///
    /// If loading left an unusable snapshot at the path, it is moved aside
    /// first; while that keeps failing, nothing is written.
    pub fn flush(&self) -> PersistResult<()> {
        let Some(file) = &self.file else {
            return Ok(());
        };

        let mut held = self
            .write_guard
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *held {
            match file.quarantine(Utc::now()) {
                Ok(moved) => {
                    warn!(store = S::KIND, to = %moved.display(), "unusable snapshot moved aside");
                }
                Err(PersistError::Io(e)) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => return Err(e),
            }
            *held = false;
        }
        let bytes = {
            let state = self.lock();
            codec::encode(&*state, Utc::now())?
        };
        file.write_atomic(&bytes)?;
        debug!(store = S::KIND, path = %file.path().display(), bytes = bytes.len(), "snapshot written");
        Ok(())
    }

    /// The handle mutations signal to request a flush.
    pub fn trigger(&self) -> &FlushTrigger {
        &self.trigger
    }

    /// The backing file, if any.
    pub fn snapshot_path(&self) -> Option<&Path> {
        self.file.as_ref().map(SnapshotFile::path)
    }
}

impl<S: SnapshotState> std::fmt::Debug for DurableStore<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DurableStore")
            .field("kind", &S::KIND)
            .field("path", &self.snapshot_path())
            .finish()
    }
}
