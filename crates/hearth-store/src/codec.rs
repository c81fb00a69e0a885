//! Snapshot codec.
//!
//! A snapshot is one self-describing JSON document holding a store's whole
//! collection together with its identifier counters. Every flush rewrites
//! the complete file; there is no incremental persistence.
//!
//! On-disk layout:
//! ```text
//! {
//!   "format":     "hearth-snapshot",
//!   "version":    1,
//!   "kind":       "<store kind>",
//!   "written_at": "<RFC 3339>",
//!   "digest":     "<hex BLAKE3 of the compact state encoding>",
//!   "state":      { ... }
//! }
//! ```
//!
//! Files are replaced atomically (temp file in the same directory, fsync,
//! rename), so a crash mid-write leaves the previous snapshot in place.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use hearth_crypto::{ContentHasher, Digest};

use crate::error::{PersistError, PersistResult};

/// Value of the `format` field.
pub const SNAPSHOT_FORMAT: &str = "hearth-snapshot";

/// The snapshot version this build reads and writes.
pub const SNAPSHOT_VERSION: u32 = 1;

/// State that can be persisted as a snapshot.
pub trait SnapshotState: Serialize + DeserializeOwned + Default + Send + 'static {
    /// Short name of the store, recorded in the document and used as the
    /// digest label.
    const KIND: &'static str;

    /// Restore internal invariants after loading, e.g. raise identifier
    /// counters above every identifier present in the collection.
    fn reconcile(&mut self) {}
}

#[derive(Serialize)]
struct EnvelopeOut<'a, S> {
    format: &'static str,
    version: u32,
    kind: &'static str,
    written_at: DateTime<Utc>,
    digest: Digest,
    state: &'a S,
}

#[derive(Deserialize)]
struct EnvelopeHeader {
    format: String,
    version: u32,
    kind: String,
}

#[derive(Deserialize)]
struct EnvelopeIn<S> {
    written_at: DateTime<Utc>,
    digest: Digest,
    state: S,
}

/// A decoded snapshot.
#[derive(Debug)]
pub struct Decoded<S> {
    pub state: S,
    pub written_at: DateTime<Utc>,
}

/// Encode a state as a snapshot document.
pub fn encode<S: SnapshotState>(state: &S, written_at: DateTime<Utc>) -> PersistResult<Vec<u8>> {
    let digest = ContentHasher::SNAPSHOT.hash_json(S::KIND, state)?;
    let envelope = EnvelopeOut {
        format: SNAPSHOT_FORMAT,
        version: SNAPSHOT_VERSION,
        kind: S::KIND,
        written_at,
        digest,
        state,
    };
    Ok(serde_json::to_vec_pretty(&envelope)?)
}

/// Decode and verify a snapshot document.
///
/// The header is checked before the state is parsed, so a document from a
/// newer version is reported as such rather than as a parse failure.
pub fn decode<S: SnapshotState>(bytes: &[u8]) -> PersistResult<Decoded<S>> {
    let header: EnvelopeHeader = serde_json::from_slice(bytes)?;
    if header.format != SNAPSHOT_FORMAT {
        return Err(PersistError::UnknownFormat(header.format));
    }
    if header.version != SNAPSHOT_VERSION {
        return Err(PersistError::UnsupportedVersion {
            found: header.version,
            supported: SNAPSHOT_VERSION,
        });
    }
    if header.kind != S::KIND {
        return Err(PersistError::KindMismatch {
            expected: S::KIND,
            found: header.kind,
        });
    }

    let envelope: EnvelopeIn<S> = serde_json::from_slice(bytes)?;
    if !ContentHasher::SNAPSHOT.verify_json(S::KIND, &envelope.state, &envelope.digest)? {
        return Err(PersistError::DigestMismatch { kind: S::KIND });
    }

    Ok(Decoded {
        state: envelope.state,
        written_at: envelope.written_at,
    })
}

/// The file a store's snapshots are written to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SnapshotFile {
    path: PathBuf,
}

impl SnapshotFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the snapshot file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        }
    }

    /// Read the raw document. Returns `Ok(None)` if the file does not exist.
    pub fn read(&self) -> PersistResult<Option<Vec<u8>>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Replace the file's contents atomically, creating the directory if
    /// needed.
    pub fn write_atomic(&self, bytes: &[u8]) -> PersistResult<()> {
        let dir = self.dir();
        fs::create_dir_all(dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
        tmp.write_all(bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| PersistError::Io(e.error))?;
        Ok(())
    }

    /// Move an unreadable snapshot aside so the next flush does not
    /// overwrite the only copy. Returns the new location, which never
    /// replaces an earlier quarantined file.
    pub fn quarantine(&self, now: DateTime<Utc>) -> PersistResult<PathBuf> {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        let stamp = now.format("%Y%m%dT%H%M%S%.6f").to_string();
        let aside = |suffix: String| {
            let mut name = file_name.clone();
            name.push(suffix);
            self.path.with_file_name(name)
        };

        let mut target = aside(format!(".corrupt-{stamp}"));
        let mut attempt = 1u32;
        while target.exists() {
            target = aside(format!(".corrupt-{stamp}-{attempt}"));
            attempt += 1;
        }
        fs::rename(&self.path, &target)?;
        Ok(target)
    }
}

/// How a store's initial state was obtained.
#[derive(Debug)]
pub enum LoadStatus {
    /// The snapshot was read and verified.
    Loaded { written_at: DateTime<Utc> },
    /// No snapshot file existed.
    Missing,
    /// The snapshot could not be used; the store starts from its default
    /// state. `moved_to` is where the unusable file was set aside, or `None`
    /// if it could not be moved and still occupies the snapshot path.
    Recovered {
        error: PersistError,
        moved_to: Option<PathBuf>,
    },
}

impl LoadStatus {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing)
    }

    /// Whether an unusable snapshot was left at the snapshot path. Such a
    /// file must not be overwritten until it has been moved aside.
    pub fn left_in_place(&self) -> bool {
        matches!(self, Self::Recovered { moved_to: None, .. })
    }
}

/// Load a store's state, never failing.
///
/// A missing file yields the default state. A file that cannot be read,
/// parsed or verified is logged, moved aside if possible, and also yields
/// the default state.
pub fn load_state<S: SnapshotState>(file: &SnapshotFile) -> (S, LoadStatus) {
    let bytes = match file.read() {
        Ok(Some(bytes)) => bytes,
        Ok(None) => {
            debug!(store = S::KIND, path = %file.path().display(), "no snapshot; starting empty");
            return (S::default(), LoadStatus::Missing);
        }
        Err(error) => {
            warn!(store = S::KIND, path = %file.path().display(), %error, "snapshot unreadable; starting empty");
            let moved_to = set_aside::<S>(file);
            return (S::default(), LoadStatus::Recovered { error, moved_to });
        }
    };

    match decode::<S>(&bytes) {
        Ok(Decoded {
            mut state,
            written_at,
        }) => {
            state.reconcile();
            info!(store = S::KIND, path = %file.path().display(), %written_at, "snapshot loaded");
            (state, LoadStatus::Loaded { written_at })
        }
        Err(error) => {
            warn!(store = S::KIND, path = %file.path().display(), %error, "snapshot rejected; starting empty");
            let moved_to = set_aside::<S>(file);
            (S::default(), LoadStatus::Recovered { error, moved_to })
        }
    }
}

fn set_aside<S: SnapshotState>(file: &SnapshotFile) -> Option<PathBuf> {
    match file.quarantine(Utc::now()) {
        Ok(moved) => {
            warn!(store = S::KIND, to = %moved.display(), "unusable snapshot moved aside");
            Some(moved)
        }
        Err(e) => {
            error!(store = S::KIND, path = %file.path().display(), error = %e, "could not move unusable snapshot aside; writes are held");
            None
        }
    }
}
