//! Index reconciliation against the sphere and a local notes directory.
//!
//! # Responsibility
//! - Mirror content-store changes into the local index.
//! - Mirror changed files of a notes directory into the local index.
//!
//! # Invariants
//! - Every entry is applied in its own index transaction.
//! - Cancellation is observed between entries, never inside one.
//! - No background threads; callers schedule runs.

use crate::db::DbError;
use crate::repo::RepoError;
use rusqlite::ErrorCode;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::io;
use std::path::PathBuf;

pub mod content_store;
pub mod fingerprint;
mod local_sync;
mod sphere_sync;

pub use content_store::{
    ContentStore, MemoryContentStore, StoreError, StoreErrorKind, StoreResult, Version,
};
pub use fingerprint::{calculate_changes, Fingerprint, FingerprintChange};
pub use local_sync::sync_local_with_index;
pub use sphere_sync::{sync_sphere_with_index, SPHERE_VERSION_KEY};

pub type SyncResult<T> = Result<T, SyncError>;

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Sphere version the index now reflects; `None` for local runs.
    pub version: Option<Version>,
    pub upserted: usize,
    pub removed: usize,
    /// Entries seen but left alone (unchanged or unaddressable).
    pub skipped: usize,
    pub cancelled: bool,
}

#[derive(Debug)]
pub enum SyncError {
    Store(StoreError),
    Repo(RepoError),
    Io { path: PathBuf, source: io::Error },
    Walk(walkdir::Error),
}

impl SyncError {
    /// Whether the caller may retry the run as is.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Store(err) => err.is_transient(),
            Self::Repo(RepoError::Db(DbError::Sqlite(rusqlite::Error::SqliteFailure(err, _)))) => {
                matches!(
                    err.code,
                    ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked
                )
            }
            _ => false,
        }
    }
}

impl Display for SyncError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Io { path, source } => write!(f, "cannot read {}: {source}", path.display()),
            Self::Walk(err) => write!(f, "cannot scan notes directory: {err}"),
        }
    }
}

impl Error for SyncError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Io { source, .. } => Some(source),
            Self::Walk(err) => Some(err),
        }
    }
}

impl From<StoreError> for SyncError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RepoError> for SyncError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<walkdir::Error> for SyncError {
    fn from(value: walkdir::Error) -> Self {
        Self::Walk(value)
    }
}
