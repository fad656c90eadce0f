//! Content store collaborator contract.
//!
//! # Responsibility
//! - Describe the versioned sphere store consumed by sync and renames.
//! - Ship an in-memory store for tests and offline use.
//!
//! # Invariants
//! - Writes and removals are staged until `save`, which yields a new version.
//! - `changes(since)` lists every slug touched by versions after `since`.

use crate::model::did::Did;
use crate::model::memo::Memo;
use crate::model::slug::Slug;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Opaque sphere version.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Version(String);

impl Version {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Version {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreErrorKind {
    NotFound,
    /// Store temporarily unreachable; safe to retry.
    Unavailable,
    UnknownVersion,
    Other,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreError {
    pub kind: StoreErrorKind,
    pub message: String,
}

impl StoreError {
    pub fn new(kind: StoreErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind == StoreErrorKind::Unavailable
    }
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "content store error ({:?}): {}", self.kind, self.message)
    }
}

impl Error for StoreError {}

pub type StoreResult<T> = Result<T, StoreError>;

/// Versioned, per-identity note store.
pub trait ContentStore {
    fn identity(&self) -> &Did;
    /// Version of the last save.
    fn version(&self) -> StoreResult<Version>;
    fn read(&self, slug: &Slug) -> StoreResult<Option<Memo>>;
    fn write(&mut self, slug: &Slug, memo: &Memo) -> StoreResult<()>;
    fn remove(&mut self, slug: &Slug) -> StoreResult<()>;
    /// Commits staged writes and removals.
    fn save(&mut self) -> StoreResult<Version>;
    fn list(&self) -> StoreResult<Vec<Slug>>;
    /// Slugs changed after `since`; every slug ever written when `None`.
    fn changes(&self, since: Option<&Version>) -> StoreResult<Vec<Slug>>;
}

const REVISION_PREFIX: &str = "rev-";

/// In-memory content store with `rev-N` versions.
#[derive(Debug, Clone)]
pub struct MemoryContentStore {
    identity: Did,
    memos: BTreeMap<Slug, Memo>,
    staged: BTreeMap<Slug, Option<Memo>>,
    revisions: Vec<BTreeSet<Slug>>,
    unavailable: bool,
}

impl MemoryContentStore {
    pub fn new(identity: Did) -> Self {
        Self {
            identity,
            memos: BTreeMap::new(),
            staged: BTreeMap::new(),
            revisions: Vec::new(),
            unavailable: false,
        }
    }

    /// Makes every call fail with a transient error while `unavailable`.
    pub fn set_unavailable(&mut self, unavailable: bool) {
        self.unavailable = unavailable;
    }

    fn ensure_available(&self) -> StoreResult<()> {
        if self.unavailable {
            return Err(StoreError::new(
                StoreErrorKind::Unavailable,
                "store is unavailable",
            ));
        }
        Ok(())
    }

    fn current_version(&self) -> Version {
        Version::new(format!("{REVISION_PREFIX}{}", self.revisions.len()))
    }

    fn revision_index(&self, version: &Version) -> StoreResult<usize> {
        version
            .as_str()
            .strip_prefix(REVISION_PREFIX)
            .and_then(|n| n.parse::<usize>().ok())
            .filter(|n| *n <= self.revisions.len())
            .ok_or_else(|| {
                StoreError::new(
                    StoreErrorKind::UnknownVersion,
                    format!("unknown version `{version}`"),
                )
            })
    }
}

impl ContentStore for MemoryContentStore {
    fn identity(&self) -> &Did {
        &self.identity
    }

    fn version(&self) -> StoreResult<Version> {
        self.ensure_available()?;
        Ok(self.current_version())
    }

    fn read(&self, slug: &Slug) -> StoreResult<Option<Memo>> {
        self.ensure_available()?;
        Ok(match self.staged.get(slug) {
            Some(staged) => staged.clone(),
            None => self.memos.get(slug).cloned(),
        })
    }

    fn write(&mut self, slug: &Slug, memo: &Memo) -> StoreResult<()> {
        self.ensure_available()?;
        self.staged.insert(slug.clone(), Some(memo.clone()));
        Ok(())
    }

    fn remove(&mut self, slug: &Slug) -> StoreResult<()> {
        self.ensure_available()?;
        if self.read(slug)?.is_none() {
            return Err(StoreError::new(
                StoreErrorKind::NotFound,
                format!("no memo at `{slug}`"),
            ));
        }
        self.staged.insert(slug.clone(), None);
        Ok(())
    }

    fn save(&mut self) -> StoreResult<Version> {
        self.ensure_available()?;
        if self.staged.is_empty() {
            return Ok(self.current_version());
        }
        let mut touched = BTreeSet::new();
        for (slug, staged) in std::mem::take(&mut self.staged) {
            match staged {
                Some(memo) => {
                    self.memos.insert(slug.clone(), memo);
                }
                None => {
                    self.memos.remove(&slug);
                }
            }
            touched.insert(slug);
        }
        self.revisions.push(touched);
        Ok(self.current_version())
    }

    fn list(&self) -> StoreResult<Vec<Slug>> {
        self.ensure_available()?;
        Ok(self.memos.keys().cloned().collect())
    }

    fn changes(&self, since: Option<&Version>) -> StoreResult<Vec<Slug>> {
        self.ensure_available()?;
        let from = match since {
            Some(version) => self.revision_index(version)?,
            None => 0,
        };
        let changed = self.revisions[from..]
            .iter()
            .flatten()
            .cloned()
            .collect::<BTreeSet<_>>();
        Ok(changed.into_iter().collect())
    }
}
