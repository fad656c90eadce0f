//! Rename use-cases: classify an edit of a title and apply it.
//!
//! # Responsibility
//! - Decide whether a rename is a retitle, a move or a merge.
//! - Apply the decision to the content store, then to the index.
//!
//! # Invariants
//! - The store is written and saved before the index is touched.
//! - Each applied rename is a single index transaction.
//! - Only entries of the own sphere can be renamed.

use crate::config::SearchConfig;
use crate::model::entry::EntryLink;
use crate::model::memo::Memo;
use crate::model::slashlink::Slashlink;
use crate::model::slug::Slug;
use crate::repo::{EntryOrigin, EntryRepository, IndexedEntry, RepoError, SqliteEntryRepository};
use crate::search::{search_entries, SearchError, SearchQuery};
use crate::sync::content_store::{ContentStore, StoreError};
use crate::sync::fingerprint::Fingerprint;
use chrono::{DateTime, Utc};
use log::{error, info};
use rusqlite::Connection;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenameSuggestion {
    /// Same address, new title.
    Retitle { from: EntryLink, to: EntryLink },
    /// New, unused address.
    Move { from: EntryLink, to: EntryLink },
    /// Address already taken: fold `child` into `parent`.
    Merge { parent: EntryLink, child: EntryLink },
}

impl RenameSuggestion {
    fn kind(&self) -> &'static str {
        match self {
            Self::Retitle { .. } => "retitle",
            Self::Move { .. } => "move",
            Self::Merge { .. } => "merge",
        }
    }
}

/// Classifies renaming `current` to `query`, given the entries known to
/// exist. Checks retitle, then merge, then move.
pub fn classify_rename(
    current: &EntryLink,
    query: &EntryLink,
    candidates: &[EntryLink],
) -> RenameSuggestion {
    if current.address == query.address {
        return RenameSuggestion::Retitle {
            from: current.clone(),
            to: query.clone(),
        };
    }

    let target_taken = candidates
        .iter()
        .filter(|candidate| candidate.address != current.address)
        .any(|candidate| candidate.address == query.address);
    if target_taken {
        RenameSuggestion::Merge {
            parent: query.clone(),
            child: current.clone(),
        }
    } else {
        RenameSuggestion::Move {
            from: current.clone(),
            to: query.clone(),
        }
    }
}

pub type RenameResult<T> = Result<T, RenameError>;

#[derive(Debug)]
pub enum RenameError {
    Store(StoreError),
    Repo(RepoError),
    Search(SearchError),
    NotFound(Slashlink),
    TargetExists(Slashlink),
    NotLocal(Slashlink),
}

impl Display for RenameError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::Search(err) => write!(f, "{err}"),
            Self::NotFound(link) => write!(f, "no memo at {link}"),
            Self::TargetExists(link) => write!(f, "a memo already exists at {link}"),
            Self::NotLocal(link) => write!(f, "{link} does not belong to this sphere"),
        }
    }
}

impl Error for RenameError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            Self::Repo(err) => Some(err),
            Self::Search(err) => Some(err),
            Self::NotFound(_) | Self::TargetExists(_) | Self::NotLocal(_) => None,
        }
    }
}

impl From<StoreError> for RenameError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<RepoError> for RenameError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<SearchError> for RenameError {
    fn from(value: SearchError) -> Self {
        Self::Search(value)
    }
}

/// Rename facade over the content store and the local index.
pub struct RenameService<'a, S: ContentStore> {
    conn: &'a mut Connection,
    store: &'a mut S,
    config: SearchConfig,
}

impl<'a, S: ContentStore> RenameService<'a, S> {
    pub fn new(conn: &'a mut Connection, store: &'a mut S, config: SearchConfig) -> Self {
        Self {
            conn,
            store,
            config,
        }
    }

    /// Suggests what renaming `current` to `title` would do.
    ///
    /// Candidates are the full-text matches for `title` plus the entry
    /// already indexed at the derived address, if any.
    pub fn suggest(&mut self, current: &EntryLink, title: &str) -> RenameResult<RenameSuggestion> {
        ensure_local(current)?;
        let query = EntryLink::from_title(title);

        let mut search = SearchQuery::new(title)
            .with_prefix()
            .with_limit(self.config.suggestion_limit);
        search.include_hidden = self.config.include_hidden;
        let mut candidates = search_entries(&*self.conn, &search)?
            .into_iter()
            .map(|hit| hit.link)
            .collect::<Vec<_>>();

        let repo = SqliteEntryRepository::try_new(self.conn)?;
        if let Some(existing) = repo.get_entry(query.slug())? {
            candidates.push(existing.entry_link());
        }

        Ok(classify_rename(current, &query, &candidates))
    }

    /// Applies `suggestion` and returns the link of the surviving entry.
    pub fn apply(
        &mut self,
        suggestion: &RenameSuggestion,
        now: DateTime<Utc>,
    ) -> RenameResult<EntryLink> {
        match self.apply_inner(suggestion, now) {
            Ok(link) => {
                info!(
                    "event=rename_apply module=service status=ok kind={} target={}",
                    suggestion.kind(),
                    link.address
                );
                Ok(link)
            }
            Err(err) => {
                error!(
                    "event=rename_apply module=service status=error kind={} error={}",
                    suggestion.kind(),
                    err
                );
                Err(err)
            }
        }
    }

    fn apply_inner(
        &mut self,
        suggestion: &RenameSuggestion,
        now: DateTime<Utc>,
    ) -> RenameResult<EntryLink> {
        match suggestion {
            RenameSuggestion::Retitle { from, to } => {
                ensure_local(from)?;
                let memo = self.read(from)?.retitled(to.title.clone(), now);
                self.store.write(from.slug(), &memo)?;
                self.store.save()?;

                let mut repo = SqliteEntryRepository::try_new(self.conn)?;
                repo.upsert_entry(&sphere_entry(from.slug(), &memo))?;
                Ok(EntryLink::new(from.address.clone(), memo.title))
            }
            RenameSuggestion::Move { from, to } => {
                ensure_local(from)?;
                ensure_local(to)?;
                if self.store.read(to.slug())?.is_some() {
                    return Err(RenameError::TargetExists(to.address.clone()));
                }
                let memo = self.read(from)?.retitled(to.title.clone(), now);
                self.store.write(to.slug(), &memo)?;
                self.store.remove(from.slug())?;
                self.store.save()?;

                let mut repo = SqliteEntryRepository::try_new(self.conn)?;
                repo.move_entry(from.slug(), &sphere_entry(to.slug(), &memo))?;
                Ok(EntryLink::new(to.address.clone(), memo.title))
            }
            RenameSuggestion::Merge { parent, child } => {
                ensure_local(parent)?;
                ensure_local(child)?;
                let parent_memo = self.read(parent)?;
                let child_memo = self.read(child)?;
                let merged = parent_memo.merge(&child_memo, now);
                self.store.write(parent.slug(), &merged)?;
                self.store.remove(child.slug())?;
                self.store.save()?;

                let mut repo = SqliteEntryRepository::try_new(self.conn)?;
                repo.merge_entries(&sphere_entry(parent.slug(), &merged), child.slug())?;
                Ok(EntryLink::new(parent.address.clone(), merged.title))
            }
        }
    }

    fn read(&self, link: &EntryLink) -> RenameResult<Memo> {
        self.store
            .read(link.slug())?
            .ok_or_else(|| RenameError::NotFound(link.address.clone()))
    }
}

fn ensure_local(link: &EntryLink) -> RenameResult<()> {
    if link.address.is_local() {
        Ok(())
    } else {
        Err(RenameError::NotLocal(link.address.clone()))
    }
}

fn sphere_entry(slug: &Slug, memo: &Memo) -> IndexedEntry {
    IndexedEntry::from_memo(
        slug.clone(),
        memo,
        Fingerprint::of_memo(memo),
        EntryOrigin::Sphere,
    )
}

#[cfg(test)]
mod tests {
    use super::{classify_rename, RenameSuggestion};
    use crate::model::entry::EntryLink;

    #[test]
    fn candidate_equal_to_current_does_not_cause_merge() {
        let current = EntryLink::from_title("The whale");
        let query = EntryLink::from_title("The Whale!");
        let suggestion = classify_rename(&current, &query, &[current.clone()]);
        assert!(matches!(suggestion, RenameSuggestion::Retitle { .. }));

        let moved = EntryLink::from_title("A whale");
        let suggestion = classify_rename(&current, &moved, &[current.clone()]);
        assert_eq!(
            suggestion,
            RenameSuggestion::Move {
                from: current,
                to: moved
            }
        );
    }
}
