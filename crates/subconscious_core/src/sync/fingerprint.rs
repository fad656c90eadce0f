//! Cheap change detection via `(modified seconds, size)` pairs.
//!
//! # Invariants
//! - Modification times are floored to whole seconds; filesystems disagree
//!   on sub-second precision.
//! - Two fingerprints are equal iff both fields are equal.

use crate::model::memo::Memo;
use crate::model::slug::Slug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::{self, Metadata};
use std::io;
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint {
    /// Seconds since the Unix epoch.
    pub modified: i64,
    pub size: u64,
}

impl Fingerprint {
    pub fn new(modified: SystemTime, size: u64) -> Self {
        Self {
            modified: floor_seconds(modified),
            size,
        }
    }

    pub fn from_parts(modified: i64, size: u64) -> Self {
        Self { modified, size }
    }

    pub fn from_metadata(metadata: &Metadata) -> io::Result<Self> {
        Ok(Self::new(metadata.modified()?, metadata.len()))
    }

    pub fn from_path(path: &Path) -> io::Result<Self> {
        Self::from_metadata(&fs::metadata(path)?)
    }

    /// Fingerprint of a memo as written to the store.
    pub fn of_memo(memo: &Memo) -> Self {
        Self {
            modified: memo.modified.timestamp(),
            size: memo.size(),
        }
    }
}

fn floor_seconds(time: SystemTime) -> i64 {
    match time.duration_since(UNIX_EPOCH) {
        Ok(after) => i64::try_from(after.as_secs()).unwrap_or(i64::MAX),
        Err(err) => {
            let before = err.duration();
            let secs = i64::try_from(before.as_secs()).unwrap_or(i64::MAX);
            if before.subsec_nanos() > 0 {
                -secs - 1
            } else {
                -secs
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintChange {
    LeftOnly,
    RightOnly,
    LeftNewer,
    RightNewer,
    /// Same modification second, different size.
    Conflict,
    Same,
}

impl FingerprintChange {
    /// `None` when neither side has the entry.
    pub fn between(left: Option<&Fingerprint>, right: Option<&Fingerprint>) -> Option<Self> {
        let change = match (left, right) {
            (None, None) => return None,
            (Some(_), None) => Self::LeftOnly,
            (None, Some(_)) => Self::RightOnly,
            (Some(left), Some(right)) if left == right => Self::Same,
            (Some(left), Some(right)) if left.modified > right.modified => Self::LeftNewer,
            (Some(left), Some(right)) if left.modified < right.modified => Self::RightNewer,
            (Some(_), Some(_)) => Self::Conflict,
        };
        Some(change)
    }
}

/// Classifies every slug present on either side, in slug order.
pub fn calculate_changes(
    left: &BTreeMap<Slug, Fingerprint>,
    right: &BTreeMap<Slug, Fingerprint>,
) -> Vec<(Slug, FingerprintChange)> {
    let mut slugs = left.keys().chain(right.keys()).collect::<Vec<_>>();
    slugs.sort();
    slugs.dedup();
    slugs
        .into_iter()
        .filter_map(|slug| {
            FingerprintChange::between(left.get(slug), right.get(slug))
                .map(|change| (slug.clone(), change))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{calculate_changes, Fingerprint, FingerprintChange};
    use crate::model::slug::Slug;
    use std::collections::BTreeMap;
    use std::time::{Duration, UNIX_EPOCH};

    #[test]
    fn truncates_to_whole_seconds() {
        let a = Fingerprint::new(UNIX_EPOCH + Duration::from_millis(10_100), 5);
        let b = Fingerprint::new(UNIX_EPOCH + Duration::from_millis(10_900), 5);
        assert_eq!(a, b);
        assert_eq!(a.modified, 10);

        let before = Fingerprint::new(UNIX_EPOCH - Duration::from_millis(1_500), 0);
        assert_eq!(before.modified, -2);
    }

    #[test]
    fn classifies_pairs() {
        let old = Fingerprint::from_parts(10, 5);
        let new = Fingerprint::from_parts(20, 5);
        let resized = Fingerprint::from_parts(10, 6);
        assert_eq!(FingerprintChange::between(Some(&old), None), Some(FingerprintChange::LeftOnly));
        assert_eq!(FingerprintChange::between(None, Some(&old)), Some(FingerprintChange::RightOnly));
        assert_eq!(FingerprintChange::between(Some(&new), Some(&old)), Some(FingerprintChange::LeftNewer));
        assert_eq!(FingerprintChange::between(Some(&old), Some(&new)), Some(FingerprintChange::RightNewer));
        assert_eq!(FingerprintChange::between(Some(&old), Some(&resized)), Some(FingerprintChange::Conflict));
        assert_eq!(FingerprintChange::between(Some(&old), Some(&old)), Some(FingerprintChange::Same));
        assert_eq!(FingerprintChange::between(None, None), None);
    }

    #[test]
    fn diffs_maps_over_union_of_slugs() {
        let slug = |s: &str| Slug::new(s).unwrap();
        let left = BTreeMap::from([
            (slug("a"), Fingerprint::from_parts(1, 1)),
            (slug("b"), Fingerprint::from_parts(2, 2)),
        ]);
        let right = BTreeMap::from([
            (slug("b"), Fingerprint::from_parts(2, 2)),
            (slug("c"), Fingerprint::from_parts(3, 3)),
        ]);
        let changes = calculate_changes(&left, &right);
        assert_eq!(
            changes,
            vec![
                (slug("a"), FingerprintChange::LeftOnly),
                (slug("b"), FingerprintChange::Same),
                (slug("c"), FingerprintChange::RightOnly),
            ]
        );
    }
}
