use super::fingerprint::{calculate_changes, Fingerprint, FingerprintChange};
use super::{SyncError, SyncReport, SyncResult};
use crate::config::SyncConfig;
use crate::model::memo::Memo;
use crate::model::slug::Slug;
use crate::repo::{EntryOrigin, EntryRepository, IndexedEntry, SqliteEntryRepository};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use rusqlite::Connection;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use walkdir::{DirEntry, WalkDir};

struct LocalNote {
    path: PathBuf,
    fingerprint: Fingerprint,
}

/// Mirrors note files under `notes_dir` into the index.
///
/// Only files whose fingerprint differs from the indexed one are read.
/// Index rows of local origin whose file disappeared are deleted. Files
/// whose slug already has a sphere row are skipped; the sphere copy wins.
pub fn sync_local_with_index(
    conn: &mut Connection,
    notes_dir: &Path,
    config: &SyncConfig,
    cancel: &AtomicBool,
) -> SyncResult<SyncReport> {
    let started_at = Instant::now();
    info!("event=local_sync module=sync status=start");

    match run(conn, notes_dir, config, cancel) {
        Ok(report) => {
            info!(
                "event=local_sync module=sync status={} upserted={} removed={} skipped={} duration_ms={}",
                if report.cancelled { "cancelled" } else { "ok" },
                report.upserted,
                report.removed,
                report.skipped,
                started_at.elapsed().as_millis()
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                "event=local_sync module=sync status=error duration_ms={} error={}",
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn run(
    conn: &mut Connection,
    notes_dir: &Path,
    config: &SyncConfig,
    cancel: &AtomicBool,
) -> SyncResult<SyncReport> {
    let mut report = SyncReport::default();
    let notes = scan_notes(notes_dir, &config.note_extension, &mut report)?;
    let local = notes
        .iter()
        .map(|(slug, note)| (slug.clone(), note.fingerprint))
        .collect::<BTreeMap<_, _>>();

    let mut repo = SqliteEntryRepository::try_new(conn)?;
    let indexed = repo.fingerprints(EntryOrigin::Local)?;
    let shadowed = repo.fingerprints(EntryOrigin::Sphere)?;

    for (slug, change) in calculate_changes(&local, &indexed) {
        if cancel.load(Ordering::Relaxed) {
            report.cancelled = true;
            return Ok(report);
        }
        match change {
            FingerprintChange::Same => report.skipped += 1,
            FingerprintChange::RightOnly => {
                if repo.delete_entry(&slug, EntryOrigin::Local)? {
                    report.removed += 1;
                }
            }
            FingerprintChange::LeftOnly
            | FingerprintChange::LeftNewer
            | FingerprintChange::RightNewer
            | FingerprintChange::Conflict => {
                let Some(note) = notes.get(&slug) else {
                    continue;
                };
                if shadowed.contains_key(&slug) {
                    debug!(
                        "event=local_sync module=sync status=skipped reason=sphere_entry slug={}",
                        slug
                    );
                    report.skipped += 1;
                    continue;
                }
                let entry = read_note(slug, note)?;
                if repo.upsert_entry(&entry)? {
                    report.upserted += 1;
                } else {
                    report.skipped += 1;
                }
            }
        }
    }
    Ok(report)
}

fn scan_notes(
    notes_dir: &Path,
    extension: &str,
    report: &mut SyncReport,
) -> SyncResult<BTreeMap<Slug, LocalNote>> {
    let mut notes = BTreeMap::new();
    let walker = WalkDir::new(notes_dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|entry| entry.depth() == 0 || !is_hidden(entry));

    for entry in walker {
        let entry = entry?;
        let path = entry.path();
        let is_note = entry.file_type().is_file()
            && path.extension().and_then(|ext| ext.to_str()) == Some(extension);
        if !is_note {
            continue;
        }
        let Some(slug) = slug_for_path(notes_dir, path) else {
            debug!(
                "event=local_sync module=sync status=skipped reason=invalid_slug path={}",
                path.display()
            );
            report.skipped += 1;
            continue;
        };
        let metadata = entry.metadata()?;
        let fingerprint = Fingerprint::from_metadata(&metadata).map_err(|source| SyncError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        notes.insert(
            slug,
            LocalNote {
                path: path.to_path_buf(),
                fingerprint,
            },
        );
    }
    Ok(notes)
}

fn is_hidden(entry: &DirEntry) -> bool {
    entry
        .file_name()
        .to_str()
        .is_some_and(|name| name.starts_with('.'))
}

/// `journal/2023.subtext` under `root` becomes the slug `journal/2023`.
fn slug_for_path(root: &Path, path: &Path) -> Option<Slug> {
    let relative = path.strip_prefix(root).ok()?.with_extension("");
    let segments = relative
        .components()
        .map(|component| component.as_os_str().to_str())
        .collect::<Option<Vec<_>>>()?;
    Slug::new(&segments.join("/"))
}

fn read_note(slug: Slug, note: &LocalNote) -> SyncResult<IndexedEntry> {
    let text = fs::read_to_string(&note.path).map_err(|source| SyncError::Io {
        path: note.path.clone(),
        source,
    })?;
    let fallback = DateTime::from_timestamp(note.fingerprint.modified, 0).unwrap_or_else(Utc::now);
    let memo = Memo::parse(&text, fallback);
    Ok(IndexedEntry::from_memo(
        slug,
        &memo,
        note.fingerprint,
        EntryOrigin::Local,
    ))
}

#[cfg(test)]
mod tests {
    use super::slug_for_path;
    use std::path::Path;

    #[test]
    fn derives_slug_from_relative_path() {
        let root = Path::new("/notes");
        let slug = slug_for_path(root, Path::new("/notes/journal/2023-01.subtext")).unwrap();
        assert_eq!(slug.verbatim(), "journal/2023-01");
        assert!(slug_for_path(root, Path::new("/notes/bad name.subtext")).is_none());
    }
}
