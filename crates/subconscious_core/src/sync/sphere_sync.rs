use super::content_store::{ContentStore, StoreErrorKind, Version};
use super::fingerprint::Fingerprint;
use super::{SyncReport, SyncResult};
use crate::repo::{EntryOrigin, EntryRepository, IndexedEntry, SqliteEntryRepository};
use log::{error, info, warn};
use rusqlite::Connection;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// `sync_info` key holding the last fully indexed sphere version.
pub const SPHERE_VERSION_KEY: &str = "sphere_version";

/// Applies every store change since the last synced version to the index.
///
/// The recorded version only advances once every change has been applied,
/// so a cancelled or failed run is replayed by the next one.
pub fn sync_sphere_with_index(
    conn: &mut Connection,
    store: &impl ContentStore,
    cancel: &AtomicBool,
) -> SyncResult<SyncReport> {
    let started_at = Instant::now();
    info!("event=sphere_sync module=sync status=start");

    match run(conn, store, cancel) {
        Ok(report) => {
            info!(
                "event=sphere_sync module=sync status={} version={} upserted={} removed={} duration_ms={}",
                if report.cancelled { "cancelled" } else { "ok" },
                report.version.as_ref().map_or("-", Version::as_str),
                report.upserted,
                report.removed,
                started_at.elapsed().as_millis()
            );
            Ok(report)
        }
        Err(err) => {
            error!(
                "event=sphere_sync module=sync status=error transient={} duration_ms={} error={}",
                err.is_transient(),
                started_at.elapsed().as_millis(),
                err
            );
            Err(err)
        }
    }
}

fn run(
    conn: &mut Connection,
    store: &impl ContentStore,
    cancel: &AtomicBool,
) -> SyncResult<SyncReport> {
    let mut repo = SqliteEntryRepository::try_new(conn)?;
    let last_synced = repo.read_sync_info(SPHERE_VERSION_KEY)?.map(Version::new);
    let target = store.version()?;

    let mut report = SyncReport {
        version: Some(target.clone()),
        ..SyncReport::default()
    };
    if last_synced.as_ref() == Some(&target) {
        return Ok(report);
    }

    let changed = match store.changes(last_synced.as_ref()) {
        Err(err) if err.kind == StoreErrorKind::UnknownVersion => {
            warn!(
                "event=sphere_sync module=sync status=full_resync reason=unknown_version version={}",
                last_synced.as_ref().map_or("-", Version::as_str)
            );
            store.changes(None)?
        }
        result => result?,
    };

    for slug in changed {
        if cancel.load(Ordering::Relaxed) {
            report.version = last_synced;
            report.cancelled = true;
            return Ok(report);
        }
        match store.read(&slug)? {
            Some(memo) => {
                let entry = IndexedEntry::from_memo(
                    slug,
                    &memo,
                    Fingerprint::of_memo(&memo),
                    EntryOrigin::Sphere,
                );
                repo.upsert_entry(&entry)?;
                report.upserted += 1;
            }
            None => {
                if repo.delete_entry(&slug, EntryOrigin::Sphere)? {
                    report.removed += 1;
                } else {
                    report.skipped += 1;
                }
            }
        }
    }

    repo.write_sync_info(SPHERE_VERSION_KEY, target.as_str())?;
    Ok(report)
}
