//! Entry repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Store one row per indexed note plus its outgoing links.
//! - Provide the transactional move/merge primitives used by renames.
//!
//! # Invariants
//! - Rows are keyed by the normalized slug.
//! - An entry row and its `entry_link` rows change in the same transaction.
//! - The FTS shadow table follows `entry` through triggers only.
//! - A sphere row is never overwritten or deleted on behalf of a local
//!   file; sphere writes take over local rows with the same slug.

use super::{RepoError, RepoResult};
use crate::db::migrations::latest_version;
use crate::model::entry::EntryLink;
use crate::model::memo::Memo;
use crate::model::slashlink::Slashlink;
use crate::model::slug::Slug;
use crate::subtext::Headers;
use crate::sync::fingerprint::Fingerprint;
use rusqlite::types::Value;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::collections::BTreeMap;

const EXCERPT_CHARS: usize = 240;

const ENTRY_SELECT_SQL: &str = "SELECT
    slug,
    title,
    excerpt,
    body,
    headers,
    modified,
    size,
    origin
FROM entry";

/// Where an indexed entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EntryOrigin {
    /// Mirrored from the content-addressed sphere.
    Sphere,
    /// Mirrored from a plain file in a local notes directory.
    Local,
}

impl EntryOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Sphere => "sphere",
            Self::Local => "local",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "sphere" => Some(Self::Sphere),
            "local" => Some(Self::Local),
            _ => None,
        }
    }
}

/// One row of the local index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexedEntry {
    pub slug: Slug,
    pub title: String,
    pub excerpt: String,
    pub body: String,
    pub headers: Headers,
    /// Seconds since the Unix epoch.
    pub modified: i64,
    pub size: u64,
    /// Outgoing slashlinks, deduplicated.
    pub links: Vec<Slashlink>,
    pub origin: EntryOrigin,
}

impl IndexedEntry {
    pub fn from_memo(slug: Slug, memo: &Memo, fingerprint: Fingerprint, origin: EntryOrigin) -> Self {
        let subtext = memo.subtext();
        let mut links = subtext
            .slashlinks()
            .into_iter()
            .cloned()
            .collect::<Vec<_>>();
        links.sort();
        links.dedup();

        Self {
            slug,
            title: memo.title.clone(),
            excerpt: subtext.excerpt(EXCERPT_CHARS),
            body: memo.body.clone(),
            headers: memo.headers(),
            modified: fingerprint.modified,
            size: fingerprint.size,
            links,
            origin,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_parts(self.modified, self.size)
    }

    pub fn entry_link(&self) -> EntryLink {
        EntryLink::new(Slashlink::local(self.slug.clone()), self.title.clone())
    }
}

/// Query options for listing entries.
#[derive(Debug, Clone, Default)]
pub struct EntryListQuery {
    pub include_hidden: bool,
    pub origin: Option<EntryOrigin>,
    pub limit: Option<u32>,
}

/// Repository interface for the local index.
pub trait EntryRepository {
    /// Inserts or replaces the entry and its links.
    ///
    /// Returns `false` when a local entry is shadowed by a sphere row.
    fn upsert_entry(&mut self, entry: &IndexedEntry) -> RepoResult<bool>;
    fn get_entry(&self, slug: &Slug) -> RepoResult<Option<IndexedEntry>>;
    /// Removes the row only if it has `origin`. Returns whether a row was removed.
    fn delete_entry(&mut self, slug: &Slug, origin: EntryOrigin) -> RepoResult<bool>;
    /// Entries ordered by modification time, newest first.
    fn list_entries(&self, query: &EntryListQuery) -> RepoResult<Vec<EntryLink>>;
    fn fingerprints(&self, origin: EntryOrigin) -> RepoResult<BTreeMap<Slug, Fingerprint>>;
    /// Entries whose body links to `/slug`.
    fn backlinks(&self, slug: &Slug) -> RepoResult<Vec<EntryLink>>;
    /// Writes `to` and removes the sphere row of `from`, if indexed, in one
    /// transaction.
    fn move_entry(&mut self, from: &Slug, to: &IndexedEntry) -> RepoResult<()>;
    /// Writes `parent` and removes the sphere row of `child`, if indexed, in
    /// one transaction.
    fn merge_entries(&mut self, parent: &IndexedEntry, child: &Slug) -> RepoResult<()>;
    fn read_sync_info(&self, key: &str) -> RepoResult<Option<String>>;
    fn write_sync_info(&mut self, key: &str, value: &str) -> RepoResult<()>;
}

/// SQLite-backed entry repository.
pub struct SqliteEntryRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteEntryRepository<'conn> {
    /// Creates the repository from a fully migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        let expected_version = latest_version();
        let actual_version: u32 =
            conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?;
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }

    fn begin(&mut self) -> RepoResult<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

impl EntryRepository for SqliteEntryRepository<'_> {
    fn upsert_entry(&mut self, entry: &IndexedEntry) -> RepoResult<bool> {
        let tx = self.begin()?;
        let written = write_entry(&tx, entry)?;
        tx.commit()?;
        Ok(written)
    }

    fn get_entry(&self, slug: &Slug) -> RepoResult<Option<IndexedEntry>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{ENTRY_SELECT_SQL} WHERE slug = ?1;"))?;
        let mut rows = stmt.query([slug.normalized()])?;
        match rows.next()? {
            Some(row) => {
                let mut entry = parse_entry_row(row)?;
                entry.links = read_links(&*self.conn, slug)?;
                Ok(Some(entry))
            }
            None => Ok(None),
        }
    }

    fn delete_entry(&mut self, slug: &Slug, origin: EntryOrigin) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM entry WHERE slug = ?1 AND origin = ?2;",
            params![slug.normalized(), origin.as_str()],
        )?;
        Ok(changed > 0)
    }

    fn list_entries(&self, query: &EntryListQuery) -> RepoResult<Vec<EntryLink>> {
        let mut sql = String::from("SELECT slug, title FROM entry WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !query.include_hidden {
            sql.push_str(" AND slug NOT LIKE '\\_%' ESCAPE '\\'");
        }
        if let Some(origin) = query.origin {
            sql.push_str(" AND origin = ?");
            bind_values.push(Value::Text(origin.as_str().to_string()));
        }
        sql.push_str(" ORDER BY modified DESC, slug ASC");
        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(i64::from(limit)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(parse_entry_link(row)?);
        }
        Ok(links)
    }

    fn fingerprints(&self, origin: EntryOrigin) -> RepoResult<BTreeMap<Slug, Fingerprint>> {
        let mut stmt = self
            .conn
            .prepare("SELECT slug, modified, size FROM entry WHERE origin = ?1;")?;
        let mut rows = stmt.query([origin.as_str()])?;
        let mut fingerprints = BTreeMap::new();
        while let Some(row) = rows.next()? {
            let slug = parse_slug(row)?;
            let size = size_from_db(row.get("size")?)?;
            fingerprints.insert(slug, Fingerprint::from_parts(row.get("modified")?, size));
        }
        Ok(fingerprints)
    }

    fn backlinks(&self, slug: &Slug) -> RepoResult<Vec<EntryLink>> {
        let target = Slashlink::local(slug.clone()).normalized();
        let mut stmt = self.conn.prepare(
            "SELECT e.slug, e.title
             FROM entry_link l
             JOIN entry e ON e.slug = l.source_slug
             WHERE l.target = ?1
               AND e.slug != ?2
             ORDER BY e.modified DESC, e.slug ASC;",
        )?;
        let mut rows = stmt.query(params![target, slug.normalized()])?;
        let mut links = Vec::new();
        while let Some(row) = rows.next()? {
            links.push(parse_entry_link(row)?);
        }
        Ok(links)
    }

    fn move_entry(&mut self, from: &Slug, to: &IndexedEntry) -> RepoResult<()> {
        let tx = self.begin()?;
        if from != &to.slug {
            delete_sphere_row(&tx, from)?;
        }
        write_entry(&tx, to)?;
        tx.commit()?;
        Ok(())
    }

    fn merge_entries(&mut self, parent: &IndexedEntry, child: &Slug) -> RepoResult<()> {
        let tx = self.begin()?;
        write_entry(&tx, parent)?;
        if child != &parent.slug {
            delete_sphere_row(&tx, child)?;
        }
        tx.commit()?;
        Ok(())
    }

    fn read_sync_info(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM sync_info WHERE key = ?1;", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    fn write_sync_info(&mut self, key: &str, value: &str) -> RepoResult<()> {
        self.conn.execute(
            "INSERT INTO sync_info (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value;",
            params![key, value],
        )?;
        Ok(())
    }
}

fn write_entry(tx: &Transaction<'_>, entry: &IndexedEntry) -> RepoResult<bool> {
    let headers = serde_json::to_string(&entry.headers)
        .map_err(|err| RepoError::InvalidData(format!("cannot encode headers: {err}")))?;
    let size = i64::try_from(entry.size)
        .map_err(|_| RepoError::InvalidData(format!("entry size {} overflows", entry.size)))?;
    let slug = entry.slug.normalized();

    let changed = tx.execute(
        "INSERT INTO entry (slug, title, excerpt, body, headers, modified, size, origin)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
         ON CONFLICT(slug) DO UPDATE SET
            title = excluded.title,
            excerpt = excluded.excerpt,
            body = excluded.body,
            headers = excluded.headers,
            modified = excluded.modified,
            size = excluded.size,
            origin = excluded.origin
         WHERE entry.origin = excluded.origin OR excluded.origin = 'sphere';",
        params![
            slug,
            entry.title.as_str(),
            entry.excerpt.as_str(),
            entry.body.as_str(),
            headers,
            entry.modified,
            size,
            entry.origin.as_str(),
        ],
    )?;
    if changed == 0 {
        return Ok(false);
    }

    tx.execute("DELETE FROM entry_link WHERE source_slug = ?1;", [slug])?;
    for link in &entry.links {
        tx.execute(
            "INSERT OR IGNORE INTO entry_link (source_slug, target) VALUES (?1, ?2);",
            params![slug, link.normalized()],
        )?;
    }
    Ok(true)
}

fn delete_sphere_row(tx: &Transaction<'_>, slug: &Slug) -> RepoResult<usize> {
    Ok(tx.execute(
        "DELETE FROM entry WHERE slug = ?1 AND origin = ?2;",
        params![slug.normalized(), EntryOrigin::Sphere.as_str()],
    )?)
}

fn read_links(conn: &Connection, slug: &Slug) -> RepoResult<Vec<Slashlink>> {
    let mut stmt =
        conn.prepare("SELECT target FROM entry_link WHERE source_slug = ?1 ORDER BY target;")?;
    let mut rows = stmt.query([slug.normalized()])?;
    let mut links = Vec::new();
    while let Some(row) = rows.next()? {
        let target: String = row.get(0)?;
        let link = Slashlink::new(&target).ok_or_else(|| {
            RepoError::InvalidData(format!("invalid link `{target}` in entry_link.target"))
        })?;
        links.push(link);
    }
    Ok(links)
}

fn parse_entry_row(row: &Row<'_>) -> RepoResult<IndexedEntry> {
    let headers_text: String = row.get("headers")?;
    let headers: Headers = serde_json::from_str(&headers_text)
        .map_err(|err| RepoError::InvalidData(format!("invalid entry.headers: {err}")))?;
    let origin_text: String = row.get("origin")?;
    let origin = EntryOrigin::parse(&origin_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid origin `{origin_text}` in entry.origin"))
    })?;

    Ok(IndexedEntry {
        slug: parse_slug(row)?,
        title: row.get("title")?,
        excerpt: row.get("excerpt")?,
        body: row.get("body")?,
        headers,
        modified: row.get("modified")?,
        size: size_from_db(row.get("size")?)?,
        links: Vec::new(),
        origin,
    })
}

fn parse_entry_link(row: &Row<'_>) -> RepoResult<EntryLink> {
    Ok(EntryLink::new(
        Slashlink::local(parse_slug(row)?),
        row.get::<_, String>("title")?,
    ))
}

fn parse_slug(row: &Row<'_>) -> RepoResult<Slug> {
    let value: String = row.get("slug")?;
    Slug::new(&value)
        .ok_or_else(|| RepoError::InvalidData(format!("invalid slug `{value}` in entry.slug")))
}

fn size_from_db(value: i64) -> RepoResult<u64> {
    u64::try_from(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid size `{value}` in entry.size")))
}
