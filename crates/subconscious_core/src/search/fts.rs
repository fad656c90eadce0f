//! SQLite FTS5 search over indexed entries.
//!
//! # Invariants
//! - Hidden slugs are excluded unless the query asks for them.
//! - Result ordering is deterministic: rank, then `modified` desc, then slug.
//! - Escaped queries never surface FTS5 syntax errors.

use crate::db::DbError;
use crate::model::entry::EntryLink;
use crate::model::slashlink::Slashlink;
use crate::model::slug::Slug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type SearchResult<T> = Result<T, SearchError>;

#[derive(Debug)]
pub enum SearchError {
    /// Raw query text rejected by the FTS5 parser.
    InvalidQuery {
        query: String,
        message: String,
    },
    Db(DbError),
    InvalidData(String),
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { query, message } => {
                write!(f, "invalid full-text query `{query}`: {message}")
            }
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid search row: {message}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::InvalidQuery { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<DbError> for SearchError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for SearchError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub limit: u32,
    pub include_hidden: bool,
    /// Match each term as a prefix, for type-as-you-search.
    pub prefix: bool,
    /// Pass `text` through as a raw FTS5 expression.
    pub raw_fts_syntax: bool,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            limit: 20,
            include_hidden: false,
            prefix: false,
            raw_fts_syntax: false,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_prefix(mut self) -> Self {
        self.prefix = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub link: EntryLink,
    pub snippet: String,
}

/// Searches titles and bodies; blank queries return no hits.
pub fn search_entries(conn: &Connection, query: &SearchQuery) -> SearchResult<Vec<SearchHit>> {
    let Some(match_expr) = build_match_expression(query) else {
        return Ok(Vec::new());
    };
    if query.limit == 0 {
        return Ok(Vec::new());
    }

    let mut sql = String::from(
        "SELECT
            entry.slug AS slug,
            entry.title AS title,
            snippet(entry_search, 2, '[', ']', ' ... ', 10) AS snippet
         FROM entry_search
         JOIN entry ON entry.rowid = entry_search.rowid
         WHERE entry_search MATCH ?",
    );
    let mut bind_values: Vec<Value> = vec![Value::Text(match_expr.clone())];

    if !query.include_hidden {
        sql.push_str(" AND entry.slug NOT LIKE '\\_%' ESCAPE '\\'");
    }
    sql.push_str(" ORDER BY bm25(entry_search), entry.modified DESC, entry.slug ASC LIMIT ?");
    bind_values.push(Value::Integer(i64::from(query.limit)));

    let mut stmt = conn.prepare(&sql)?;
    let mut rows = stmt
        .query(params_from_iter(bind_values))
        .map_err(|err| map_query_error(err, &match_expr))?;
    let mut hits = Vec::new();
    while let Some(row) = rows
        .next()
        .map_err(|err| map_query_error(err, &match_expr))?
    {
        hits.push(parse_search_hit(row)?);
    }
    Ok(hits)
}

fn parse_search_hit(row: &Row<'_>) -> SearchResult<SearchHit> {
    let slug_text: String = row.get("slug")?;
    let slug = Slug::new(&slug_text)
        .ok_or_else(|| SearchError::InvalidData(format!("invalid slug `{slug_text}`")))?;
    Ok(SearchHit {
        link: EntryLink::new(Slashlink::local(slug), row.get::<_, String>("title")?),
        snippet: row.get("snippet")?,
    })
}

fn build_match_expression(query: &SearchQuery) -> Option<String> {
    let text = query.text.trim();
    if text.is_empty() {
        return None;
    }
    if query.raw_fts_syntax {
        return Some(text.to_string());
    }

    let terms = text
        .split_whitespace()
        .map(|term| escape_fts_term(term, query.prefix))
        .collect::<Vec<_>>();
    if terms.is_empty() {
        return None;
    }
    Some(terms.join(" AND "))
}

fn escape_fts_term(raw: &str, prefix: bool) -> String {
    let escaped = raw.replace('"', "\"\"");
    if prefix {
        format!("\"{escaped}\"*")
    } else {
        format!("\"{escaped}\"")
    }
}

fn map_query_error(err: rusqlite::Error, query: &str) -> SearchError {
    if is_match_syntax_error(&err) {
        return SearchError::InvalidQuery {
            query: query.to_string(),
            message: err.to_string(),
        };
    }
    SearchError::Db(DbError::Sqlite(err))
}

fn is_match_syntax_error(err: &rusqlite::Error) -> bool {
    match err {
        rusqlite::Error::SqliteFailure(_, Some(message)) => {
            let msg = message.to_lowercase();
            (msg.contains("fts5") && msg.contains("syntax"))
                || msg.contains("malformed match expression")
                || msg.contains("unterminated")
        }
        _ => false,
    }
}
