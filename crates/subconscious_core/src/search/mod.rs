//! Full-text search entry points.
//!
//! # Responsibility
//! - Expose query APIs backed by the `entry_search` FTS5 index.
//! - Keep search result shaping inside core.

pub mod fts;

pub use fts::{search_entries, SearchError, SearchHit, SearchQuery, SearchResult};
