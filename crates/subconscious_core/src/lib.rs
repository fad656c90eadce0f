//! Core library of the Subconscious notes engine.
//! Addressing, Subtext parsing, petname resolution and the local index live
//! here; hosts only wire storage and scheduling.

pub mod config;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod resolver;
pub mod search;
pub mod service;
pub mod subtext;
pub mod sync;

pub use config::{ConfigError, CoreConfig, ResolverConfig, SearchConfig, SyncConfig};
pub use db::{open_index, open_index_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::did::Did;
pub use model::entry::EntryLink;
pub use model::memo::Memo;
pub use model::petname::{Name, Petname};
pub use model::slashlink::{Peer, Slashlink};
pub use model::slug::Slug;
pub use model::AddressParseError;
pub use repo::{
    EntryListQuery, EntryOrigin, EntryRepository, IndexedEntry, RepoError, RepoResult,
    SqliteEntryRepository,
};
pub use resolver::{
    resolve_link, resolve_petname, MemoryPetnameTable, PetnameTable, ResolutionError,
    ResolvedAddress,
};
pub use search::{search_entries, SearchError, SearchHit, SearchQuery, SearchResult};
pub use service::{classify_rename, RenameError, RenameService, RenameSuggestion};
pub use subtext::{parse_document, Document, Subtext};
pub use sync::{
    sync_local_with_index, sync_sphere_with_index, ContentStore, MemoryContentStore, SyncError,
    SyncReport,
};

/// Health probe for host wiring.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
