use std::cell::Cell;
use subconscious_core::model::petname::Name;
use subconscious_core::resolver::LookupError;
use subconscious_core::{
    resolve_link, Did, MemoryPetnameTable, Peer, Petname, PetnameTable, ResolutionError,
    ResolverConfig, Slashlink,
};

fn did(id: &str) -> Did {
    Did::new(&format!("did:key:{id}")).unwrap()
}

fn name(value: &str) -> Name {
    Name::new(value).unwrap()
}

/// Table that counts lookups and can be switched to fail.
struct CountingTable {
    inner: MemoryPetnameTable,
    calls: Cell<usize>,
    failing: bool,
}

impl PetnameTable for CountingTable {
    fn lookup(&self, sphere: &Did, name: &Name) -> Result<Option<Did>, LookupError> {
        self.calls.set(self.calls.get() + 1);
        if self.failing {
            return Err(LookupError::new("gateway timeout"));
        }
        self.inner.lookup(sphere, name)
    }
}

fn cyclic_table() -> MemoryPetnameTable {
    let mut table = MemoryPetnameTable::new();
    table.insert(did("me"), name("ping"), did("ping"));
    table.insert(did("ping"), name("pong"), did("pong"));
    table.insert(did("pong"), name("ping"), did("ping"));
    table
}

#[test]
fn cyclic_petnames_resolve_within_the_bound() {
    let table = cyclic_table();
    let link = Slashlink::new("@pong.ping.pong.ping/notes").unwrap();
    let resolved = resolve_link(&did("me"), &link, &table, &ResolverConfig::default()).unwrap();
    assert_eq!(resolved.owner, did("pong"));
}

#[test]
fn overlong_petname_fails_without_lookups() {
    let table = CountingTable {
        inner: cyclic_table(),
        calls: Cell::new(0),
        failing: false,
    };
    let segments = ["pong", "ping"].repeat(9).join(".");
    let link = Slashlink::new(&format!("@{segments}/notes")).unwrap();

    let err = resolve_link(&did("me"), &link, &table, &ResolverConfig::default()).unwrap_err();
    assert_eq!(err, ResolutionError::DepthExceeded { depth: 18, max: 16 });
    assert_eq!(table.calls.get(), 0);
}

#[test]
fn one_lookup_per_segment() {
    let table = CountingTable {
        inner: cyclic_table(),
        calls: Cell::new(0),
        failing: false,
    };
    let link = Slashlink::new("@ping.pong.ping/notes").unwrap();
    let resolved = resolve_link(&did("me"), &link, &table, &ResolverConfig::default()).unwrap();
    assert_eq!(resolved.owner, did("ping"));
    assert_eq!(table.calls.get(), 3);
}

#[test]
fn lookup_failures_are_transient() {
    let table = CountingTable {
        inner: MemoryPetnameTable::new(),
        calls: Cell::new(0),
        failing: true,
    };
    let link = Slashlink::new("@bob/notes").unwrap();
    let err = resolve_link(&did("me"), &link, &table, &ResolverConfig::default()).unwrap_err();
    assert!(matches!(err, ResolutionError::Lookup(_)));
    assert!(err.is_transient());
}

#[test]
fn petname_lookup_ignores_case() {
    let mut table = MemoryPetnameTable::new();
    table.insert(did("me"), name("Bob"), did("bob"));
    let link = Slashlink::new("@BOB/Notes").unwrap();
    let resolved = resolve_link(&did("me"), &link, &table, &ResolverConfig::default()).unwrap();
    assert_eq!(resolved.slashlink.to_string(), "did:key:bob/Notes");
}

#[test]
fn rebased_link_resolves_through_the_base_sphere() {
    let mut table = MemoryPetnameTable::new();
    table.insert(did("me"), name("bob"), did("bob"));
    table.insert(did("bob"), name("alice"), did("alice"));

    // `@alice/garden` was found while reading @bob's notes.
    let base = Peer::Petname(Petname::new("bob").unwrap());
    let link = Slashlink::new("@alice/garden").unwrap().rebase(Some(&base));

    let resolved = resolve_link(&did("me"), &link, &table, &ResolverConfig::default()).unwrap();
    assert_eq!(resolved.owner, did("alice"));

    let local_in_bob = Slashlink::new("/garden").unwrap().rebase(Some(&base));
    let resolved =
        resolve_link(&did("me"), &local_in_bob, &table, &ResolverConfig::default()).unwrap();
    assert_eq!(resolved.owner, did("bob"));
}
