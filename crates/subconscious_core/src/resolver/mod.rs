//! Petname resolution across nested spheres.
//!
//! # Responsibility
//! - Turn a relative slashlink into an absolute one owned by a `Did`.
//!
//! # Invariants
//! - Traversal starts at the root segment (named by the resolving sphere)
//!   and ends at the leaf; one table lookup per segment.
//! - Paths longer than `ResolverConfig::max_depth` are rejected before any
//!   lookup is made.
//! - Resolution is read-only.

mod table;

pub use table::{LookupError, MemoryPetnameTable, PetnameTable};

use crate::config::ResolverConfig;
use crate::model::did::Did;
use crate::model::petname::{Name, Petname};
use crate::model::slashlink::{Peer, Slashlink};
use log::debug;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// A slashlink pinned to the identity that owns it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAddress {
    pub owner: Did,
    /// Same slug, peer replaced with `Peer::Did(owner)`.
    pub slashlink: Slashlink,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    /// `sphere` has no entry for `segment` of `petname`.
    NotFound {
        petname: Petname,
        segment: Name,
        sphere: Did,
    },
    DepthExceeded {
        depth: usize,
        max: usize,
    },
    Lookup(LookupError),
}

impl ResolutionError {
    /// Only collaborator failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Lookup(_))
    }
}

impl Display for ResolutionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound {
                petname,
                segment,
                sphere,
            } => write!(
                f,
                "petname `{petname}` not found: `{segment}` is unknown to {sphere}"
            ),
            Self::DepthExceeded { depth, max } => {
                write!(f, "petname depth {depth} exceeds maximum {max}")
            }
            Self::Lookup(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResolutionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lookup(err) => Some(err),
            _ => None,
        }
    }
}

impl From<LookupError> for ResolutionError {
    fn from(value: LookupError) -> Self {
        Self::Lookup(value)
    }
}

/// Resolves `link`, read from the sphere `context`, to its owning identity.
pub fn resolve_link(
    context: &Did,
    link: &Slashlink,
    table: &impl PetnameTable,
    config: &ResolverConfig,
) -> Result<ResolvedAddress, ResolutionError> {
    let owner = match link.peer() {
        None => context.clone(),
        Some(Peer::Did(did)) => did.clone(),
        Some(Peer::Petname(petname)) => resolve_petname(context, petname, table, config)?,
    };
    debug!(
        "event=resolve_link module=resolver status=ok link={} owner={}",
        link, owner
    );
    Ok(ResolvedAddress {
        slashlink: link.with_peer(Some(Peer::Did(owner.clone()))),
        owner,
    })
}

/// Walks `petname` from its root to its leaf, starting in `context`.
pub fn resolve_petname(
    context: &Did,
    petname: &Petname,
    table: &impl PetnameTable,
    config: &ResolverConfig,
) -> Result<Did, ResolutionError> {
    let depth = petname.depth();
    if depth > config.max_depth {
        debug!(
            "event=resolve_petname module=resolver status=depth_exceeded depth={} max={}",
            depth, config.max_depth
        );
        return Err(ResolutionError::DepthExceeded {
            depth,
            max: config.max_depth,
        });
    }

    let mut current = context.clone();
    for segment in petname.names().iter().rev() {
        match table.lookup(&current, segment)? {
            Some(next) => current = next,
            None => {
                debug!(
                    "event=resolve_petname module=resolver status=not_found petname={} segment={}",
                    petname, segment
                );
                return Err(ResolutionError::NotFound {
                    petname: petname.clone(),
                    segment: segment.clone(),
                    sphere: current,
                });
            }
        }
    }
    Ok(current)
}

#[cfg(test)]
mod tests {
    use super::{resolve_link, MemoryPetnameTable, ResolutionError};
    use crate::config::ResolverConfig;
    use crate::model::did::Did;
    use crate::model::petname::Name;
    use crate::model::slashlink::Slashlink;

    fn did(id: &str) -> Did {
        Did::new(&format!("did:key:{id}")).unwrap()
    }

    #[test]
    fn local_and_absolute_links_need_no_lookups() {
        let table = MemoryPetnameTable::new();
        let config = ResolverConfig::default();

        let local = resolve_link(&did("me"), &Slashlink::new("/foo").unwrap(), &table, &config)
            .unwrap();
        assert_eq!(local.owner, did("me"));
        assert_eq!(local.slashlink.to_string(), "did:key:me/foo");

        let absolute = Slashlink::new("did:key:other/foo").unwrap();
        let resolved = resolve_link(&did("me"), &absolute, &table, &config).unwrap();
        assert_eq!(resolved.owner, did("other"));
    }

    #[test]
    fn two_hop_petname_walks_root_first() {
        let mut table = MemoryPetnameTable::new();
        table.insert(did("me"), Name::new("bob").unwrap(), did("bob"));
        table.insert(did("bob"), Name::new("alice").unwrap(), did("alice"));

        let link = Slashlink::new("@alice.bob/notes").unwrap();
        let resolved =
            resolve_link(&did("me"), &link, &table, &ResolverConfig::default()).unwrap();
        assert_eq!(resolved.owner, did("alice"));
        assert_eq!(resolved.slashlink.to_string(), "did:key:alice/notes");
    }

    #[test]
    fn missing_hop_reports_segment() {
        let mut table = MemoryPetnameTable::new();
        table.insert(did("me"), Name::new("bob").unwrap(), did("bob"));

        let link = Slashlink::new("@alice.bob/notes").unwrap();
        let err = resolve_link(&did("me"), &link, &table, &ResolverConfig::default())
            .unwrap_err();
        match err {
            ResolutionError::NotFound { segment, sphere, .. } => {
                assert_eq!(segment.normalized(), "alice");
                assert_eq!(sphere, did("bob"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn depth_bound_is_enforced() {
        let table = MemoryPetnameTable::new();
        let link = Slashlink::new("@a.b.c/notes").unwrap();
        let err = resolve_link(&did("me"), &link, &table, &ResolverConfig { max_depth: 2 })
            .unwrap_err();
        assert_eq!(err, ResolutionError::DepthExceeded { depth: 3, max: 2 });
        assert!(!err.is_transient());
    }
}
