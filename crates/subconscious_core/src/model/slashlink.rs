//! Slashlinks: complete note addresses with an optional peer.
//!
//! # Responsibility
//! - Parse `/slug`, `@petname/slug` and `did:method:id/slug` addresses.
//! - Rebase links discovered inside another sphere onto the reader's view.
//!
//! # Invariants
//! - `peer == None` means the reader's own sphere.
//! - `description()` lowercases the petname only; slugs keep their casing.

use super::did::Did;
use super::petname::Petname;
use super::slug::Slug;
use super::AddressParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static SLASHLINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(?:@(?P<petname>[\w\-]+(?:\.[\w\-]+)*)|(?P<did>did:[a-z0-9]+:(?:[A-Za-z0-9_.%\-]*:)*[A-Za-z0-9_.%\-]+))?/(?P<slug>[\w\-]+(?:/[\w\-]+)*)$",
    )
    .expect("valid slashlink regex")
});

/// Who a slashlink points at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Peer {
    /// Absolute reference to one identity.
    Did(Did),
    /// Relative reference resolved through petname tables.
    Petname(Petname),
}

impl Peer {
    pub fn is_absolute(&self) -> bool {
        matches!(self, Self::Did(_))
    }

    /// Peer as typed: `@Alice.Bob` or `did:key:...`.
    pub fn verbatim(&self) -> String {
        match self {
            Self::Did(did) => did.to_string(),
            Self::Petname(petname) => format!("@{}", petname.verbatim()),
        }
    }

    pub fn to_petname(&self) -> Option<&Petname> {
        match self {
            Self::Did(_) => None,
            Self::Petname(petname) => Some(petname),
        }
    }
}

impl Display for Peer {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Did(did) => write!(f, "{did}"),
            Self::Petname(petname) => write!(f, "@{petname}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slashlink {
    peer: Option<Peer>,
    slug: Slug,
}

impl Slashlink {
    /// Parses a slashlink; whitespace anywhere makes the input invalid.
    pub fn new(value: &str) -> Option<Self> {
        let caps = SLASHLINK_RE.captures(value)?;
        let slug = Slug::new(caps.name("slug")?.as_str())?;
        let peer = if let Some(petname) = caps.name("petname") {
            Some(Peer::Petname(Petname::new(petname.as_str())?))
        } else if let Some(did) = caps.name("did") {
            Some(Peer::Did(Did::new(did.as_str())?))
        } else {
            None
        };
        Some(Self { peer, slug })
    }

    pub fn new_with_peer(peer: Option<Peer>, slug: Slug) -> Self {
        Self { peer, slug }
    }

    /// Link into the reader's own sphere.
    pub fn local(slug: Slug) -> Self {
        Self { peer: None, slug }
    }

    pub fn peer(&self) -> Option<&Peer> {
        self.peer.as_ref()
    }

    pub fn slug(&self) -> &Slug {
        &self.slug
    }

    pub fn is_local(&self) -> bool {
        self.peer.is_none()
    }

    pub fn is_absolute(&self) -> bool {
        self.peer.as_ref().is_some_and(Peer::is_absolute)
    }

    pub fn to_petname(&self) -> Option<&Petname> {
        self.peer.as_ref().and_then(Peer::to_petname)
    }

    /// Same slug, different peer.
    pub fn with_peer(&self, peer: Option<Peer>) -> Self {
        Self {
            peer,
            slug: self.slug.clone(),
        }
    }

    /// Re-expresses a link found inside the sphere `base` from the reader's
    /// point of view.
    ///
    /// - `@alice/x` inside `@bob` becomes `@alice.bob/x`;
    /// - `/x` inside `@bob` becomes `@bob/x`;
    /// - `/x` inside `did:key:b` becomes `did:key:b/x`;
    /// - absolute links and links read from the own sphere are unchanged.
    pub fn rebase(&self, base: Option<&Peer>) -> Self {
        match (base, &self.peer) {
            (Some(Peer::Petname(base)), Some(Peer::Petname(petname))) => {
                self.with_peer(Some(Peer::Petname(petname.append(base))))
            }
            (Some(base), None) => self.with_peer(Some(base.clone())),
            _ => self.clone(),
        }
    }

    /// Address as typed.
    pub fn verbatim(&self) -> String {
        match &self.peer {
            Some(peer) => format!("{}/{}", peer.verbatim(), self.slug.verbatim()),
            None => format!("/{}", self.slug.verbatim()),
        }
    }

    /// Canonical display form: lowercase petname, slug as typed.
    pub fn description(&self) -> String {
        match &self.peer {
            Some(peer) => format!("{peer}/{}", self.slug.verbatim()),
            None => format!("/{}", self.slug.verbatim()),
        }
    }

    /// Fully lowercased form used as an index key.
    pub fn normalized(&self) -> String {
        match &self.peer {
            Some(peer) => format!("{peer}/{}", self.slug.normalized()),
            None => format!("/{}", self.slug.normalized()),
        }
    }
}

impl Display for Slashlink {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.description())
    }
}

impl FromStr for Slashlink {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| AddressParseError::new("slashlink", s))
    }
}

impl TryFrom<String> for Slashlink {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Slashlink> for String {
    fn from(value: Slashlink) -> Self {
        value.verbatim()
    }
}
