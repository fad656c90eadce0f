//! Petnames: locally assigned, possibly hierarchical names for spheres.
//!
//! # Invariants
//! - A `Petname` has at least one `Name` segment.
//! - Segments are ordered leaf-first: `alice.bob` is "alice, as named by bob".
//! - Identity is the lowercase form; `verbatim` is kept for display only.

use super::slashlink::{Peer, Slashlink};
use super::slug::Slug;
use super::{format_path, AddressParseError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

static NAME_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[\w\-]+$").expect("valid name regex"));
static TRAILING_NUMBER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(.*)-([0-9]+)$").expect("valid trailing number regex"));

const UNNAMED: &str = "unnamed";

/// One segment of a petname.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name {
    verbatim: String,
    normalized: String,
}

impl Name {
    /// Validates a single segment. Dots, whitespace and punctuation other
    /// than `-`/`_` are rejected.
    pub fn new(value: &str) -> Option<Self> {
        if !NAME_RE.is_match(value) {
            return None;
        }
        Some(Self {
            verbatim: value.to_string(),
            normalized: value.to_lowercase(),
        })
    }

    /// Formats free text into a valid name, falling back to `unnamed`.
    pub fn format(text: &str) -> Self {
        let formatted = format_path(&text.replace('.', " "), '.');
        Self::new(&formatted).unwrap_or_else(Self::unnamed)
    }

    fn unnamed() -> Self {
        Self {
            verbatim: UNNAMED.to_string(),
            normalized: UNNAMED.to_string(),
        }
    }

    pub fn verbatim(&self) -> &str {
        &self.verbatim
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Returns the next name in the `name`, `name-1`, `name-2`, ... series.
    ///
    /// Used to pick a fresh petname when the preferred one is taken.
    pub fn increment(&self) -> Self {
        let next = match TRAILING_NUMBER_RE.captures(&self.verbatim) {
            Some(caps) => match caps[2].parse::<u64>().ok().and_then(|n| n.checked_add(1)) {
                Some(number) => format!("{}-{number}", &caps[1]),
                None => format!("{}-1", self.verbatim),
            },
            None if self.verbatim.ends_with('-') => format!("{}1", self.verbatim),
            None => format!("{}-1", self.verbatim),
        };
        Self {
            normalized: next.to_lowercase(),
            verbatim: next,
        }
    }
}

impl PartialEq for Name {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Name {}

impl Hash for Name {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for Name {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Name {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

impl Display for Name {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized)
    }
}

impl FromStr for Name {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| AddressParseError::new("petname segment", s))
    }
}

impl TryFrom<String> for Name {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Name> for String {
    fn from(value: Name) -> Self {
        value.verbatim
    }
}

/// Dot-separated, leaf-first path of names: `leaf.{...}.root`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Petname {
    names: Vec<Name>,
}

impl Petname {
    /// Parses a dot-separated petname. Empty segments are invalid.
    pub fn new(value: &str) -> Option<Self> {
        let names = value
            .split('.')
            .map(Name::new)
            .collect::<Option<Vec<_>>>()?;
        Self::from_names(names)
    }

    /// Builds a petname from segments; `None` when `names` is empty.
    pub fn from_names(names: Vec<Name>) -> Option<Self> {
        if names.is_empty() {
            None
        } else {
            Some(Self { names })
        }
    }

    /// Formats free text into a valid petname, falling back to `unnamed`.
    pub fn format(text: &str) -> Self {
        let formatted = format_path(text, '.');
        Self::new(&formatted).unwrap_or_else(|| Self {
            names: vec![Name::unnamed()],
        })
    }

    pub fn names(&self) -> &[Name] {
        &self.names
    }

    /// First segment: the name closest to the linked sphere.
    pub fn leaf(&self) -> &Name {
        &self.names[0]
    }

    /// Last segment: the name as it appears in the resolving sphere.
    pub fn root(&self) -> &Name {
        &self.names[self.names.len() - 1]
    }

    pub fn depth(&self) -> usize {
        self.names.len()
    }

    /// Concatenates `other` after this petname's segments.
    ///
    /// `alice.append(bob)` is `alice.bob`: alice as seen through bob.
    pub fn append(&self, other: &Petname) -> Petname {
        let mut names = self.names.clone();
        names.extend(other.names.iter().cloned());
        Self { names }
    }

    /// Increments the leaf segment (`ziggy.bob` -> `ziggy-1.bob`).
    pub fn increment(&self) -> Petname {
        let mut names = self.names.clone();
        names[0] = self.leaf().increment();
        Self { names }
    }

    /// Link to this peer's profile, `@petname/_profile_`.
    pub fn to_slashlink(&self) -> Slashlink {
        Slashlink::new_with_peer(Some(Peer::Petname(self.clone())), Slug::profile())
    }

    pub fn verbatim(&self) -> String {
        self.join(Name::verbatim)
    }

    pub fn normalized(&self) -> String {
        self.join(Name::normalized)
    }

    fn join(&self, part: fn(&Name) -> &str) -> String {
        self.names.iter().map(part).collect::<Vec<_>>().join(".")
    }
}

impl Display for Petname {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.normalized())
    }
}

impl FromStr for Petname {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| AddressParseError::new("petname", s))
    }
}

impl TryFrom<String> for Petname {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Petname> for String {
    fn from(value: Petname) -> Self {
        value.verbatim()
    }
}

#[cfg(test)]
mod tests {
    use super::{Name, Petname};

    #[test]
    fn name_keeps_verbatim_and_normalizes_for_identity() {
        let upper = Name::new("Ziggy").unwrap();
        let lower = Name::new("ziggy").unwrap();
        assert_eq!(upper, lower);
        assert_eq!(upper.normalized(), lower.normalized());
        assert_ne!(upper.verbatim(), lower.verbatim());
    }

    #[test]
    fn name_rejects_dots_whitespace_and_punctuation() {
        for input in ["", " ", " ziggy", "zig gy", "zig.gy", "zig!", "@ziggy"] {
            assert!(Name::new(input).is_none(), "{input:?}");
        }
        assert!(Name::new("zïggy_star-dust").is_some());
    }

    #[test]
    fn increment_follows_numeric_series() {
        let cases = [
            ("ziggy", "ziggy-1"),
            ("ziggy-1", "ziggy-2"),
            ("ziggy-9", "ziggy-10"),
            ("name-", "name-1"),
            ("name999", "name999-1"),
            ("a-b-3", "a-b-4"),
        ];
        for (input, expected) in cases {
            let name = Name::new(input).unwrap();
            assert_eq!(name.increment().verbatim(), expected, "{input}");
        }
    }

    #[test]
    fn increment_preserves_verbatim_case() {
        let name = Name::new("Ziggy-2").unwrap();
        let next = name.increment();
        assert_eq!(next.verbatim(), "Ziggy-3");
        assert_eq!(next.normalized(), "ziggy-3");
    }

    #[test]
    fn petname_parses_dot_separated_segments_leaf_first() {
        let petname = Petname::new("alice.Bob.carol").unwrap();
        assert_eq!(petname.depth(), 3);
        assert_eq!(petname.leaf().verbatim(), "alice");
        assert_eq!(petname.root().verbatim(), "carol");
        assert_eq!(petname.verbatim(), "alice.Bob.carol");
        assert_eq!(petname.to_string(), "alice.bob.carol");
    }

    #[test]
    fn petname_rejects_empty_segments() {
        for input in ["", ".", "a..b", ".a", "a.", "a. b"] {
            assert!(Petname::new(input).is_none(), "{input:?}");
        }
    }

    #[test]
    fn append_concatenates_leaf_first() {
        let alice = Petname::new("alice").unwrap();
        let bob_carol = Petname::new("bob.carol").unwrap();
        assert_eq!(alice.append(&bob_carol), Petname::new("alice.bob.carol").unwrap());
    }

    #[test]
    fn petname_increment_bumps_leaf_only() {
        let petname = Petname::new("ziggy.bob").unwrap();
        assert_eq!(petname.increment().verbatim(), "ziggy-1.bob");
    }

    #[test]
    fn format_is_total_and_idempotent() {
        for input in ["Alice B. Toklas", "  ", "...", "Ñoño", "bob.carol", "@#$"] {
            let once = Petname::format(input);
            assert_eq!(Petname::format(&once.verbatim()), once, "{input:?}");
        }
        assert_eq!(Petname::format("Alice B. Toklas").verbatim(), "alice-b.toklas");
        assert_eq!(Petname::format("@#$").verbatim(), "unnamed");
        assert_eq!(Name::format("Alice B. Toklas").verbatim(), "alice-b-toklas");
    }

    #[test]
    fn to_slashlink_points_at_profile() {
        let petname = Petname::new("alice").unwrap();
        assert_eq!(petname.to_slashlink().to_string(), "@alice/_profile_");
    }
}
