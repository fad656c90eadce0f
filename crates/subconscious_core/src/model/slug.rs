//! Slugs: path-like identifiers of single notes within a sphere.
//!
//! # Invariants
//! - Grammar: `segment *("/" segment)`, segment = word characters and `-`.
//! - A slug whose first character is `_` is hidden (system/internal).
//! - Identity is the lowercase form; `verbatim` keeps the typed casing.

use super::{format_path, AddressParseError};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::hash::{Hash, Hasher};
use std::str::FromStr;

static SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[\w\-]+(?:/[\w\-]+)*$").expect("valid slug regex"));

const PROFILE: &str = "_profile_";
const UNTITLED: &str = "untitled";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Slug {
    verbatim: String,
    normalized: String,
}

impl Slug {
    pub fn new(value: &str) -> Option<Self> {
        if !SLUG_RE.is_match(value) {
            return None;
        }
        Some(Self {
            verbatim: value.to_string(),
            normalized: value.to_lowercase(),
        })
    }

    /// Accepts only slugs that are not hidden.
    pub fn visible(value: &str) -> Option<Self> {
        Self::new(value).filter(|slug| !slug.is_hidden())
    }

    /// Prefixes one more `_` than `value` already carries.
    pub fn hidden(value: &str) -> Option<Self> {
        Self::new(&format!("_{value}"))
    }

    /// Formats free text (usually a title) into a visible slug.
    ///
    /// Total: falls back to `untitled` when no valid characters remain.
    pub fn format(text: &str) -> Self {
        let formatted = format_path(text, '/');
        Self::new(&formatted).unwrap_or_else(Self::untitled)
    }

    pub fn untitled() -> Self {
        Self {
            verbatim: UNTITLED.to_string(),
            normalized: UNTITLED.to_string(),
        }
    }

    /// Hidden slug holding a sphere's profile.
    pub fn profile() -> Self {
        Self {
            verbatim: PROFILE.to_string(),
            normalized: PROFILE.to_string(),
        }
    }

    pub fn is_hidden(&self) -> bool {
        self.verbatim.starts_with('_')
    }

    pub fn is_profile(&self) -> bool {
        self.normalized == PROFILE
    }

    pub fn verbatim(&self) -> &str {
        &self.verbatim
    }

    pub fn normalized(&self) -> &str {
        &self.normalized
    }

    /// Slash-separated path segments.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.verbatim.split('/')
    }
}

impl PartialEq for Slug {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Slug {}

impl Hash for Slug {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized.hash(state);
    }
}

impl PartialOrd for Slug {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Slug {
    fn cmp(&self, other: &Self) -> Ordering {
        self.normalized.cmp(&other.normalized)
    }
}

/// Displays the slug as typed; slugs derived from titles may carry casing.
impl Display for Slug {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.verbatim)
    }
}

impl FromStr for Slug {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| AddressParseError::new("slug", s))
    }
}

impl TryFrom<String> for Slug {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Slug> for String {
    fn from(value: Slug) -> Self {
        value.verbatim
    }
}

#[cfg(test)]
mod tests {
    use super::Slug;

    #[test]
    fn accepts_nested_and_unicode_slugs() {
        for input in ["foo", "foo/bar", "foo-bar_baz", "Über/straße", "2024-01-01"] {
            assert!(Slug::new(input).is_some(), "{input}");
        }
    }

    #[test]
    fn rejects_malformed_slugs() {
        for input in ["", "/foo", "foo/", "foo//bar", "foo bar", " foo", "foo.bar", "@foo"] {
            assert!(Slug::new(input).is_none(), "{input:?}");
        }
    }

    #[test]
    fn casing_variants_share_identity() {
        let a = Slug::new("The-Whale").unwrap();
        let b = Slug::new("the-whale").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.normalized(), b.normalized());
        assert_ne!(a.verbatim(), b.verbatim());
        assert_eq!(a.to_string(), "The-Whale");
    }

    #[test]
    fn visible_rejects_hidden_slugs() {
        assert!(Slug::visible("_secret").is_none());
        assert!(Slug::visible("public").is_some());
    }

    #[test]
    fn hidden_always_adds_one_marker() {
        assert_eq!(Slug::hidden("notes").unwrap().verbatim(), "_notes");
        assert_eq!(Slug::hidden("_notes").unwrap().verbatim(), "__notes");
        assert!(Slug::hidden("notes").unwrap().is_hidden());
    }

    #[test]
    fn format_produces_visible_slug() {
        assert_eq!(
            Slug::format("Ye three unsurrendered spires of mine").verbatim(),
            "ye-three-unsurrendered-spires-of-mine"
        );
        assert_eq!(Slug::format("_hidden thing").verbatim(), "hidden-thing");
        assert_eq!(Slug::format("Journal / 2024 / June").verbatim(), "journal/2024/june");
        assert_eq!(Slug::format("?!").verbatim(), "untitled");
    }

    #[test]
    fn format_is_idempotent() {
        for input in ["The Whale, the whale!", "  __x__  ", "a//b", "Ça va?", ""] {
            let once = Slug::format(input);
            let twice = Slug::format(once.verbatim());
            assert_eq!(once.verbatim(), twice.verbatim(), "{input:?}");
        }
    }

    #[test]
    fn profile_is_hidden() {
        assert!(Slug::profile().is_hidden());
        assert!(Slug::profile().is_profile());
        assert_eq!(Slug::new("_profile_"), Some(Slug::profile()));
    }
}
