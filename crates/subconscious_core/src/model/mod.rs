//! Addressing model: identities, names, slugs and links.
//!
//! # Responsibility
//! - Define validated value types used to address notes locally and across
//!   spheres (`Did`, `Petname`, `Slug`, `Slashlink`, `Peer`).
//! - Provide total formatters that turn free text into valid names.
//!
//! # Invariants
//! - Constructors never panic; invalid input yields `None`.
//! - Equality and hashing use the normalized (lowercase) form, except for
//!   `Did`, which compares its exact string.
//! - Values are immutable once constructed.

use once_cell::sync::Lazy;
use regex::Regex;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod did;
pub mod entry;
pub mod memo;
pub mod petname;
pub mod slashlink;
pub mod slug;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));
static DISALLOWED_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\-]").expect("valid disallowed-char regex"));
static HYPHEN_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"-{2,}").expect("valid hyphen regex"));

/// Error returned by `FromStr` implementations of address types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressParseError {
    /// Address kind that failed to parse (`did`, `slug`, ...).
    pub kind: &'static str,
    /// Offending input.
    pub input: String,
}

impl AddressParseError {
    pub(crate) fn new(kind: &'static str, input: &str) -> Self {
        Self {
            kind,
            input: input.to_string(),
        }
    }
}

impl Display for AddressParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "invalid {}: `{}`", self.kind, self.input)
    }
}

impl Error for AddressParseError {}

/// Formats free text into `separator`-joined path segments.
///
/// Each segment is lowercased, whitespace runs become `-`, characters other
/// than word characters and `-` are dropped, `-` runs collapse and segment
/// edges are trimmed. Empty segments are removed and leading hidden markers
/// (`_`) are stripped from the result. May return an empty string.
pub(crate) fn format_path(text: &str, separator: char) -> String {
    let lowered = text.to_lowercase();
    let segments = lowered
        .split(separator)
        .map(|raw| {
            let hyphenated = WHITESPACE_RE.replace_all(raw.trim(), "-");
            let stripped = DISALLOWED_RE.replace_all(&hyphenated, "");
            let collapsed = HYPHEN_RUN_RE.replace_all(&stripped, "-");
            collapsed.trim_matches('-').to_string()
        })
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();

    segments
        .join(&separator.to_string())
        .trim_start_matches(|c| c == '_' || c == '-' || c == separator)
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::format_path;

    #[test]
    fn format_path_collapses_whitespace_and_strips_punctuation() {
        assert_eq!(
            format_path("  The Whale, the  whale! ", '/'),
            "the-whale-the-whale"
        );
        assert_eq!(format_path("a -- b", '/'), "a-b");
    }

    #[test]
    fn format_path_drops_empty_segments_and_hidden_markers() {
        assert_eq!(format_path("_foo//bar/", '/'), "foo/bar");
        assert_eq!(format_path("__/-_x", '/'), "x");
        assert_eq!(format_path("alice..bob.", '.'), "alice.bob");
    }

    #[test]
    fn format_path_keeps_interior_underscores_and_diacritics() {
        assert_eq!(format_path("Snake_Case Éclair", '/'), "snake_case-éclair");
    }

    #[test]
    fn format_path_can_be_empty() {
        assert_eq!(format_path("!!! ???", '/'), "");
    }

    #[test]
    fn format_path_is_idempotent() {
        for input in [
            "Hello World",
            "_hidden/_path",
            "--a--b--",
            "über straße/ünïcode",
            "x.y z",
            "",
        ] {
            let once = format_path(input, '/');
            assert_eq!(format_path(&once, '/'), once, "input {input:?}");
        }
    }
}
