//! Document headers: `Name: value` lines at the top of a note.
//!
//! # Invariants
//! - Header names match `[A-Za-z0-9-]+`; lookups are case-insensitive.
//! - Malformed header lines are dropped, never fatal.
//! - Header order is preserved.

use super::tape::Tape;
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};

pub const CONTENT_TYPE: &str = "Content-Type";
pub const TITLE: &str = "Title";
pub const CREATED: &str = "Created";
pub const MODIFIED: &str = "Modified";
pub const FILE_EXTENSION: &str = "File-Extension";

/// Well-known header names, in the order they are written.
pub const WELL_KNOWN: [&str; 5] = [CONTENT_TYPE, TITLE, CREATED, MODIFIED, FILE_EXTENSION];

static HEADER_NAME_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-]+$").expect("valid header name regex"));
static HEADER_SHAPE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z0-9\-]+:").expect("valid header shape regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    /// Creates a header; `None` when `name` is outside the header alphabet or
    /// `value` spans lines.
    pub fn new(name: &str, value: &str) -> Option<Self> {
        if !HEADER_NAME_RE.is_match(name) || value.contains(['\n', '\r']) {
            return None;
        }
        Some(Self {
            name: name.to_string(),
            value: value.to_string(),
        })
    }

    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

impl Display for Header {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{}: {}", self.name, self.value)
    }
}

/// Ordered header list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(Vec<Header>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Header> {
        self.0.iter()
    }

    pub fn push(&mut self, header: Header) {
        self.0.push(header);
    }

    /// First header with `name`, compared case-insensitively.
    pub fn first(&self, name: &str) -> Option<&Header> {
        self.0.iter().find(|header| header.is_named(name))
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.first(name).map(|header| header.value.as_str())
    }

    /// Replaces the first header named `name`, or appends one.
    pub fn set(&mut self, header: Header) {
        match self.0.iter_mut().find(|existing| existing.is_named(&header.name)) {
            Some(existing) => *existing = header,
            None => self.0.push(header),
        }
    }

    /// Removes every header named `name`.
    pub fn remove(&mut self, name: &str) {
        self.0.retain(|header| !header.is_named(name));
    }

    /// Headers that are not one of [`WELL_KNOWN`].
    pub fn without_well_known(&self) -> Headers {
        Headers(
            self.0
                .iter()
                .filter(|header| !WELL_KNOWN.iter().any(|name| header.is_named(name)))
                .cloned()
                .collect(),
        )
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get(CONTENT_TYPE)
    }

    pub fn title(&self) -> Option<&str> {
        self.get(TITLE)
    }

    pub fn created(&self) -> Option<&str> {
        self.get(CREATED)
    }

    pub fn modified(&self) -> Option<&str> {
        self.get(MODIFIED)
    }

    pub fn file_extension(&self) -> Option<&str> {
        self.get(FILE_EXTENSION)
    }
}

impl Display for Headers {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        self.0.iter().try_for_each(|header| write!(f, "{header}"))
    }
}

impl FromIterator<Header> for Headers {
    fn from_iter<T: IntoIterator<Item = Header>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

enum HeaderLine {
    Valid(Header),
    Malformed,
    NotHeader,
}

/// Parses the header block at the start of `tape`.
///
/// If the first line is not header-shaped nothing is consumed. Otherwise
/// lines are read until a blank line (consumed) or a line without `:` (left
/// for the body). The consumed header block is cut from the tape.
pub(crate) fn parse_headers(tape: &mut Tape<'_>) -> Headers {
    let mut headers = Headers::new();
    if !HEADER_SHAPE_RE.is_match(tape.rest()) {
        return headers;
    }

    while !tape.is_exhausted() {
        tape.save();
        let line = tape.consume_line();
        let content = trim_line_ending(line);
        if content.trim().is_empty() {
            break;
        }
        match parse_header_line(content) {
            HeaderLine::Valid(header) => headers.push(header),
            HeaderLine::Malformed => {
                debug!(
                    "event=header_dropped module=subtext status=skipped line_len={}",
                    content.len()
                );
            }
            HeaderLine::NotHeader => {
                tape.backtrack();
                break;
            }
        }
    }
    tape.cut();
    headers
}

fn parse_header_line(line: &str) -> HeaderLine {
    let Some((name, value)) = line.split_once(':') else {
        return HeaderLine::NotHeader;
    };
    let value = value.strip_prefix(' ').unwrap_or(value);
    match Header::new(name, value) {
        Some(header) => HeaderLine::Valid(header),
        None => HeaderLine::Malformed,
    }
}

fn trim_line_ending(line: &str) -> &str {
    let line = line.strip_suffix('\n').unwrap_or(line);
    line.strip_suffix('\r').unwrap_or(line)
}

#[cfg(test)]
mod tests {
    use super::{parse_headers, Header, Headers};
    use crate::subtext::tape::Tape;

    fn parse(input: &str) -> (Headers, &str) {
        let mut tape = Tape::new(input);
        let headers = parse_headers(&mut tape);
        (headers, tape.rest())
    }

    #[test]
    fn drops_malformed_header_lines() {
        let (headers, body) =
            parse("Content-Type: text/subtext\nMalformed header: X\nTitle: Y\n\nBody");
        assert_eq!(headers.len(), 2);
        assert_eq!(headers.content_type(), Some("text/subtext"));
        assert_eq!(headers.title(), Some("Y"));
        assert_eq!(body, "Body");
    }

    #[test]
    fn skips_headers_when_first_line_is_not_header_shaped() {
        let input = "Just some prose.\nTitle: not a header\n\nBody";
        let (headers, body) = parse(input);
        assert!(headers.is_empty());
        assert_eq!(body, input);
    }

    #[test]
    fn line_without_colon_ends_headers_without_being_consumed() {
        let (headers, body) = parse("Title: Hello\nFirst body line\nSecond");
        assert_eq!(headers.len(), 1);
        assert_eq!(body, "First body line\nSecond");
    }

    #[test]
    fn rejects_non_ascii_header_names() {
        let (headers, _) = parse("Title: ok\nTítulo: no\n\n");
        assert_eq!(headers.len(), 1);
    }

    #[test]
    fn value_keeps_inner_colons_and_trims_one_space() {
        let (headers, _) = parse("Created: 2023-01-01T00:00:00Z\nX-Note:  spaced\r\n\nBody");
        assert_eq!(headers.created(), Some("2023-01-01T00:00:00Z"));
        assert_eq!(headers.get("x-note"), Some(" spaced"));
    }

    #[test]
    fn headers_only_document_has_empty_body() {
        let (headers, body) = parse("Title: Only\n");
        assert_eq!(headers.title(), Some("Only"));
        assert_eq!(body, "");
    }

    #[test]
    fn first_is_case_insensitive_and_set_replaces() {
        let mut headers: Headers = [
            Header::new("Title", "One").unwrap(),
            Header::new("TITLE", "Two").unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(headers.first("title").map(|h| h.value.as_str()), Some("One"));

        headers.set(Header::new("title", "Three").unwrap());
        assert_eq!(headers.title(), Some("Three"));
        assert_eq!(headers.len(), 2);

        headers.remove("Title");
        assert!(headers.is_empty());
    }

    #[test]
    fn renders_back_to_header_lines() {
        let (headers, _) = parse("Content-Type: text/subtext\nTitle: Y\n\nBody");
        assert_eq!(headers.to_string(), "Content-Type: text/subtext\nTitle: Y\n");
    }

    #[test]
    fn header_new_rejects_bad_names_and_multiline_values() {
        assert!(Header::new("Bad Name", "x").is_none());
        assert!(Header::new("", "x").is_none());
        assert!(Header::new("Title", "a\nb").is_none());
    }
}
