//! Subtext document parsing.
//!
//! # Responsibility
//! - Split a note into its header block and Subtext body.
//! - Expose inline spans and outgoing links for indexing.
//!
//! # Invariants
//! - Parsing never fails; a `Document` renders back to its exact input.
//! - Parsers are pure functions over borrowed text.

pub mod block;
pub mod header;
pub mod inline;
pub mod tape;

pub use block::{Block, Subtext};
pub use header::{Header, Headers};
pub use inline::{Bold, Code, Inline, Italic, SlashlinkSpan, Wikilink};

use std::fmt::{Display, Formatter};
use tape::Tape;

/// Headers plus body of one note.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    headers: Headers,
    header_markup: String,
    body: Subtext,
}

impl Document {
    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn body(&self) -> &Subtext {
        &self.body
    }

    pub fn into_parts(self) -> (Headers, Subtext) {
        (self.headers, self.body)
    }
}

impl Display for Document {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.header_markup)?;
        write!(f, "{}", self.body)
    }
}

/// Parses a full note: optional header block, blank line, Subtext body.
pub fn parse_document(text: &str) -> Document {
    let mut tape = Tape::new(text);
    let headers = header::parse_headers(&mut tape);
    let header_markup = text[..tape.position()].to_string();
    let body = Subtext::parse(tape.rest());
    Document {
        headers,
        header_markup,
        body,
    }
}
