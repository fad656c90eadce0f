//! Memo: one note as stored in a sphere.
//!
//! # Responsibility
//! - Lift the well-known headers into typed fields.
//! - Serialize back to the document wire format.
//!
//! # Invariants
//! - `Created`/`Modified` are written as RFC 3339 UTC with whole seconds.
//! - Unknown headers survive a parse/serialize cycle in their original order.

use crate::subtext::header::{self, Header, Headers};
use crate::subtext::{parse_document, Subtext};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

pub const SUBTEXT_CONTENT_TYPE: &str = "text/subtext";
pub const SUBTEXT_EXTENSION: &str = "subtext";
const UNTITLED_TITLE: &str = "Untitled";
const DERIVED_TITLE_CHARS: usize = 120;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Memo {
    pub content_type: String,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
    pub title: String,
    pub file_extension: String,
    pub additional_headers: Headers,
    pub body: String,
}

impl Memo {
    /// New Subtext memo created and modified at `now`.
    pub fn new(title: impl Into<String>, body: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            content_type: SUBTEXT_CONTENT_TYPE.to_string(),
            created: now,
            modified: now,
            title: title.into(),
            file_extension: SUBTEXT_EXTENSION.to_string(),
            additional_headers: Headers::new(),
            body: body.into(),
        }
    }

    /// Reads a memo from wire text.
    ///
    /// Missing or unreadable dates fall back to `fallback_time`; a missing
    /// or blank title is derived from the first block of the body. A present
    /// title is kept verbatim, surrounding spaces included.
    pub fn parse(text: &str, fallback_time: DateTime<Utc>) -> Self {
        let (headers, body) = parse_document(text).into_parts();
        let title = headers
            .title()
            .filter(|title| !title.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| derive_title(&body));

        Self {
            content_type: headers
                .content_type()
                .unwrap_or(SUBTEXT_CONTENT_TYPE)
                .to_string(),
            created: headers
                .created()
                .and_then(parse_timestamp)
                .unwrap_or(fallback_time),
            modified: headers
                .modified()
                .and_then(parse_timestamp)
                .unwrap_or(fallback_time),
            title,
            file_extension: headers
                .file_extension()
                .unwrap_or(SUBTEXT_EXTENSION)
                .to_string(),
            additional_headers: headers.without_well_known(),
            body: body.to_string(),
        }
    }

    /// Well-known headers in canonical order, then the additional ones.
    pub fn headers(&self) -> Headers {
        let well_known = [
            (header::CONTENT_TYPE, self.content_type.clone()),
            (header::TITLE, single_line(&self.title)),
            (header::CREATED, format_timestamp(&self.created)),
            (header::MODIFIED, format_timestamp(&self.modified)),
            (header::FILE_EXTENSION, self.file_extension.clone()),
        ];
        well_known
            .iter()
            .filter_map(|(name, value)| Header::new(name, value))
            .chain(self.additional_headers.iter().cloned())
            .collect()
    }

    /// Wire text: headers, a blank line, the body.
    pub fn to_document_text(&self) -> String {
        format!("{}\n{}", self.headers(), self.body)
    }

    /// Size in bytes of the wire text.
    pub fn size(&self) -> u64 {
        self.to_document_text().len() as u64
    }

    pub fn subtext(&self) -> Subtext {
        Subtext::parse(&self.body)
    }

    /// Same memo under a new title.
    pub fn retitled(&self, title: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            title: title.into(),
            modified: now,
            ..self.clone()
        }
    }

    /// Appends `child`'s body to this memo's body.
    pub fn merge(&self, child: &Memo, now: DateTime<Utc>) -> Self {
        let parent_body = self.body.trim_end();
        let child_body = child.body.trim_start();
        let body = if parent_body.is_empty() {
            child_body.to_string()
        } else if child_body.is_empty() {
            parent_body.to_string()
        } else {
            format!("{parent_body}\n\n{child_body}")
        };
        Self {
            body,
            modified: now,
            ..self.clone()
        }
    }
}

pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|time| time.with_timezone(&Utc))
}

fn derive_title(body: &Subtext) -> String {
    let excerpt = body.excerpt(DERIVED_TITLE_CHARS);
    if excerpt.is_empty() {
        UNTITLED_TITLE.to_string()
    } else {
        excerpt
    }
}

fn single_line(value: &str) -> String {
    value.split(['\r', '\n']).collect::<Vec<_>>().join(" ")
}
