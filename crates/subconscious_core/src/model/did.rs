//! Decentralized identifiers.

use super::AddressParseError;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

static DID_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^did:[a-z0-9]+:(?:[A-Za-z0-9_.%\-]*:)*[A-Za-z0-9_.%\-]+$").expect("valid did regex")
});

const LOCAL_DID: &str = "did:subconscious:local";

/// Absolute identity reference: `did:<method>:<method-specific-id>`.
///
/// Compared by exact string; no case folding is applied.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Did(String);

impl Did {
    /// Validates and wraps a DID string.
    pub fn new(value: &str) -> Option<Self> {
        if DID_RE.is_match(value) {
            Some(Self(value.to_string()))
        } else {
            None
        }
    }

    /// Identity used for notes that only exist on this device.
    pub fn local() -> Self {
        Self(LOCAL_DID.to_string())
    }

    pub fn is_local(&self) -> bool {
        self.0 == LOCAL_DID
    }

    /// DID method, e.g. `key` for `did:key:z6Mk...`.
    pub fn method(&self) -> &str {
        self.0.split(':').nth(1).unwrap_or_default()
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Did {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Did {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s).ok_or_else(|| AddressParseError::new("did", s))
    }
}

impl TryFrom<String> for Did {
    type Error = AddressParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Did> for String {
    fn from(value: Did) -> Self {
        value.0
    }
}
