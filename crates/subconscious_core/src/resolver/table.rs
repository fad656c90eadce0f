use crate::model::did::Did;
use crate::model::petname::Name;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Failure reported by a petname table itself (store unavailable, ...).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LookupError {
    pub message: String,
}

impl LookupError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl Display for LookupError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "petname lookup failed: {}", self.message)
    }
}

impl Error for LookupError {}

/// Per-sphere petname tables, one lookup per hop.
pub trait PetnameTable {
    /// Identity that `sphere` has assigned to `name`, if any.
    fn lookup(&self, sphere: &Did, name: &Name) -> Result<Option<Did>, LookupError>;
}

/// In-memory petname tables keyed by owning sphere.
#[derive(Debug, Clone, Default)]
pub struct MemoryPetnameTable {
    entries: HashMap<Did, HashMap<Name, Did>>,
}

impl MemoryPetnameTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records that `sphere` calls `identity` by `name`. Replaces any
    /// previous assignment of `name` in that sphere.
    pub fn insert(&mut self, sphere: Did, name: Name, identity: Did) {
        self.entries.entry(sphere).or_default().insert(name, identity);
    }

    pub fn remove(&mut self, sphere: &Did, name: &Name) -> Option<Did> {
        self.entries.get_mut(sphere)?.remove(name)
    }
}

impl PetnameTable for MemoryPetnameTable {
    fn lookup(&self, sphere: &Did, name: &Name) -> Result<Option<Did>, LookupError> {
        Ok(self
            .entries
            .get(sphere)
            .and_then(|names| names.get(name))
            .cloned())
    }
}
