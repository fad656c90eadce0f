//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate store, repository and search calls into use-case APIs.
//! - Keep callers decoupled from storage details.

pub mod rename;

pub use rename::{classify_rename, RenameError, RenameResult, RenameService, RenameSuggestion};
