//! A short user note as stored in the `notes` collection.

use serde::{Deserialize, Serialize};

/// A persisted note.
///
/// Only the raw markdown is stored. The store's own `_id` is ignored on read;
/// insertion order is the only ordering the service relies on.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Note {
    /// Raw markdown, never empty once persisted.
    pub description: String,
}

impl Note {
    pub fn new(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
        }
    }
}

/// Read-time projection of a note with its description rendered to HTML.
#[derive(Serialize, Clone, Debug, PartialEq, Eq)]
pub struct RenderedNote {
    pub description: String,
}
