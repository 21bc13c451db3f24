//! Note model

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier assigned by the note service when a note is created.
///
/// Opaque to the client; never generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(String);

impl NoteId {
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Get the string representation of this ID
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First `len` characters, for compact listings.
    #[must_use]
    pub fn short(&self, len: usize) -> String {
        self.0.chars().take(len).collect()
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for NoteId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for NoteId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A note as persisted by the note service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Note {
    /// Server-assigned identifier, immutable after creation
    pub id: NoteId,
    /// Plain text content
    pub content: String,
    /// Last modification time (Unix ms), display only
    pub ts: i64,
}

impl Note {
    #[must_use]
    pub fn new(id: impl Into<NoteId>, content: impl Into<String>, ts: i64) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            ts,
        }
    }

    /// First line with whitespace collapsed, truncated to `max_chars` with an ellipsis.
    #[must_use]
    pub fn preview(&self, max_chars: usize) -> String {
        let first_line = self.content.lines().next().unwrap_or("").trim();
        let collapsed = first_line.split_whitespace().collect::<Vec<_>>().join(" ");

        if collapsed.chars().count() <= max_chars {
            collapsed
        } else {
            let take_len = max_chars.saturating_sub(3);
            let mut truncated = collapsed.chars().take(take_len).collect::<String>();
            truncated.push_str("...");
            truncated
        }
    }

    /// Check if note content is empty (whitespace-only counts as empty)
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.content.trim().is_empty()
    }

    /// Copy the fields a successful update is allowed to change.
    pub(crate) fn apply_update(&mut self, updated: &Self) {
        self.content.clone_from(&updated.content);
        self.ts = updated.ts;
    }
}

/// Fields sent to the note service on update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotePatch {
    pub content: String,
}

impl NotePatch {
    #[must_use]
    pub fn content(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}
