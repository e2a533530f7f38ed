//! Core data models used throughout memchat.
//!
//! These types represent the documents, chunks, chat messages and
//! retrieval results that flow through ingestion and each chat turn.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Raw source text loaded at ingest time. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    /// Identifier shown in source attribution (the file name).
    pub source_id: String,
    pub text: String,
}

impl Document {
    pub fn new(source_id: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            text: text.into(),
        }
    }
}

/// A window of a document's text.
#[derive(Debug, Clone, PartialEq)]
pub struct Chunk {
    pub text: String,
    pub source_id: String,
    /// Offset of the first character, counted in chars (not bytes).
    pub start_offset: usize,
    pub chunk_index: i64,
    /// SHA-256 hex digest of `text`.
    pub hash: String,
}

/// Who authored a [`Message`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Capitalized label used in transcript files (`"User"`, ...).
    pub fn label(&self) -> &'static str {
        match self {
            Role::System => "System",
            Role::User => "User",
            Role::Assistant => "Assistant",
        }
    }

    pub fn from_label(label: &str) -> Option<Role> {
        match label {
            "System" => Some(Role::System),
            "User" => Some(Role::User),
            "Assistant" => Some(Role::Assistant),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One chat message, serialized in the `{"role", "content"}` wire shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Context block and attributed sources for one query. Never persisted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RetrievalResult {
    pub context: String,
    /// Unique source identifiers in first-seen order.
    pub sources: Vec<String>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.context.is_empty() && self.sources.is_empty()
    }

    /// Render the sources as `[a.pdf, b.pdf]`.
    pub fn sources_list(&self) -> String {
        format!("[{}]", self.sources.join(", "))
    }
}
