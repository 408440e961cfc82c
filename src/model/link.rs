//! Directed link between two documents

use super::document::DocId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LinkId(Uuid);

impl LinkId {
    /// Create a new random LinkId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for LinkId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for LinkId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for LinkId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// A directed relationship between two documents.
///
/// Both endpoints must exist (as real or placeholder documents) before the
/// link is created. Links are never updated in place; a duplicate is a new
/// row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Link {
    /// Unique identifier
    pub id: LinkId,
    /// Source document
    pub from: DocId,
    /// Target document
    pub to: DocId,
    /// Display label, "<from title> -> <to title>"
    pub label: String,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl Link {
    /// Create a new link between two documents
    pub fn new(from: DocId, to: DocId) -> Self {
        Self {
            id: LinkId::new(),
            from,
            to,
            label: String::new(),
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }
}
