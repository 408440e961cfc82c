//! Canonical document record

use super::docfile::DocFileId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocId(Uuid);

impl DocId {
    /// Create a new random DocId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a DocId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Sentinel for an unknown outgoing-link count; suppresses link-count
/// validation until the document's own record arrives.
pub const UNKNOWN_LINK_COUNT: i64 = -1;

/// A tracked unit of content.
///
/// Documents are created either by ingestion of a processed-document record
/// or implicitly as placeholders when a link references their title first.
/// Titles are unique by convention only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique identifier
    pub id: DocId,
    /// Title, matched exactly and case-sensitively during resolution
    pub title: String,
    /// Raw metadata captured by the pipeline (empty when none was extracted)
    pub metadata: String,
    /// Owning file record; absent on placeholder documents
    pub file: Option<DocFileId>,
    /// Outgoing links the pipeline expects; `UNKNOWN_LINK_COUNT` when unknown
    pub expected_links: i64,
    /// Inactive documents are invisible to resolution
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    /// Create a new document with an unknown link count.
    ///
    /// This is exactly the shape a placeholder takes; ingestion of a real
    /// record fills the remaining fields with the builder methods.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: DocId::new(),
            title: title.into(),
            metadata: String::new(),
            file: None,
            expected_links: UNKNOWN_LINK_COUNT,
            active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_metadata(mut self, metadata: impl Into<String>) -> Self {
        self.metadata = metadata.into();
        self
    }

    pub fn with_file(mut self, file: DocFileId) -> Self {
        self.file = Some(file);
        self
    }

    pub fn with_expected_links(mut self, expected_links: i64) -> Self {
        self.expected_links = expected_links;
        self
    }

    /// Whether link-count validation is suppressed for this document
    pub fn link_count_unknown(&self) -> bool {
        self.expected_links < 0
    }

    /// Update the last-modified timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
