//! File record owning the two processing-status tracks

use super::status::ProcessStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use uuid::Uuid;

/// Unique identifier for a doc file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DocFileId(Uuid);

impl DocFileId {
    /// Create a new random DocFileId
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create a DocFileId from an existing UUID
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DocFileId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DocFileId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocFileId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// An uploaded source file and the processing state of what was extracted
/// from it.
///
/// `doc_status` tracks the document's own metadata, `links_status` tracks
/// its outgoing links; the two advance independently. The core never
/// deletes doc files.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocFile {
    /// Unique identifier
    pub id: DocFileId,
    /// Display label, derived from the source file name
    pub label: String,
    /// Path of the uploaded PDF
    pub source_path: String,
    /// Optional secondary file used for extraction
    pub aux_path: Option<String>,
    /// Status of the document-metadata track
    pub doc_status: ProcessStatus,
    /// Status of the links track
    pub links_status: ProcessStatus,
    /// The file path has been staged for the extraction pipeline
    pub sent_to_pipeline: bool,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl DocFile {
    /// Create a new doc file for an uploaded source path.
    ///
    /// Both status tracks start at `Processing`; the label is taken from
    /// the source file name.
    pub fn new(source_path: impl Into<String>) -> Self {
        let source_path = source_path.into();
        let label = Path::new(&source_path)
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| source_path.clone());
        Self {
            id: DocFileId::new(),
            label,
            source_path,
            aux_path: None,
            doc_status: ProcessStatus::Processing,
            links_status: ProcessStatus::Processing,
            sent_to_pipeline: false,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub fn with_aux_path(mut self, aux_path: impl Into<String>) -> Self {
        self.aux_path = Some(aux_path.into());
        self
    }

    /// Advance the document-metadata track
    pub fn set_doc_status(&mut self, to: ProcessStatus) {
        self.doc_status = self.doc_status.transition(to);
    }

    /// Advance the links track
    pub fn set_links_status(&mut self, to: ProcessStatus) {
        self.links_status = self.links_status.transition(to);
    }

    /// Both tracks have reached `Processed`
    pub fn is_fully_processed(&self) -> bool {
        self.doc_status == ProcessStatus::Processed && self.links_status == ProcessStatus::Processed
    }
}
