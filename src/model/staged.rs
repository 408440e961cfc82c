//! Rows deposited by the extraction pipeline, pending reconciliation

use super::docfile::DocFileId;
use serde::{Deserialize, Serialize};

/// Identifier of a staged row (the staging store's rowid)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StagedId(pub i64);

impl std::fmt::Display for StagedId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Which staging table a row belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StagedKind {
    Doc,
    Link,
    Path,
}

impl std::fmt::Display for StagedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            StagedKind::Doc => "doc",
            StagedKind::Link => "link",
            StagedKind::Path => "path",
        };
        f.write_str(name)
    }
}

/// A processed-document record awaiting merge into the content store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedDoc {
    pub id: StagedId,
    pub title: String,
    pub metadata: String,
    /// File the pipeline extracted this record from, when known
    pub file: Option<DocFileId>,
    /// Outgoing links the pipeline counted in the document
    pub num_links: i64,
    /// Set when a previous ingestion attempt failed; swept, not retried
    pub failed: bool,
}

/// An extracted link awaiting merge into the content store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedLink {
    pub id: StagedId,
    pub from_title: String,
    pub to_title: String,
    pub failed: bool,
    /// Failed sweeps that could not find the source document yet
    pub sweep_attempts: u32,
}

/// A registered file path awaiting pickup by the extraction pipeline.
///
/// The core only ever consumes these rows once the pipeline has marked them
/// failed; pending rows belong to the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedPath {
    pub id: StagedId,
    pub pdf_path: String,
    pub process_path: Option<String>,
    pub file: DocFileId,
    pub failed: bool,
}
