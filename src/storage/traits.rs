//! Storage trait definitions

use crate::model::{
    DocFile, DocFileId, DocId, Document, Link, StagedDoc, StagedId, StagedKind, StagedLink,
    StagedPath,
};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Document not found: {0}")]
    DocumentNotFound(String),

    #[error("Doc file not found: {0}")]
    DocFileNotFound(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Id parsing error: {0}")]
    IdParse(String),

    #[error("Status parsing error: {0}")]
    StatusParse(String),

    #[error("Date parsing error: {0}")]
    DateParse(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Canonical store of documents, doc files, and links.
///
/// Implementations must be thread-safe (Send + Sync) to support concurrent
/// access from multiple threads.
pub trait ContentStore: Send + Sync {
    // === Document Operations ===

    /// Save a document (insert or update). Titles must be non-empty.
    fn save_document(&self, doc: &Document) -> StorageResult<()>;

    /// Load a document by ID
    fn load_document(&self, id: DocId) -> StorageResult<Option<Document>>;

    /// Delete a document. Does not cascade to links.
    fn delete_document(&self, id: DocId) -> StorageResult<bool>;

    /// Find documents whose title matches exactly, optionally restricted to
    /// active ones. Titles are unique by convention, so callers usually take
    /// the first hit.
    fn find_docs_by_title(&self, title: &str, active_only: bool) -> StorageResult<Vec<DocId>>;

    /// List all documents
    fn list_documents(&self) -> StorageResult<Vec<Document>>;

    // === DocFile Operations ===

    /// Save a doc file (insert or update)
    fn save_doc_file(&self, file: &DocFile) -> StorageResult<()>;

    /// Load a doc file by ID
    fn load_doc_file(&self, id: DocFileId) -> StorageResult<Option<DocFile>>;

    // === Link Operations ===

    /// Insert a link. Links are never updated in place.
    fn create_link(&self, link: &Link) -> StorageResult<()>;

    /// Get links originating from a document
    fn links_from(&self, doc: DocId) -> StorageResult<Vec<Link>>;

    /// Count active links originating from a document
    fn count_active_links_from(&self, doc: DocId) -> StorageResult<usize>;
}

/// Queue-like store of rows deposited by the extraction pipeline.
///
/// Each staged kind carries a `failed` flag: pending rows (`failed = false`)
/// are consumed by ingestion, failed rows are consumed by the sweeps.
pub trait StagingStore: Send + Sync {
    // === Enqueue ===

    fn stage_doc(
        &self,
        title: &str,
        metadata: &str,
        file: Option<DocFileId>,
        num_links: i64,
    ) -> StorageResult<StagedId>;

    fn stage_link(&self, from_title: &str, to_title: &str) -> StorageResult<StagedId>;

    fn stage_path(
        &self,
        pdf_path: &str,
        process_path: Option<&str>,
        file: DocFileId,
    ) -> StorageResult<StagedId>;

    // === Dequeue ===

    /// Fetch up to `limit` pending staged documents, oldest first
    fn fetch_pending_docs(&self, limit: usize) -> StorageResult<Vec<StagedDoc>>;

    /// Fetch up to `limit` pending staged links, oldest first
    fn fetch_pending_links(&self, limit: usize) -> StorageResult<Vec<StagedLink>>;

    /// Fetch all staged documents marked failed
    fn fetch_failed_docs(&self) -> StorageResult<Vec<StagedDoc>>;

    /// Fetch all staged links marked failed
    fn fetch_failed_links(&self) -> StorageResult<Vec<StagedLink>>;

    /// Fetch all staged file paths marked failed
    fn fetch_failed_paths(&self) -> StorageResult<Vec<StagedPath>>;

    // === Row state ===

    /// Flag a row as failed so it is swept instead of retried as new
    fn mark_failed(&self, kind: StagedKind, id: StagedId) -> StorageResult<()>;

    /// Delete a staged row
    fn delete(&self, kind: StagedKind, id: StagedId) -> StorageResult<bool>;

    /// Record one more failed-link sweep that could not find the source
    /// document; returns the new attempt count.
    fn bump_link_sweep_attempts(&self, id: StagedId) -> StorageResult<u32>;
}

/// Extension trait for opening stores from paths
pub trait OpenStore: Sized {
    /// Open or create a store at the given path
    fn open(path: impl AsRef<Path>) -> StorageResult<Self>;

    /// Create an in-memory store (useful for testing)
    fn open_in_memory() -> StorageResult<Self>;
}
