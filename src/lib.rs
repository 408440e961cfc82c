//! Docmesh: document/link reconciliation engine
//!
//! Reconciles records staged by an external PDF-processing pipeline into a
//! canonical store of documents and the links between them, tracking
//! per-file processing status along the way.
//!
//! # Core Concepts
//!
//! - **Documents**: tracked units of content, resolved by title
//! - **Links**: directed relationships between documents
//! - **DocFiles**: uploaded source files owning the two status tracks
//! - **Staged rows**: pipeline output waiting to be merged
//!
//! # Example
//!
//! ```
//! use docmesh::{DocmeshApi, OpenStore, SqliteContentStore, SqliteStagingStore};
//! use std::sync::Arc;
//!
//! let content = Arc::new(SqliteContentStore::open_in_memory().unwrap());
//! let staging = Arc::new(SqliteStagingStore::open_in_memory().unwrap());
//! let api = DocmeshApi::new(content, staging);
//!
//! let report = api.reconcile(50).unwrap();
//! assert_eq!(report.docs_ingested, 0);
//! ```

mod api;
pub mod ingest;
mod model;
pub mod storage;

pub use api::{DocSummary, DocmeshApi, FileStatus, LinkView};
pub use ingest::{
    DocResolver, IngestError, IngestResult, ReconcileConfig, ReconcileReport, Reconciler,
    Resolution, DEFAULT_MAX_ITEMS,
};
pub use model::{
    DocFile, DocFileId, DocId, Document, Link, LinkId, ProcessStatus, StagedDoc, StagedId,
    StagedKind, StagedLink, StagedPath, UnknownStatus, UNKNOWN_LINK_COUNT,
};
pub use storage::{
    ContentStore, OpenStore, SqliteContentStore, SqliteStagingStore, StagingStore, StorageError,
    StorageResult,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
