//! Consumer-facing facade over the stores and the reconciliation engine.
//!
//! `DocmeshApi` is the single entry point for external callers: the CLI and
//! any embedding application go through it rather than reaching into the
//! stores or the `Reconciler` directly.

use crate::ingest::{IngestError, IngestResult, ReconcileConfig, ReconcileReport, Reconciler};
use crate::model::{DocFile, DocFileId, DocId, ProcessStatus};
use crate::storage::{ContentStore, StagingStore};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

/// One row of the document projection
#[derive(Debug, Clone, Serialize)]
pub struct DocSummary {
    pub id: DocId,
    pub title: String,
    /// The owning file has both status tracks at `Processed`
    pub tracked: bool,
}

/// One row of the link projection, resolved to titles
#[derive(Debug, Clone, Serialize)]
pub struct LinkView {
    pub from: String,
    pub to: String,
}

/// Processing status of a registered file
#[derive(Debug, Clone, Serialize)]
pub struct FileStatus {
    pub doc_status: ProcessStatus,
    pub links_status: ProcessStatus,
}

/// Single entry point for all consumer-facing operations.
pub struct DocmeshApi {
    content: Arc<dyn ContentStore>,
    staging: Arc<dyn StagingStore>,
    reconciler: Reconciler,
}

impl DocmeshApi {
    /// Create a new API instance over the two stores.
    pub fn new(content: Arc<dyn ContentStore>, staging: Arc<dyn StagingStore>) -> Self {
        let reconciler = Reconciler::new(content.clone(), staging.clone());
        Self {
            content,
            staging,
            reconciler,
        }
    }

    /// Replace the reconciliation tuning knobs.
    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.reconciler = Reconciler::new(self.content.clone(), self.staging.clone())
            .with_config(config);
        self
    }

    // --- Registration ---

    /// Register an uploaded file and hand its paths to the pipeline.
    ///
    /// Both status tracks start at `Processing`; the pipeline reports back
    /// through the staging store.
    pub fn register_file(
        &self,
        pdf_path: &str,
        aux_path: Option<&str>,
    ) -> IngestResult<DocFileId> {
        let mut file = DocFile::new(pdf_path);
        if let Some(aux) = aux_path {
            file = file.with_aux_path(aux);
        }
        self.content.save_doc_file(&file)?;
        self.send_to_pipeline(file.id)?;
        Ok(file.id)
    }

    /// Stage a registered file's paths for the extraction pipeline, at most
    /// once per file. Returns whether the paths were staged by this call.
    pub fn send_to_pipeline(&self, id: DocFileId) -> IngestResult<bool> {
        let mut file = self
            .content
            .load_doc_file(id)?
            .ok_or(IngestError::DocFileNotFound(id))?;
        if file.sent_to_pipeline {
            return Ok(false);
        }

        self.staging
            .stage_path(&file.source_path, file.aux_path.as_deref(), file.id)?;
        file.sent_to_pipeline = true;
        self.content.save_doc_file(&file)?;
        Ok(true)
    }

    // --- Reconciliation ---

    /// Run one reconciliation batch. See [`Reconciler::reconcile`].
    pub fn reconcile(&self, max_items: usize) -> IngestResult<ReconcileReport> {
        self.reconciler.reconcile(max_items)
    }

    // --- Read-only projections ---

    /// List all documents with their tracking state.
    pub fn docs(&self) -> IngestResult<Vec<DocSummary>> {
        let mut out = Vec::new();
        for doc in self.content.list_documents()? {
            let tracked = match doc.file {
                Some(file) => self
                    .content
                    .load_doc_file(file)?
                    .map(|f| f.is_fully_processed())
                    .unwrap_or(false),
                None => false,
            };
            out.push(DocSummary {
                id: doc.id,
                title: doc.title,
                tracked,
            });
        }
        Ok(out)
    }

    /// List links originating from the document with the given title.
    pub fn links_for(&self, title: &str) -> IngestResult<Vec<LinkView>> {
        let ids = self.content.find_docs_by_title(title, true)?;
        let Some(&id) = ids.first() else {
            return Ok(Vec::new());
        };

        let mut out = Vec::new();
        for link in self.content.links_from(id)? {
            if !link.active {
                continue;
            }
            match self.content.load_document(link.to)? {
                Some(target) => out.push(LinkView {
                    from: title.to_string(),
                    to: target.title,
                }),
                None => warn!(link = %link.id, "link target no longer exists; skipping"),
            }
        }
        Ok(out)
    }

    /// Processing status of a registered file, if it exists.
    pub fn status_of(&self, file: DocFileId) -> IngestResult<Option<FileStatus>> {
        Ok(self.content.load_doc_file(file)?.map(|f| FileStatus {
            doc_status: f.doc_status,
            links_status: f.links_status,
        }))
    }
}
