//! Batch reconciliation of staged pipeline records into the content store

use super::resolver::DocResolver;
use crate::model::{
    DocFileId, DocId, Document, Link, ProcessStatus, StagedDoc, StagedId, StagedKind, StagedLink,
    StagedPath,
};
use crate::storage::{ContentStore, StagingStore, StorageError};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, error, info, warn};

/// Default batch bound for a reconciliation run
pub const DEFAULT_MAX_ITEMS: usize = 50;

/// Errors that can occur while driving ingestion
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Document not found: {0}")]
    DocumentNotFound(DocId),

    #[error("Doc file not found: {0}")]
    DocFileNotFound(DocFileId),
}

/// Result type for ingestion operations
pub type IngestResult<T> = Result<T, IngestError>;

/// Tuning knobs for the reconciliation engine
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Failed-link sweeps tolerated before a row whose source document never
    /// arrived is dropped.
    pub max_link_sweep_attempts: u32,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            max_link_sweep_attempts: 20,
        }
    }
}

/// Counts from one reconciliation run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconcileReport {
    pub docs_ingested: usize,
    pub docs_failed: usize,
    pub links_ingested: usize,
    pub links_failed: usize,
    pub placeholders_created: usize,
    /// Documents that ended up with more links than they expected
    pub link_count_anomalies: usize,
    pub failed_paths_swept: usize,
    pub failed_docs_swept: usize,
    pub failed_links_swept: usize,
    /// Failed links whose source document has not arrived yet
    pub failed_links_deferred: usize,
    /// Failed links dropped after exhausting their sweep attempts
    pub failed_links_dropped: usize,
}

/// Outcome of sweeping one failed link row
enum LinkSweep {
    Swept,
    Deferred,
}

/// Drains the staging store into the content store in bounded batches.
///
/// A run ingests pending documents first (so that links arriving in the same
/// batch rarely need placeholders), then pending links, then converts rows
/// that failed in an earlier run into terminal `Failed` statuses. Errors are
/// contained per item; one bad row never aborts the batch.
pub struct Reconciler {
    content: Arc<dyn ContentStore>,
    staging: Arc<dyn StagingStore>,
    resolver: DocResolver,
    config: ReconcileConfig,
}

impl Reconciler {
    pub fn new(content: Arc<dyn ContentStore>, staging: Arc<dyn StagingStore>) -> Self {
        let resolver = DocResolver::new(content.clone());
        Self {
            content,
            staging,
            resolver,
            config: ReconcileConfig::default(),
        }
    }

    pub fn with_config(mut self, config: ReconcileConfig) -> Self {
        self.config = config;
        self
    }

    /// Run one reconciliation batch of at most `max_items` staged rows.
    ///
    /// Documents take up to half the budget, links the remainder. The
    /// failure sweeps act on rows marked failed before this run started;
    /// rows failing now are retained for the next run's sweeps.
    pub fn reconcile(&self, max_items: usize) -> IngestResult<ReconcileReport> {
        let mut report = ReconcileReport::default();

        // Snapshot rows that already carry the failed flag. The passes below
        // may mark more rows failed; those wait for the next run.
        let failed_paths = self.staging.fetch_failed_paths()?;
        let failed_docs = self.staging.fetch_failed_docs()?;
        let failed_links = self.staging.fetch_failed_links()?;

        let staged_docs = self.staging.fetch_pending_docs(max_items / 2)?;
        for row in &staged_docs {
            match self.ingest_document(row) {
                Ok(()) => {
                    self.delete_staged(StagedKind::Doc, row.id);
                    report.docs_ingested += 1;
                    debug!(title = %row.title, "document ingested");
                }
                Err(e) => {
                    warn!(staged = %row.id, title = %row.title, error = %e,
                        "document ingestion failed, deferring to sweep");
                    self.mark_staged_failed(StagedKind::Doc, row.id);
                    report.docs_failed += 1;
                }
            }
        }

        let link_budget = max_items.saturating_sub(staged_docs.len());
        let staged_links = self.staging.fetch_pending_links(link_budget)?;
        for row in &staged_links {
            match self.ingest_link(row, &mut report) {
                Ok(()) => {
                    self.delete_staged(StagedKind::Link, row.id);
                    report.links_ingested += 1;
                    debug!(from = %row.from_title, to = %row.to_title, "link ingested");
                }
                Err(e) => {
                    warn!(staged = %row.id, from = %row.from_title, to = %row.to_title,
                        error = %e, "link ingestion failed, deferring to sweep");
                    self.mark_staged_failed(StagedKind::Link, row.id);
                    report.links_failed += 1;
                }
            }
        }

        self.sweep_failed_paths(&failed_paths, &mut report);
        self.sweep_failed_docs(&failed_docs, &mut report);
        self.sweep_failed_links(&failed_links, &mut report);

        info!(
            docs = report.docs_ingested,
            docs_failed = report.docs_failed,
            links = report.links_ingested,
            links_failed = report.links_failed,
            swept = report.failed_paths_swept + report.failed_docs_swept + report.failed_links_swept,
            "reconcile run complete"
        );

        Ok(report)
    }

    // === Document ingestion ===

    /// Merge one staged document: create it if the title is new, otherwise
    /// overwrite metadata, file reference, and link count. On success the
    /// owning doc file's document track advances to `Processed`.
    fn ingest_document(&self, row: &StagedDoc) -> IngestResult<()> {
        let resolution = self.resolver.resolve(&row.title, || {
            let mut doc = Document::new(&row.title)
                .with_metadata(&row.metadata)
                .with_expected_links(row.num_links);
            if let Some(file) = row.file {
                doc = doc.with_file(file);
            }
            doc
        })?;

        if !resolution.created {
            let mut doc = self
                .content
                .load_document(resolution.id)?
                .ok_or(IngestError::DocumentNotFound(resolution.id))?;
            doc.metadata = row.metadata.clone();
            doc.file = row.file;
            doc.expected_links = row.num_links;
            doc.touch();
            self.content.save_document(&doc)?;
        }

        if let Some(file) = row.file {
            self.set_doc_status(file, ProcessStatus::Processed)?;
        }

        Ok(())
    }

    // === Link ingestion ===

    /// Merge one staged link: resolve both endpoints (creating placeholders
    /// as needed), persist the link once, then run the completion check.
    ///
    /// Placeholders created here are removed again if the link itself never
    /// makes it to the store; once the link row exists they must stay.
    fn ingest_link(&self, row: &StagedLink, report: &mut ReconcileReport) -> IngestResult<()> {
        let mut placeholders: Vec<DocId> = Vec::new();

        let from = match self
            .resolver
            .resolve(&row.from_title, || Document::new(&row.from_title))
        {
            Ok(res) => {
                if res.created {
                    placeholders.push(res.id);
                }
                res.id
            }
            Err(e) => {
                self.discard_placeholders(&placeholders);
                return Err(e.into());
            }
        };

        let to = match self
            .resolver
            .resolve(&row.to_title, || Document::new(&row.to_title))
        {
            Ok(res) => {
                if res.created {
                    placeholders.push(res.id);
                }
                res.id
            }
            Err(e) => {
                self.discard_placeholders(&placeholders);
                return Err(e.into());
            }
        };

        let link = Link::new(from, to)
            .with_label(format!("{} -> {}", row.from_title, row.to_title));
        if let Err(e) = self.content.create_link(&link) {
            self.discard_placeholders(&placeholders);
            return Err(e.into());
        }

        // The link is durable from here on; a completion-check failure marks
        // the staged row failed without ever re-creating the link.
        report.placeholders_created += placeholders.len();
        self.check_link_completion(from, report)?;

        Ok(())
    }

    /// Compare the source document's active outgoing links against its
    /// expected count and advance the links track when they match. An
    /// over-count still advances but is surfaced as an anomaly.
    fn check_link_completion(&self, from: DocId, report: &mut ReconcileReport) -> IngestResult<()> {
        let doc = self
            .content
            .load_document(from)?
            .ok_or(IngestError::DocumentNotFound(from))?;

        if doc.link_count_unknown() {
            return Ok(());
        }

        let actual = self.content.count_active_links_from(from)? as i64;
        if actual < doc.expected_links {
            return Ok(());
        }
        if actual > doc.expected_links {
            error!(
                title = %doc.title,
                expected = doc.expected_links,
                actual,
                "more links processed than the document expects"
            );
            report.link_count_anomalies += 1;
        }

        match doc.file {
            Some(file) => self.set_links_status(file, ProcessStatus::Processed)?,
            None => debug!(title = %doc.title, "link count complete but document has no file record"),
        }

        Ok(())
    }

    /// Best-effort removal of placeholders left behind by a failed link.
    /// A leftover placeholder is harmless and reconciles on retry.
    fn discard_placeholders(&self, placeholders: &[DocId]) {
        for id in placeholders {
            match self.content.delete_document(*id) {
                Ok(_) => debug!(document = %id, "removed placeholder after link failure"),
                Err(e) => warn!(document = %id, error = %e,
                    "failed to remove placeholder after link failure"),
            }
        }
    }

    // === Failure sweeps ===

    /// Convert failed file-path rows into `doc_status = Failed`.
    fn sweep_failed_paths(&self, rows: &[StagedPath], report: &mut ReconcileReport) {
        for row in rows {
            match self.set_doc_status(row.file, ProcessStatus::Failed) {
                Ok(()) => {
                    self.delete_staged(StagedKind::Path, row.id);
                    report.failed_paths_swept += 1;
                }
                Err(IngestError::DocFileNotFound(file)) => {
                    // The file record was removed out from under us; there is
                    // nothing left to mark.
                    warn!(file = %file, "doc file for failed path no longer exists");
                    self.delete_staged(StagedKind::Path, row.id);
                    report.failed_paths_swept += 1;
                }
                Err(e) => {
                    warn!(staged = %row.id, error = %e, "failed-path sweep deferred");
                }
            }
        }
    }

    /// Convert failed document rows into `doc_status = Failed` on the doc
    /// file they reference.
    fn sweep_failed_docs(&self, rows: &[StagedDoc], report: &mut ReconcileReport) {
        for row in rows {
            let Some(file) = row.file else {
                warn!(staged = %row.id, title = %row.title,
                    "failed document carries no file reference; nothing to mark");
                self.delete_staged(StagedKind::Doc, row.id);
                report.failed_docs_swept += 1;
                continue;
            };

            match self.set_doc_status(file, ProcessStatus::Failed) {
                Ok(()) => {
                    self.delete_staged(StagedKind::Doc, row.id);
                    report.failed_docs_swept += 1;
                }
                Err(IngestError::DocFileNotFound(file)) => {
                    warn!(file = %file, "doc file for failed document no longer exists");
                    self.delete_staged(StagedKind::Doc, row.id);
                    report.failed_docs_swept += 1;
                }
                Err(e) => {
                    warn!(staged = %row.id, error = %e, "failed-doc sweep deferred");
                }
            }
        }
    }

    /// Convert failed link rows into `links_status = Failed` on the doc file
    /// owning the source title. Rows whose source document has not arrived
    /// yet are deferred, up to the configured attempt bound.
    fn sweep_failed_links(&self, rows: &[StagedLink], report: &mut ReconcileReport) {
        for row in rows {
            match self.sweep_failed_link(row) {
                Ok(LinkSweep::Swept) => {
                    self.delete_staged(StagedKind::Link, row.id);
                    report.failed_links_swept += 1;
                }
                Ok(LinkSweep::Deferred) => {
                    let attempts = match self.staging.bump_link_sweep_attempts(row.id) {
                        Ok(n) => n,
                        Err(e) => {
                            warn!(staged = %row.id, error = %e, "failed to record sweep attempt");
                            row.sweep_attempts + 1
                        }
                    };
                    if attempts >= self.config.max_link_sweep_attempts {
                        error!(staged = %row.id, from = %row.from_title, attempts,
                            "dropping failed link; its source document never arrived");
                        self.delete_staged(StagedKind::Link, row.id);
                        report.failed_links_dropped += 1;
                    } else {
                        report.failed_links_deferred += 1;
                    }
                }
                Err(e) => {
                    warn!(staged = %row.id, error = %e, "failed-link sweep deferred");
                }
            }
        }
    }

    fn sweep_failed_link(&self, row: &StagedLink) -> IngestResult<LinkSweep> {
        let ids = self.content.find_docs_by_title(&row.from_title, true)?;
        let Some(&doc_id) = ids.first() else {
            return Ok(LinkSweep::Deferred);
        };

        let doc = self
            .content
            .load_document(doc_id)?
            .ok_or(IngestError::DocumentNotFound(doc_id))?;

        match doc.file {
            Some(file) => self.set_links_status(file, ProcessStatus::Failed)?,
            None => debug!(title = %doc.title,
                "source of failed link has no file record; nothing to mark"),
        }

        Ok(LinkSweep::Swept)
    }

    // === Status propagation ===

    fn set_doc_status(&self, file: DocFileId, to: ProcessStatus) -> IngestResult<()> {
        let mut record = self
            .content
            .load_doc_file(file)?
            .ok_or(IngestError::DocFileNotFound(file))?;
        record.set_doc_status(to);
        self.content.save_doc_file(&record)?;
        Ok(())
    }

    fn set_links_status(&self, file: DocFileId, to: ProcessStatus) -> IngestResult<()> {
        let mut record = self
            .content
            .load_doc_file(file)?
            .ok_or(IngestError::DocFileNotFound(file))?;
        record.set_links_status(to);
        self.content.save_doc_file(&record)?;
        Ok(())
    }

    // === Staging bookkeeping ===

    /// Delete a staged row, tolerating failure: the content mutation already
    /// committed, and an undeleted row re-applies idempotently next run.
    fn delete_staged(&self, kind: StagedKind, id: StagedId) {
        if let Err(e) = self.staging.delete(kind, id) {
            warn!(kind = %kind, staged = %id, error = %e,
                "failed to delete staged row; it will be revisited next run");
        }
    }

    fn mark_staged_failed(&self, kind: StagedKind, id: StagedId) {
        if let Err(e) = self.staging.mark_failed(kind, id) {
            warn!(kind = %kind, staged = %id, error = %e,
                "failed to flag staged row; it will be retried as pending");
        }
    }
}
