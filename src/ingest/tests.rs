//! End-to-end reconciliation scenarios on in-memory stores

use super::*;
use crate::model::{DocFile, Document, ProcessStatus, StagedKind, UNKNOWN_LINK_COUNT};
use crate::storage::{
    ContentStore, OpenStore, SqliteContentStore, SqliteStagingStore, StagingStore,
};
use std::sync::Arc;

struct Fixture {
    content: Arc<SqliteContentStore>,
    staging: Arc<SqliteStagingStore>,
    reconciler: Reconciler,
}

impl Fixture {
    fn new() -> Self {
        Self::with_config(ReconcileConfig::default())
    }

    fn with_config(config: ReconcileConfig) -> Self {
        let content = Arc::new(SqliteContentStore::open_in_memory().unwrap());
        let staging = Arc::new(SqliteStagingStore::open_in_memory().unwrap());
        let reconciler =
            Reconciler::new(content.clone(), staging.clone()).with_config(config);
        Self {
            content,
            staging,
            reconciler,
        }
    }

    fn register_file(&self, path: &str) -> DocFile {
        let file = DocFile::new(path);
        self.content.save_doc_file(&file).unwrap();
        file
    }

    fn doc_by_title(&self, title: &str) -> Document {
        let ids = self.content.find_docs_by_title(title, true).unwrap();
        assert_eq!(ids.len(), 1, "expected exactly one document titled {title:?}");
        self.content.load_document(ids[0]).unwrap().unwrap()
    }

    fn file_record(&self, file: &DocFile) -> DocFile {
        self.content.load_doc_file(file.id).unwrap().unwrap()
    }
}

// === Document ingestion ===

#[test]
fn test_reconcile_drains_staged_documents() {
    let fx = Fixture::new();
    let file_a = fx.register_file("a.pdf");
    let file_b = fx.register_file("b.pdf");

    fx.staging
        .stage_doc("Report A", "meta a", Some(file_a.id), 2)
        .unwrap();
    fx.staging
        .stage_doc("Report B", "meta b", Some(file_b.id), 0)
        .unwrap();

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.docs_ingested, 2);
    assert_eq!(report.docs_failed, 0);

    assert!(fx.staging.fetch_pending_docs(10).unwrap().is_empty());
    assert_eq!(fx.doc_by_title("Report A").expected_links, 2);
    assert_eq!(fx.doc_by_title("Report B").metadata, "meta b");
}

#[test]
fn test_document_ingestion_marks_doc_file_processed() {
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");
    fx.staging
        .stage_doc("Report A", "", Some(file.id), 0)
        .unwrap();

    fx.reconciler.reconcile(10).unwrap();

    assert_eq!(fx.file_record(&file).doc_status, ProcessStatus::Processed);
}

#[test]
fn test_reingestion_overwrites_without_duplicating() {
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");

    fx.staging
        .stage_doc("Report A", "first", Some(file.id), 1)
        .unwrap();
    fx.reconciler.reconcile(10).unwrap();

    fx.staging
        .stage_doc("Report A", "second", Some(file.id), 4)
        .unwrap();
    fx.reconciler.reconcile(10).unwrap();

    let docs = fx.content.list_documents().unwrap();
    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].metadata, "second");
    assert_eq!(docs[0].expected_links, 4);
}

#[test]
fn test_document_ingestion_fills_placeholder() {
    let fx = Fixture::new();
    fx.staging.stage_link("Report A", "Report B").unwrap();
    fx.reconciler.reconcile(10).unwrap();

    let placeholder = fx.doc_by_title("Report A");
    assert_eq!(placeholder.expected_links, UNKNOWN_LINK_COUNT);

    // The document's own record arrives later and overwrites in place.
    let file = fx.register_file("a.pdf");
    fx.staging
        .stage_doc("Report A", "arrived", Some(file.id), 1)
        .unwrap();
    fx.reconciler.reconcile(10).unwrap();

    let doc = fx.doc_by_title("Report A");
    assert_eq!(doc.id, placeholder.id);
    assert_eq!(doc.metadata, "arrived");
    assert_eq!(doc.expected_links, 1);
}

#[test]
fn test_document_budget_is_half_of_max_items() {
    let fx = Fixture::new();
    for i in 0..3 {
        fx.staging
            .stage_doc(&format!("Doc {i}"), "", None, 0)
            .unwrap();
    }

    let report = fx.reconciler.reconcile(4).unwrap();
    assert_eq!(report.docs_ingested, 2);
    assert_eq!(fx.staging.fetch_pending_docs(10).unwrap().len(), 1);
}

// === Failure isolation and sweeps ===

#[test]
fn test_one_bad_document_does_not_abort_the_batch() {
    let fx = Fixture::new();
    let file = fx.register_file("bad.pdf");

    fx.staging.stage_doc("Report A", "", None, 0).unwrap();
    // Empty titles fail content-store validation.
    fx.staging.stage_doc("", "", Some(file.id), 0).unwrap();
    fx.staging.stage_doc("Report C", "", None, 0).unwrap();

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.docs_ingested, 2);
    assert_eq!(report.docs_failed, 1);

    // The bad row is retained with the failed flag, not deleted.
    let failed = fx.staging.fetch_failed_docs().unwrap();
    assert_eq!(failed.len(), 1);
    assert!(fx.staging.fetch_pending_docs(10).unwrap().is_empty());
    assert_eq!(fx.content.list_documents().unwrap().len(), 2);
}

#[test]
fn test_failed_document_sweeps_to_failed_status_next_run() {
    let fx = Fixture::new();
    let file = fx.register_file("bad.pdf");
    fx.staging.stage_doc("", "", Some(file.id), 0).unwrap();

    // First run fails the row; the sweep only acts on previously failed rows.
    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.docs_failed, 1);
    assert_eq!(report.failed_docs_swept, 0);
    assert_eq!(fx.file_record(&file).doc_status, ProcessStatus::Processing);

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.failed_docs_swept, 1);
    assert_eq!(fx.file_record(&file).doc_status, ProcessStatus::Failed);
    assert!(fx.staging.fetch_failed_docs().unwrap().is_empty());
}

#[test]
fn test_failed_path_sweeps_to_failed_status() {
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");
    let path = fx
        .staging
        .stage_path("a.pdf", None, file.id)
        .unwrap();
    // The pipeline flags paths it could not process.
    fx.staging.mark_failed(StagedKind::Path, path).unwrap();

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.failed_paths_swept, 1);
    assert_eq!(fx.file_record(&file).doc_status, ProcessStatus::Failed);
    assert!(fx.staging.fetch_failed_paths().unwrap().is_empty());
}

#[test]
fn test_failed_link_sweeps_links_status_when_source_exists() {
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");
    fx.staging
        .stage_doc("Report A", "", Some(file.id), 5)
        .unwrap();
    // The empty target title makes this link fail ingestion.
    fx.staging.stage_link("Report A", "").unwrap();

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.links_failed, 1);

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.failed_links_swept, 1);
    assert_eq!(fx.file_record(&file).links_status, ProcessStatus::Failed);
    assert!(fx.staging.fetch_failed_links().unwrap().is_empty());
}

#[test]
fn test_failed_link_with_missing_source_is_deferred() {
    let fx = Fixture::new();
    fx.staging.stage_link("Ghost", "").unwrap();

    fx.reconciler.reconcile(10).unwrap();
    let report = fx.reconciler.reconcile(10).unwrap();

    assert_eq!(report.failed_links_deferred, 1);
    assert_eq!(report.failed_links_swept, 0);
    let failed = fx.staging.fetch_failed_links().unwrap();
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].sweep_attempts, 1);
}

#[test]
fn test_failed_link_is_dropped_after_sweep_attempt_bound() {
    let fx = Fixture::with_config(ReconcileConfig {
        max_link_sweep_attempts: 2,
    });
    fx.staging.stage_link("Ghost", "").unwrap();

    fx.reconciler.reconcile(10).unwrap();
    let first = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(first.failed_links_deferred, 1);

    let second = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(second.failed_links_dropped, 1);
    assert!(fx.staging.fetch_failed_links().unwrap().is_empty());
}

#[test]
fn test_placeholder_is_removed_when_link_fails() {
    let fx = Fixture::new();
    // Source resolves to a fresh placeholder, target fails validation.
    fx.staging.stage_link("Ghost", "").unwrap();
    fx.reconciler.reconcile(10).unwrap();

    assert!(fx
        .content
        .find_docs_by_title("Ghost", true)
        .unwrap()
        .is_empty());
}

// === Placeholders and link counting ===

#[test]
fn test_link_ingestion_creates_placeholders() {
    let fx = Fixture::new();
    fx.staging.stage_link("Report A", "Report B").unwrap();

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.links_ingested, 1);
    assert_eq!(report.placeholders_created, 2);

    let from = fx.doc_by_title("Report A");
    let to = fx.doc_by_title("Report B");
    assert_eq!(from.expected_links, UNKNOWN_LINK_COUNT);
    assert!(to.file.is_none());

    let links = fx.content.links_from(from.id).unwrap();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].to, to.id);
    assert_eq!(links[0].label, "Report A -> Report B");
}

#[test]
fn test_shared_source_title_creates_one_placeholder() {
    let fx = Fixture::new();
    fx.staging.stage_link("Report A", "Report B").unwrap();
    fx.staging.stage_link("Report A", "Report C").unwrap();

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.links_ingested, 2);
    // A once, B once, C once.
    assert_eq!(report.placeholders_created, 3);

    let from = fx.doc_by_title("Report A");
    assert_eq!(fx.content.count_active_links_from(from.id).unwrap(), 2);
}

#[test]
fn test_link_count_completion_exact() {
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");
    fx.staging
        .stage_doc("Report A", "", Some(file.id), 2)
        .unwrap();
    fx.staging.stage_link("Report A", "Report B").unwrap();
    fx.staging.stage_link("Report A", "Report C").unwrap();

    fx.reconciler.reconcile(10).unwrap();

    assert_eq!(fx.file_record(&file).links_status, ProcessStatus::Processed);
}

#[test]
fn test_link_count_below_expected_stays_processing() {
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");
    fx.staging
        .stage_doc("Report A", "", Some(file.id), 3)
        .unwrap();
    fx.staging.stage_link("Report A", "Report B").unwrap();
    fx.staging.stage_link("Report A", "Report C").unwrap();

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.link_count_anomalies, 0);
    assert_eq!(
        fx.file_record(&file).links_status,
        ProcessStatus::Processing
    );
}

#[test]
fn test_link_count_above_expected_is_an_anomaly_but_still_processed() {
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");
    fx.staging
        .stage_doc("Report A", "", Some(file.id), 1)
        .unwrap();
    fx.staging.stage_link("Report A", "Report B").unwrap();
    fx.staging.stage_link("Report A", "Report C").unwrap();

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.link_count_anomalies, 1);
    assert_eq!(fx.file_record(&file).links_status, ProcessStatus::Processed);
}

#[test]
fn test_unknown_link_count_suppresses_completion() {
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");
    fx.staging
        .stage_doc("Report A", "", Some(file.id), UNKNOWN_LINK_COUNT)
        .unwrap();
    fx.staging.stage_link("Report A", "Report B").unwrap();

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.link_count_anomalies, 0);
    assert_eq!(
        fx.file_record(&file).links_status,
        ProcessStatus::Processing
    );
}

// === Full scenario and idempotence ===

#[test]
fn test_report_a_b_c_scenario() {
    let fx = Fixture::new();
    let file = fx.register_file("report-a.pdf");

    fx.staging
        .stage_doc("Report A", "", Some(file.id), 2)
        .unwrap();
    fx.staging.stage_link("Report A", "Report B").unwrap();
    fx.staging.stage_link("Report A", "Report C").unwrap();

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report.docs_ingested, 1);
    assert_eq!(report.links_ingested, 2);
    assert_eq!(report.placeholders_created, 2);

    let a = fx.doc_by_title("Report A");
    let b = fx.doc_by_title("Report B");
    let c = fx.doc_by_title("Report C");
    assert_eq!(a.expected_links, 2);
    assert_eq!(b.expected_links, UNKNOWN_LINK_COUNT);
    assert_eq!(c.expected_links, UNKNOWN_LINK_COUNT);

    assert_eq!(fx.content.count_active_links_from(a.id).unwrap(), 2);

    let record = fx.file_record(&file);
    assert_eq!(record.doc_status, ProcessStatus::Processed);
    assert_eq!(record.links_status, ProcessStatus::Processed);
    assert!(record.is_fully_processed());

    assert!(fx.staging.fetch_pending_docs(10).unwrap().is_empty());
    assert!(fx.staging.fetch_pending_links(10).unwrap().is_empty());
}

#[test]
fn test_terminal_statuses_survive_further_runs() {
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");
    fx.staging
        .stage_doc("Report A", "", Some(file.id), 1)
        .unwrap();
    fx.staging.stage_link("Report A", "Report B").unwrap();
    fx.reconciler.reconcile(10).unwrap();
    assert_eq!(fx.file_record(&file).links_status, ProcessStatus::Processed);

    let report = fx.reconciler.reconcile(10).unwrap();
    assert_eq!(report, ReconcileReport::default());

    let record = fx.file_record(&file);
    assert_eq!(record.doc_status, ProcessStatus::Processed);
    assert_eq!(record.links_status, ProcessStatus::Processed);
}

#[test]
fn test_new_success_overwrites_failed_doc_status() {
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");

    // A failed path sweep drives the document track to Failed.
    let path = fx.staging.stage_path("a.pdf", None, file.id).unwrap();
    fx.staging.mark_failed(StagedKind::Path, path).unwrap();
    fx.reconciler.reconcile(10).unwrap();
    assert_eq!(fx.file_record(&file).doc_status, ProcessStatus::Failed);

    // A later successful ingestion for the same file re-asserts Processed.
    fx.staging
        .stage_doc("Report A", "", Some(file.id), 0)
        .unwrap();
    fx.reconciler.reconcile(10).unwrap();
    assert_eq!(fx.file_record(&file).doc_status, ProcessStatus::Processed);
}

#[test]
fn test_reapplied_staged_document_is_a_noop() {
    // A crash between content commit and staged delete leaves the row
    // behind; re-processing it must not duplicate the document.
    let fx = Fixture::new();
    let file = fx.register_file("a.pdf");

    fx.staging
        .stage_doc("Report A", "meta", Some(file.id), 1)
        .unwrap();
    fx.reconciler.reconcile(10).unwrap();

    fx.staging
        .stage_doc("Report A", "meta", Some(file.id), 1)
        .unwrap();
    fx.reconciler.reconcile(10).unwrap();

    assert_eq!(fx.content.list_documents().unwrap().len(), 1);
}
