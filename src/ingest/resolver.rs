//! Lookup-or-create resolution of documents by title

use crate::model::{DocId, Document};
use crate::storage::{ContentStore, StorageResult};
use dashmap::DashMap;
use std::sync::{Arc, Mutex};

/// Outcome of a title resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub id: DocId,
    /// A new document was created to satisfy the lookup
    pub created: bool,
}

/// Resolves a document title to a document id, creating the document when
/// it does not exist yet.
///
/// Creation is persisted immediately so that a later lookup in the same
/// batch observes it; this is what keeps several links sharing a title from
/// spawning duplicate placeholders. Resolution of the same title is
/// additionally serialized through a per-title lock, so concurrent batches
/// cannot double-create either.
pub struct DocResolver {
    content: Arc<dyn ContentStore>,
    title_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl DocResolver {
    pub fn new(content: Arc<dyn ContentStore>) -> Self {
        Self {
            content,
            title_locks: DashMap::new(),
        }
    }

    /// Resolve an active document by exact title.
    ///
    /// On a miss the document returned by `create` is saved and its id
    /// returned with `created = true`.
    pub fn resolve<F>(&self, title: &str, create: F) -> StorageResult<Resolution>
    where
        F: FnOnce() -> Document,
    {
        let lock = self
            .title_locks
            .entry(title.to_string())
            .or_default()
            .clone();
        let _guard = lock.lock().unwrap();

        let ids = self.content.find_docs_by_title(title, true)?;
        if let Some(&id) = ids.first() {
            return Ok(Resolution { id, created: false });
        }

        let doc = create();
        self.content.save_document(&doc)?;
        Ok(Resolution {
            id: doc.id,
            created: true,
        })
    }
}
