//! SQLite backend for the pipeline staging store
//!
//! The staging database is a separate file from the content store: the two
//! are distinct transactional domains, and a crash between a content commit
//! and the matching staged-row delete leaves the row behind for the next
//! run.

use super::traits::{OpenStore, StagingStore, StorageError, StorageResult};
use crate::model::{DocFileId, StagedDoc, StagedId, StagedKind, StagedLink, StagedPath};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed staging store
///
/// One table per staged kind, each with a `failed` flag. Rows are consumed
/// oldest-first by rowid.
pub struct SqliteStagingStore {
    conn: Mutex<Connection>,
}

impl SqliteStagingStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Processed-document records from the pipeline
            CREATE TABLE IF NOT EXISTS staged_docs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                title TEXT NOT NULL,
                metadata TEXT NOT NULL,
                file_id TEXT,
                num_links INTEGER NOT NULL,
                failed INTEGER NOT NULL DEFAULT 0
            );

            -- Extracted links from the pipeline
            CREATE TABLE IF NOT EXISTS staged_links (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                from_title TEXT NOT NULL,
                to_title TEXT NOT NULL,
                failed INTEGER NOT NULL DEFAULT 0,
                sweep_attempts INTEGER NOT NULL DEFAULT 0
            );

            -- File paths handed to the pipeline
            CREATE TABLE IF NOT EXISTS staged_paths (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                pdf_path TEXT NOT NULL,
                process_path TEXT,
                file_id TEXT NOT NULL,
                failed INTEGER NOT NULL DEFAULT 0
            );

            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn table(kind: StagedKind) -> &'static str {
        match kind {
            StagedKind::Doc => "staged_docs",
            StagedKind::Link => "staged_links",
            StagedKind::Path => "staged_paths",
        }
    }

    fn parse_file_id(s: &str) -> StorageResult<DocFileId> {
        s.parse().map_err(|_| StorageError::IdParse(s.to_string()))
    }

    fn fetch_docs(&self, failed: bool, limit: Option<usize>) -> StorageResult<Vec<StagedDoc>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT id, title, metadata, file_id, num_links, failed
             FROM staged_docs WHERE failed = ?1 ORDER BY id",
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![failed], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, bool>(5)?,
            ))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, title, metadata, file_id, num_links, failed) = row?;
            docs.push(StagedDoc {
                id: StagedId(id),
                title,
                metadata,
                file: file_id.as_deref().map(Self::parse_file_id).transpose()?,
                num_links,
                failed,
            });
        }

        Ok(docs)
    }

    fn fetch_links(&self, failed: bool, limit: Option<usize>) -> StorageResult<Vec<StagedLink>> {
        let conn = self.conn.lock().unwrap();

        let mut sql = String::from(
            "SELECT id, from_title, to_title, failed, sweep_attempts
             FROM staged_links WHERE failed = ?1 ORDER BY id",
        );
        if let Some(limit) = limit {
            sql.push_str(&format!(" LIMIT {}", limit));
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt.query_map(params![failed], |row| {
            Ok(StagedLink {
                id: StagedId(row.get(0)?),
                from_title: row.get(1)?,
                to_title: row.get(2)?,
                failed: row.get(3)?,
                sweep_attempts: row.get::<_, i64>(4)? as u32,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }
}

impl OpenStore for SqliteStagingStore {
    fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn open_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }
}

impl StagingStore for SqliteStagingStore {
    // === Enqueue ===

    fn stage_doc(
        &self,
        title: &str,
        metadata: &str,
        file: Option<DocFileId>,
        num_links: i64,
    ) -> StorageResult<StagedId> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO staged_docs (title, metadata, file_id, num_links) VALUES (?1, ?2, ?3, ?4)",
            params![title, metadata, file.map(|f| f.to_string()), num_links],
        )?;
        Ok(StagedId(conn.last_insert_rowid()))
    }

    fn stage_link(&self, from_title: &str, to_title: &str) -> StorageResult<StagedId> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO staged_links (from_title, to_title) VALUES (?1, ?2)",
            params![from_title, to_title],
        )?;
        Ok(StagedId(conn.last_insert_rowid()))
    }

    fn stage_path(
        &self,
        pdf_path: &str,
        process_path: Option<&str>,
        file: DocFileId,
    ) -> StorageResult<StagedId> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "INSERT INTO staged_paths (pdf_path, process_path, file_id) VALUES (?1, ?2, ?3)",
            params![pdf_path, process_path, file.to_string()],
        )?;
        Ok(StagedId(conn.last_insert_rowid()))
    }

    // === Dequeue ===

    fn fetch_pending_docs(&self, limit: usize) -> StorageResult<Vec<StagedDoc>> {
        self.fetch_docs(false, Some(limit))
    }

    fn fetch_pending_links(&self, limit: usize) -> StorageResult<Vec<StagedLink>> {
        self.fetch_links(false, Some(limit))
    }

    fn fetch_failed_docs(&self) -> StorageResult<Vec<StagedDoc>> {
        self.fetch_docs(true, None)
    }

    fn fetch_failed_links(&self) -> StorageResult<Vec<StagedLink>> {
        self.fetch_links(true, None)
    }

    fn fetch_failed_paths(&self) -> StorageResult<Vec<StagedPath>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, pdf_path, process_path, file_id, failed
             FROM staged_paths WHERE failed = 1 ORDER BY id",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
            ))
        })?;

        let mut paths = Vec::new();
        for row in rows {
            let (id, pdf_path, process_path, file_id, failed) = row?;
            paths.push(StagedPath {
                id: StagedId(id),
                pdf_path,
                process_path,
                file: Self::parse_file_id(&file_id)?,
                failed,
            });
        }

        Ok(paths)
    }

    // === Row state ===

    fn mark_failed(&self, kind: StagedKind, id: StagedId) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("UPDATE {} SET failed = 1 WHERE id = ?1", Self::table(kind)),
            params![id.0],
        )?;
        Ok(())
    }

    fn delete(&self, kind: StagedKind, id: StagedId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            &format!("DELETE FROM {} WHERE id = ?1", Self::table(kind)),
            params![id.0],
        )?;
        Ok(rows > 0)
    }

    fn bump_link_sweep_attempts(&self, id: StagedId) -> StorageResult<u32> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE staged_links SET sweep_attempts = sweep_attempts + 1 WHERE id = ?1",
            params![id.0],
        )?;
        let attempts: i64 = conn.query_row(
            "SELECT sweep_attempts FROM staged_links WHERE id = ?1",
            params![id.0],
            |row| row.get(0),
        )?;
        Ok(attempts as u32)
    }
}
