//! SQLite backend for the canonical content store

use super::traits::{ContentStore, OpenStore, StorageError, StorageResult};
use crate::model::{DocFile, DocFileId, DocId, Document, Link, LinkId, ProcessStatus};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::Mutex;

/// SQLite-backed content store
///
/// Uses a single SQLite database file with tables for documents, doc files,
/// and links. Thread-safe via internal mutex on the connection.
pub struct SqliteContentStore {
    conn: Mutex<Connection>,
}

impl SqliteContentStore {
    /// Initialize the database schema
    fn init_schema(conn: &Connection) -> StorageResult<()> {
        conn.execute_batch(
            r#"
            -- Documents table
            CREATE TABLE IF NOT EXISTS documents (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                metadata TEXT NOT NULL,
                file_id TEXT,
                expected_links INTEGER NOT NULL,
                active INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            );

            -- Resolution is always an exact-title lookup over active rows
            CREATE INDEX IF NOT EXISTS idx_documents_title
                ON documents(title, active);

            -- Doc files table
            CREATE TABLE IF NOT EXISTS doc_files (
                id TEXT PRIMARY KEY,
                label TEXT NOT NULL,
                source_path TEXT NOT NULL,
                aux_path TEXT,
                doc_status TEXT NOT NULL,
                links_status TEXT NOT NULL,
                sent_to_pipeline INTEGER NOT NULL,
                active INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Links table
            CREATE TABLE IF NOT EXISTS links (
                id TEXT PRIMARY KEY,
                from_id TEXT NOT NULL,
                to_id TEXT NOT NULL,
                label TEXT NOT NULL,
                active INTEGER NOT NULL,
                created_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_links_from
                ON links(from_id, active);

            PRAGMA foreign_keys = ON;

            -- WAL for concurrent reads during writes
            PRAGMA journal_mode = WAL;
            "#,
        )?;
        Ok(())
    }

    fn parse_doc_id(s: &str) -> StorageResult<DocId> {
        s.parse().map_err(|_| StorageError::IdParse(s.to_string()))
    }

    fn parse_file_id(s: &str) -> StorageResult<DocFileId> {
        s.parse().map_err(|_| StorageError::IdParse(s.to_string()))
    }

    fn parse_status(s: &str) -> StorageResult<ProcessStatus> {
        s.parse().map_err(|_| StorageError::StatusParse(s.to_string()))
    }

    fn parse_timestamp(s: &str) -> StorageResult<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|t| t.with_timezone(&Utc))
            .map_err(|e| StorageError::DateParse(e.to_string()))
    }

    #[allow(clippy::too_many_arguments)]
    fn row_to_document(
        id: String,
        title: String,
        metadata: String,
        file_id: Option<String>,
        expected_links: i64,
        active: bool,
        created_at: String,
        updated_at: String,
    ) -> StorageResult<Document> {
        Ok(Document {
            id: Self::parse_doc_id(&id)?,
            title,
            metadata,
            file: file_id.as_deref().map(Self::parse_file_id).transpose()?,
            expected_links,
            active,
            created_at: Self::parse_timestamp(&created_at)?,
            updated_at: Self::parse_timestamp(&updated_at)?,
        })
    }

    #[allow(clippy::too_many_arguments)]
    fn row_to_doc_file(
        id: String,
        label: String,
        source_path: String,
        aux_path: Option<String>,
        doc_status: String,
        links_status: String,
        sent_to_pipeline: bool,
        active: bool,
        created_at: String,
    ) -> StorageResult<DocFile> {
        Ok(DocFile {
            id: Self::parse_file_id(&id)?,
            label,
            source_path,
            aux_path,
            doc_status: Self::parse_status(&doc_status)?,
            links_status: Self::parse_status(&links_status)?,
            sent_to_pipeline,
            active,
            created_at: Self::parse_timestamp(&created_at)?,
        })
    }

    fn row_to_link(
        id: String,
        from_id: String,
        to_id: String,
        label: String,
        active: bool,
        created_at: String,
    ) -> StorageResult<Link> {
        Ok(Link {
            id: id
                .parse::<LinkId>()
                .map_err(|_| StorageError::IdParse(id.clone()))?,
            from: Self::parse_doc_id(&from_id)?,
            to: Self::parse_doc_id(&to_id)?,
            label,
            active,
            created_at: Self::parse_timestamp(&created_at)?,
        })
    }
}

impl OpenStore for SqliteContentStore {
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

impl ContentStore for SqliteContentStore {
    // === Document Operations ===

    fn save_document(&self, doc: &Document) -> StorageResult<()> {
        if doc.title.is_empty() {
            return Err(StorageError::InvalidDocument(
                "title must not be empty".to_string(),
            ));
        }

        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO documents (id, title, metadata, file_id, expected_links, active, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(id) DO UPDATE SET
                title = excluded.title,
                metadata = excluded.metadata,
                file_id = excluded.file_id,
                expected_links = excluded.expected_links,
                active = excluded.active,
                updated_at = excluded.updated_at
            "#,
            params![
                doc.id.to_string(),
                doc.title,
                doc.metadata,
                doc.file.map(|f| f.to_string()),
                doc.expected_links,
                doc.active,
                doc.created_at.to_rfc3339(),
                doc.updated_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn load_document(&self, id: DocId) -> StorageResult<Option<Document>> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                "SELECT id, title, metadata, file_id, expected_links, active, created_at, updated_at
                 FROM documents WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, i64>(4)?,
                        row.get::<_, bool>(5)?,
                        row.get::<_, String>(6)?,
                        row.get::<_, String>(7)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, title, metadata, file_id, expected, active, created, updated)) => Ok(Some(
                Self::row_to_document(id, title, metadata, file_id, expected, active, created, updated)?,
            )),
            None => Ok(None),
        }
    }

    fn delete_document(&self, id: DocId) -> StorageResult<bool> {
        let conn = self.conn.lock().unwrap();
        let rows = conn.execute(
            "DELETE FROM documents WHERE id = ?1",
            params![id.to_string()],
        )?;
        Ok(rows > 0)
    }

    fn find_docs_by_title(&self, title: &str, active_only: bool) -> StorageResult<Vec<DocId>> {
        let conn = self.conn.lock().unwrap();

        let sql = if active_only {
            "SELECT id FROM documents WHERE title = ?1 AND active = 1 ORDER BY created_at"
        } else {
            "SELECT id FROM documents WHERE title = ?1 ORDER BY created_at"
        };

        let mut stmt = conn.prepare(sql)?;
        let ids = stmt
            .query_map(params![title], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        ids.iter().map(|s| Self::parse_doc_id(s)).collect()
    }

    fn list_documents(&self) -> StorageResult<Vec<Document>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, title, metadata, file_id, expected_links, active, created_at, updated_at
             FROM documents ORDER BY created_at",
        )?;
        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, i64>(4)?,
                row.get::<_, bool>(5)?,
                row.get::<_, String>(6)?,
                row.get::<_, String>(7)?,
            ))
        })?;

        let mut docs = Vec::new();
        for row in rows {
            let (id, title, metadata, file_id, expected, active, created, updated) = row?;
            docs.push(Self::row_to_document(
                id, title, metadata, file_id, expected, active, created, updated,
            )?);
        }

        Ok(docs)
    }

    // === DocFile Operations ===

    fn save_doc_file(&self, file: &DocFile) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO doc_files (id, label, source_path, aux_path, doc_status, links_status,
                                   sent_to_pipeline, active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            ON CONFLICT(id) DO UPDATE SET
                label = excluded.label,
                source_path = excluded.source_path,
                aux_path = excluded.aux_path,
                doc_status = excluded.doc_status,
                links_status = excluded.links_status,
                sent_to_pipeline = excluded.sent_to_pipeline,
                active = excluded.active
            "#,
            params![
                file.id.to_string(),
                file.label,
                file.source_path,
                file.aux_path,
                file.doc_status.as_str(),
                file.links_status.as_str(),
                file.sent_to_pipeline,
                file.active,
                file.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn load_doc_file(&self, id: DocFileId) -> StorageResult<Option<DocFile>> {
        let conn = self.conn.lock().unwrap();

        let row = conn
            .query_row(
                "SELECT id, label, source_path, aux_path, doc_status, links_status,
                        sent_to_pipeline, active, created_at
                 FROM doc_files WHERE id = ?1",
                params![id.to_string()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, Option<String>>(3)?,
                        row.get::<_, String>(4)?,
                        row.get::<_, String>(5)?,
                        row.get::<_, bool>(6)?,
                        row.get::<_, bool>(7)?,
                        row.get::<_, String>(8)?,
                    ))
                },
            )
            .optional()?;

        match row {
            Some((id, label, source, aux, doc_status, links_status, sent, active, created)) => {
                Ok(Some(Self::row_to_doc_file(
                    id, label, source, aux, doc_status, links_status, sent, active, created,
                )?))
            }
            None => Ok(None),
        }
    }

    // === Link Operations ===

    fn create_link(&self, link: &Link) -> StorageResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            r#"
            INSERT INTO links (id, from_id, to_id, label, active, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
            params![
                link.id.to_string(),
                link.from.to_string(),
                link.to.to_string(),
                link.label,
                link.active,
                link.created_at.to_rfc3339(),
            ],
        )?;

        Ok(())
    }

    fn links_from(&self, doc: DocId) -> StorageResult<Vec<Link>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn.prepare(
            "SELECT id, from_id, to_id, label, active, created_at
             FROM links WHERE from_id = ?1 ORDER BY created_at",
        )?;
        let rows = stmt.query_map(params![doc.to_string()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
                row.get::<_, bool>(4)?,
                row.get::<_, String>(5)?,
            ))
        })?;

        let mut links = Vec::new();
        for row in rows {
            let (id, from, to, label, active, created) = row?;
            links.push(Self::row_to_link(id, from, to, label, active, created)?);
        }

        Ok(links)
    }

    fn count_active_links_from(&self, doc: DocId) -> StorageResult<usize> {
        let conn = self.conn.lock().unwrap();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM links WHERE from_id = ?1 AND active = 1",
            params![doc.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as usize)
    }
}
