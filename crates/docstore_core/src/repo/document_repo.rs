//! Document repository contract and SQLite implementation.
//!
//! # Invariants
//! - `FolderFilter::Named` matches the immediate folder name only; it is not
//!   a path or descendant match.
//! - Listing order is deterministic: `name ASC, id ASC`.

use super::{
    in_write_tx, parse_optional_uuid, parse_uuid, RepoError, RepoResult, DOCUMENT_TOPICS,
};
use crate::db::ensure_schema_ready;
use crate::model::document::{Document, DocumentId};
use crate::model::folder::FolderId;
use crate::model::topic::TopicId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const DOCUMENT_SELECT_SQL: &str = "SELECT
    d.id AS id,
    d.name AS name,
    d.folder_id AS folder_id,
    d.contents AS contents
FROM documents d";

/// Folder constraint for document listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FolderFilter {
    /// Documents with no folder.
    Unfiled,
    /// Documents whose immediate folder has this name.
    Named(String),
    /// Documents directly inside this folder.
    Id(FolderId),
}

impl FolderFilter {
    /// Maps the `?folder=` query value: empty means unfiled.
    pub fn from_query_value(value: &str) -> Self {
        if value.is_empty() {
            Self::Unfiled
        } else {
            Self::Named(value.to_string())
        }
    }
}

/// Query options for listing documents.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentListQuery {
    /// Exact match on a related topic's `short_desc`.
    pub topic: Option<String>,
    pub topic_id: Option<TopicId>,
    pub folder: Option<FolderFilter>,
}

/// Repository interface for document CRUD operations.
pub trait DocumentRepository {
    fn create_document(&self, document: &Document) -> RepoResult<DocumentId>;
    /// Full replace of name, folder, contents and topic set.
    fn replace_document(&self, document: &Document) -> RepoResult<()>;
    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>>;
    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>>;
    /// Returns whether a row was removed.
    fn delete_document(&self, id: DocumentId) -> RepoResult<bool>;
}

/// SQLite-backed document repository.
pub struct SqliteDocumentRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteDocumentRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["documents", "document_topics"])?;
        Ok(Self { conn })
    }
}

impl DocumentRepository for SqliteDocumentRepository<'_> {
    fn create_document(&self, document: &Document) -> RepoResult<DocumentId> {
        document.validate()?;

        in_write_tx(self.conn, |conn| {
            conn.execute(
                "INSERT INTO documents (id, name, folder_id, contents) VALUES (?1, ?2, ?3, ?4);",
                params![
                    document.id.to_string(),
                    document.name.as_str(),
                    document.folder.map(|value| value.to_string()),
                    document.contents.as_str(),
                ],
            )?;
            DOCUMENT_TOPICS.replace(conn, document.id, &document.topics)?;
            Ok(document.id)
        })
    }

    fn replace_document(&self, document: &Document) -> RepoResult<()> {
        document.validate()?;

        in_write_tx(self.conn, |conn| {
            let changed = conn.execute(
                "UPDATE documents
                 SET
                    name = ?2,
                    folder_id = ?3,
                    contents = ?4,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    document.id.to_string(),
                    document.name.as_str(),
                    document.folder.map(|value| value.to_string()),
                    document.contents.as_str(),
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    kind: "document",
                    id: document.id,
                });
            }
            DOCUMENT_TOPICS.replace(conn, document.id, &document.topics)
        })
    }

    fn get_document(&self, id: DocumentId) -> RepoResult<Option<Document>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{DOCUMENT_SELECT_SQL} WHERE d.id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_document_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_documents(&self, query: &DocumentListQuery) -> RepoResult<Vec<Document>> {
        let mut sql = format!("{DOCUMENT_SELECT_SQL} WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(topic) = query.topic.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM document_topics dt
                    INNER JOIN topics t ON t.id = dt.topic_id
                    WHERE dt.document_id = d.id
                      AND t.short_desc = ?
                )",
            );
            bind_values.push(Value::Text(topic.clone()));
        }

        if let Some(topic_id) = query.topic_id {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM document_topics dt
                    WHERE dt.document_id = d.id
                      AND dt.topic_id = ?
                )",
            );
            bind_values.push(Value::Text(topic_id.to_string()));
        }

        match query.folder.as_ref() {
            None => {}
            Some(FolderFilter::Unfiled) => sql.push_str(" AND d.folder_id IS NULL"),
            Some(FolderFilter::Named(name)) => {
                sql.push_str(
                    " AND EXISTS (
                        SELECT 1
                        FROM folders p
                        WHERE p.id = d.folder_id
                          AND p.name = ?
                    )",
                );
                bind_values.push(Value::Text(name.clone()));
            }
            Some(FolderFilter::Id(folder_id)) => {
                sql.push_str(" AND d.folder_id = ?");
                bind_values.push(Value::Text(folder_id.to_string()));
            }
        }

        sql.push_str(" ORDER BY d.name ASC, d.id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut documents = Vec::new();
        while let Some(row) = rows.next()? {
            documents.push(parse_document_row(self.conn, row)?);
        }
        Ok(documents)
    }

    fn delete_document(&self, id: DocumentId) -> RepoResult<bool> {
        in_write_tx(self.conn, |conn| {
            let changed =
                conn.execute("DELETE FROM documents WHERE id = ?1;", [id.to_string()])?;
            Ok(changed > 0)
        })
    }
}

fn parse_document_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Document> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "documents.id")?;
    let document = Document {
        id,
        name: row.get("name")?,
        folder: parse_optional_uuid(row.get("folder_id")?, "documents.folder_id")?,
        topics: DOCUMENT_TOPICS.load(conn, id)?,
        contents: row.get("contents")?,
    };
    document
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("document {id}: {err}")))?;
    Ok(document)
}
