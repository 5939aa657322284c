//! Folder repository contract and SQLite implementation.
//!
//! # Responsibility
//! - Persist the folder forest and folder topic associations.
//! - Provide the folder arena used for path derivation.
//!
//! # Invariants
//! - Deleting a folder cascades to child folders and contained documents
//!   through `ON DELETE CASCADE` (requires `foreign_keys=ON`).
//! - Listing order is deterministic: `name ASC, id ASC`.

use super::{
    in_write_tx, parse_optional_uuid, parse_uuid, RepoError, RepoResult, FOLDER_TOPICS,
};
use crate::db::ensure_schema_ready;
use crate::model::folder::{Folder, FolderId};
use crate::model::path::FolderIndex;
use crate::model::topic::TopicId;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

/// Query options for listing folders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FolderListQuery {
    /// Exact match on a related topic's `short_desc`.
    pub topic: Option<String>,
    /// Restricts to folders associated with this topic id.
    pub topic_id: Option<TopicId>,
}

/// Repository interface for folder CRUD operations.
pub trait FolderRepository {
    fn create_folder(&self, folder: &Folder) -> RepoResult<FolderId>;
    /// Full replace of name, parent and topic set.
    fn replace_folder(&self, folder: &Folder) -> RepoResult<()>;
    fn get_folder(&self, id: FolderId) -> RepoResult<Option<Folder>>;
    fn list_folders(&self, query: &FolderListQuery) -> RepoResult<Vec<Folder>>;
    /// Returns whether a row was removed (descendants go with it).
    fn delete_folder(&self, id: FolderId) -> RepoResult<bool>;
    /// Loads every folder's name and parent link.
    fn folder_index(&self) -> RepoResult<FolderIndex>;
}

/// SQLite-backed folder repository.
pub struct SqliteFolderRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFolderRepository<'conn> {
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["folders", "folder_topics"])?;
        Ok(Self { conn })
    }
}

impl FolderRepository for SqliteFolderRepository<'_> {
    fn create_folder(&self, folder: &Folder) -> RepoResult<FolderId> {
        folder.validate()?;

        in_write_tx(self.conn, |conn| {
            conn.execute(
                "INSERT INTO folders (id, name, parent_id) VALUES (?1, ?2, ?3);",
                params![
                    folder.id.to_string(),
                    folder.name.as_str(),
                    folder.parent.map(|value| value.to_string()),
                ],
            )?;
            FOLDER_TOPICS.replace(conn, folder.id, &folder.topics)?;
            Ok(folder.id)
        })
    }

    fn replace_folder(&self, folder: &Folder) -> RepoResult<()> {
        folder.validate()?;

        in_write_tx(self.conn, |conn| {
            let changed = conn.execute(
                "UPDATE folders
                 SET
                    name = ?2,
                    parent_id = ?3,
                    updated_at = (strftime('%s', 'now') * 1000)
                 WHERE id = ?1;",
                params![
                    folder.id.to_string(),
                    folder.name.as_str(),
                    folder.parent.map(|value| value.to_string()),
                ],
            )?;
            if changed == 0 {
                return Err(RepoError::NotFound {
                    kind: "folder",
                    id: folder.id,
                });
            }
            FOLDER_TOPICS.replace(conn, folder.id, &folder.topics)
        })
    }

    fn get_folder(&self, id: FolderId) -> RepoResult<Option<Folder>> {
        let mut stmt = self
            .conn
            .prepare("SELECT id, name, parent_id FROM folders WHERE id = ?1;")?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_folder_row(self.conn, row)?));
        }
        Ok(None)
    }

    fn list_folders(&self, query: &FolderListQuery) -> RepoResult<Vec<Folder>> {
        let mut sql = String::from("SELECT id, name, parent_id FROM folders f WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if let Some(topic) = query.topic.as_ref() {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM folder_topics ft
                    INNER JOIN topics t ON t.id = ft.topic_id
                    WHERE ft.folder_id = f.id
                      AND t.short_desc = ?
                )",
            );
            bind_values.push(Value::Text(topic.clone()));
        }

        if let Some(topic_id) = query.topic_id {
            sql.push_str(
                " AND EXISTS (
                    SELECT 1
                    FROM folder_topics ft
                    WHERE ft.folder_id = f.id
                      AND ft.topic_id = ?
                )",
            );
            bind_values.push(Value::Text(topic_id.to_string()));
        }

        sql.push_str(" ORDER BY name ASC, id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut folders = Vec::new();
        while let Some(row) = rows.next()? {
            folders.push(parse_folder_row(self.conn, row)?);
        }
        Ok(folders)
    }

    fn delete_folder(&self, id: FolderId) -> RepoResult<bool> {
        in_write_tx(self.conn, |conn| {
            let changed = conn.execute("DELETE FROM folders WHERE id = ?1;", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    fn folder_index(&self) -> RepoResult<FolderIndex> {
        let mut stmt = self.conn.prepare("SELECT id, name, parent_id FROM folders;")?;
        let mut rows = stmt.query([])?;
        let mut index = FolderIndex::new();
        while let Some(row) = rows.next()? {
            let id_text: String = row.get("id")?;
            let parent = parse_optional_uuid(row.get("parent_id")?, "folders.parent_id")?;
            index.insert(
                parse_uuid(&id_text, "folders.id")?,
                row.get::<_, String>("name")?,
                parent,
            );
        }
        Ok(index)
    }
}

fn parse_folder_row(conn: &Connection, row: &Row<'_>) -> RepoResult<Folder> {
    let id_text: String = row.get("id")?;
    let id = parse_uuid(&id_text, "folders.id")?;
    let folder = Folder {
        id,
        name: row.get("name")?,
        parent: parse_optional_uuid(row.get("parent_id")?, "folders.parent_id")?,
        topics: FOLDER_TOPICS.load(conn, id)?,
    };
    folder
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("folder {id}: {err}")))?;
    Ok(folder)
}
