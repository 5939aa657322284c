//! Topic repository contract and SQLite implementation.
//!
//! # Invariants
//! - Deleting a topic removes its folder/document association rows only.
//! - Listing order is deterministic: `short_desc ASC, id ASC`.

use super::{in_write_tx, parse_uuid, RepoError, RepoResult};
use crate::db::ensure_schema_ready;
use crate::model::topic::{Topic, TopicId};
use rusqlite::{params, Connection, Row};

const TOPIC_SELECT_SQL: &str = "SELECT id, short_desc, full_desc FROM topics";

/// Repository interface for topic CRUD operations.
pub trait TopicRepository {
    fn create_topic(&self, topic: &Topic) -> RepoResult<TopicId>;
    /// Full replace of all topic fields; `NotFound` when the id is absent.
    fn replace_topic(&self, topic: &Topic) -> RepoResult<()>;
    fn get_topic(&self, id: TopicId) -> RepoResult<Option<Topic>>;
    fn list_topics(&self) -> RepoResult<Vec<Topic>>;
    /// Returns whether a row was removed.
    fn delete_topic(&self, id: TopicId) -> RepoResult<bool>;
    /// Returns the subset of `ids` that has no topic row, in input order.
    fn missing_topics(&self, ids: &[TopicId]) -> RepoResult<Vec<TopicId>>;
}

/// SQLite-backed topic repository.
pub struct SqliteTopicRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTopicRepository<'conn> {
    /// Creates repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_schema_ready(conn, &["topics", "folder_topics", "document_topics"])?;
        Ok(Self { conn })
    }
}

impl TopicRepository for SqliteTopicRepository<'_> {
    fn create_topic(&self, topic: &Topic) -> RepoResult<TopicId> {
        topic.validate()?;

        self.conn.execute(
            "INSERT INTO topics (id, short_desc, full_desc) VALUES (?1, ?2, ?3);",
            params![
                topic.id.to_string(),
                topic.short_desc.as_str(),
                topic.full_desc.as_str(),
            ],
        )?;
        Ok(topic.id)
    }

    fn replace_topic(&self, topic: &Topic) -> RepoResult<()> {
        topic.validate()?;

        let changed = self.conn.execute(
            "UPDATE topics
             SET
                short_desc = ?2,
                full_desc = ?3,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE id = ?1;",
            params![
                topic.id.to_string(),
                topic.short_desc.as_str(),
                topic.full_desc.as_str(),
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::NotFound {
                kind: "topic",
                id: topic.id,
            });
        }
        Ok(())
    }

    fn get_topic(&self, id: TopicId) -> RepoResult<Option<Topic>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{TOPIC_SELECT_SQL} WHERE id = ?1;"))?;
        let mut rows = stmt.query([id.to_string()])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_topic_row(row)?));
        }
        Ok(None)
    }

    fn list_topics(&self) -> RepoResult<Vec<Topic>> {
        let mut stmt = self.conn.prepare(&format!(
            "{TOPIC_SELECT_SQL} ORDER BY short_desc ASC, id ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        let mut topics = Vec::new();
        while let Some(row) = rows.next()? {
            topics.push(parse_topic_row(row)?);
        }
        Ok(topics)
    }

    fn delete_topic(&self, id: TopicId) -> RepoResult<bool> {
        in_write_tx(self.conn, |conn| {
            let changed = conn.execute("DELETE FROM topics WHERE id = ?1;", [id.to_string()])?;
            Ok(changed > 0)
        })
    }

    fn missing_topics(&self, ids: &[TopicId]) -> RepoResult<Vec<TopicId>> {
        let mut stmt = self
            .conn
            .prepare("SELECT EXISTS(SELECT 1 FROM topics WHERE id = ?1);")?;
        let mut missing = Vec::new();
        for id in ids {
            let exists: i64 = stmt.query_row([id.to_string()], |row| row.get(0))?;
            if exists == 0 {
                missing.push(*id);
            }
        }
        Ok(missing)
    }
}

fn parse_topic_row(row: &Row<'_>) -> RepoResult<Topic> {
    let id_text: String = row.get("id")?;
    let topic = Topic {
        id: parse_uuid(&id_text, "topics.id")?,
        short_desc: row.get("short_desc")?,
        full_desc: row.get("full_desc")?,
    };
    topic
        .validate()
        .map_err(|err| RepoError::InvalidData(format!("topic {}: {err}", topic.id)))?;
    Ok(topic)
}
