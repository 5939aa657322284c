//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define per-entity data access contracts (create/read/replace/delete and
//!   filtered listing).
//! - Isolate SQL details from resource handlers and transfer logic.
//!
//! # Invariants
//! - Write paths call the entity `validate()` before SQL mutations.
//! - Entity rows and their topic association rows change in one transaction.
//! - Read paths reject invalid persisted state instead of masking it.

use crate::db::DbError;
use crate::model::path::PathError;
use crate::model::topic::TopicId;
use crate::model::validation::FieldErrors;
use rusqlite::{params, Connection, Transaction, TransactionBehavior};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod document_repo;
pub mod folder_repo;
pub mod topic_repo;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by all entity repositories.
#[derive(Debug)]
pub enum RepoError {
    Validation(FieldErrors),
    Db(DbError),
    NotFound { kind: &'static str, id: Uuid },
    InvalidData(String),
    Path(PathError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { kind, id } => write!(f, "{kind} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::Path(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::Path(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<FieldErrors> for RepoError {
    fn from(value: FieldErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<PathError> for RepoError {
    fn from(value: PathError) -> Self {
        Self::Path(value)
    }
}

/// Runs `f` inside an immediate write transaction.
///
/// When the connection is already inside a transaction (for example a bulk
/// load) `f` joins it instead of opening a nested one.
pub(crate) fn in_write_tx<T>(
    conn: &Connection,
    f: impl FnOnce(&Connection) -> RepoResult<T>,
) -> RepoResult<T> {
    if !conn.is_autocommit() {
        return f(conn);
    }

    let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)?;
    let value = f(&tx)?;
    tx.commit()?;
    Ok(value)
}

/// Association table linking an owner row to topics.
#[derive(Debug, Clone, Copy)]
pub(crate) struct TopicLinks {
    pub table: &'static str,
    pub owner_column: &'static str,
}

pub(crate) const FOLDER_TOPICS: TopicLinks = TopicLinks {
    table: "folder_topics",
    owner_column: "folder_id",
};

pub(crate) const DOCUMENT_TOPICS: TopicLinks = TopicLinks {
    table: "document_topics",
    owner_column: "document_id",
};

impl TopicLinks {
    /// Replaces the whole topic set of `owner`.
    pub fn replace(&self, conn: &Connection, owner: Uuid, topics: &[TopicId]) -> RepoResult<()> {
        conn.execute(
            &format!("DELETE FROM {} WHERE {} = ?1;", self.table, self.owner_column),
            [owner.to_string()],
        )?;

        let insert_sql = format!(
            "INSERT OR IGNORE INTO {} ({}, topic_id) VALUES (?1, ?2);",
            self.table, self.owner_column
        );
        for topic in topics {
            conn.execute(&insert_sql, params![owner.to_string(), topic.to_string()])?;
        }
        Ok(())
    }

    /// Loads topic ids of `owner`, sorted.
    pub fn load(&self, conn: &Connection, owner: Uuid) -> RepoResult<Vec<TopicId>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT topic_id FROM {} WHERE {} = ?1 ORDER BY topic_id ASC;",
            self.table, self.owner_column
        ))?;
        let mut rows = stmt.query([owner.to_string()])?;
        let mut topics = Vec::new();
        while let Some(row) = rows.next()? {
            let value: String = row.get(0)?;
            topics.push(parse_uuid(&value, self.table)?);
        }
        topics.sort_unstable();
        Ok(topics)
    }
}

pub(crate) fn parse_uuid(value: &str, column: &str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

pub(crate) fn parse_optional_uuid(value: Option<String>, column: &str) -> RepoResult<Option<Uuid>> {
    value.map(|value| parse_uuid(&value, column)).transpose()
}
