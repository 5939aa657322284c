//! Framework-independent resource handlers.
//!
//! # Responsibility
//! - Implement list/create/retrieve/replace/delete for each entity on top of
//!   the repositories and the `rest` codec.
//! - Classify failures into the HTTP-facing taxonomy (`ResourceError`).
//!
//! # Invariants
//! - Delete is idempotent: it reports `NoContent` whether or not a row existed.
//! - Referenced ids (topics, parent, folder) must exist before a write.
//! - Paths are derived from one folder snapshot per call.

use crate::model::document::Document;
use crate::model::folder::Folder;
use crate::model::path::{FolderIndex, Located, PathError};
use crate::model::topic::TopicId;
use crate::model::validation::{missing_object_message, FieldErrors};
use crate::repo::document_repo::SqliteDocumentRepository;
use crate::repo::folder_repo::{FolderRepository, SqliteFolderRepository};
use crate::repo::topic_repo::{SqliteTopicRepository, TopicRepository};
use crate::repo::{RepoError, RepoResult};
use rusqlite::Connection;
use serde_json::{json, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

pub mod document;
pub mod folder;
pub mod topic;

pub use document::DocumentResource;
pub use folder::FolderResource;
pub use topic::TopicResource;

pub(crate) const MSG_ID_MISMATCH: &str = "Does not match the identifier in the URL.";
pub(crate) const MSG_ID_TAKEN: &str = "An object with this id already exists.";

pub type ResourceResult<T> = Result<T, ResourceError>;

/// Successful handler outcome.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// 200 with body.
    Ok(Value),
    /// 201 with body.
    Created(Value),
    /// 204 without body.
    NoContent,
}

impl Reply {
    pub fn status(&self) -> u16 {
        match self {
            Self::Ok(_) => 200,
            Self::Created(_) => 201,
            Self::NoContent => 204,
        }
    }

    pub fn body(&self) -> Option<&Value> {
        match self {
            Self::Ok(body) | Self::Created(body) => Some(body),
            Self::NoContent => None,
        }
    }
}

/// Handler failure taxonomy.
#[derive(Debug)]
pub enum ResourceError {
    /// Input decoded but failed validation; 400 with `{field: [messages]}`.
    Validation(FieldErrors),
    /// Body is not JSON; 400 with `{"detail": ...}`.
    Malformed(String),
    /// Target entity does not exist; 404.
    NotFound(Uuid),
    /// Persistence failure; 500.
    Store(RepoError),
}

impl ResourceError {
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) | Self::Malformed(_) => 400,
            Self::NotFound(_) => 404,
            Self::Store(_) => 500,
        }
    }

    /// Response body. Store failures never expose internal detail.
    pub fn body(&self) -> Value {
        match self {
            Self::Validation(errors) => {
                serde_json::to_value(errors).unwrap_or_else(|_| json!({}))
            }
            Self::Malformed(detail) => json!({ "detail": detail }),
            Self::NotFound(_) => json!({ "detail": "Not found." }),
            Self::Store(_) => json!({ "detail": "internal server error" }),
        }
    }
}

impl Display for ResourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "validation failed: {err}"),
            Self::Malformed(detail) => write!(f, "{detail}"),
            Self::NotFound(id) => write!(f, "not found: {id}"),
            Self::Store(err) => write!(f, "{err}"),
        }
    }
}

impl Error for ResourceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Store(err) => Some(err),
            Self::Malformed(_) | Self::NotFound(_) => None,
        }
    }
}

impl From<FieldErrors> for ResourceError {
    fn from(value: FieldErrors) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for ResourceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(errors) => Self::Validation(errors),
            RepoError::NotFound { id, .. } => Self::NotFound(id),
            other => Self::Store(other),
        }
    }
}

impl From<PathError> for ResourceError {
    fn from(value: PathError) -> Self {
        Self::Store(RepoError::Path(value))
    }
}

/// Parses a raw request body as JSON.
pub fn parse_body(body: &[u8]) -> ResourceResult<Value> {
    serde_json::from_slice(body)
        .map_err(|err| ResourceError::Malformed(format!("JSON parse error - {err}")))
}

/// Repositories shared by all handlers over one connection.
pub(crate) struct Repos<'conn> {
    pub topics: SqliteTopicRepository<'conn>,
    pub folders: SqliteFolderRepository<'conn>,
    pub documents: SqliteDocumentRepository<'conn>,
}

impl<'conn> Repos<'conn> {
    pub fn open(conn: &'conn Connection) -> RepoResult<Self> {
        Ok(Self {
            topics: SqliteTopicRepository::try_new(conn)?,
            folders: SqliteFolderRepository::try_new(conn)?,
            documents: SqliteDocumentRepository::try_new(conn)?,
        })
    }

    /// Adds one complaint under `topics` per id with no topic row.
    pub fn check_topics(&self, errors: &mut FieldErrors, topics: &[TopicId]) -> RepoResult<()> {
        for missing in self.topics.missing_topics(topics)? {
            errors.add("topics", missing_object_message(missing));
        }
        Ok(())
    }

    pub fn locate_folders(
        &self,
        index: &FolderIndex,
        folders: Vec<Folder>,
    ) -> RepoResult<Vec<Located<Folder>>> {
        folders
            .into_iter()
            .map(|folder| -> RepoResult<Located<Folder>> {
                let path = index.folder_path(folder.id)?;
                Ok(Located::new(folder, path))
            })
            .collect()
    }

    pub fn locate_documents(
        &self,
        index: &FolderIndex,
        documents: Vec<Document>,
    ) -> RepoResult<Vec<Located<Document>>> {
        documents
            .into_iter()
            .map(|document| -> RepoResult<Located<Document>> {
                let path = index.document_path(&document.name, document.folder)?;
                Ok(Located::new(document, path))
            })
            .collect()
    }

    pub fn folder_index(&self) -> RepoResult<FolderIndex> {
        self.folders.folder_index()
    }
}

/// Complains when a body `id` disagrees with the addressed entity.
pub(crate) fn check_body_id(errors: &mut FieldErrors, supplied: Option<Uuid>, addressed: Uuid) {
    if supplied.is_some_and(|id| id != addressed) {
        errors.add("id", MSG_ID_MISMATCH);
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_body, Reply, ResourceError};
    use crate::model::validation::FieldErrors;
    use crate::repo::RepoError;
    use uuid::Uuid;

    #[test]
    fn malformed_body_reports_parse_detail() {
        let err = parse_body(b"{not json").unwrap_err();
        assert_eq!(err.status(), 400);
        let detail = err.body()["detail"].as_str().unwrap().to_string();
        assert!(detail.starts_with("JSON parse error - "));
    }

    #[test]
    fn repo_errors_map_to_taxonomy() {
        let id = Uuid::new_v4();
        let not_found = ResourceError::from(RepoError::NotFound { kind: "topic", id });
        assert_eq!(not_found.status(), 404);

        let validation = ResourceError::from(RepoError::Validation(FieldErrors::single("a", "b")));
        assert_eq!(validation.status(), 400);

        let store = ResourceError::from(RepoError::InvalidData("bad row".to_string()));
        assert_eq!(store.status(), 500);
        assert_eq!(store.body()["detail"], "internal server error");
    }

    #[test]
    fn no_content_has_no_body() {
        assert_eq!(Reply::NoContent.status(), 204);
        assert!(Reply::NoContent.body().is_none());
    }
}
