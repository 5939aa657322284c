//! Document domain model.

use super::folder::FolderId;
use super::topic::TopicId;
use super::validation::{check_text, normalize_ids, FieldErrors, MAX_NAME_CHARS, MSG_NIL_UUID};
use uuid::Uuid;

pub type DocumentId = Uuid;

/// Named leaf entity holding textual contents, optionally placed in a folder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub id: DocumentId,
    pub name: String,
    /// `None` means the document is unfiled and shown at `/<name>`.
    pub folder: Option<FolderId>,
    pub topics: Vec<TopicId>,
    pub contents: String,
}

impl Document {
    pub fn new(name: impl Into<String>, folder: Option<FolderId>) -> Self {
        Self::with_id(Uuid::new_v4(), name, folder)
    }

    pub fn with_id(id: DocumentId, name: impl Into<String>, folder: Option<FolderId>) -> Self {
        Self {
            id,
            name: name.into(),
            folder,
            topics: Vec::new(),
            contents: String::new(),
        }
    }

    pub fn set_topics(&mut self, topics: impl IntoIterator<Item = TopicId>) {
        self.topics = topics.into_iter().collect();
        normalize_ids(&mut self.topics);
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.id.is_nil() {
            errors.add("id", MSG_NIL_UUID);
        }
        check_text(&mut errors, "name", &self.name, Some(MAX_NAME_CHARS));
        errors.into_result()
    }
}
