//! Folder domain model.
//!
//! # Invariants
//! - `parent` is an id into the store, never a direct reference.
//! - A folder is never its own parent; deeper cycles are rejected by the
//!   resource layer and detected by path derivation.
//! - `topics` is kept sorted and free of duplicates.

use super::topic::TopicId;
use super::validation::{check_text, normalize_ids, FieldErrors, MAX_NAME_CHARS, MSG_NIL_UUID};
use uuid::Uuid;

pub type FolderId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Folder {
    pub id: FolderId,
    pub name: String,
    /// `None` means a root folder.
    pub parent: Option<FolderId>,
    pub topics: Vec<TopicId>,
}

impl Folder {
    pub fn new(name: impl Into<String>, parent: Option<FolderId>) -> Self {
        Self::with_id(Uuid::new_v4(), name, parent)
    }

    pub fn with_id(id: FolderId, name: impl Into<String>, parent: Option<FolderId>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            topics: Vec::new(),
        }
    }

    /// Replaces the topic set, normalizing order and duplicates.
    pub fn set_topics(&mut self, topics: impl IntoIterator<Item = TopicId>) {
        self.topics = topics.into_iter().collect();
        normalize_ids(&mut self.topics);
    }

    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.id.is_nil() {
            errors.add("id", MSG_NIL_UUID);
        }
        check_text(&mut errors, "name", &self.name, Some(MAX_NAME_CHARS));
        if self.parent == Some(self.id) {
            errors.add("parent", "A folder cannot be its own parent.");
        }
        errors.into_result()
    }
}
