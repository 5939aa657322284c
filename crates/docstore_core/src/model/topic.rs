//! Topic domain model.
//!
//! A topic is a tag/category attached to folders and documents. Deleting a
//! topic only removes its associations.

use super::validation::{check_text, FieldErrors, MAX_NAME_CHARS, MSG_NIL_UUID};
use uuid::Uuid;

pub type TopicId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub id: TopicId,
    /// Bounded label; list filters match on it exactly.
    pub short_desc: String,
    pub full_desc: String,
}

impl Topic {
    /// Creates a topic with a generated id.
    pub fn new(short_desc: impl Into<String>, full_desc: impl Into<String>) -> Self {
        Self::with_id(Uuid::new_v4(), short_desc, full_desc)
    }

    pub fn with_id(
        id: TopicId,
        short_desc: impl Into<String>,
        full_desc: impl Into<String>,
    ) -> Self {
        Self {
            id,
            short_desc: short_desc.into(),
            full_desc: full_desc.into(),
        }
    }

    pub fn validate(&self) -> Result<(), FieldErrors> {
        let mut errors = FieldErrors::new();
        if self.id.is_nil() {
            errors.add("id", MSG_NIL_UUID);
        }
        check_text(&mut errors, "short_desc", &self.short_desc, Some(MAX_NAME_CHARS));
        check_text(&mut errors, "full_desc", &self.full_desc, None);
        errors.into_result()
    }
}
