//! Per-field validation errors.
//!
//! # Responsibility
//! - Collect human-readable complaints keyed by wire field name.
//! - Provide the shared field checks used by entities and the wire decoder.
//!
//! # Invariants
//! - Fields iterate in sorted order so error bodies are deterministic.
//! - An empty `FieldErrors` never leaves this module as an `Err`.

use serde::Serialize;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Key for complaints that do not belong to a single field.
pub const NON_FIELD_ERRORS: &str = "non_field_errors";
/// Upper bound for bounded strings (`short_desc`, `name`).
pub const MAX_NAME_CHARS: usize = 255;

pub const MSG_REQUIRED: &str = "This field is required.";
pub const MSG_BLANK: &str = "This field may not be blank.";
pub const MSG_NOT_STRING: &str = "Not a valid string.";
pub const MSG_NOT_UUID: &str = "Must be a valid UUID.";
pub const MSG_NIL_UUID: &str = "Must not be the nil UUID.";
pub const MSG_UNKNOWN_FIELD: &str = "Unknown field.";

/// Mapping of field name to the list of complaints about it.
/// Serializes as the wire body `{field: [messages]}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds an error set holding exactly one complaint.
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn messages(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// `Ok(())` when nothing was collected, `Err(self)` otherwise.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl Display for FieldErrors {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{field}: {message}")?;
                first = false;
            }
        }
        Ok(())
    }
}

impl Error for FieldErrors {}

/// Checks a required text value: not blank and, when bounded, not too long.
pub fn check_text(errors: &mut FieldErrors, field: &str, value: &str, max_chars: Option<usize>) {
    if value.trim().is_empty() {
        errors.add(field, MSG_BLANK);
        return;
    }
    if let Some(max_chars) = max_chars {
        if value.chars().count() > max_chars {
            errors.add(field, too_long_message(max_chars));
        }
    }
}

pub fn too_long_message(max_chars: usize) -> String {
    format!("Ensure this field has no more than {max_chars} characters.")
}

pub fn missing_object_message(id: impl Display) -> String {
    format!("Invalid pk \"{id}\" - object does not exist.")
}

/// Sorts and deduplicates related ids so association sets compare stably.
pub fn normalize_ids(ids: &mut Vec<uuid::Uuid>) {
    ids.sort_unstable();
    ids.dedup();
}

#[cfg(test)]
mod tests {
    use super::{check_text, FieldErrors, MSG_BLANK};

    #[test]
    fn into_result_is_ok_only_when_empty() {
        assert!(FieldErrors::new().into_result().is_ok());
        let err = FieldErrors::single("name", "bad").into_result().unwrap_err();
        assert_eq!(err.messages("name"), ["bad".to_string()]);
    }

    #[test]
    fn check_text_counts_chars_not_bytes() {
        let mut errors = FieldErrors::new();
        check_text(&mut errors, "name", &"é".repeat(255), Some(255));
        assert!(errors.is_empty());

        check_text(&mut errors, "name", "   ", Some(255));
        assert_eq!(errors.messages("name"), [MSG_BLANK.to_string()]);
    }

    #[test]
    fn serializes_messages_grouped_per_field() {
        let mut errors = FieldErrors::new();
        errors.add("name", "first");
        errors.add("name", "second");
        errors.add("parent", "third");

        let json = serde_json::to_value(&errors).unwrap();
        assert_eq!(json["name"], serde_json::json!(["first", "second"]));
        assert_eq!(json["parent"], serde_json::json!(["third"]));
        assert_eq!(errors.to_string(), "name: first; name: second; parent: third");
    }
}
