//! Structured per-entity JSON codec (the HTTP wire format).
//!
//! # Responsibility
//! - Encode topics, folders and documents as listing or detail objects.
//! - Decode request bodies into validated inputs, reporting every problem
//!   as a per-field complaint.
//!
//! # Invariants
//! - `path` and embedded collections are read-only: accepted on input so a
//!   detail body can be sent back unchanged, then ignored.
//! - Decoding never panics; malformed input always yields `FieldErrors`.
//! - `decode_*(encode_*(x))` reproduces id, scalar fields and references.

use super::Representation;
use crate::model::document::{Document, DocumentId};
use crate::model::folder::{Folder, FolderId};
use crate::model::path::Located;
use crate::model::topic::{Topic, TopicId};
use crate::model::validation::{
    check_text, normalize_ids, FieldErrors, MAX_NAME_CHARS, MSG_NOT_STRING, MSG_NOT_UUID,
    MSG_REQUIRED, MSG_UNKNOWN_FIELD, NON_FIELD_ERRORS,
};
use serde_json::{json, Map, Value};
use uuid::Uuid;

const TOPIC_FIELDS: &[&str] = &["id", "short_desc", "full_desc", "folders", "documents"];
const FOLDER_FIELDS: &[&str] = &["id", "path", "name", "parent", "topics", "documents"];
const DOCUMENT_FIELDS: &[&str] = &["id", "path", "name", "folder", "topics", "contents"];

/// Collections embedded in a topic detail.
#[derive(Debug, Clone, Default)]
pub struct TopicRelations {
    pub folders: Vec<Located<Folder>>,
    pub documents: Vec<Located<Document>>,
}

/// Collections embedded in a folder detail. Sub-folders are not embedded.
#[derive(Debug, Clone, Default)]
pub struct FolderRelations {
    pub documents: Vec<Located<Document>>,
}

pub fn encode_topic(topic: &Topic, representation: Representation<&TopicRelations>) -> Value {
    let mut body = json!({
        "id": topic.id.to_string(),
        "short_desc": topic.short_desc,
        "full_desc": topic.full_desc,
    });

    if let (Representation::Detail(relations), Some(object)) =
        (representation, body.as_object_mut())
    {
        object.insert(
            "folders".to_string(),
            Value::Array(
                relations
                    .folders
                    .iter()
                    .map(|folder| encode_folder(folder, Representation::Listing))
                    .collect(),
            ),
        );
        object.insert(
            "documents".to_string(),
            encode_document_list(&relations.documents),
        );
    }
    body
}

pub fn encode_folder(
    folder: &Located<Folder>,
    representation: Representation<&FolderRelations>,
) -> Value {
    let item = &folder.item;
    let mut body = json!({
        "id": item.id.to_string(),
        "path": folder.path,
        "name": item.name,
        "parent": item.parent.map(|id| id.to_string()),
    });

    if let (Representation::Detail(relations), Some(object)) =
        (representation, body.as_object_mut())
    {
        object.insert("topics".to_string(), encode_ids(&item.topics));
        object.insert(
            "documents".to_string(),
            encode_document_list(&relations.documents),
        );
    }
    body
}

pub fn encode_document(document: &Located<Document>, representation: Representation<()>) -> Value {
    let item = &document.item;
    let mut body = json!({
        "id": item.id.to_string(),
        "path": document.path,
        "name": item.name,
        "folder": item.folder.map(|id| id.to_string()),
    });

    if let (Representation::Detail(()), Some(object)) = (representation, body.as_object_mut()) {
        object.insert("topics".to_string(), encode_ids(&item.topics));
        object.insert("contents".to_string(), Value::String(item.contents.clone()));
    }
    body
}

fn encode_document_list(documents: &[Located<Document>]) -> Value {
    Value::Array(
        documents
            .iter()
            .map(|document| encode_document(document, Representation::Listing))
            .collect(),
    )
}

fn encode_ids(ids: &[Uuid]) -> Value {
    Value::Array(ids.iter().map(|id| Value::String(id.to_string())).collect())
}

/// Validated topic write input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicInput {
    pub id: Option<TopicId>,
    pub short_desc: String,
    pub full_desc: String,
}

impl TopicInput {
    pub fn into_topic(self, id: TopicId) -> Topic {
        Topic::with_id(id, self.short_desc, self.full_desc)
    }
}

/// Validated folder write input. Referenced ids are not yet checked
/// against the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FolderInput {
    pub id: Option<FolderId>,
    pub name: String,
    pub parent: Option<FolderId>,
    pub topics: Vec<TopicId>,
}

impl FolderInput {
    pub fn into_folder(self, id: FolderId) -> Folder {
        let mut folder = Folder::with_id(id, self.name, self.parent);
        folder.set_topics(self.topics);
        folder
    }
}

/// Validated document write input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentInput {
    pub id: Option<DocumentId>,
    pub name: String,
    pub folder: Option<FolderId>,
    pub topics: Vec<TopicId>,
    pub contents: String,
}

impl DocumentInput {
    pub fn into_document(self, id: DocumentId) -> Document {
        let mut document = Document::with_id(id, self.name, self.folder);
        document.set_topics(self.topics);
        document.contents = self.contents;
        document
    }
}

pub fn decode_topic(body: &Value) -> Result<TopicInput, FieldErrors> {
    let mut reader = FieldReader::open(body, TOPIC_FIELDS)?;
    let input = TopicInput {
        id: reader.optional_uuid("id"),
        short_desc: reader.required_text("short_desc", Some(MAX_NAME_CHARS)),
        full_desc: reader.required_text("full_desc", None),
    };
    reader.finish(input)
}

pub fn decode_folder(body: &Value) -> Result<FolderInput, FieldErrors> {
    let mut reader = FieldReader::open(body, FOLDER_FIELDS)?;
    let input = FolderInput {
        id: reader.optional_uuid("id"),
        name: reader.required_text("name", Some(MAX_NAME_CHARS)),
        parent: reader.optional_uuid("parent"),
        topics: reader.uuid_list("topics"),
    };
    reader.finish(input)
}

pub fn decode_document(body: &Value) -> Result<DocumentInput, FieldErrors> {
    let mut reader = FieldReader::open(body, DOCUMENT_FIELDS)?;
    let input = DocumentInput {
        id: reader.optional_uuid("id"),
        name: reader.required_text("name", Some(MAX_NAME_CHARS)),
        folder: reader.optional_uuid("folder"),
        topics: reader.uuid_list("topics"),
        contents: reader.optional_text("contents"),
    };
    reader.finish(input)
}

/// Reads fields out of a JSON object while collecting complaints.
struct FieldReader<'a> {
    object: &'a Map<String, Value>,
    known: &'static [&'static str],
    errors: FieldErrors,
}

impl<'a> FieldReader<'a> {
    fn open(body: &'a Value, known: &'static [&'static str]) -> Result<Self, FieldErrors> {
        match body.as_object() {
            Some(object) => Ok(Self {
                object,
                known,
                errors: FieldErrors::new(),
            }),
            None => Err(FieldErrors::single(
                NON_FIELD_ERRORS,
                format!(
                    "Invalid data. Expected an object, but got {}.",
                    json_type_name(body)
                ),
            )),
        }
    }

    fn required_text(&mut self, field: &str, max_chars: Option<usize>) -> String {
        match self.object.get(field) {
            None | Some(Value::Null) => {
                self.errors.add(field, MSG_REQUIRED);
                String::new()
            }
            Some(Value::String(value)) => {
                check_text(&mut self.errors, field, value, max_chars);
                value.clone()
            }
            Some(_) => {
                self.errors.add(field, MSG_NOT_STRING);
                String::new()
            }
        }
    }

    /// Optional, may be blank; absent or null reads as empty.
    fn optional_text(&mut self, field: &str) -> String {
        match self.object.get(field) {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(value)) => value.clone(),
            Some(_) => {
                self.errors.add(field, MSG_NOT_STRING);
                String::new()
            }
        }
    }

    fn optional_uuid(&mut self, field: &str) -> Option<Uuid> {
        match self.object.get(field) {
            None | Some(Value::Null) => None,
            Some(value) => match parse_uuid_value(value) {
                Some(id) => Some(id),
                None => {
                    self.errors.add(field, MSG_NOT_UUID);
                    None
                }
            },
        }
    }

    /// Absent or null reads as an empty set.
    fn uuid_list(&mut self, field: &str) -> Vec<Uuid> {
        let items = match self.object.get(field) {
            None | Some(Value::Null) => return Vec::new(),
            Some(Value::Array(items)) => items,
            Some(other) => {
                self.errors.add(
                    field,
                    format!(
                        "Expected a list of items but got type \"{}\".",
                        json_type_name(other)
                    ),
                );
                return Vec::new();
            }
        };

        let mut ids = Vec::with_capacity(items.len());
        for (position, item) in items.iter().enumerate() {
            match parse_uuid_value(item) {
                Some(id) => ids.push(id),
                None => self
                    .errors
                    .add(field, format!("Item {position}: {MSG_NOT_UUID}")),
            }
        }
        normalize_ids(&mut ids);
        ids
    }

    fn finish<T>(mut self, value: T) -> Result<T, FieldErrors> {
        for key in self.object.keys() {
            if !self.known.contains(&key.as_str()) {
                self.errors.add(key.clone(), MSG_UNKNOWN_FIELD);
            }
        }
        self.errors.into_result().map(|()| value)
    }
}

fn parse_uuid_value(value: &Value) -> Option<Uuid> {
    value.as_str().and_then(|text| Uuid::parse_str(text).ok())
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::{decode_folder, json_type_name, FieldReader, FOLDER_FIELDS};
    use crate::model::validation::{MSG_UNKNOWN_FIELD, NON_FIELD_ERRORS};
    use serde_json::json;

    #[test]
    fn non_object_body_is_a_non_field_error() {
        let err = decode_folder(&json!(["not", "an", "object"])).unwrap_err();
        assert_eq!(
            err.messages(NON_FIELD_ERRORS),
            ["Invalid data. Expected an object, but got array.".to_string()]
        );
    }

    #[test]
    fn unknown_keys_are_reported_per_key() {
        let body = json!({"name": "a", "colour": "red"});
        let reader = FieldReader::open(&body, FOLDER_FIELDS).unwrap();
        let err = reader.finish(()).unwrap_err();
        assert_eq!(err.messages("colour"), [MSG_UNKNOWN_FIELD.to_string()]);
    }

    #[test]
    fn type_names_follow_json_vocabulary() {
        assert_eq!(json_type_name(&json!(1.5)), "number");
        assert_eq!(json_type_name(&json!({})), "object");
    }
}
