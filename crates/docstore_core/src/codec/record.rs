//! Generic record transcoder between the native store shape and a flat shape.
//!
//! # Responsibility
//! - Native: `{"model": tag, "pk": id, "fields": {...}}`.
//! - Flat: `{"id": id, "model": tag, ...fields}`.
//!
//! # Invariants
//! - `unflatten(flatten(r)) == r` for every record `flatten` accepts.
//! - Native fields named `id` or `model` are rejected on flatten; a native
//!   field named `fields` round-trips as ordinary data.
//! - A flat record without `id` receives the caller's default, never `null`.

use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

const ID_KEY: &str = "id";
const MODEL_KEY: &str = "model";

/// Entity kinds known to the store, with their record tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ModelKind {
    Topic,
    Folder,
    Document,
}

impl ModelKind {
    /// Dependency order: topics before folders before documents.
    pub const ALL: [ModelKind; 3] = [Self::Topic, Self::Folder, Self::Document];

    pub fn tag(self) -> &'static str {
        match self {
            Self::Topic => "docstore.topic",
            Self::Folder => "docstore.folder",
            Self::Document => "docstore.document",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    /// Short name used on the command line (`topic`, `folder`, `document`).
    pub fn name(self) -> &'static str {
        match self {
            Self::Topic => "topic",
            Self::Folder => "folder",
            Self::Document => "document",
        }
    }
}

impl Display for ModelKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One record in the native store shape.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreRecord {
    pub model: String,
    pub pk: Value,
    pub fields: Map<String, Value>,
}

impl StoreRecord {
    pub fn new(kind: ModelKind, pk: impl Into<Value>, fields: Map<String, Value>) -> Self {
        Self {
            model: kind.tag().to_string(),
            pk: pk.into(),
            fields,
        }
    }
}

/// One record or a batch, chosen by the caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Records {
    Single(StoreRecord),
    Many(Vec<StoreRecord>),
}

impl Records {
    pub fn into_vec(self) -> Vec<StoreRecord> {
        match self {
            Self::Single(record) => vec![record],
            Self::Many(records) => records,
        }
    }
}

/// Expected top-level shape of decoder input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMode {
    Single,
    Many,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EncodeError {
    /// A native field name collides with a flat-shape key.
    ReservedField { model: String, field: String },
}

impl Display for EncodeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ReservedField { model, field } => {
                write!(f, "record `{model}` has reserved field name `{field}`")
            }
        }
    }
}

impl Error for EncodeError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    InvalidJson(String),
    /// Single mode received something other than an object.
    ExpectedObject,
    /// Many mode received something other than an array.
    ExpectedArray,
    NotAnObject { index: usize },
    MissingModel { index: usize },
    /// `model` is present but not a non-empty string.
    InvalidModel { index: usize },
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidJson(message) => write!(f, "invalid json: {message}"),
            Self::ExpectedObject => f.write_str("expected a single record object"),
            Self::ExpectedArray => f.write_str("expected an array of records"),
            Self::NotAnObject { index } => write!(f, "record {index} is not an object"),
            Self::MissingModel { index } => write!(f, "record {index} has no `model`"),
            Self::InvalidModel { index } => {
                write!(f, "record {index} has a `model` that is not a non-empty string")
            }
        }
    }
}

impl Error for ParseError {}

/// Converts a native record into the flat shape.
pub fn flatten(record: &StoreRecord) -> Result<Map<String, Value>, EncodeError> {
    let mut flat = Map::with_capacity(record.fields.len() + 2);
    flat.insert(ID_KEY.to_string(), record.pk.clone());
    flat.insert(MODEL_KEY.to_string(), Value::String(record.model.clone()));

    for (name, value) in &record.fields {
        match name.as_str() {
            ID_KEY | MODEL_KEY => {
                return Err(EncodeError::ReservedField {
                    model: record.model.clone(),
                    field: name.clone(),
                })
            }
            // Includes a native field named `fields`; it is plain data here.
            _ => {
                flat.insert(name.clone(), value.clone());
            }
        }
    }
    Ok(flat)
}

/// Converts one flat object back into a native record.
pub fn unflatten(
    flat: Map<String, Value>,
    default_id: impl FnMut() -> Value,
) -> Result<StoreRecord, ParseError> {
    let mut default_id = default_id;
    unflatten_at(0, flat, &mut default_id)
}

fn unflatten_at(
    index: usize,
    flat: Map<String, Value>,
    default_id: &mut impl FnMut() -> Value,
) -> Result<StoreRecord, ParseError> {
    let mut model = None;
    let mut pk = None;
    let mut fields = Map::new();

    for (key, value) in flat {
        match key.as_str() {
            MODEL_KEY => model = Some(value),
            ID_KEY => pk = Some(value),
            _ => {
                fields.insert(key, value);
            }
        }
    }

    let model = match model {
        None => return Err(ParseError::MissingModel { index }),
        Some(Value::String(tag)) if !tag.is_empty() => tag,
        Some(_) => return Err(ParseError::InvalidModel { index }),
    };
    let pk = match pk {
        None | Some(Value::Null) => default_id(),
        Some(value) => value,
    };

    Ok(StoreRecord { model, pk, fields })
}

/// Serializes records in the flat shape: an object for `Single`, an array
/// for `Many`.
pub fn encode(records: &Records) -> Result<Value, EncodeError> {
    match records {
        Records::Single(record) => flatten(record).map(Value::Object),
        Records::Many(records) => records
            .iter()
            .map(|record| flatten(record).map(Value::Object))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
    }
}

/// Parses flat-shape JSON text into native records.
///
/// `default_id` is called once for each record that has no `id`.
pub fn decode(
    input: &str,
    mode: RecordMode,
    default_id: impl FnMut() -> Value,
) -> Result<Records, ParseError> {
    let value: Value =
        serde_json::from_str(input).map_err(|err| ParseError::InvalidJson(err.to_string()))?;
    decode_value(value, mode, default_id)
}

/// Same as [`decode`] for an already parsed JSON value.
pub fn decode_value(
    value: Value,
    mode: RecordMode,
    default_id: impl FnMut() -> Value,
) -> Result<Records, ParseError> {
    let mut default_id = default_id;
    match (mode, value) {
        (RecordMode::Single, Value::Object(flat)) => {
            unflatten_at(0, flat, &mut default_id).map(Records::Single)
        }
        (RecordMode::Single, _) => Err(ParseError::ExpectedObject),
        (RecordMode::Many, Value::Array(items)) => {
            let mut records = Vec::with_capacity(items.len());
            for (index, item) in items.into_iter().enumerate() {
                let Value::Object(flat) = item else {
                    return Err(ParseError::NotAnObject { index });
                };
                records.push(unflatten_at(index, flat, &mut default_id)?);
            }
            Ok(Records::Many(records))
        }
        (RecordMode::Many, _) => Err(ParseError::ExpectedArray),
    }
}
