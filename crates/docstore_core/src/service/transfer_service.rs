//! Record dump/load use-cases.
//!
//! # Responsibility
//! - Export store contents as native records, one kind at a time.
//! - Import native records as upserts, validating each one through the
//!   same decoder the HTTP surface uses.
//!
//! # Invariants
//! - A load is all-or-nothing: any rejected record rolls back the batch.
//! - Foreign keys are checked at commit, so record order inside a batch does
//!   not matter.
//! - A load never leaves a folder parent cycle or an over-deep folder chain
//!   behind.

use crate::codec::record::{
    decode, encode, EncodeError, ModelKind, ParseError, RecordMode, Records, StoreRecord,
};
use crate::codec::rest::{decode_document, decode_folder, decode_topic};
use crate::model::document::Document;
use crate::model::folder::{Folder, FolderId};
use crate::model::path::MAX_FOLDER_DEPTH;
use crate::model::topic::Topic;
use crate::model::validation::{missing_object_message, FieldErrors, MSG_REQUIRED};
use crate::repo::document_repo::{DocumentListQuery, DocumentRepository, SqliteDocumentRepository};
use crate::repo::folder_repo::{FolderListQuery, FolderRepository, SqliteFolderRepository};
use crate::repo::topic_repo::{SqliteTopicRepository, TopicRepository};
use crate::repo::RepoError;
use log::{error, info};
use rusqlite::{Connection, Transaction, TransactionBehavior};
use serde_json::{json, Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;
use uuid::Uuid;

/// Service error for dump/load.
#[derive(Debug)]
pub enum TransferError {
    Parse(ParseError),
    Encode(EncodeError),
    /// Record tag is not one of the store's model kinds.
    UnknownModel { index: usize, model: String },
    /// Record fields fail entity validation.
    InvalidRecord { index: usize, errors: FieldErrors },
    /// Record references a folder or topic that is absent after the load.
    DanglingReference { index: usize, field: &'static str, id: Uuid },
    /// The loaded folders form a parent cycle through this folder.
    FolderCycle(FolderId),
    /// This folder would sit deeper than `MAX_FOLDER_DEPTH`.
    FolderTooDeep(FolderId),
    Repo(RepoError),
}

impl Display for TransferError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Parse(err) => write!(f, "{err}"),
            Self::Encode(err) => write!(f, "{err}"),
            Self::UnknownModel { index, model } => {
                write!(f, "record {index} has unknown model `{model}`")
            }
            Self::InvalidRecord { index, errors } => write!(f, "record {index}: {errors}"),
            Self::DanglingReference { index, field, id } => {
                write!(f, "record {index}: {field} {}", missing_object_message(id))
            }
            Self::FolderCycle(id) => write!(f, "folder parent cycle through {id}"),
            Self::FolderTooDeep(id) => {
                write!(f, "folder {id} is nested more than {MAX_FOLDER_DEPTH} levels deep")
            }
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TransferError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Parse(err) => Some(err),
            Self::Encode(err) => Some(err),
            Self::InvalidRecord { errors, .. } => Some(errors),
            Self::Repo(err) => Some(err),
            Self::UnknownModel { .. }
            | Self::DanglingReference { .. }
            | Self::FolderCycle(_)
            | Self::FolderTooDeep(_) => None,
        }
    }
}

impl From<ParseError> for TransferError {
    fn from(value: ParseError) -> Self {
        Self::Parse(value)
    }
}

impl From<EncodeError> for TransferError {
    fn from(value: EncodeError) -> Self {
        Self::Encode(value)
    }
}

impl From<RepoError> for TransferError {
    fn from(value: RepoError) -> Self {
        Self::Repo(value)
    }
}

impl From<rusqlite::Error> for TransferError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Repo(RepoError::from(value))
    }
}

/// Created/replaced counts for one model kind.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KindCounts {
    pub created: usize,
    pub replaced: usize,
}

/// Outcome of a successful load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    pub topics: KindCounts,
    pub folders: KindCounts,
    pub documents: KindCounts,
}

impl LoadSummary {
    pub fn total(&self) -> usize {
        [self.topics, self.folders, self.documents]
            .iter()
            .map(|counts| counts.created + counts.replaced)
            .sum()
    }

    fn counts_mut(&mut self, kind: ModelKind) -> &mut KindCounts {
        match kind {
            ModelKind::Topic => &mut self.topics,
            ModelKind::Folder => &mut self.folders,
            ModelKind::Document => &mut self.documents,
        }
    }
}

/// Dump/load over one store connection.
pub struct TransferService<'conn> {
    conn: &'conn Connection,
}

impl<'conn> TransferService<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    /// Native records for `kinds` (all kinds when empty), topics first.
    pub fn dump(&self, kinds: &[ModelKind]) -> Result<Vec<StoreRecord>, TransferError> {
        let mut records = Vec::new();
        for kind in ModelKind::ALL {
            if !kinds.is_empty() && !kinds.contains(&kind) {
                continue;
            }
            match kind {
                ModelKind::Topic => {
                    let repo = SqliteTopicRepository::try_new(self.conn)?;
                    records.extend(repo.list_topics()?.iter().map(topic_record));
                }
                ModelKind::Folder => {
                    let repo = SqliteFolderRepository::try_new(self.conn)?;
                    records.extend(
                        repo.list_folders(&FolderListQuery::default())?
                            .iter()
                            .map(folder_record),
                    );
                }
                ModelKind::Document => {
                    let repo = SqliteDocumentRepository::try_new(self.conn)?;
                    records.extend(
                        repo.list_documents(&DocumentListQuery::default())?
                            .iter()
                            .map(document_record),
                    );
                }
            }
        }

        info!(
            "event=transfer_dump module=service status=ok records={}",
            records.len()
        );
        Ok(records)
    }

    /// Dump in the flat interchange shape, as a JSON array.
    pub fn dump_json(&self, kinds: &[ModelKind]) -> Result<Value, TransferError> {
        Ok(encode(&Records::Many(self.dump(kinds)?))?)
    }

    /// Parses a flat record array and loads it; records without `id` get a
    /// fresh v4 UUID.
    pub fn load_json(&self, input: &str) -> Result<LoadSummary, TransferError> {
        let records = decode(input, RecordMode::Many, || {
            Value::String(Uuid::new_v4().to_string())
        })?;
        self.load(records.into_vec())
    }

    /// Upserts `records` in one transaction.
    pub fn load(&self, records: Vec<StoreRecord>) -> Result<LoadSummary, TransferError> {
        let started_at = Instant::now();
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        tx.execute_batch("PRAGMA defer_foreign_keys = ON;")?;

        // Dropping `tx` on any early return rolls the batch back.
        match load_in_tx(&tx, records) {
            Ok(summary) => {
                tx.commit()?;
                info!(
                    "event=transfer_load module=service status=ok records={} duration_ms={}",
                    summary.total(),
                    started_at.elapsed().as_millis()
                );
                Ok(summary)
            }
            Err(err) => {
                error!(
                    "event=transfer_load module=service status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }
}

enum Loaded {
    Topic(Topic),
    Folder(Folder),
    Document(Document),
}

fn load_in_tx(conn: &Connection, records: Vec<StoreRecord>) -> Result<LoadSummary, TransferError> {
    let topics = SqliteTopicRepository::try_new(conn)?;
    let folders = SqliteFolderRepository::try_new(conn)?;
    let documents = SqliteDocumentRepository::try_new(conn)?;

    let mut summary = LoadSummary::default();
    let mut loaded = Vec::with_capacity(records.len());

    for (index, record) in records.into_iter().enumerate() {
        let kind = ModelKind::from_tag(&record.model).ok_or_else(|| {
            TransferError::UnknownModel {
                index,
                model: record.model.clone(),
            }
        })?;
        let entity = to_entity(kind, record).map_err(|errors| TransferError::InvalidRecord {
            index,
            errors,
        })?;

        let replaced = match &entity {
            Loaded::Topic(topic) => {
                let exists = topics.get_topic(topic.id)?.is_some();
                if exists {
                    topics.replace_topic(topic)?;
                } else {
                    topics.create_topic(topic)?;
                }
                exists
            }
            Loaded::Folder(folder) => {
                let exists = folders.get_folder(folder.id)?.is_some();
                if exists {
                    folders.replace_folder(folder)?;
                } else {
                    folders.create_folder(folder)?;
                }
                exists
            }
            Loaded::Document(document) => {
                let exists = documents.get_document(document.id)?.is_some();
                if exists {
                    documents.replace_document(document)?;
                } else {
                    documents.create_document(document)?;
                }
                exists
            }
        };

        let counts = summary.counts_mut(kind);
        if replaced {
            counts.replaced += 1;
        } else {
            counts.created += 1;
        }
        loaded.push(entity);
    }

    let folder_index = folders.folder_index()?;
    if let Some(id) = folder_index.find_cycle() {
        return Err(TransferError::FolderCycle(id));
    }
    if let Some(id) = folder_index.find_too_deep() {
        return Err(TransferError::FolderTooDeep(id));
    }

    for (index, entity) in loaded.iter().enumerate() {
        let (container, container_field, topic_ids) = match entity {
            Loaded::Topic(_) => continue,
            Loaded::Folder(folder) => (folder.parent, "parent", &folder.topics),
            Loaded::Document(document) => (document.folder, "folder", &document.topics),
        };
        if let Some(id) = container.filter(|id| !folder_index.contains(*id)) {
            return Err(TransferError::DanglingReference {
                index,
                field: container_field,
                id,
            });
        }
        if let Some(id) = topics.missing_topics(topic_ids)?.first() {
            return Err(TransferError::DanglingReference {
                index,
                field: "topics",
                id: *id,
            });
        }
    }

    Ok(summary)
}

/// Validates one record through the HTTP decoder for its kind.
fn to_entity(kind: ModelKind, record: StoreRecord) -> Result<Loaded, FieldErrors> {
    let mut body = record.fields;
    body.insert("id".to_string(), record.pk);
    let body = Value::Object(body);

    match kind {
        ModelKind::Topic => {
            let input = decode_topic(&body)?;
            let id = input.id.ok_or_else(missing_id)?;
            Ok(Loaded::Topic(input.into_topic(id)))
        }
        ModelKind::Folder => {
            let input = decode_folder(&body)?;
            let id = input.id.ok_or_else(missing_id)?;
            Ok(Loaded::Folder(input.into_folder(id)))
        }
        ModelKind::Document => {
            let input = decode_document(&body)?;
            let id = input.id.ok_or_else(missing_id)?;
            Ok(Loaded::Document(input.into_document(id)))
        }
    }
}

fn missing_id() -> FieldErrors {
    FieldErrors::single("id", MSG_REQUIRED)
}

fn topic_record(topic: &Topic) -> StoreRecord {
    StoreRecord::new(
        ModelKind::Topic,
        topic.id.to_string(),
        fields(json!({
            "short_desc": topic.short_desc,
            "full_desc": topic.full_desc,
        })),
    )
}

fn folder_record(folder: &Folder) -> StoreRecord {
    StoreRecord::new(
        ModelKind::Folder,
        folder.id.to_string(),
        fields(json!({
            "name": folder.name,
            "parent": folder.parent.map(|id| id.to_string()),
            "topics": ids(&folder.topics),
        })),
    )
}

fn document_record(document: &Document) -> StoreRecord {
    StoreRecord::new(
        ModelKind::Document,
        document.id.to_string(),
        fields(json!({
            "name": document.name,
            "folder": document.folder.map(|id| id.to_string()),
            "topics": ids(&document.topics),
            "contents": document.contents,
        })),
    )
}

fn ids(values: &[Uuid]) -> Vec<String> {
    values.iter().map(Uuid::to_string).collect()
}

fn fields(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}
