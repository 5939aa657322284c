//! Document resource handler.

use super::{check_body_id, Reply, Repos, ResourceError, ResourceResult, MSG_ID_TAKEN};
use crate::codec::rest::{decode_document, encode_document, DocumentInput};
use crate::codec::Representation;
use crate::model::document::{Document, DocumentId};
use crate::model::path::{FolderIndex, Located};
use crate::model::validation::{missing_object_message, FieldErrors};
use crate::repo::document_repo::{DocumentListQuery, DocumentRepository};
use crate::repo::RepoResult;
use log::info;
use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;

pub struct DocumentResource<'conn> {
    repos: Repos<'conn>,
}

impl<'conn> DocumentResource<'conn> {
    pub fn try_new(conn: &'conn Connection) -> ResourceResult<Self> {
        Ok(Self {
            repos: Repos::open(conn)?,
        })
    }

    pub fn list(&self, query: &DocumentListQuery) -> ResourceResult<Reply> {
        let index = self.repos.folder_index()?;
        let documents = self.repos.documents.list_documents(query)?;
        let located = self.repos.locate_documents(&index, documents)?;
        Ok(Reply::Ok(Value::Array(
            located
                .iter()
                .map(|document| encode_document(document, Representation::Listing))
                .collect(),
        )))
    }

    pub fn create(&self, body: &Value) -> ResourceResult<Reply> {
        let input = decode_document(body)?;
        let index = self.repos.folder_index()?;

        let mut errors = FieldErrors::new();
        if let Some(id) = input.id {
            if self.repos.documents.get_document(id)?.is_some() {
                errors.add("id", MSG_ID_TAKEN);
            }
        }
        self.check_references(&mut errors, &index, &input)?;
        errors.into_result()?;

        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let document = input.into_document(id);
        self.repos.documents.create_document(&document)?;
        info!(
            "event=document_create module=resource status=ok id={id} filed={}",
            document.folder.is_some()
        );
        Ok(Reply::Created(self.detail(&index, document)?))
    }

    pub fn retrieve(&self, id: DocumentId) -> ResourceResult<Reply> {
        let document = self
            .repos
            .documents
            .get_document(id)?
            .ok_or(ResourceError::NotFound(id))?;
        let index = self.repos.folder_index()?;
        Ok(Reply::Ok(self.detail(&index, document)?))
    }

    pub fn replace(&self, id: DocumentId, body: &Value) -> ResourceResult<Reply> {
        if self.repos.documents.get_document(id)?.is_none() {
            return Err(ResourceError::NotFound(id));
        }

        let input = decode_document(body)?;
        let index = self.repos.folder_index()?;
        let mut errors = FieldErrors::new();
        check_body_id(&mut errors, input.id, id);
        self.check_references(&mut errors, &index, &input)?;
        errors.into_result()?;

        let document = input.into_document(id);
        self.repos.documents.replace_document(&document)?;
        info!("event=document_replace module=resource status=ok id={id}");
        Ok(Reply::Ok(self.detail(&index, document)?))
    }

    pub fn delete(&self, id: DocumentId) -> ResourceResult<Reply> {
        let removed = self.repos.documents.delete_document(id)?;
        info!("event=document_delete module=resource status=ok id={id} removed={removed}");
        Ok(Reply::NoContent)
    }

    fn check_references(
        &self,
        errors: &mut FieldErrors,
        index: &FolderIndex,
        input: &DocumentInput,
    ) -> RepoResult<()> {
        if let Some(folder) = input.folder {
            if !index.contains(folder) {
                errors.add("folder", missing_object_message(folder));
            }
        }
        self.repos.check_topics(errors, &input.topics)
    }

    // Document writes never touch folders, so a pre-write index stays valid.
    fn detail(&self, index: &FolderIndex, document: Document) -> ResourceResult<Value> {
        let path = index.document_path(&document.name, document.folder)?;
        Ok(encode_document(
            &Located::new(document, path),
            Representation::Detail(()),
        ))
    }
}
