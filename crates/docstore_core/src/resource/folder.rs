//! Folder resource handler.
//!
//! # Invariants
//! - `parent` must name an existing folder and never the folder itself or
//!   one of its descendants, and the placement keeps the whole subtree within
//!   `MAX_FOLDER_DEPTH` levels.
//! - Deleting a folder removes its whole subtree and contained documents.

use super::{check_body_id, Reply, Repos, ResourceError, ResourceResult, MSG_ID_TAKEN};
use crate::codec::rest::{decode_folder, encode_folder, FolderInput, FolderRelations};
use crate::codec::Representation;
use crate::model::folder::{Folder, FolderId};
use crate::model::path::{FolderIndex, Located, MAX_FOLDER_DEPTH};
use crate::model::validation::{missing_object_message, FieldErrors};
use crate::repo::document_repo::{DocumentListQuery, DocumentRepository, FolderFilter};
use crate::repo::folder_repo::{FolderListQuery, FolderRepository};
use crate::repo::RepoResult;
use log::info;
use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;

const MSG_PARENT_CYCLE: &str =
    "A folder cannot be placed inside itself or one of its descendants.";

fn too_deep_message() -> String {
    format!("Folders cannot be nested more than {MAX_FOLDER_DEPTH} levels deep.")
}

pub struct FolderResource<'conn> {
    repos: Repos<'conn>,
}

impl<'conn> FolderResource<'conn> {
    pub fn try_new(conn: &'conn Connection) -> ResourceResult<Self> {
        Ok(Self {
            repos: Repos::open(conn)?,
        })
    }

    pub fn list(&self, query: &FolderListQuery) -> ResourceResult<Reply> {
        let index = self.repos.folder_index()?;
        let folders = self.repos.folders.list_folders(query)?;
        let located = self.repos.locate_folders(&index, folders)?;
        Ok(Reply::Ok(Value::Array(
            located
                .iter()
                .map(|folder| encode_folder(folder, Representation::Listing))
                .collect(),
        )))
    }

    pub fn create(&self, body: &Value) -> ResourceResult<Reply> {
        let input = decode_folder(body)?;
        let index = self.repos.folder_index()?;

        let mut errors = FieldErrors::new();
        if input.id.is_some_and(|id| index.contains(id)) {
            errors.add("id", MSG_ID_TAKEN);
        }
        self.check_references(&mut errors, &index, &input, None)?;
        errors.into_result()?;

        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let folder = input.into_folder(id);
        self.repos.folders.create_folder(&folder)?;
        info!(
            "event=folder_create module=resource status=ok id={id} root={}",
            folder.is_root()
        );
        Ok(Reply::Created(self.detail(folder)?))
    }

    pub fn retrieve(&self, id: FolderId) -> ResourceResult<Reply> {
        let folder = self
            .repos
            .folders
            .get_folder(id)?
            .ok_or(ResourceError::NotFound(id))?;
        Ok(Reply::Ok(self.detail(folder)?))
    }

    pub fn replace(&self, id: FolderId, body: &Value) -> ResourceResult<Reply> {
        let index = self.repos.folder_index()?;
        if !index.contains(id) {
            return Err(ResourceError::NotFound(id));
        }

        let input = decode_folder(body)?;
        let mut errors = FieldErrors::new();
        check_body_id(&mut errors, input.id, id);
        self.check_references(&mut errors, &index, &input, Some(id))?;
        errors.into_result()?;

        let folder = input.into_folder(id);
        self.repos.folders.replace_folder(&folder)?;
        info!("event=folder_replace module=resource status=ok id={id}");
        Ok(Reply::Ok(self.detail(folder)?))
    }

    pub fn delete(&self, id: FolderId) -> ResourceResult<Reply> {
        let removed = self.repos.folders.delete_folder(id)?;
        info!("event=folder_delete module=resource status=ok id={id} removed={removed}");
        Ok(Reply::NoContent)
    }

    /// Checks `parent` and `topics`; `moving` is the folder being replaced.
    fn check_references(
        &self,
        errors: &mut FieldErrors,
        index: &FolderIndex,
        input: &FolderInput,
        moving: Option<FolderId>,
    ) -> RepoResult<()> {
        if let Some(parent) = input.parent {
            if index.contains(parent) {
                self.check_placement(errors, index, parent, moving)?;
            } else {
                errors.add("parent", missing_object_message(parent));
            }
        }
        self.repos.check_topics(errors, &input.topics)
    }

    fn check_placement(
        &self,
        errors: &mut FieldErrors,
        index: &FolderIndex,
        parent: FolderId,
        moving: Option<FolderId>,
    ) -> RepoResult<()> {
        if let Some(id) = moving {
            if index.would_create_cycle(id, parent)? {
                errors.add("parent", MSG_PARENT_CYCLE);
                return Ok(());
            }
        }
        if !index.fits_under(parent, moving)? {
            errors.add("parent", too_deep_message());
        }
        Ok(())
    }

    fn detail(&self, folder: Folder) -> ResourceResult<Value> {
        let index = self.repos.folder_index()?;
        let documents = self.repos.documents.list_documents(&DocumentListQuery {
            folder: Some(FolderFilter::Id(folder.id)),
            ..DocumentListQuery::default()
        })?;
        let relations = FolderRelations {
            documents: self.repos.locate_documents(&index, documents)?,
        };

        let path = index.folder_path(folder.id)?;
        Ok(encode_folder(
            &Located::new(folder, path),
            Representation::Detail(&relations),
        ))
    }
}
