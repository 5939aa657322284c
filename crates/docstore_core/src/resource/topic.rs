//! Topic resource handler.

use super::{check_body_id, Reply, Repos, ResourceError, ResourceResult, MSG_ID_TAKEN};
use crate::codec::rest::{decode_topic, encode_topic, TopicRelations};
use crate::codec::Representation;
use crate::model::topic::{Topic, TopicId};
use crate::model::validation::FieldErrors;
use crate::repo::document_repo::{DocumentListQuery, DocumentRepository};
use crate::repo::folder_repo::{FolderListQuery, FolderRepository};
use crate::repo::topic_repo::TopicRepository;
use log::info;
use rusqlite::Connection;
use serde_json::Value;
use uuid::Uuid;

pub struct TopicResource<'conn> {
    repos: Repos<'conn>,
}

impl<'conn> TopicResource<'conn> {
    pub fn try_new(conn: &'conn Connection) -> ResourceResult<Self> {
        Ok(Self {
            repos: Repos::open(conn)?,
        })
    }

    pub fn list(&self) -> ResourceResult<Reply> {
        let topics = self.repos.topics.list_topics()?;
        Ok(Reply::Ok(Value::Array(
            topics
                .iter()
                .map(|topic| encode_topic(topic, Representation::Listing))
                .collect(),
        )))
    }

    pub fn create(&self, body: &Value) -> ResourceResult<Reply> {
        let input = decode_topic(body)?;
        if let Some(id) = input.id {
            if self.repos.topics.get_topic(id)?.is_some() {
                return Err(FieldErrors::single("id", MSG_ID_TAKEN).into());
            }
        }

        let id = input.id.unwrap_or_else(Uuid::new_v4);
        let topic = input.into_topic(id);
        self.repos.topics.create_topic(&topic)?;
        info!("event=topic_create module=resource status=ok id={id}");
        Ok(Reply::Created(self.detail(&topic)?))
    }

    pub fn retrieve(&self, id: TopicId) -> ResourceResult<Reply> {
        let topic = self
            .repos
            .topics
            .get_topic(id)?
            .ok_or(ResourceError::NotFound(id))?;
        Ok(Reply::Ok(self.detail(&topic)?))
    }

    pub fn replace(&self, id: TopicId, body: &Value) -> ResourceResult<Reply> {
        if self.repos.topics.get_topic(id)?.is_none() {
            return Err(ResourceError::NotFound(id));
        }

        let input = decode_topic(body)?;
        let mut errors = FieldErrors::new();
        check_body_id(&mut errors, input.id, id);
        errors.into_result()?;

        let topic = input.into_topic(id);
        self.repos.topics.replace_topic(&topic)?;
        info!("event=topic_replace module=resource status=ok id={id}");
        Ok(Reply::Ok(self.detail(&topic)?))
    }

    pub fn delete(&self, id: TopicId) -> ResourceResult<Reply> {
        let removed = self.repos.topics.delete_topic(id)?;
        info!("event=topic_delete module=resource status=ok id={id} removed={removed}");
        Ok(Reply::NoContent)
    }

    fn detail(&self, topic: &Topic) -> ResourceResult<Value> {
        let index = self.repos.folder_index()?;
        let folders = self.repos.folders.list_folders(&FolderListQuery {
            topic_id: Some(topic.id),
            ..FolderListQuery::default()
        })?;
        let documents = self.repos.documents.list_documents(&DocumentListQuery {
            topic_id: Some(topic.id),
            ..DocumentListQuery::default()
        })?;

        let relations = TopicRelations {
            folders: self.repos.locate_folders(&index, folders)?,
            documents: self.repos.locate_documents(&index, documents)?,
        };
        Ok(encode_topic(topic, Representation::Detail(&relations)))
    }
}
