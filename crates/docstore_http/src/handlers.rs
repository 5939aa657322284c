//! Axum adapters over the core resource handlers.

use crate::{ApiError, AppState};
use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use docstore_core::{
    core_version, parse_body, DocumentListQuery, DocumentResource, FolderFilter, FolderListQuery,
    FolderResource, Reply, TopicResource,
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

/// Successful reply rendered as a response.
pub(crate) struct ApiReply(Reply);

impl IntoResponse for ApiReply {
    fn into_response(self) -> Response {
        match self.0 {
            Reply::Ok(body) => (StatusCode::OK, Json(body)).into_response(),
            Reply::Created(body) => (StatusCode::CREATED, Json(body)).into_response(),
            Reply::NoContent => StatusCode::NO_CONTENT.into_response(),
        }
    }
}

type HandlerResult = Result<ApiReply, ApiError>;

#[derive(Debug, Default, Deserialize)]
pub(crate) struct FolderParams {
    topic: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct DocumentParams {
    topic: Option<String>,
    folder: Option<String>,
}

fn parse_id(raw: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw).map_err(|_| ApiError::InvalidId(raw.to_string()))
}

pub(crate) async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "version": core_version() }))
}

pub(crate) async fn list_topics(State(state): State<AppState>) -> HandlerResult {
    state
        .with_conn(move |conn| Ok(ApiReply(TopicResource::try_new(conn)?.list()?)))
        .await
}

pub(crate) async fn create_topic(State(state): State<AppState>, body: Bytes) -> HandlerResult {
    let body = parse_body(&body)?;
    state
        .with_conn(move |conn| Ok(ApiReply(TopicResource::try_new(conn)?.create(&body)?)))
        .await
}

pub(crate) async fn retrieve_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_id(&id)?;
    state
        .with_conn(move |conn| Ok(ApiReply(TopicResource::try_new(conn)?.retrieve(id)?)))
        .await
}

pub(crate) async fn replace_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> HandlerResult {
    let id = parse_id(&id)?;
    let body = parse_body(&body)?;
    state
        .with_conn(move |conn| Ok(ApiReply(TopicResource::try_new(conn)?.replace(id, &body)?)))
        .await
}

pub(crate) async fn delete_topic(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_id(&id)?;
    state
        .with_conn(move |conn| Ok(ApiReply(TopicResource::try_new(conn)?.delete(id)?)))
        .await
}

pub(crate) async fn list_folders(
    State(state): State<AppState>,
    Query(params): Query<FolderParams>,
) -> HandlerResult {
    let query = FolderListQuery {
        topic: params.topic,
        ..FolderListQuery::default()
    };
    state
        .with_conn(move |conn| Ok(ApiReply(FolderResource::try_new(conn)?.list(&query)?)))
        .await
}

pub(crate) async fn create_folder(State(state): State<AppState>, body: Bytes) -> HandlerResult {
    let body = parse_body(&body)?;
    state
        .with_conn(move |conn| Ok(ApiReply(FolderResource::try_new(conn)?.create(&body)?)))
        .await
}

pub(crate) async fn retrieve_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_id(&id)?;
    state
        .with_conn(move |conn| Ok(ApiReply(FolderResource::try_new(conn)?.retrieve(id)?)))
        .await
}

pub(crate) async fn replace_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> HandlerResult {
    let id = parse_id(&id)?;
    let body = parse_body(&body)?;
    state
        .with_conn(move |conn| Ok(ApiReply(FolderResource::try_new(conn)?.replace(id, &body)?)))
        .await
}

pub(crate) async fn delete_folder(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_id(&id)?;
    state
        .with_conn(move |conn| Ok(ApiReply(FolderResource::try_new(conn)?.delete(id)?)))
        .await
}

pub(crate) async fn list_documents(
    State(state): State<AppState>,
    Query(params): Query<DocumentParams>,
) -> HandlerResult {
    let query = DocumentListQuery {
        topic: params.topic,
        folder: params.folder.as_deref().map(FolderFilter::from_query_value),
        ..DocumentListQuery::default()
    };
    state
        .with_conn(move |conn| Ok(ApiReply(DocumentResource::try_new(conn)?.list(&query)?)))
        .await
}

pub(crate) async fn create_document(State(state): State<AppState>, body: Bytes) -> HandlerResult {
    let body = parse_body(&body)?;
    state
        .with_conn(move |conn| Ok(ApiReply(DocumentResource::try_new(conn)?.create(&body)?)))
        .await
}

pub(crate) async fn retrieve_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_id(&id)?;
    state
        .with_conn(move |conn| Ok(ApiReply(DocumentResource::try_new(conn)?.retrieve(id)?)))
        .await
}

pub(crate) async fn replace_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Bytes,
) -> HandlerResult {
    let id = parse_id(&id)?;
    let body = parse_body(&body)?;
    state
        .with_conn(move |conn| Ok(ApiReply(DocumentResource::try_new(conn)?.replace(id, &body)?)))
        .await
}

pub(crate) async fn delete_document(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> HandlerResult {
    let id = parse_id(&id)?;
    state
        .with_conn(move |conn| Ok(ApiReply(DocumentResource::try_new(conn)?.delete(id)?)))
        .await
}

#[cfg(test)]
mod tests {
    use super::parse_id;
    use crate::ApiError;

    #[test]
    fn parse_id_rejects_non_uuid() {
        assert!(matches!(parse_id("123"), Err(ApiError::InvalidId(raw)) if raw == "123"));
        assert!(parse_id("67e55044-10b1-426f-9247-bb680e5fe0c8").is_ok());
    }
}
