use docstore_core::codec::record::{ModelKind, StoreRecord};
use docstore_core::db::open_db_in_memory;
use docstore_core::model::path::MAX_FOLDER_DEPTH;
use docstore_core::{
    DocumentListQuery, DocumentResource, FolderListQuery, FolderResource, Reply, TopicResource,
    TransferError, TransferService,
};
use rusqlite::Connection;
use serde_json::{json, Map, Value};
use uuid::Uuid;

fn body_of(reply: Reply) -> Value {
    reply.body().cloned().unwrap()
}

fn fields(value: Value) -> Map<String, Value> {
    value.as_object().unwrap().clone()
}

fn seed(conn: &Connection) {
    let topics = TopicResource::try_new(conn).unwrap();
    let folders = FolderResource::try_new(conn).unwrap();
    let documents = DocumentResource::try_new(conn).unwrap();

    let topic = body_of(
        topics
            .create(&json!({"short_desc": "t", "full_desc": "topic"}))
            .unwrap(),
    );
    let root = body_of(
        folders
            .create(&json!({"name": "root", "topics": [topic["id"]]}))
            .unwrap(),
    );
    let child = body_of(
        folders
            .create(&json!({"name": "child", "parent": root["id"]}))
            .unwrap(),
    );
    documents
        .create(&json!({
            "name": "doc",
            "folder": child["id"],
            "topics": [topic["id"]],
            "contents": "body",
        }))
        .unwrap();
}

fn snapshot(conn: &Connection) -> (Value, Value, Value) {
    let topics = TopicResource::try_new(conn).unwrap();
    let folders = FolderResource::try_new(conn).unwrap();
    let documents = DocumentResource::try_new(conn).unwrap();
    (
        body_of(topics.list().unwrap()),
        body_of(folders.list(&FolderListQuery::default()).unwrap()),
        body_of(documents.list(&DocumentListQuery::default()).unwrap()),
    )
}

#[test]
fn dump_then_load_into_fresh_store_reproduces_entities() {
    let source = open_db_in_memory().unwrap();
    seed(&source);
    let dumped = TransferService::new(&source)
        .dump_json(&[])
        .unwrap()
        .to_string();

    let target = open_db_in_memory().unwrap();
    let summary = TransferService::new(&target).load_json(&dumped).unwrap();
    assert_eq!(summary.topics.created, 1);
    assert_eq!(summary.folders.created, 2);
    assert_eq!(summary.documents.created, 1);
    assert_eq!(summary.total(), 4);

    assert_eq!(snapshot(&source), snapshot(&target));
}

#[test]
fn loading_twice_replaces_instead_of_duplicating() {
    let source = open_db_in_memory().unwrap();
    seed(&source);
    let records = TransferService::new(&source).dump(&[]).unwrap();

    let target = open_db_in_memory().unwrap();
    let service = TransferService::new(&target);
    service.load(records.clone()).unwrap();
    let second = service.load(records).unwrap();

    assert_eq!(second.folders.created, 0);
    assert_eq!(second.folders.replaced, 2);
    assert_eq!(snapshot(&source), snapshot(&target));
}

#[test]
fn dump_respects_requested_kinds_in_dependency_order() {
    let conn = open_db_in_memory().unwrap();
    seed(&conn);
    let service = TransferService::new(&conn);

    let records = service
        .dump(&[ModelKind::Document, ModelKind::Topic])
        .unwrap();
    let tags: Vec<&str> = records.iter().map(|record| record.model.as_str()).collect();
    assert_eq!(tags, ["docstore.topic", "docstore.document"]);
}

#[test]
fn child_may_precede_parent_within_one_load() {
    let parent = Uuid::new_v4();
    let child = Uuid::new_v4();
    let input = json!([
        {"model": "docstore.folder", "id": child.to_string(), "name": "child", "parent": parent.to_string()},
        {"model": "docstore.folder", "id": parent.to_string(), "name": "parent"},
        {"model": "docstore.document", "name": "generated-id"},
    ])
    .to_string();

    let conn = open_db_in_memory().unwrap();
    TransferService::new(&conn).load_json(&input).unwrap();

    let folders = FolderResource::try_new(&conn).unwrap();
    assert_eq!(
        body_of(folders.retrieve(child).unwrap())["path"],
        "/parent/child"
    );
    let documents = body_of(
        DocumentResource::try_new(&conn)
            .unwrap()
            .list(&DocumentListQuery::default())
            .unwrap(),
    );
    assert!(Uuid::parse_str(documents[0]["id"].as_str().unwrap()).is_ok());
}

#[test]
fn folder_cycle_aborts_the_whole_load() {
    let a = Uuid::new_v4();
    let b = Uuid::new_v4();
    let records = vec![
        StoreRecord::new(
            ModelKind::Topic,
            Uuid::new_v4().to_string(),
            fields(json!({"short_desc": "kept?", "full_desc": "no"})),
        ),
        StoreRecord::new(
            ModelKind::Folder,
            a.to_string(),
            fields(json!({"name": "a", "parent": b.to_string()})),
        ),
        StoreRecord::new(
            ModelKind::Folder,
            b.to_string(),
            fields(json!({"name": "b", "parent": a.to_string()})),
        ),
    ];

    let conn = open_db_in_memory().unwrap();
    let err = TransferService::new(&conn).load(records).unwrap_err();
    assert!(matches!(err, TransferError::FolderCycle(_)));

    let topics = body_of(TopicResource::try_new(&conn).unwrap().list().unwrap());
    assert_eq!(topics, json!([]));
}

#[test]
fn dangling_reference_and_bad_records_are_rejected() {
    let conn = open_db_in_memory().unwrap();
    let service = TransferService::new(&conn);

    let dangling = json!([
        {"model": "docstore.document", "name": "x", "folder": Uuid::new_v4().to_string()}
    ])
    .to_string();
    assert!(matches!(
        service.load_json(&dangling).unwrap_err(),
        TransferError::DanglingReference { index: 0, field: "folder", .. }
    ));

    let unknown = json!([{"model": "docstore.user", "name": "x"}]).to_string();
    assert!(matches!(
        service.load_json(&unknown).unwrap_err(),
        TransferError::UnknownModel { index: 0, .. }
    ));

    let invalid = json!([{"model": "docstore.topic", "short_desc": ""}]).to_string();
    match service.load_json(&invalid).unwrap_err() {
        TransferError::InvalidRecord { index, errors } => {
            assert_eq!(index, 0);
            assert!(errors.contains("short_desc"));
            assert!(errors.contains("full_desc"));
        }
        other => panic!("unexpected error: {other}"),
    }

    assert!(matches!(
        service.load_json("{}").unwrap_err(),
        TransferError::Parse(_)
    ));
}

#[test]
fn over_deep_folder_chain_aborts_the_whole_load() {
    let ids: Vec<Uuid> = (0..=MAX_FOLDER_DEPTH).map(|_| Uuid::new_v4()).collect();
    let records: Vec<StoreRecord> = ids
        .iter()
        .enumerate()
        .map(|(level, id)| {
            let parent = level.checked_sub(1).map(|prev| ids[prev].to_string());
            StoreRecord::new(
                ModelKind::Folder,
                id.to_string(),
                fields(json!({"name": format!("l{level}"), "parent": parent})),
            )
        })
        .collect();

    let conn = open_db_in_memory().unwrap();
    let service = TransferService::new(&conn);
    let err = service.load(records.clone()).unwrap_err();
    assert!(matches!(err, TransferError::FolderTooDeep(_)));

    let folders = FolderResource::try_new(&conn).unwrap();
    let listed = body_of(folders.list(&FolderListQuery::default()).unwrap());
    assert_eq!(listed, json!([]));

    let summary = service
        .load(records[..MAX_FOLDER_DEPTH].to_vec())
        .unwrap();
    assert_eq!(summary.folders.created, MAX_FOLDER_DEPTH);
}
