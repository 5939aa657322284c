use docstore_core::db::open_db_in_memory;
use docstore_core::{FolderResource, Reply, ResourceError, TopicResource};
use serde_json::{json, Value};
use uuid::Uuid;

fn body_of(reply: Reply) -> Value {
    reply.body().cloned().unwrap()
}

#[test]
fn create_returns_created_detail_with_generated_id() {
    let conn = open_db_in_memory().unwrap();
    let topics = TopicResource::try_new(&conn).unwrap();

    let reply = topics
        .create(&json!({"short_desc": "rust", "full_desc": "Systems language"}))
        .unwrap();
    assert_eq!(reply.status(), 201);

    let body = body_of(reply);
    let id = Uuid::parse_str(body["id"].as_str().unwrap()).unwrap();
    assert!(!id.is_nil());
    assert_eq!(body["folders"], json!([]));
    assert_eq!(body["documents"], json!([]));
}

#[test]
fn create_honours_a_supplied_unused_id_and_rejects_a_taken_one() {
    let conn = open_db_in_memory().unwrap();
    let topics = TopicResource::try_new(&conn).unwrap();
    let id = Uuid::new_v4();
    let payload = json!({"id": id.to_string(), "short_desc": "a", "full_desc": "b"});

    let body = body_of(topics.create(&payload).unwrap());
    assert_eq!(body["id"], id.to_string());

    match topics.create(&payload).unwrap_err() {
        ResourceError::Validation(errors) => assert!(errors.contains("id")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn list_is_sorted_by_short_desc() {
    let conn = open_db_in_memory().unwrap();
    let topics = TopicResource::try_new(&conn).unwrap();
    for name in ["zeta", "alpha", "mid"] {
        topics
            .create(&json!({"short_desc": name, "full_desc": "x"}))
            .unwrap();
    }

    let listed = body_of(topics.list().unwrap());
    let names: Vec<&str> = listed
        .as_array()
        .unwrap()
        .iter()
        .map(|item| item["short_desc"].as_str().unwrap())
        .collect();
    assert_eq!(names, ["alpha", "mid", "zeta"]);
    assert!(listed[0].get("folders").is_none());
}

#[test]
fn retrieve_and_replace_absent_topic_are_not_found() {
    let conn = open_db_in_memory().unwrap();
    let topics = TopicResource::try_new(&conn).unwrap();
    let id = Uuid::new_v4();

    assert!(matches!(
        topics.retrieve(id).unwrap_err(),
        ResourceError::NotFound(missing) if missing == id
    ));
    assert!(matches!(
        topics
            .replace(id, &json!({"short_desc": "a", "full_desc": "b"}))
            .unwrap_err(),
        ResourceError::NotFound(_)
    ));
}

#[test]
fn replace_rewrites_fields_and_rejects_mismatched_body_id() {
    let conn = open_db_in_memory().unwrap();
    let topics = TopicResource::try_new(&conn).unwrap();
    let created = body_of(
        topics
            .create(&json!({"short_desc": "old", "full_desc": "old text"}))
            .unwrap(),
    );
    let id = Uuid::parse_str(created["id"].as_str().unwrap()).unwrap();

    let replaced = body_of(
        topics
            .replace(id, &json!({"short_desc": "new", "full_desc": "new text"}))
            .unwrap(),
    );
    assert_eq!(replaced["short_desc"], "new");
    assert_eq!(body_of(topics.retrieve(id).unwrap())["full_desc"], "new text");

    let err = topics
        .replace(
            id,
            &json!({"id": Uuid::new_v4().to_string(), "short_desc": "x", "full_desc": "y"}),
        )
        .unwrap_err();
    match err {
        ResourceError::Validation(errors) => assert!(errors.contains("id")),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn delete_is_no_content_even_when_absent() {
    let conn = open_db_in_memory().unwrap();
    let topics = TopicResource::try_new(&conn).unwrap();
    let id = Uuid::new_v4();

    assert_eq!(topics.delete(id).unwrap(), Reply::NoContent);
    assert_eq!(topics.delete(id).unwrap(), Reply::NoContent);
}

#[test]
fn topic_detail_embeds_related_folders_and_delete_keeps_them() {
    let conn = open_db_in_memory().unwrap();
    let topics = TopicResource::try_new(&conn).unwrap();
    let folders = FolderResource::try_new(&conn).unwrap();

    let topic = body_of(
        topics
            .create(&json!({"short_desc": "t", "full_desc": "x"}))
            .unwrap(),
    );
    let topic_id = Uuid::parse_str(topic["id"].as_str().unwrap()).unwrap();
    let folder = body_of(
        folders
            .create(&json!({"name": "tagged", "topics": [topic_id.to_string()]}))
            .unwrap(),
    );
    let folder_id = Uuid::parse_str(folder["id"].as_str().unwrap()).unwrap();

    let detail = body_of(topics.retrieve(topic_id).unwrap());
    assert_eq!(detail["folders"][0]["id"], folder_id.to_string());
    assert_eq!(detail["folders"][0]["path"], "/tagged");

    topics.delete(topic_id).unwrap();
    let folder_after = body_of(folders.retrieve(folder_id).unwrap());
    assert_eq!(folder_after["topics"], json!([]));
}
