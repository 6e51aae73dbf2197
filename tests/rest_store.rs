//! Wire-format checks for the PostgREST task store.

use homework_tracker::store::{RestTaskStore, StoreConfig, StoreError, TaskStore};
use homework_tracker::types::{Student, Subject, TaskPatch};
use serde_json::{Value, json};
use uuid::Uuid;
use wiremock::matchers::{body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const KEY: &str = "anon-test-key";
const ROW_ID: &str = "6b0d7f0c-3f6c-4c3e-9d55-3c1a43b2b7a1";

fn store_for(server: &MockServer) -> RestTaskStore {
    let config = StoreConfig::new(Some(&server.uri()), Some(KEY), "tasks").expect("valid config");
    RestTaskStore::new(config).expect("client builds")
}

fn row(id: &str, title: &str, student: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "subject": "Math",
        "due_date": "2026-10-16",
        "student": student,
        "color": "#16a34a",
        "completed": false,
        "notes": null
    })
}

#[tokio::test]
async fn test_list_sends_credentials_and_due_date_order() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("select", "*"))
        .and(query_param("order", "due_date.asc"))
        .and(header("apikey", KEY))
        .and(header("authorization", format!("Bearer {KEY}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([
            row(ROW_ID, "Algebra HW", "Muhammad"),
            row("not-a-uuid", "Broken", "Muhammad"),
        ])))
        .expect(1)
        .mount(&server)
        .await;

    let tasks = store_for(&server).list().await.expect("list succeeds");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Algebra HW");
    assert_eq!(tasks[0].subject, Subject::Math);
    assert_eq!(tasks[0].student, Student::Muhammad);
}

#[tokio::test]
async fn test_list_flags_legacy_student_codes() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!([row(ROW_ID, "Essay", "MAH")])),
        )
        .mount(&server)
        .await;

    let tasks = store_for(&server).list().await.expect("list succeeds");
    assert_eq!(tasks[0].student, Student::Mahveen);
    assert!(tasks[0].needs_migration);
}

#[tokio::test]
async fn test_create_posts_row_and_asks_for_representation() {
    let server = MockServer::start().await;
    let id = Uuid::parse_str(ROW_ID).expect("fixed id");
    Mock::given(method("POST"))
        .and(path("/rest/v1/tasks"))
        .and(header("prefer", "return=representation"))
        .and(body_partial_json(json!({
            "id": ROW_ID,
            "title": "Algebra HW",
            "student": "Muhammad",
            "color": "#16a34a"
        })))
        .respond_with(
            ResponseTemplate::new(201).set_body_json(json!([row(ROW_ID, "Algebra HW", "Muhammad")])),
        )
        .expect(1)
        .mount(&server)
        .await;

    let task = homework_tracker::types::TaskDraft {
        title: "Algebra HW".to_string(),
        subject: Subject::Math,
        due_date: None,
        student: Student::Muhammad,
        notes: None,
    }
    .into_task(id);

    let stored = store_for(&server).create(&task).await.expect("create succeeds");
    assert_eq!(stored.id, id);
}

#[tokio::test]
async fn test_update_targets_row_by_id() {
    let server = MockServer::start().await;
    let id = Uuid::parse_str(ROW_ID).expect("fixed id");
    let mut updated = row(ROW_ID, "Algebra HW", "Muhammad");
    updated["completed"] = json!(true);
    Mock::given(method("PATCH"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("id", format!("eq.{ROW_ID}").as_str()))
        .and(body_partial_json(json!({ "completed": true })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([updated])))
        .expect(1)
        .mount(&server)
        .await;

    let task = store_for(&server)
        .update(id, &TaskPatch::completed(true))
        .await
        .expect("update succeeds");
    assert!(task.completed);
}

#[tokio::test]
async fn test_delete_of_missing_row_is_not_found() {
    let server = MockServer::start().await;
    let id = Uuid::new_v4();
    Mock::given(method("DELETE"))
        .and(path("/rest/v1/tasks"))
        .and(query_param("id", format!("eq.{id}").as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!([])))
        .expect(1)
        .mount(&server)
        .await;

    let result = store_for(&server).delete(id).await;
    assert!(matches!(result, Err(StoreError::NotFound(missing)) if missing == id));
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/rest/v1/tasks"))
        .respond_with(ResponseTemplate::new(500).set_body_string("  relation does not exist \n"))
        .mount(&server)
        .await;

    match store_for(&server).list().await {
        Err(StoreError::Status { status, body }) => {
            assert_eq!(status, 500);
            assert_eq!(body, "relation does not exist");
        }
        other => panic!("expected status error, got {other:?}"),
    }
}
