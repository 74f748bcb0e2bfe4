//! HTTP surface exercised through a real listener.

mod common;

use common::{Harness, HANDBOOK};
use jarvis_rag::server::{build_router, state::AppState};
use reqwest::multipart::{Form, Part};
use serde_json::{json, Value};
use tempfile::TempDir;

async fn spawn_server() -> (String, TempDir, tokio::task::JoinHandle<()>) {
    let Harness { engine, dir, .. } = Harness::new();
    let app = build_router(AppState::new(engine));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind test listener");
    let addr = listener.local_addr().expect("listener addr");

    let handle = tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server run");
    });

    (format!("http://{}", addr), dir, handle)
}

fn upload(files: &[(&str, &str)]) -> Form {
    files.iter().fold(Form::new(), |form, (name, text)| {
        form.part(
            "files",
            Part::bytes(text.as_bytes().to_vec()).file_name(name.to_string()),
        )
    })
}

#[tokio::test]
async fn serves_ui_and_health() {
    let (base, _dir, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let page = client.get(&base).send().await.unwrap();
    assert!(page.status().is_success());
    let html = page.text().await.unwrap();
    assert!(html.contains("Upload Documents"));
    assert!(html.contains("Document Collection"));

    let health = client.get(format!("{}/health", base)).send().await.unwrap();
    assert_eq!(health.text().await.unwrap(), "OK");

    let ready: Value = client
        .get(format!("{}/ready", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ready["vector_store"], true);
    assert_eq!(ready["llm"], true);

    handle.abort();
}

#[tokio::test]
async fn upload_query_list_and_delete() {
    let (base, _dir, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let ingest: Value = client
        .post(format!("{}/api/ingest", base))
        .multipart(upload(&[("handbook.txt", HANDBOOK), ("notes.xlsx", "x")]))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ingest["success"], false);
    assert_eq!(ingest["documents"].as_array().unwrap().len(), 1);
    assert_eq!(ingest["errors"][0]["filename"], "notes.xlsx");
    assert_eq!(ingest["total_chunks_created"], 1);

    let answer: Value = client
        .post(format!("{}/api/query", base))
        .json(&json!({ "question": "How many vacation days do employees get?" }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(answer["answer"].as_str().unwrap().contains("15"));
    assert_eq!(answer["citations"][0]["document_name"], "handbook.txt");

    let listing: Value = client
        .get(format!("{}/api/documents", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(listing["total_count"], 1);
    assert_eq!(listing["documents"][0]["id"], "handbook.txt");
    assert_eq!(listing["documents"][0]["file_type"], "txt");

    let deleted = client
        .delete(format!("{}/api/documents/handbook.txt", base))
        .send()
        .await
        .unwrap();
    assert!(deleted.status().is_success());
    let deleted: Value = deleted.json().await.unwrap();
    assert_eq!(deleted["deleted_chunks"], 1);

    let missing = client
        .delete(format!("{}/api/documents/handbook.txt", base))
        .send()
        .await
        .unwrap();
    assert_eq!(missing.status(), reqwest::StatusCode::NOT_FOUND);

    handle.abort();
}

#[tokio::test]
async fn chat_and_text_ingest() {
    let (base, dir, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let ingest: Value = client
        .post(format!("{}/api/ingest/text", base))
        .json(&json!({ "title": "Leave Policy", "text": HANDBOOK }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(ingest["success"], true);
    let filename = ingest["documents"][0]["filename"].as_str().unwrap().to_string();
    assert!(dir.path().join(&filename).exists());

    let chat: Value = client
        .post(format!("{}/api/chat", base))
        .json(&json!({
            "messages": [
                { "role": "user", "content": "How many vacation days do employees get?" }
            ]
        }))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(chat["citations"][0]["document_name"], filename.as_str());

    let stats: Value = client
        .get(format!("{}/api/stats", base))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(stats["total_vectors"], 1);

    let cleared = client
        .delete(format!("{}/api/documents", base))
        .send()
        .await
        .unwrap();
    assert!(cleared.status().is_success());

    handle.abort();
}

#[tokio::test]
async fn invalid_requests_get_structured_errors() {
    let (base, _dir, handle) = spawn_server().await;
    let client = reqwest::Client::new();

    let empty_question = client
        .post(format!("{}/api/query", base))
        .json(&json!({ "question": "" }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty_question.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = empty_question.json().await.unwrap();
    assert_eq!(body["error"]["type"], "invalid_request");

    let empty_text = client
        .post(format!("{}/api/ingest/text", base))
        .json(&json!({ "title": "Blank", "text": "   " }))
        .send()
        .await
        .unwrap();
    assert_eq!(empty_text.status(), reqwest::StatusCode::BAD_REQUEST);

    handle.abort();
}
