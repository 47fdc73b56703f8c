//! End-to-end checks of the chat widget API against a faked OpenAI backend.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use mockito::{Matcher, ServerGuard};
use std::time::{Duration, Instant};
use serde_json::{json, Value};
use tower::ServiceExt;

use najot_bot::{build_router, Config, UnifiedAppState};

const MISSING_KEY_WARNING: &str = "Iltimos, OpenAI API kalitni kiriting.";

/// One-page PDF whose text becomes a single chunk.
fn brochure_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 720.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).unwrap();
    buffer
}

struct Harness {
    app: Router,
    state: UnifiedAppState,
    _dir: tempfile::TempDir,
}

fn harness(server: &ServerGuard, with_document: bool) -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let pdf_path = dir.path().join("najot_talim.pdf");
    if with_document {
        std::fs::write(&pdf_path, brochure_pdf("Frontend kursi narxi oyiga 2400000 som")).unwrap();
    }

    let config = Config {
        openai_base_url: server.url(),
        source_pdf: pdf_path.to_string_lossy().to_string(),
        ..Config::default()
    };
    let state = UnifiedAppState::new(config);
    Harness {
        app: build_router(state.clone()),
        state,
        _dir: dir,
    }
}

async fn call(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

async fn open_session(app: &Router, api_key: Option<&str>) -> String {
    let (status, created) = call(app, "POST", "/sessions", None).await;
    assert_eq!(status, StatusCode::OK);
    let session_id = created["session_id"].as_str().unwrap().to_string();

    if let Some(key) = api_key {
        let (status, body) = call(
            app,
            "PUT",
            &format!("/sessions/{}/api-key", session_id),
            Some(json!({ "api_key": key })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["has_api_key"], true);
    }
    session_id
}

async fn mock_embeddings(server: &mut ServerGuard, expected_calls: usize) -> mockito::Mock {
    mock_embeddings_for(server, "sk-test", expected_calls).await
}

async fn mock_embeddings_for(server: &mut ServerGuard, api_key: &str, expected_calls: usize) -> mockito::Mock {
    server
        .mock("POST", "/v1/embeddings")
        .match_header("authorization", format!("Bearer {}", api_key).as_str())
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"data": [{"index": 0, "embedding": [0.6, 0.8]}]}).to_string())
        .expect(expected_calls)
        .create_async()
        .await
}

#[tokio::test]
async fn test_missing_credential_blocks_every_remote_call() {
    let mut server = mockito::Server::new_async().await;
    let remote = server.mock("POST", Matcher::Any).expect(0).create_async().await;
    let h = harness(&server, true);

    let session_id = open_session(&h.app, None).await;
    let (status, body) = call(
        &h.app,
        "POST",
        &format!("/sessions/{}/messages", session_id),
        Some(json!({ "content": "Kurs narxi qancha?" })),
    )
    .await;

    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], MISSING_KEY_WARNING);

    let (_, session) = call(&h.app, "GET", &format!("/sessions/{}", session_id), None).await;
    assert_eq!(session["has_api_key"], false);
    assert_eq!(session["messages"].as_array().unwrap().len(), 0);

    remote.assert_async().await;
}

#[tokio::test]
async fn test_question_answered_from_document() {
    let mut server = mockito::Server::new_async().await;
    // One call indexes the single chunk, one call per question embeds it.
    let embeddings = mock_embeddings(&mut server, 3).await;
    let completions = server
        .mock("POST", "/v1/chat/completions")
        .match_body(Matcher::AllOf(vec![
            Matcher::PartialJson(json!({"model": "gpt-4", "temperature": 0.2})),
            Matcher::Regex("Frontend kursi narxi".to_string()),
            Matcher::Regex("Question: Kurs narxi qancha\\?".to_string()),
        ]))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"choices": [{"message": {"content": "Oyiga 2.400.000 so'm."}}]}).to_string())
        .expect(2)
        .create_async()
        .await;
    let h = harness(&server, true);
    let session_id = open_session(&h.app, Some("sk-test")).await;
    let uri = format!("/sessions/{}/messages", session_id);

    let (status, body) = call(&h.app, "POST", &uri, Some(json!({ "content": "Kurs narxi qancha?" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Oyiga 2.400.000 so'm.");
    let messages = body["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0], json!({"role": "user", "content": "Kurs narxi qancha?"}));
    assert_eq!(messages[1], json!({"role": "assistant", "content": "Oyiga 2.400.000 so'm."}));

    // The index is reused for the rest of the session.
    let (status, body) = call(&h.app, "POST", &uri, Some(json!({ "content": "Kurs narxi qancha?" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["messages"].as_array().unwrap().len(), 4);

    embeddings.assert_async().await;
    completions.assert_async().await;
}

#[tokio::test]
async fn test_new_chat_archives_previous_messages() {
    let mut server = mockito::Server::new_async().await;
    let _embeddings = mock_embeddings(&mut server, 2).await;
    let _completion = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"choices": [{"message": {"content": "Toshkentda."}}]}).to_string())
        .create_async()
        .await;
    let h = harness(&server, true);
    let session_id = open_session(&h.app, Some("sk-test")).await;

    let (_, before) = call(&h.app, "GET", &format!("/sessions/{}", session_id), None).await;
    call(
        &h.app,
        "POST",
        &format!("/sessions/{}/messages", session_id),
        Some(json!({ "content": "Manzil qayerda?" })),
    )
    .await;

    let (status, new_chat) = call(&h.app, "POST", &format!("/sessions/{}/new-chat", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(new_chat["archived_chats"], 1);
    assert_ne!(new_chat["thread_id"], before["thread_id"]);

    let (_, after) = call(&h.app, "GET", &format!("/sessions/{}", session_id), None).await;
    assert_eq!(after["messages"].as_array().unwrap().len(), 0);
    assert_eq!(after["thread_id"], new_chat["thread_id"]);

    let (_, history) = call(&h.app, "GET", &format!("/sessions/{}/history", session_id), None).await;
    let chats = history["chats"].as_array().unwrap();
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0]["thread_id"], before["thread_id"]);
    assert_eq!(chats[0]["messages"][0]["content"], "Manzil qayerda?");
    assert_eq!(chats[0]["messages"][1]["content"], "Toshkentda.");

    // An empty chat is not archived again.
    let (_, again) = call(&h.app, "POST", &format!("/sessions/{}/new-chat", session_id), None).await;
    assert_eq!(again["archived_chats"], 1);
}

#[tokio::test]
async fn test_missing_document_reported_in_chat() {
    let mut server = mockito::Server::new_async().await;
    let remote = server.mock("POST", Matcher::Any).expect(0).create_async().await;
    let h = harness(&server, false);
    let session_id = open_session(&h.app, Some("sk-test")).await;

    let (status, body) = call(
        &h.app,
        "POST",
        &format!("/sessions/{}/messages", session_id),
        Some(json!({ "content": "Salom" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let reply = body["reply"].as_str().unwrap();
    assert!(reply.starts_with("Error initializing vector store:"));
    assert!(reply.contains("Error generating response:"));
    assert_eq!(body["messages"].as_array().unwrap().len(), 2);
    remote.assert_async().await;
}

#[tokio::test]
async fn test_completion_failure_becomes_reply() {
    let mut server = mockito::Server::new_async().await;
    let _embeddings = mock_embeddings(&mut server, 2).await;
    let _completion = server
        .mock("POST", "/v1/chat/completions")
        .with_status(429)
        .with_body("Rate limit reached")
        .create_async()
        .await;
    let h = harness(&server, true);
    let session_id = open_session(&h.app, Some("sk-test")).await;

    let (status, body) = call(
        &h.app,
        "POST",
        &format!("/sessions/{}/messages", session_id),
        Some(json!({ "content": "Chegirmalar bormi?" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let reply = body["reply"].as_str().unwrap();
    assert!(reply.starts_with("Error generating response:"));
    assert!(reply.contains("429"));
}

#[tokio::test]
async fn test_clearing_credential_blocks_chat_again() {
    let server = mockito::Server::new_async().await;
    let h = harness(&server, true);
    let session_id = open_session(&h.app, Some("sk-test")).await;

    let (status, body) = call(
        &h.app,
        "PUT",
        &format!("/sessions/{}/api-key", session_id),
        Some(json!({ "api_key": "   " })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["has_api_key"], false);

    let (status, _) = call(
        &h.app,
        "POST",
        &format!("/sessions/{}/messages", session_id),
        Some(json!({ "content": "Salom" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_blank_message_rejected() {
    let server = mockito::Server::new_async().await;
    let h = harness(&server, true);
    let session_id = open_session(&h.app, Some("sk-test")).await;

    let (status, _) = call(
        &h.app,
        "POST",
        &format!("/sessions/{}/messages", session_id),
        Some(json!({ "content": "  " })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (_, session) = call(&h.app, "GET", &format!("/sessions/{}", session_id), None).await;
    assert_eq!(session["messages"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_unknown_session_is_not_found() {
    let server = mockito::Server::new_async().await;
    let h = harness(&server, true);

    let (status, body) = call(&h.app, "GET", "/sessions/does-not-exist", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(body["error"].as_str().unwrap().contains("does-not-exist"));

    let (status, _) = call(&h.app, "POST", "/sessions/does-not-exist/new-chat", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_widget_and_health_served() {
    let server = mockito::Server::new_async().await;
    let h = harness(&server, true);

    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let html = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(html.contains("Najot Ta'lim ChatBot"));
    assert!(html.contains("Yangi chat"));
    assert!(html.contains("Savolni kiriting"));

    let response = h
        .app
        .clone()
        .oneshot(Request::builder().uri("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_changing_key_rebuilds_index_with_new_key() {
    let mut server = mockito::Server::new_async().await;
    // Index build plus question embedding under each key.
    let first_key = mock_embeddings_for(&mut server, "sk-first", 2).await;
    let second_key = mock_embeddings_for(&mut server, "sk-second", 2).await;
    let _completion = server
        .mock("POST", "/v1/chat/completions")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(json!({"choices": [{"message": {"content": "Ha."}}]}).to_string())
        .expect(2)
        .create_async()
        .await;
    let h = harness(&server, true);
    let session_id = open_session(&h.app, Some("sk-first")).await;
    let uri = format!("/sessions/{}/messages", session_id);

    let (status, _) = call(&h.app, "POST", &uri, Some(json!({ "content": "Kurslar bormi?" }))).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = call(
        &h.app,
        "PUT",
        &format!("/sessions/{}/api-key", session_id),
        Some(json!({ "api_key": "sk-second" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = call(&h.app, "POST", &uri, Some(json!({ "content": "Kurslar bormi?" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["reply"], "Ha.");

    first_key.assert_async().await;
    second_key.assert_async().await;
}

#[tokio::test]
async fn test_reading_session_keeps_it_alive() {
    let server = mockito::Server::new_async().await;
    let h = harness(&server, true);
    let session_id = open_session(&h.app, Some("sk-test")).await;

    let session = h.state.sessions.get(&session_id).unwrap();
    session.write().unwrap().last_accessed = Instant::now() - Duration::from_secs(120);

    let (status, _) = call(&h.app, "GET", &format!("/sessions/{}", session_id), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, _) = call(&h.app, "GET", &format!("/sessions/{}/history", session_id), None).await;
    assert_eq!(status, StatusCode::OK);

    assert_eq!(h.state.sessions.evict_idle(Duration::from_secs(60)), 0);
    let (_, body) = call(&h.app, "GET", &format!("/sessions/{}", session_id), None).await;
    assert_eq!(body["has_api_key"], true);
}
