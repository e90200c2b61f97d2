//! End-to-end send flow against a mock model endpoint.

use glimmer::chat::ChatController;
use glimmer::llm::{CollectSink, ContextEntry, EngineConfig, GeminiEngine, Role};
use glimmer::sessions::{Message, SessionManager};
use glimmer::storage::FileStore;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::Mutex;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MODEL: &str = "gemini-2.0-flash";
const STREAM_PATH: &str = "/v1beta/models/gemini-2.0-flash:streamGenerateContent";

const HELLO_BODY: &str = concat!(
    r#"[{"candidates":[{"content":{"parts":[{"text":"He"}]}}]},"#,
    r#"{"candidates":[{"content":{"parts":[{"text":"llo"}]}}]}]"#
);

fn engine_for(server: &MockServer) -> Arc<GeminiEngine> {
    let mut config = EngineConfig::new(Some("test-key".into()));
    config.base_url = server.uri();
    Arc::new(GeminiEngine::new(config))
}

fn harness(
    server: &MockServer,
    dir: &TempDir,
) -> (ChatController, Arc<Mutex<SessionManager>>) {
    let store = FileStore::new(dir.path().to_path_buf()).unwrap();
    let manager = Arc::new(Mutex::new(SessionManager::new(Box::new(store), 100)));
    let controller = ChatController::new(
        Arc::clone(&manager),
        engine_for(server),
        MODEL.into(),
        20,
    );
    (controller, manager)
}

#[tokio::test]
async fn engine_streams_decoded_deltas_in_order() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .and(query_param("key", "test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(HELLO_BODY, "application/json"))
        .expect(1)
        .mount(&server)
        .await;

    let engine = engine_for(&server);
    let sink = CollectSink::new();
    let contents = vec![ContextEntry::new(Role::User, "hi")];

    engine.stream_response(MODEL, &contents, &sink).await.unwrap();
    assert_eq!(sink.into_text(), "Hello");
}

#[tokio::test]
async fn send_message_appends_pair_and_folds_streamed_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(HELLO_BODY, "application/json"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (controller, manager) = harness(&server, &dir);
    let session_id = {
        // Seed one prior user/model pair.
        let mut manager = manager.lock().await;
        let id = manager.active_id().to_string();
        let mut reply = Message::assistant_placeholder();
        reply.text = "earlier reply".into();
        manager.append_messages(&id, vec![Message::user("earlier question"), reply]);
        id
    };

    let sink = CollectSink::new();
    controller.send_message(&session_id, "hi", &sink).await.unwrap();

    let manager = manager.lock().await;
    let messages = &manager.active_session().messages;
    assert_eq!(messages.len(), 4);
    assert_eq!(messages[2].text, "hi");
    assert!(messages[2].from_user);
    assert_eq!(messages[3].text, "Hello");
    assert!(!messages[3].from_user);
    assert_eq!(sink.into_text(), "Hello");

    // Request carried the prior pair plus the wrapped new turn.
    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    let contents = body["contents"].as_array().unwrap();
    assert_eq!(contents.len(), 3);
    assert_eq!(contents[0]["role"], "user");
    assert_eq!(contents[0]["parts"][0]["text"], "earlier question");
    assert_eq!(contents[1]["role"], "model");
    assert_eq!(contents[1]["parts"][0]["text"], "earlier reply");
    assert_eq!(contents[2]["role"], "user");
    let wrapped = contents[2]["parts"][0]["text"].as_str().unwrap();
    assert!(wrapped.contains("hi"));
    assert!(wrapped.contains("Markdown"));
}

#[tokio::test]
async fn second_send_while_first_is_streaming_is_dropped() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw(HELLO_BODY, "application/json")
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (controller, manager) = harness(&server, &dir);
    let controller = Arc::new(controller);
    let session_id = manager.lock().await.active_id().to_string();

    let first = tokio::spawn({
        let controller = Arc::clone(&controller);
        let session_id = session_id.clone();
        async move {
            controller
                .send_message(&session_id, "first", &CollectSink::new())
                .await
        }
    });

    // Let the first send reach its in-flight window, then try a second.
    tokio::time::sleep(Duration::from_millis(150)).await;
    let dropped = CollectSink::new();
    controller
        .send_message(&session_id, "second", &dropped)
        .await
        .unwrap();

    // The dropped send appended nothing and streamed nothing.
    assert_eq!(manager.lock().await.active_session().messages.len(), 2);
    assert!(dropped.into_text().is_empty());

    first.await.unwrap().unwrap();
    let manager = manager.lock().await;
    let messages = &manager.active_session().messages;
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].text, "first");
    assert_eq!(messages[1].text, "Hello");
}

#[tokio::test]
async fn non_success_status_lands_as_error_in_transcript() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(429).set_body_string("quota exhausted"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let (controller, manager) = harness(&server, &dir);
    let session_id = manager.lock().await.active_id().to_string();

    controller
        .send_message(&session_id, "hi", &CollectSink::new())
        .await
        .unwrap();

    let manager = manager.lock().await;
    let messages = &manager.active_session().messages;
    assert_eq!(messages.len(), 2);
    assert!(messages[1].text.contains("[error:"));
    assert!(messages[1].text.contains("429"));
}

#[tokio::test]
async fn settled_send_is_persisted_and_reloadable() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(STREAM_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_raw(HELLO_BODY, "application/json"))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let session_id = {
        let (controller, manager) = harness(&server, &dir);
        let id = manager.lock().await.active_id().to_string();
        controller
            .send_message(&id, "hi", &CollectSink::new())
            .await
            .unwrap();
        id
    };

    // A fresh manager over the same directory sees the settled turn.
    let store = FileStore::new(dir.path().to_path_buf()).unwrap();
    let reloaded = SessionManager::new(Box::new(store), 100);
    assert_eq!(reloaded.active_id(), session_id);
    let messages = &reloaded.active_session().messages;
    assert_eq!(messages[0].text, "hi");
    assert_eq!(messages[1].text, "Hello");
}
