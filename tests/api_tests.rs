use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum_test::TestServer;
use serde_json::json;

use channel_recommender::{
    api::{create_router, AppState},
    config::{ConfigStore, RecommenderSettings},
    error::AppResult,
    services::{InMemoryDirectory, Messenger, Recommender},
};

#[derive(Default)]
struct RecordingMessenger {
    sent: Mutex<Vec<(String, String, String)>>,
}

impl RecordingMessenger {
    fn sent(&self) -> Vec<(String, String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Messenger for RecordingMessenger {
    async fn send_ephemeral(&self, user_id: &str, channel_id: &str, text: &str) -> AppResult<()> {
        self.sent.lock().unwrap().push((
            user_id.to_string(),
            channel_id.to_string(),
            text.to_string(),
        ));
        Ok(())
    }
}

/// Town with a `lobby` channel whose members also use `dev`, `ops` and `memes`
fn directory() -> InMemoryDirectory {
    let mut directory = InMemoryDirectory::new();
    directory
        .add_channel("lobby", "team", "lobby")
        .add_channel("dev", "team", "dev")
        .add_channel("ops", "team", "ops")
        .add_channel("memes", "team", "memes");

    for user in ["newbie", "ann", "bob", "cat", "dan"] {
        directory.add_member("lobby", user);
    }
    for user in ["ann", "bob", "cat"] {
        directory.add_member("dev", user);
    }
    for user in ["ann", "bob"] {
        directory.add_member("ops", user);
    }
    directory.add_member("memes", "dan");
    directory
}

async fn create_test_server(
    directory: InMemoryDirectory,
    settings: Option<RecommenderSettings>,
) -> (TestServer, Arc<RecordingMessenger>) {
    let store = ConfigStore::new();
    if let Some(settings) = settings {
        store.apply(settings).await.unwrap();
    }

    let messenger = Arc::new(RecordingMessenger::default());
    let recommender = Recommender::new(Arc::new(directory), messenger.clone(), store.clone());
    let server = TestServer::new(create_router(AppState::new(recommender, store))).unwrap();

    (server, messenger)
}

fn settings(template: &str, excluded: &str) -> RecommenderSettings {
    RecommenderSettings {
        excluded_channels: excluded.to_string(),
        message_template: template.to_string(),
        ..RecommenderSettings::default()
    }
}

/// The join event is processed in the background; wait for a delivery
async fn wait_for_messages(messenger: &RecordingMessenger) -> Vec<(String, String, String)> {
    for _ in 0..100 {
        let sent = messenger.sent();
        if !sent.is_empty() {
            return sent;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    messenger.sent()
}

fn join_event(channel_id: &str, user_id: &str) -> serde_json::Value {
    json!({
        "channel_member": { "channel_id": channel_id, "user_id": user_id },
        "actor": { "id": user_id }
    })
}

#[tokio::test]
async fn test_health_check() {
    let (server, _) = create_test_server(directory(), None).await;

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_json(&json!({ "status": "healthy" }));
}

#[tokio::test]
async fn test_request_id_is_echoed() {
    let (server, _) = create_test_server(directory(), None).await;
    let id = "6f1c1e9e-8a3b-4c55-9d7e-0f9a2f3b4c5d";

    let response = server
        .get("/health")
        .add_header(
            axum::http::HeaderName::from_static("x-request-id"),
            axum::http::HeaderValue::from_static(id),
        )
        .await;

    assert_eq!(response.header("x-request-id"), id);
}

#[tokio::test]
async fn test_user_joined_sends_recommendation() {
    let (server, messenger) = create_test_server(
        directory(),
        Some(settings("Your new channel-mates hang out in {{.Channels}}", "memes")),
    )
    .await;

    let response = server
        .post("/api/v1/events/user-joined")
        .json(&join_event("lobby", "newbie"))
        .await;
    response.assert_status(axum::http::StatusCode::ACCEPTED);

    let sent = wait_for_messages(&messenger).await;
    assert_eq!(
        sent,
        vec![(
            "newbie".to_string(),
            "lobby".to_string(),
            "Your new channel-mates hang out in ~dev, ~ops".to_string(),
        )]
    );
}

#[tokio::test]
async fn test_failed_member_page_sends_nothing() {
    let mut directory = directory();
    directory.fail_member_page(1);
    let (server, messenger) =
        create_test_server(directory, Some(settings("{{.Channels}}", ""))).await;

    let mut settings = settings("{{.Channels}}", "");
    settings.members_per_page = 2;
    server
        .put("/api/v1/config")
        .json(&settings)
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    server
        .post("/api/v1/events/user-joined")
        .json(&join_event("lobby", "newbie"))
        .await
        .assert_status(axum::http::StatusCode::ACCEPTED);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(messenger.sent().is_empty());
}

#[tokio::test]
async fn test_excluded_joined_channel_sends_nothing() {
    let (server, messenger) =
        create_test_server(directory(), Some(settings("{{.Channels}}", "lobby"))).await;

    server
        .post("/api/v1/events/user-joined")
        .json(&join_event("lobby", "newbie"))
        .await
        .assert_status(axum::http::StatusCode::ACCEPTED);

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(messenger.sent().is_empty());
}

#[tokio::test]
async fn test_update_and_get_config() {
    let (server, _) = create_test_server(directory(), None).await;

    server
        .put("/api/v1/config")
        .json(&json!({
            "excluded_channels": "memes off-topic",
            "message_template": "Try {{.Channels}}",
            "top_n": 2
        }))
        .await
        .assert_status(axum::http::StatusCode::NO_CONTENT);

    let response = server.get("/api/v1/config").await;
    response.assert_status_ok();
    let config: serde_json::Value = response.json();
    assert_eq!(config["excluded_channels"], "memes off-topic");
    assert_eq!(config["message_template"], "Try {{.Channels}}");
    assert_eq!(config["top_n"], 2);
    assert_eq!(config["members_per_page"], 50);
}

#[tokio::test]
async fn test_invalid_config_is_rejected_and_previous_kept() {
    let (server, _) =
        create_test_server(directory(), Some(settings("Before {{.Channels}}", ""))).await;

    let response = server
        .put("/api/v1/config")
        .json(&json!({ "message_template": "no placeholder here" }))
        .await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert!(body["error"].as_str().unwrap().contains("{{.Channels}}"));

    let response = server.put("/api/v1/config").json(&json!({ "message_template": "" })).await;
    response.assert_status(axum::http::StatusCode::BAD_REQUEST);

    let config: serde_json::Value = server.get("/api/v1/config").await.json();
    assert_eq!(config["message_template"], "Before {{.Channels}}");
}
