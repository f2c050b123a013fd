use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parley::api::http::HttpChatApi;
use parley::config::{ServerConfig, SyncConfig};

#[allow(dead_code)]
pub fn server_config(server: &MockServer) -> ServerConfig {
    ServerConfig {
        base_url: server.uri(),
        timeout_seconds: 5,
    }
}

#[allow(dead_code)]
pub fn http_api(server: &MockServer) -> Arc<HttpChatApi> {
    Arc::new(HttpChatApi::new(&server_config(server)).expect("valid mock server URL"))
}

#[allow(dead_code)]
pub fn sync_config() -> SyncConfig {
    SyncConfig {
        poll_interval_seconds: 60,
        ..SyncConfig::default()
    }
}

/// Answer `/auth/check` with the given status
#[allow(dead_code)]
pub async fn mock_auth_check(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path("/auth/check"))
        .respond_with(ResponseTemplate::new(status).set_body_json(json!({"status": "ok"})))
        .mount(server)
        .await;
}

/// Answer `/chats` with the given list body
#[allow(dead_code)]
pub async fn mock_chats(server: &MockServer, body: serde_json::Value) {
    Mock::given(method("GET"))
        .and(path("/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;
}

/// Answer the next `n` `/start_chat` calls with `chat_id`
#[allow(dead_code)]
pub async fn mock_start_chat(server: &MockServer, chat_id: &str, n: u64) {
    Mock::given(method("POST"))
        .and(path("/start_chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"chat_id": chat_id})))
        .up_to_n_times(n)
        .mount(server)
        .await;
}

#[allow(dead_code)]
pub fn temp_config_file(contents: &str) -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("failed to create tempdir");
    let config_path = temp_dir.path().join("config.yaml");
    fs::write(&config_path, contents).expect("failed to write config file");
    (temp_dir, config_path)
}
