//! HTTP client integration tests
//!
//! Drives `HttpChatApi` against a `wiremock` server and checks both the
//! requests it sends and how it maps the service's answers.

mod common;

use serde_json::json;
use wiremock::matchers::{body_json, body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use parley::api::{ChatApi, Credentials, Profile};
use parley::session::{Message, Sender, SessionId};
use parley::ParleyError;

fn parley_error(err: &anyhow::Error) -> &ParleyError {
    err.downcast_ref::<ParleyError>()
        .expect("error should carry a ParleyError")
}

#[tokio::test]
async fn test_check_auth_maps_status_to_bool() {
    let server = MockServer::start().await;
    common::mock_auth_check(&server, 200).await;
    assert!(common::http_api(&server).check_auth().await.unwrap());

    let server = MockServer::start().await;
    common::mock_auth_check(&server, 401).await;
    assert!(!common::http_api(&server).check_auth().await.unwrap());
}

#[tokio::test]
async fn test_login_cookie_is_sent_on_later_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/login"))
        .and(body_json(json!({
            "name": "",
            "email": "ada@example.com",
            "password": "pw"
        })))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("set-cookie", "access_token=tok123; Path=/; HttpOnly")
                .set_body_json(json!({"message": "Login successful"})),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/check"))
        .and(header("cookie", "access_token=tok123"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;
    common::mock_auth_check(&server, 401).await;

    let api = common::http_api(&server);
    assert!(!api.check_auth().await.unwrap());
    api.login(&Credentials::new("ada@example.com", "pw"))
        .await
        .unwrap();
    assert!(api.check_auth().await.unwrap());
}

#[tokio::test]
async fn test_login_rejected_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/login"))
        .respond_with(ResponseTemplate::new(400).set_body_string("Invalid credentials"))
        .mount(&server)
        .await;

    let err = common::http_api(&server)
        .login(&Credentials::new("ada@example.com", "nope"))
        .await
        .unwrap_err();
    match parley_error(&err) {
        ParleyError::Status { status, body } => {
            assert_eq!(*status, 400);
            assert_eq!(body, "Invalid credentials");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_signup_sends_profile() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/signup"))
        .and(body_json(json!({
            "name": "Ada",
            "email": "ada@example.com",
            "password": "pw"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "User created"})))
        .expect(1)
        .mount(&server)
        .await;

    let profile = Profile {
        name: "Ada".to_string(),
        email: "ada@example.com".to_string(),
        password: "pw".to_string(),
    };
    common::http_api(&server).signup(&profile).await.unwrap();
}

#[tokio::test]
async fn test_logout_uses_get() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/logout"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    common::http_api(&server).logout().await.unwrap();
}

#[tokio::test]
async fn test_list_sessions_decodes_history_and_drops_entries_without_id() {
    let server = MockServer::start().await;
    common::mock_chats(
        &server,
        json!([
            {
                "id": "a1",
                "title": "Fever",
                "messages": [
                    {"sender": "user", "text": "I have a fever", "timestamp": "2024-03-01T10:00:00Z"},
                    {"sender": "bot", "text": "How high?", "timestamp": "2024-03-01T10:00:02.123456"}
                ]
            },
            {"title": "orphan"},
            {"chat_id": "b2", "title": "Cough"}
        ]),
    )
    .await;

    let sessions = common::http_api(&server).list_sessions().await.unwrap();
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].id, SessionId::new("a1"));
    assert_eq!(sessions[0].messages.len(), 2);
    assert_eq!(sessions[0].messages[1].sender, Sender::Assistant);
    assert_eq!(sessions[1].id, SessionId::new("b2"));
    assert!(sessions[1].messages.is_empty());
}

#[tokio::test]
async fn test_list_sessions_malformed_body_is_transport_like() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chats"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let err = common::http_api(&server).list_sessions().await.unwrap_err();
    let parley = parley_error(&err);
    assert!(matches!(parley, ParleyError::MalformedResponse(_)));
    assert!(parley.is_transport_like());
}

#[tokio::test]
async fn test_list_sessions_unauthorized_is_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/chats"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({"detail": "Missing token"})))
        .mount(&server)
        .await;

    let err = common::http_api(&server).list_sessions().await.unwrap_err();
    assert!(matches!(
        parley_error(&err),
        ParleyError::Status { status: 401, .. }
    ));
}

#[tokio::test]
async fn test_create_session_posts_title() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/start_chat"))
        .and(body_json(json!({"title": "New Chat"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"chat_id": "c42"})))
        .expect(1)
        .mount(&server)
        .await;

    let id = common::http_api(&server)
        .create_session("New Chat")
        .await
        .unwrap();
    assert_eq!(id, SessionId::new("c42"));
}

#[tokio::test]
async fn test_append_message_returns_assistant_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save_chat"))
        .and(body_partial_json(json!({
            "chat_id": "c42",
            "message": {"sender": "user", "text": "hi"}
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "message": "Chat saved successfully",
            "llm_response": {"sender": "bot", "text": "hello", "timestamp": "2024-03-01T10:00:02"}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let reply = common::http_api(&server)
        .append_message(&SessionId::new("c42"), &Message::user("hi"))
        .await
        .unwrap()
        .expect("reply expected");
    assert_eq!(reply.sender, Sender::Assistant);
    assert_eq!(reply.text, "hello");
}

#[tokio::test]
async fn test_append_message_without_reply() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save_chat"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"message": "Chat saved successfully"})),
        )
        .mount(&server)
        .await;

    let reply = common::http_api(&server)
        .append_message(&SessionId::new("c42"), &Message::user("hi"))
        .await
        .unwrap();
    assert!(reply.is_none());
}

#[tokio::test]
async fn test_append_message_error_body_is_remote_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/save_chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Chat not found"})))
        .mount(&server)
        .await;

    let err = common::http_api(&server)
        .append_message(&SessionId::new("gone"), &Message::user("hi"))
        .await
        .unwrap_err();
    match parley_error(&err) {
        ParleyError::Remote(message) => assert_eq!(message, "Chat not found"),
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_close_session_sends_id_and_title() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/end_chat"))
        .and(body_json(json!({"chat_id": "c42", "title": "Fever"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "Chat ended"})))
        .expect(1)
        .mount(&server)
        .await;

    common::http_api(&server)
        .close_session(&SessionId::new("c42"), Some("Fever"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_close_session_failures() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/end_chat"))
        .and(body_partial_json(json!({"chat_id": "missing"})))
        .respond_with(ResponseTemplate::new(404).set_body_string("Chat not found"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/end_chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"error": "Database down"})))
        .mount(&server)
        .await;
    let api = common::http_api(&server);

    let err = api
        .close_session(&SessionId::new("missing"), None)
        .await
        .unwrap_err();
    assert!(matches!(
        parley_error(&err),
        ParleyError::Status { status: 404, .. }
    ));

    let err = api
        .close_session(&SessionId::new("c42"), None)
        .await
        .unwrap_err();
    assert!(matches!(parley_error(&err), ParleyError::Remote(_)));
}
