//! HTTP implementation of [`ChatApi`]
//!
//! [`HttpChatApi`] talks JSON over HTTP to the assistant service. The
//! service authenticates with an `access_token` cookie set by `/login`;
//! the reqwest cookie store keeps it and attaches it to every later request,
//! so no call site ever handles the credential.
//!
//! # Response mapping
//!
//! - request could not be sent or timed out: [`ParleyError::Transport`]
//! - non-2xx status: [`ParleyError::Status`]
//! - 2xx with an undecodable body: [`ParleyError::MalformedResponse`]
//! - 2xx with an `{"error": ...}` body: [`ParleyError::Remote`]

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::types::{
    AppendRequest, AppendResponse, CloseRequest, CreateSessionRequest, CreateSessionResponse,
    Credentials, ErrorBody, Profile, RemoteSession,
};
use crate::api::ChatApi;
use crate::config::ServerConfig;
use crate::error::{ParleyError, Result};
use crate::session::{Message, Session, SessionId};

/// Chat service client backed by reqwest
///
/// # Examples
///
/// ```no_run
/// use parley::api::http::HttpChatApi;
/// use parley::config::ServerConfig;
///
/// let api = HttpChatApi::new(&ServerConfig::default()).unwrap();
/// ```
#[derive(Debug)]
pub struct HttpChatApi {
    client: Client,
    base_url: url::Url,
}

impl HttpChatApi {
    /// Build a client for the configured service
    ///
    /// # Errors
    ///
    /// Returns [`ParleyError::Config`] if the base URL is invalid, or an HTTP
    /// error if the reqwest client cannot be constructed.
    pub fn new(config: &ServerConfig) -> Result<Self> {
        let mut base_url = url::Url::parse(&config.base_url).map_err(|e| {
            ParleyError::Config(format!("invalid server URL {}: {}", config.base_url, e))
        })?;
        // Endpoints are joined relative to the base, which needs a trailing slash.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .cookie_store(true)
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(concat!("parley/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(ParleyError::Http)?;

        Ok(Self { client, base_url })
    }

    /// Base URL every endpoint is resolved against
    pub fn base_url(&self) -> &url::Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<url::Url> {
        self.base_url
            .join(path)
            .map_err(|e| ParleyError::Config(format!("invalid endpoint {}: {}", path, e)).into())
    }

    async fn get(&self, path: &str) -> Result<Response> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "GET");
        self.client
            .get(url)
            .send()
            .await
            .map_err(|e| transport_error("GET", path, e))
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> Result<Response> {
        let url = self.endpoint(path)?;
        tracing::debug!(%url, "POST");
        self.client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(|e| transport_error("POST", path, e))
    }
}

fn transport_error(method: &str, path: &str, e: reqwest::Error) -> anyhow::Error {
    anyhow::anyhow!(ParleyError::Transport(format!(
        "{} {} failed: {}",
        method, path, e
    )))
}

/// Fail on non-success statuses, keeping the body for diagnostics
async fn ensure_success(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ParleyError::Status {
        status: status.as_u16(),
        body,
    }
    .into())
}

/// Decode a success body into `T`
async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
    let text = response
        .text()
        .await
        .map_err(|e| ParleyError::Transport(format!("failed to read response body: {}", e)))?;
    serde_json::from_str(&text).map_err(|e| ParleyError::MalformedResponse(e.to_string()).into())
}

/// Surface `{"error": ...}` bodies that arrive with a success status
async fn ensure_no_error_body(response: Response) -> Result<()> {
    let text = response.text().await.unwrap_or_default();
    if let Ok(ErrorBody { error: Some(error) }) = serde_json::from_str::<ErrorBody>(&text) {
        return Err(ParleyError::Remote(error).into());
    }
    Ok(())
}

#[async_trait]
impl ChatApi for HttpChatApi {
    async fn check_auth(&self) -> Result<bool> {
        let response = self.get("auth/check").await?;
        let status = response.status();
        tracing::debug!(status = status.as_u16(), "auth probe answered");
        Ok(status.is_success())
    }

    async fn signup(&self, profile: &Profile) -> Result<()> {
        let response = self.post("signup", profile).await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn login(&self, credentials: &Credentials) -> Result<()> {
        let response = self.post("login", credentials).await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn logout(&self) -> Result<()> {
        let response = self.get("logout").await?;
        ensure_success(response).await?;
        Ok(())
    }

    async fn list_sessions(&self) -> Result<Vec<Session>> {
        let response = ensure_success(self.get("chats").await?).await?;
        let remote: Vec<RemoteSession> = decode(response).await?;
        let total = remote.len();
        let sessions: Vec<Session> = remote
            .into_iter()
            .filter_map(RemoteSession::into_session)
            .collect();
        if sessions.len() < total {
            tracing::warn!(
                dropped = total - sessions.len(),
                "session list contained entries without an id"
            );
        }
        Ok(sessions)
    }

    async fn create_session(&self, title: &str) -> Result<SessionId> {
        let response = self
            .post("start_chat", &CreateSessionRequest { title })
            .await?;
        let created: CreateSessionResponse = decode(ensure_success(response).await?).await?;
        Ok(created.chat_id)
    }

    async fn append_message(&self, id: &SessionId, message: &Message) -> Result<Option<Message>> {
        let response = self
            .post(
                "save_chat",
                &AppendRequest {
                    chat_id: id,
                    message,
                },
            )
            .await?;
        let body: AppendResponse = decode(ensure_success(response).await?).await?;
        if let Some(error) = body.error {
            return Err(ParleyError::Remote(error).into());
        }
        Ok(body.llm_response)
    }

    async fn close_session(&self, id: &SessionId, title: Option<&str>) -> Result<()> {
        let response = self
            .post("end_chat", &CloseRequest { chat_id: id, title })
            .await?;
        ensure_no_error_body(ensure_success(response).await?).await
    }
}
