//! Parley - terminal client for a conversational assistant service
//!
//! This library keeps a local view of "the current conversation" and "the
//! set of known conversations" consistent with a remote store, under
//! polling, optimistic updates, and session creation/finalization.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//!
//! - `auth`: Authentication gate, single writer of the auth state
//! - `directory`: Polled mirror of the remote session list
//! - `conversation`: Active session log with optimistic sends and finalize
//! - `shell`: Auth-gated composition of the above
//! - `api`: Service contract, wire types, and the HTTP client
//! - `session`: Session and message data model
//! - `config`: Configuration management and validation
//! - `error`: Error types and result aliases
//! - `cli`, `commands`, `logging`: The `parley` binary
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use parley::api::http::HttpChatApi;
//! use parley::{Config, Shell};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.yaml", &Default::default())?;
//!     config.validate()?;
//!
//!     let api = Arc::new(HttpChatApi::new(&config.server)?);
//!     let mut shell = Shell::new(api, config.sync.clone());
//!     if shell.mount().await.is_authenticated() {
//!         if let Some(chat) = shell.chat() {
//!             chat.view().send_message("hello").await?;
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod auth;
pub mod cli;
pub mod commands;
pub mod config;
pub mod conversation;
pub mod directory;
pub mod error;
pub mod logging;
pub mod session;
pub mod shell;

// Re-export commonly used types
pub use api::ChatApi;
pub use auth::{AuthGate, AuthState};
pub use config::Config;
pub use conversation::{ConversationView, SendOutcome, ViewState};
pub use directory::{PollHandle, SessionDirectory};
pub use error::{ParleyError, Result};
pub use session::{Message, Sender, Session, SessionId};
pub use shell::{ChatTree, Shell};
