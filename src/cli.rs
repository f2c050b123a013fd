//! Command-line interface definition for Parley
//!
//! This module defines the CLI structure using clap's derive API.

use clap::{Parser, Subcommand};

/// Parley - chat with an assistant service from the terminal
///
/// Keeps a local view of your conversations in sync with the service while
/// you type.
#[derive(Parser, Debug, Clone)]
#[command(name = "parley")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "config/config.yaml")]
    pub config: Option<String>,

    /// Override the service base URL
    #[arg(long)]
    pub server: Option<String>,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands for Parley
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Start an interactive chat session
    Chat,

    /// Log in and print the list of known sessions
    Sessions {
        /// Account email (prompted when omitted)
        #[arg(short, long)]
        email: Option<String>,
    },

    /// Probe whether the service accepts the current credential
    Status,
}

impl Cli {
    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

impl Default for Cli {
    fn default() -> Self {
        Self {
            config: Some("config/config.yaml".to_string()),
            server: None,
            verbose: false,
            command: Commands::Status,
        }
    }
}
