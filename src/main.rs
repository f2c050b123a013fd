//! Parley - terminal client for a conversational assistant service
//!
#![doc = "Main entry point for the parley binary."]

use anyhow::Result;

use parley::cli::{Cli, Commands};
use parley::commands;
use parley::config::Config;
use parley::logging::{init_logging, with_bootstrap_logging};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command line arguments
    let cli = Cli::parse_args();

    // Load configuration under a stderr subscriber so its warnings are kept
    let config_path = cli.config.as_deref().unwrap_or("config/config.yaml");
    let config = with_bootstrap_logging(|| -> Result<Config> {
        let config = Config::load(config_path, &cli)?;
        config.validate()?;
        Ok(config)
    })?;

    // Install the configured subscriber for the rest of the run
    init_logging(&config.logging)?;
    tracing::debug!("Using service at {}", config.server.base_url);

    // Execute command
    match cli.command {
        Commands::Chat => {
            commands::chat::run_chat(config).await?;
            Ok(())
        }
        Commands::Sessions { email } => {
            if let Some(e) = &email {
                tracing::debug!("Logging in as: {}", e);
            }
            commands::sessions::run_sessions(config, email).await?;
            Ok(())
        }
        Commands::Status => {
            commands::status::run_status(config).await?;
            Ok(())
        }
    }
}
