use std::sync::Arc;

use colored::Colorize;
use prettytable::{format, Table};

use crate::api::http::HttpChatApi;
use crate::api::ChatApi;
use crate::auth::AuthGate;
use crate::config::Config;
use crate::directory::SessionDirectory;
use crate::error::Result;
use crate::session::{Session, SessionId};

const MAX_TITLE_CHARS: usize = 40;
const MAX_PREVIEW_CHARS: usize = 50;

/// Handle the `sessions` command: log in if needed and print the list
///
/// Only reads the list; unlike `chat`, no session is created.
pub async fn run_sessions(config: Config, email: Option<String>) -> Result<()> {
    let api: Arc<dyn ChatApi> = Arc::new(HttpChatApi::new(&config.server)?);
    let auth = AuthGate::new(Arc::clone(&api));

    if !auth.check_auth().await.is_authenticated() {
        let mut rl = rustyline::DefaultEditor::new()?;
        let email = match email {
            Some(email) => email,
            None => rl.readline("Email: ")?.trim().to_string(),
        };
        let Some(password) = super::read_password("Password")? else {
            return Ok(());
        };
        auth.login(&crate::api::Credentials::new(email, password))
            .await?;
    }

    let directory = SessionDirectory::new(api, &config.sync.fallback_title);
    directory.refresh().await?;
    print_sessions(&directory.sessions().await, None, directory.fallback_title());
    Ok(())
}

/// Print the session table, or a notice when there are no sessions
///
/// # Arguments
///
/// * `sessions` - Sessions in directory order; the row number is the `/select` index
/// * `active` - Id of the active session, marked in the first column
/// * `fallback_title` - Title shown for sessions with a blank title
pub fn print_sessions(sessions: &[Session], active: Option<&SessionId>, fallback_title: &str) {
    if sessions.is_empty() {
        println!("{}", "No chats yet.".yellow());
        return;
    }

    println!("\nChats:");
    sessions_table(sessions, active, fallback_title).printstd();
    println!();
    println!("Use {} to switch chats.", "/select <#>".cyan());
    println!();
}

/// Build the session table
pub fn sessions_table(
    sessions: &[Session],
    active: Option<&SessionId>,
    fallback_title: &str,
) -> Table {
    let mut table = Table::new();
    table.set_format(*format::consts::FORMAT_BORDERS_ONLY);

    table.add_row(prettytable::row![
        "#".bold(),
        "ID".bold(),
        "Title".bold(),
        "Messages".bold(),
        "Last Message".bold()
    ]);

    for (index, session) in sessions.iter().enumerate() {
        let marker = if Some(&session.id) == active {
            format!("*{}", index + 1).green().to_string()
        } else {
            (index + 1).to_string()
        };
        let title = truncate(session.display_title(fallback_title), MAX_TITLE_CHARS);
        let preview = session
            .preview()
            .map(|text| truncate(text, MAX_PREVIEW_CHARS))
            .unwrap_or_else(|| "-".to_string());

        table.add_row(prettytable::row![
            marker,
            session.id.as_str().cyan(),
            title,
            session.messages.len(),
            preview
        ]);
    }

    table
}

fn truncate(text: &str, max_chars: usize) -> String {
    let single_line = text.replace('\n', " ");
    if single_line.chars().count() > max_chars {
        let kept: String = single_line.chars().take(max_chars - 3).collect();
        format!("{}...", kept)
    } else {
        single_line
    }
}
