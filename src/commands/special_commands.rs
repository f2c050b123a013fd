//! Special commands parser for interactive chat mode
//!
//! Lines starting with `/` control the chat session instead of being sent
//! to the assistant. Command names are case-insensitive; arguments keep
//! their case because session ids are opaque.

use thiserror::Error;

use crate::session::SessionId;

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {0}\n\nType '/help' to see available commands")]
    UnknownCommand(String),

    /// Command was given an unsupported argument
    #[error("Unsupported argument for {command}: {arg}\n\nType '/help' to see valid usage")]
    UnsupportedArgument { command: String, arg: String },

    /// Command requires an argument but none was provided
    #[error("Command {command} requires an argument\n\nUsage: {usage}")]
    MissingArgument { command: String, usage: String },
}

/// How `/select` names a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectTarget {
    /// 1-based position in the last printed session table
    Index(usize),
    /// Session id
    Id(SessionId),
}

/// Special commands that can be executed during interactive chat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Start a fresh session and make it active
    NewChat,

    /// Close the active session on the service and start a fresh one
    Save,

    /// Print the session table
    ListSessions,

    /// Make a listed session active
    Select(SelectTarget),

    /// Refresh the session list now instead of waiting for the poller
    Refresh,

    /// Print the active session's messages
    History,

    /// Log out and return to the login prompt
    Logout,

    /// Display help information
    Help,

    /// Exit the interactive session
    Exit,

    /// Not a special command
    ///
    /// The input should be sent as a chat message.
    None,
}

/// Parse a user input string into a special command
///
/// # Arguments
///
/// * `input` - The user input string to parse
///
/// # Returns
///
/// Returns `SpecialCommand::None` for input that is not a command.
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not
/// a valid command, `CommandError::MissingArgument` for `/select` without a
/// target, and `CommandError::UnsupportedArgument` for arguments given to
/// commands that take none or for a `/select 0`.
///
/// # Examples
///
/// ```
/// use parley::commands::special_commands::{parse_special_command, SelectTarget, SpecialCommand};
///
/// assert_eq!(parse_special_command("/save").unwrap(), SpecialCommand::Save);
/// assert_eq!(
///     parse_special_command("/select 2").unwrap(),
///     SpecialCommand::Select(SelectTarget::Index(2))
/// );
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// assert!(parse_special_command("/foo").is_err());
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    if !trimmed.starts_with('/') && lower != "exit" && lower != "quit" {
        return Ok(SpecialCommand::None);
    }

    let (name, arg) = match trimmed.split_once(char::is_whitespace) {
        Some((name, arg)) => (name.to_lowercase(), arg.trim()),
        None => (lower.clone(), ""),
    };

    let command = match name.as_str() {
        "/new" => SpecialCommand::NewChat,
        "/save" | "/end" => SpecialCommand::Save,
        "/sessions" | "/chats" => SpecialCommand::ListSessions,
        "/refresh" => SpecialCommand::Refresh,
        "/history" => SpecialCommand::History,
        "/logout" => SpecialCommand::Logout,
        "/help" | "/?" => SpecialCommand::Help,
        "exit" | "quit" | "/exit" | "/quit" => SpecialCommand::Exit,
        "/select" => return parse_select(arg),
        other => return Err(CommandError::UnknownCommand(other.to_string())),
    };

    if !arg.is_empty() {
        return Err(CommandError::UnsupportedArgument {
            command: name,
            arg: arg.to_string(),
        });
    }
    Ok(command)
}

fn parse_select(arg: &str) -> Result<SpecialCommand, CommandError> {
    if arg.is_empty() {
        return Err(CommandError::MissingArgument {
            command: "/select".to_string(),
            usage: "/select <number|session id>".to_string(),
        });
    }
    let target = match arg.parse::<usize>() {
        Ok(0) => {
            return Err(CommandError::UnsupportedArgument {
                command: "/select".to_string(),
                arg: arg.to_string(),
            })
        }
        Ok(index) => SelectTarget::Index(index),
        Err(_) => SelectTarget::Id(SessionId::new(arg)),
    };
    Ok(SpecialCommand::Select(target))
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat Mode
===========================================

SESSIONS:
  /new              - Start a fresh chat
  /save             - Save and close this chat, then start a fresh one
  /sessions         - List known chats
  /select <n|id>    - Switch to a chat by table number or id
  /refresh          - Reload the chat list now
  /history          - Show the messages of the active chat

ACCOUNT:
  /logout           - Log out

OTHER:
  /help             - Show this help
  /quit             - Leave (also: exit, quit)

Anything else is sent to the assistant.
"#
    );
}
