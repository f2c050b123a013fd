/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level commands:

- `chat`     - Interactive chat against the service
- `sessions` - Print the list of known chats
- `status`   - Probe whether the stored credential is accepted

These handlers are intentionally small and use the library components:
the API client, the auth gate, and the shell.
*/

// Special commands parser for the chat loop
pub mod special_commands;

// Session table rendering and the `sessions` command
pub mod sessions;

use crate::error::Result;

/// Read a password without echoing it; `None` when the prompt is interrupted
pub(crate) fn read_password(prompt: &str) -> Result<Option<String>> {
    password_input(dialoguer::Password::new().with_prompt(prompt).interact())
}

fn password_input(input: dialoguer::Result<String>) -> Result<Option<String>> {
    match input {
        Ok(password) => Ok(Some(password.trim().to_string())),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Mounts a [`Shell`] against the configured service, asks for a login
    //! when the credential is missing, and runs a readline loop that sends
    //! plain lines to the assistant and dispatches slash commands.
    //!
    //! Sends are detached: the prompt comes back as soon as the message is
    //! appended locally, and the reply is printed above the prompt when it
    //! arrives.

    use std::sync::{Arc, Mutex};

    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::{DefaultEditor, ExternalPrinter};

    use super::read_password;
    use super::sessions::print_sessions;
    use super::special_commands::{parse_special_command, print_help, SelectTarget, SpecialCommand};
    use crate::api::http::HttpChatApi;
    use crate::api::{Credentials, Profile};
    use crate::config::Config;
    use crate::conversation::{SendOutcome, ViewState};
    use crate::error::{ParleyError, Result};
    use crate::session::{Sender, SessionId};
    use crate::shell::{ChatTree, Shell};

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Global configuration (consumed)
    ///
    /// # Examples
    ///
    /// ```
    /// use parley::commands::chat;
    /// use parley::config::Config;
    ///
    /// // In application code:
    /// // chat::run_chat(Config::default()).await?;
    /// ```
    pub async fn run_chat(config: Config) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let api = Arc::new(HttpChatApi::new(&config.server)?);
        let mut shell = Shell::new(api, config.sync.clone());
        let mut rl = DefaultEditor::new()?;
        let printer = ReplyPrinter::new(&mut rl);

        print_welcome_banner(&config.server.base_url);
        shell.mount().await;

        loop {
            if shell.chat().is_none() && !authenticate(&mut rl, &mut shell).await? {
                break;
            }

            match rl.readline(&"parley> ".cyan().to_string()) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }
                    rl.add_history_entry(trimmed)?;

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::None) => send(&shell, trimmed, &printer).await,
                        Ok(SpecialCommand::Exit) => break,
                        Ok(command) => handle_command(&mut shell, command).await,
                        Err(e) => eprintln!("{}", e.to_string().red()),
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("CTRL-C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("CTRL-D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {:?}", err);
                    break;
                }
            }
        }

        shell.unmount().await;
        println!("Goodbye!");
        Ok(())
    }

    /// Login/signup prompt shown while unauthenticated
    ///
    /// Returns `false` when the user chose to quit.
    async fn authenticate(rl: &mut DefaultEditor, shell: &mut Shell) -> Result<bool> {
        println!("{}", "You are not logged in.".yellow());
        loop {
            let Some(choice) = ask(rl, "[l]ogin, [s]ignup or [q]uit: ")? else {
                return Ok(false);
            };
            match choice.to_lowercase().as_str() {
                "l" | "login" => {
                    let Some(email) = ask(rl, "Email: ")? else {
                        return Ok(false);
                    };
                    let Some(password) = read_password("Password")? else {
                        return Ok(false);
                    };
                    match shell.login(&Credentials::new(email, password)).await {
                        Ok(()) => {
                            println!("{}", "Logged in.".green());
                            report_bootstrap(shell).await;
                            return Ok(true);
                        }
                        Err(e) => eprintln!("{}", e.to_string().red()),
                    }
                }
                "s" | "signup" => {
                    let Some(name) = ask(rl, "Name: ")? else {
                        return Ok(false);
                    };
                    let Some(email) = ask(rl, "Email: ")? else {
                        return Ok(false);
                    };
                    let Some(password) = read_password("Password")? else {
                        return Ok(false);
                    };
                    let profile = Profile {
                        name,
                        email,
                        password,
                    };
                    match shell.signup(&profile).await {
                        Ok(()) => println!("{}", "Account created. Please log in.".green()),
                        Err(e) => eprintln!("{}", e.to_string().red()),
                    }
                }
                "q" | "quit" | "exit" => return Ok(false),
                other => eprintln!("Unknown choice: {}", other),
            }
        }
    }

    /// Read one trimmed line; `None` on CTRL-C or CTRL-D
    fn ask(rl: &mut DefaultEditor, prompt: &str) -> Result<Option<String>> {
        match rl.readline(prompt) {
            Ok(line) => Ok(Some(line.trim().to_string())),
            Err(ReadlineError::Interrupted) | Err(ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Prints lines that arrive while the prompt is waiting for input
    ///
    /// Falls back to stdout when the terminal has no external printer.
    #[derive(Clone)]
    struct ReplyPrinter {
        printer: Option<Arc<Mutex<Box<dyn ExternalPrinter + Send>>>>,
    }

    impl ReplyPrinter {
        fn new(rl: &mut DefaultEditor) -> Self {
            let printer = match rl.create_external_printer() {
                Ok(printer) => {
                    let printer: Box<dyn ExternalPrinter + Send> = Box::new(printer);
                    Some(Arc::new(Mutex::new(printer)))
                }
                Err(e) => {
                    tracing::debug!("No external printer, replies go to stdout: {}", e);
                    None
                }
            };
            Self { printer }
        }

        fn print(&self, line: String) {
            if let Some(printer) = &self.printer {
                if let Ok(mut printer) = printer.lock() {
                    match printer.print(line.clone()) {
                        Ok(()) => return,
                        Err(e) => tracing::debug!("External printer failed: {}", e),
                    }
                }
            }
            println!("{}", line);
        }
    }

    /// Text shown once a detached send settles
    fn describe_outcome(outcome: &SendOutcome) -> Option<String> {
        match outcome {
            SendOutcome::Replied(reply) => Some(format!("\n{}\n", reply.text)),
            SendOutcome::Delivered => Some("(no reply)".dimmed().to_string()),
            SendOutcome::Unconfirmed(reason) => Some(
                format!("Message kept locally but not confirmed: {}", reason)
                    .yellow()
                    .to_string(),
            ),
            SendOutcome::Discarded => Some(
                "(reply stored with a chat that is no longer open)"
                    .dimmed()
                    .to_string(),
            ),
            SendOutcome::Ignored | SendOutcome::ViewGone => None,
        }
    }

    /// Append `text` and hand the round trip to a background task
    async fn send(shell: &Shell, text: &str, printer: &ReplyPrinter) {
        let Some(tree) = shell.chat() else {
            return;
        };
        match tree.view().send_message_detached(text).await {
            Ok(Some(handle)) => {
                let printer = printer.clone();
                tokio::spawn(async move {
                    match handle.await {
                        Ok(outcome) => {
                            if let Some(line) = describe_outcome(&outcome) {
                                printer.print(line);
                            }
                        }
                        Err(e) => tracing::error!("Send task failed: {}", e),
                    }
                });
            }
            Ok(None) => {}
            Err(e) => match e.downcast_ref::<ParleyError>() {
                Some(ParleyError::NoActiveSession) => eprintln!(
                    "{}",
                    "No active chat. Type /new to start one.".yellow()
                ),
                _ => eprintln!("{}", format!("Error: {}", e).red()),
            },
        }
    }

    /// Run a slash command; failures are printed and never end the loop
    async fn handle_command(shell: &mut Shell, command: SpecialCommand) {
        if let Err(e) = dispatch(shell, command).await {
            eprintln!("{}", format!("Error: {:#}", e).red());
        }
    }

    async fn dispatch(shell: &mut Shell, command: SpecialCommand) -> Result<()> {
        match command {
            SpecialCommand::Help => print_help(),
            SpecialCommand::Logout => {
                shell.logout().await;
                println!("{}", "Logged out.".green());
            }
            SpecialCommand::NewChat => {
                let id = shell.new_chat().await?;
                println!("Started chat {}", id.as_str().cyan());
            }
            SpecialCommand::Select(target) => {
                let id = resolve_target(mounted(shell)?, target).await?;
                let id = shell.select_session(&id).await?;
                println!("Switched to chat {}", id.as_str().cyan());
                print_history(mounted(shell)?).await;
            }
            SpecialCommand::Save => {
                let tree = mounted(shell)?;
                match tree.view().finalize_session().await {
                    Ok(id) => println!(
                        "{} New chat {}",
                        "Chat saved.".green(),
                        id.as_str().cyan()
                    ),
                    Err(e) => {
                        eprintln!("{}", format!("Could not save chat: {:#}", e).red());
                        if tree.view().state().await == ViewState::Uninitialized {
                            println!("Type {} to start a new chat.", "/new".cyan());
                        }
                    }
                }
            }
            SpecialCommand::ListSessions => {
                let tree = mounted(shell)?;
                if let Some(notice) = tree.directory().last_error().await {
                    eprintln!("{}", format!("List may be out of date: {}", notice).yellow());
                }
                let active = tree.view().active_id().await;
                print_sessions(
                    &tree.directory().sessions().await,
                    active.as_ref(),
                    tree.directory().fallback_title(),
                );
            }
            SpecialCommand::Refresh => {
                let count = mounted(shell)?.directory().refresh().await?;
                println!("{} chats listed", count);
            }
            SpecialCommand::History => print_history(mounted(shell)?).await,
            SpecialCommand::Exit | SpecialCommand::None => {}
        }
        Ok(())
    }

    fn mounted(shell: &Shell) -> Result<&ChatTree> {
        shell
            .chat()
            .ok_or_else(|| ParleyError::Authentication("Not logged in".to_string()).into())
    }

    async fn resolve_target(tree: &ChatTree, target: SelectTarget) -> Result<SessionId> {
        match target {
            SelectTarget::Id(id) => Ok(id),
            SelectTarget::Index(index) => tree
                .directory()
                .sessions()
                .await
                .get(index - 1)
                .map(|s| s.id.clone())
                .ok_or_else(|| ParleyError::UnknownSession(format!("#{}", index)).into()),
        }
    }

    async fn print_history(tree: &ChatTree) {
        let messages = tree.view().messages().await;
        if messages.is_empty() {
            println!("{}", "(empty chat)".dimmed());
            return;
        }
        for message in messages {
            let who = match message.sender {
                Sender::User => "you".green(),
                Sender::Assistant => "assistant".cyan(),
            };
            println!("{}: {}", who.bold(), message.text);
        }
        println!();
    }

    async fn report_bootstrap(shell: &Shell) {
        if let Some(tree) = shell.chat() {
            if tree.view().state().await == ViewState::Uninitialized {
                eprintln!(
                    "{}",
                    "Could not start a chat. Type /new to try again.".yellow()
                );
            }
        }
    }

    fn print_welcome_banner(server: &str) {
        println!("\n╔══════════════════════════════════════════════════════════════╗");
        println!("║               Parley Interactive Chat - Welcome!             ║");
        println!("╚══════════════════════════════════════════════════════════════╝\n");
        println!("Server: {}", server.cyan());
        println!("Type '/help' for available commands, 'exit' to quit\n");
    }

}

// Status command handler
pub mod status {
    //! One-shot authentication probe.

    use std::sync::Arc;

    use colored::Colorize;

    use crate::api::http::HttpChatApi;
    use crate::auth::{AuthGate, AuthState};
    use crate::config::Config;
    use crate::error::Result;

    /// Print whether the service accepts the stored credential
    pub async fn run_status(config: Config) -> Result<AuthState> {
        let api = Arc::new(HttpChatApi::new(&config.server)?);
        let state = AuthGate::new(api).check_auth().await;
        let label = if state.is_authenticated() {
            "authenticated".green()
        } else {
            "not authenticated".yellow()
        };
        println!("{}: {}", config.server.base_url, label);
        Ok(state)
    }
}
