//! Special commands parser for interactive chat mode
//!
//! Lines typed at the chat prompt are either messages for the endpoint or
//! one of a few session commands:
//! - Display help information
//! - View rate limit and endpoint status
//! - Exit the session
//!
//! Commands are prefixed with `/` and are case-insensitive. `exit` and
//! `quit` also work without the slash.

use thiserror::Error;

const KNOWN_COMMANDS: [&str; 6] = ["/help", "/?", "/status", "/exit", "/quit", "/clear"];

/// Errors that can occur when parsing special commands
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    /// Unknown command was entered
    #[error("Unknown command: {command}{}\n\nType '/help' to see available commands", suggestion_suffix(.suggestion))]
    UnknownCommand {
        command: String,
        suggestion: Option<String>,
    },

    /// Command was given an argument it does not take
    #[error("{command} takes no arguments (got '{arg}')")]
    UnexpectedArgument { command: String, arg: String },
}

fn suggestion_suffix(suggestion: &Option<String>) -> String {
    suggestion
        .as_ref()
        .map(|s| format!(" (did you mean {}?)", s))
        .unwrap_or_default()
}

/// Special commands that can be executed during interactive chat
///
/// These commands are handled locally and never reach the endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpecialCommand {
    /// Display help information
    Help,

    /// Show endpoint, timeout and remaining rate budget
    ShowStatus,

    /// Clear the terminal
    Clear,

    /// Exit the session
    Exit,

    /// Not a special command; send the input as a message
    None,
}

/// Parse user input to detect special commands
///
/// # Errors
///
/// Returns `CommandError::UnknownCommand` if input starts with "/" but is not
/// a valid command, with the closest known command as a suggestion when one
/// is near enough. Returns `CommandError::UnexpectedArgument` if a command is
/// followed by extra text.
///
/// # Examples
///
/// ```
/// use streamchat::commands::special_commands::{parse_special_command, SpecialCommand};
///
/// assert_eq!(parse_special_command("/help").unwrap(), SpecialCommand::Help);
/// assert_eq!(parse_special_command("quit").unwrap(), SpecialCommand::Exit);
/// assert_eq!(parse_special_command("hello").unwrap(), SpecialCommand::None);
/// ```
pub fn parse_special_command(input: &str) -> Result<SpecialCommand, CommandError> {
    let trimmed = input.trim();
    let lower = trimmed.to_lowercase();

    match lower.as_str() {
        "exit" | "quit" => return Ok(SpecialCommand::Exit),
        _ if !lower.starts_with('/') => return Ok(SpecialCommand::None),
        _ => {}
    }

    let mut parts = lower.splitn(2, char::is_whitespace);
    let command = parts.next().unwrap_or_default();
    let arg = parts.next().map(str::trim).unwrap_or_default();

    let parsed = match command {
        "/help" | "/?" => SpecialCommand::Help,
        "/status" => SpecialCommand::ShowStatus,
        "/clear" => SpecialCommand::Clear,
        "/exit" | "/quit" => SpecialCommand::Exit,
        _ => {
            return Err(CommandError::UnknownCommand {
                command: command.to_string(),
                suggestion: suggest(command),
            })
        }
    };

    if !arg.is_empty() {
        return Err(CommandError::UnexpectedArgument {
            command: command.to_string(),
            arg: arg.to_string(),
        });
    }

    Ok(parsed)
}

/// Closest known command, if the typo is small
fn suggest(command: &str) -> Option<String> {
    KNOWN_COMMANDS
        .iter()
        .map(|known| (known, strsim::levenshtein(command, known)))
        .filter(|(_, distance)| *distance <= 2)
        .min_by_key(|(_, distance)| *distance)
        .map(|(known, _)| known.to_string())
}

/// Display help text for special commands
pub fn print_help() {
    println!(
        r#"
Special Commands for Interactive Chat
=====================================

SESSION INFORMATION:
  /status         - Show endpoint, timeout and messages left this minute
  /help           - Show this help message
  /?              - Same as /help

SESSION CONTROL:
  /clear          - Clear the screen
  exit            - Exit interactive mode
  quit            - Same as exit
  Ctrl-D          - Same as exit

NOTES:
  - Commands are case-insensitive
  - Anything else you type is sent to the endpoint
  - Input is ignored while an answer is still streaming
"#
    );
}
