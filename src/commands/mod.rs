/*!
Command handlers for the CLI

This module provides command handlers invoked by the CLI entrypoint.

It exposes three top-level command modules:

- `chat`: interactive chat session
- `send`: send one message and stream the answer
- `show_config`: print the effective configuration

The handlers build a terminal surface and a chat session from the resolved
configuration; everything else lives in the library.
*/

use crate::config::Config;
use crate::error::Result;
use crate::terminal::TerminalSurface;
use crate::theme::Theme;

// Special commands parser for the chat prompt
pub mod special_commands;

/// Terminal surface themed and labelled from `config`
fn terminal_surface(config: &Config) -> Result<TerminalSurface> {
    let theme = Theme::from_config(&config.theme)?;
    Ok(TerminalSurface::stdout(theme, &config.widget.merchant_name))
}

// Chat command handler
pub mod chat {
    //! Interactive chat mode handler.
    //!
    //! Renders the chat box header and greeting, then runs a readline loop
    //! that hands each line either to the special command parser or to the
    //! chat session.

    use super::*;
    use crate::commands::special_commands::{parse_special_command, print_help, SpecialCommand};
    use crate::session::{ChatSession, SendOutcome};
    use crate::surface::DisplaySurface;
    use colored::Colorize;
    use rustyline::error::ReadlineError;
    use rustyline::DefaultEditor;

    /// Start interactive chat mode
    ///
    /// # Arguments
    ///
    /// * `config` - Resolved configuration (consumed)
    /// * `echo` - Print outgoing messages into the transcript as well
    ///
    /// # Errors
    ///
    /// Returns error if the theme or endpoint is invalid, or the line
    /// editor cannot be initialized
    pub async fn run_chat(config: Config, echo: bool) -> Result<()> {
        tracing::info!("Starting interactive chat mode");

        let mut surface = super::terminal_surface(&config)?.with_echo_outgoing(echo);
        surface.render_header(&config.widget, &config.messages.input_placeholder);

        let mut session = ChatSession::new(&config, surface)?;
        let mut rl = DefaultEditor::new()?;
        let prompt = "you › ";

        loop {
            match rl.readline(prompt) {
                Ok(line) => {
                    let trimmed = line.trim();
                    if trimmed.is_empty() {
                        continue;
                    }

                    match parse_special_command(trimmed) {
                        Ok(SpecialCommand::Help) => {
                            print_help();
                            continue;
                        }
                        Ok(SpecialCommand::ShowStatus) => {
                            print_status(&session);
                            continue;
                        }
                        Ok(SpecialCommand::Clear) => {
                            print!("\x1b[2J\x1b[H");
                            continue;
                        }
                        Ok(SpecialCommand::Exit) => break,
                        Ok(SpecialCommand::None) => {}
                        Err(e) => {
                            eprintln!("{}", e.to_string().yellow());
                            continue;
                        }
                    }

                    rl.add_history_entry(trimmed)?;

                    match session.handle_message(trimmed).await {
                        SendOutcome::Done { .. } | SendOutcome::Empty => {}
                        SendOutcome::Busy => {
                            tracing::debug!("Input dropped while busy");
                        }
                        SendOutcome::RateLimited { error, .. }
                        | SendOutcome::Failed { error, .. } => {
                            tracing::debug!("Turn did not complete: {}", error);
                        }
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    println!("^C");
                    break;
                }
                Err(ReadlineError::Eof) => {
                    println!("^D");
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    return Err(err.into());
                }
            }
        }

        let turns = session.surface().transcript().len();
        tracing::info!(turns, "Chat session ended");
        println!("Goodbye!");
        Ok(())
    }

    fn print_status<S: DisplaySurface>(session: &ChatSession<S>) {
        let limiter = session.limiter();
        println!();
        println!("{}", "Session status".bold());
        println!("  Endpoint:      {}", session.renderer().endpoint());
        println!("  Timeout:       {} ms", session.renderer().timeout().as_millis());
        println!(
            "  Messages left: {}/{} this minute",
            limiter.remaining(),
            limiter.limit()
        );
        println!("  Last turn:     {}", session.last_state());
        println!();
    }
}

// One-shot send handler
pub mod send {
    //! Send a single message and stream the answer to stdout.

    use super::*;
    use crate::session::ChatSession;

    /// Send `message` and wait for the answer
    ///
    /// The greeting is not printed; only the answer (or the configured
    /// error message) is.
    ///
    /// # Errors
    ///
    /// Returns error if the message is blank, the limiter rejects it, or
    /// the turn fails
    pub async fn run_send(mut config: Config, message: String) -> Result<()> {
        tracing::info!("Sending one message");
        config.messages.initial.clear();

        let surface = super::terminal_surface(&config)?;
        let mut session = ChatSession::new(&config, surface)?;
        session.handle_message(&message).await.into_result()
    }
}

// Configuration printer
pub mod show_config {
    //! Print the resolved configuration.

    use super::*;

    /// Effective configuration rendered as YAML
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn render(config: &Config) -> Result<String> {
        Ok(serde_yaml::to_string(config).map_err(crate::error::StreamchatError::from)?)
    }

    /// Print the effective configuration to stdout
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails
    pub fn run_show_config(config: &Config) -> Result<()> {
        print!("{}", render(config)?);
        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn test_render_round_trips() {
            let mut config = Config::default();
            config.widget.merchant_name = "Yuge Roast".to_string();
            let yaml = render(&config).unwrap();
            assert!(yaml.contains("merchant_name: Yuge Roast"));
            let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
            assert_eq!(parsed, config);
        }
    }
}
