//! Terminal display surface
//!
//! Renders turns onto a line-oriented terminal. Incoming answers are
//! labelled with the merchant name and painted in the theme colors. A
//! placeholder (or a thinking indicator when the thinking message is empty)
//! stays on the current line until the first streamed text erases it.
//! Outgoing turns are not echoed by default because the readline prompt
//! already shows what the user typed.
//!
//! Every turn is also kept in a [`Transcript`].

use std::fmt;
use std::io::{self, Write};

use colored::Colorize;

use crate::config::WidgetConfig;
use crate::markup;
use crate::surface::{DisplaySurface, Transcript};
use crate::theme::Theme;
use crate::turn::{ChatTurn, Role, TurnId};

const THINKING_INDICATOR: &str = "• • •";
const CLEAR_LINE: &str = "\r\x1b[2K";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Line {
    Idle,
    Placeholder(TurnId),
    Streaming(TurnId),
}

/// Colored terminal rendering of a chat session
pub struct TerminalSurface<W: Write = io::Stdout> {
    transcript: Transcript,
    theme: Theme,
    label: String,
    echo_outgoing: bool,
    line: Line,
    out: W,
}

impl TerminalSurface<io::Stdout> {
    /// Surface writing to standard output
    pub fn stdout(theme: Theme, merchant_name: &str) -> Self {
        Self::new(io::stdout(), theme, merchant_name)
    }
}

impl<W: Write> TerminalSurface<W> {
    /// Surface writing to `out`
    pub fn new(out: W, theme: Theme, merchant_name: &str) -> Self {
        Self {
            transcript: Transcript::new(),
            theme,
            label: format!(" {} ", merchant_name),
            echo_outgoing: false,
            line: Line::Idle,
            out,
        }
    }

    /// Also print the user's own messages
    pub fn with_echo_outgoing(mut self, echo: bool) -> Self {
        self.echo_outgoing = echo;
        self
    }

    /// Turns rendered so far
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// The underlying writer
    pub fn writer(&self) -> &W {
        &self.out
    }

    /// Print the chat box header: name, logo reference and online status
    pub fn render_header(&mut self, widget: &WidgetConfig, input_placeholder: &str) {
        let name = self.theme.primary.paint(&format!(" {} ", widget.merchant_name)).bold();
        let mut header = format!("\n{}", name);
        if let Some(logo) = &widget.merchant_logo {
            header.push_str(&format!(" {}", format!("[{}]", logo).dimmed()));
        }
        if widget.show_online_status {
            header.push_str(&format!("  {} Online", "●".green()));
        }
        header.push('\n');
        if !input_placeholder.is_empty() {
            header.push_str(&format!(
                "{}\n",
                format!("{} (/help for commands, exit to quit)", input_placeholder).dimmed()
            ));
        }
        header.push('\n');
        self.emit(format_args!("{}", header));
    }

    fn emit(&mut self, args: fmt::Arguments<'_>) {
        if let Err(e) = self.out.write_fmt(args).and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write to terminal");
        }
    }

    fn label(&self) -> String {
        format!("{} ", self.theme.primary.paint(&self.label))
    }

    /// Finish whatever line is open so new output starts on a fresh line
    fn close_line(&mut self) {
        if self.line != Line::Idle {
            self.emit(format_args!("\n"));
            self.line = Line::Idle;
        }
    }

    /// Put the label back at the start of the line for `id`
    fn restart_line(&mut self, id: TurnId) {
        let label = self.label();
        match self.line {
            Line::Placeholder(open) if open == id => {
                self.emit(format_args!("{}{}", CLEAR_LINE, label));
            }
            _ => {
                self.close_line();
                self.emit(format_args!("{}", label));
            }
        }
    }

    fn is_open(&self, id: TurnId) -> bool {
        matches!(self.line, Line::Placeholder(open) | Line::Streaming(open) if open == id)
    }
}

impl<W: Write> DisplaySurface for TerminalSurface<W> {
    fn push_turn(&mut self, turn: ChatTurn) -> TurnId {
        let text = if turn.is_markup {
            markup::to_plain_text(&turn.text)
        } else {
            turn.text.clone()
        };
        let role = turn.role;
        let is_error = turn.is_error;
        let id = self.transcript.push_turn(turn);

        match role {
            Role::Outgoing => {
                if self.echo_outgoing {
                    self.close_line();
                    self.emit(format_args!("{} {}\n", "you ›".bold(), text));
                }
            }
            Role::Incoming if is_error => {
                self.close_line();
                let label = self.label();
                let body = self.theme.error.paint(&text);
                self.emit(format_args!("{}{}\n", label, body));
            }
            Role::Incoming => {
                self.close_line();
                let label = self.label();
                let body = if text.is_empty() {
                    self.theme.paint_placeholder(THINKING_INDICATOR)
                } else {
                    self.theme.incoming.paint(&text)
                };
                self.emit(format_args!("{}{}", label, body));
                self.line = Line::Placeholder(id);
            }
        }
        id
    }

    fn replace_text(&mut self, id: TurnId, text: &str) {
        self.transcript.replace_text(id, text);
        if !self.is_open(id) {
            return;
        }
        self.restart_line(id);
        let body = self.theme.incoming.paint(text);
        self.emit(format_args!("{}", body));
        self.line = Line::Streaming(id);
    }

    fn append_text(&mut self, id: TurnId, text: &str) {
        self.transcript.append_text(id, text);
        match self.line {
            Line::Streaming(open) if open == id => {
                let body = self.theme.incoming.paint(text);
                self.emit(format_args!("{}", body));
            }
            Line::Placeholder(open) if open == id => {
                let full = self
                    .transcript
                    .get(id)
                    .map(|t| t.text.clone())
                    .unwrap_or_default();
                self.restart_line(id);
                let body = self.theme.incoming.paint(&full);
                self.emit(format_args!("{}", body));
                self.line = Line::Streaming(id);
            }
            _ => {}
        }
    }

    fn mark_error(&mut self, id: TurnId, message: &str) {
        self.transcript.mark_error(id, message);
        self.restart_line(id);
        let body = self.theme.error.paint(message);
        self.emit(format_args!("{}\n", body));
        self.line = Line::Idle;
    }

    fn finish_turn(&mut self, id: TurnId) {
        if self.is_open(id) {
            self.close_line();
        }
    }
}

impl<W: Write> fmt::Debug for TerminalSurface<W> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TerminalSurface")
            .field("turns", &self.transcript.len())
            .field("echo_outgoing", &self.echo_outgoing)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ThemeConfig;

    fn surface() -> TerminalSurface<Vec<u8>> {
        colored::control::set_override(false);
        let theme = Theme::from_config(&ThemeConfig::default()).unwrap();
        TerminalSurface::new(Vec::new(), theme, "Bot")
    }

    fn output(surface: &TerminalSurface<Vec<u8>>) -> String {
        String::from_utf8(surface.writer().clone()).unwrap()
    }

    #[test]
    fn test_greeting_printed_as_plain_text() {
        let mut s = surface();
        let id = s.push_turn(ChatTurn::greeting("Hi<br>there"));
        s.finish_turn(id);
        assert_eq!(output(&s), " Bot  Hi\nthere\n");
        // Transcript keeps the configured string untouched
        assert_eq!(s.transcript().get(id).unwrap().text, "Hi<br>there");
    }

    #[test]
    fn test_placeholder_erased_by_first_chunk() {
        let mut s = surface();
        let id = s.push_turn(ChatTurn::incoming(""));
        s.replace_text(id, "Hel");
        s.append_text(id, "lo");
        s.finish_turn(id);

        let out = output(&s);
        assert!(out.starts_with(" Bot  • • •"));
        assert!(out.ends_with(&format!("{} Bot  Hello\n", CLEAR_LINE)));
        assert_eq!(s.transcript().get(id).unwrap().text, "Hello");
    }

    #[test]
    fn test_error_after_partial_stream_starts_new_line() {
        let mut s = surface();
        let id = s.push_turn(ChatTurn::incoming(""));
        s.replace_text(id, "partial");
        s.mark_error(id, "Oops");

        let out = output(&s);
        assert!(out.ends_with("partial\n Bot  Oops\n"));
        let turn = s.transcript().get(id).unwrap();
        assert!(turn.is_error);
        assert_eq!(turn.text, "Oops");
    }

    #[test]
    fn test_error_replaces_placeholder_in_place() {
        let mut s = surface();
        let id = s.push_turn(ChatTurn::incoming(""));
        s.mark_error(id, "Oops");
        assert!(output(&s).ends_with(&format!("{} Bot  Oops\n", CLEAR_LINE)));
    }

    #[test]
    fn test_outgoing_echo_is_optional() {
        let mut s = surface();
        s.push_turn(ChatTurn::outgoing("question"));
        assert_eq!(output(&s), "");

        let mut s = surface().with_echo_outgoing(true);
        s.push_turn(ChatTurn::outgoing("question"));
        assert_eq!(output(&s), "you › question\n");
    }

    #[test]
    fn test_outgoing_echo_keeps_tags_and_entities() {
        let mut s = surface().with_echo_outgoing(true);
        s.push_turn(ChatTurn::outgoing("is <b> valid html &amp; ok?"));
        assert_eq!(output(&s), "you › is <b> valid html &amp; ok?\n");
    }

    #[test]
    fn test_answer_and_error_text_printed_literally() {
        let mut s = surface();
        s.push_turn(ChatTurn::incoming("a<br>b"));
        s.push_turn(ChatTurn::incoming_error("x &lt; y"));
        assert_eq!(output(&s), " Bot  a<br>b\n Bot  x &lt; y\n");
    }

    #[test]
    fn test_rate_limit_bubble_is_complete_line() {
        let mut s = surface();
        s.push_turn(ChatTurn::incoming_error("Too many"));
        assert_eq!(output(&s), " Bot  Too many\n");
    }

    #[test]
    fn test_header_shows_status_and_placeholder() {
        let mut s = surface();
        let widget = WidgetConfig {
            merchant_name: "Yuge Roast".to_string(),
            merchant_logo: Some("logo.png".to_string()),
            ..WidgetConfig::default()
        };
        s.render_header(&widget, "Enter a message...");
        let out = output(&s);
        assert!(out.contains(" Yuge Roast "));
        assert!(out.contains("[logo.png]"));
        assert!(out.contains("Online"));
        assert!(out.contains("Enter a message..."));
    }

    #[test]
    fn test_header_hides_offline_status() {
        let mut s = surface();
        let widget = WidgetConfig {
            show_online_status: false,
            ..WidgetConfig::default()
        };
        s.render_header(&widget, "");
        assert!(!output(&s).contains("Online"));
    }
}
