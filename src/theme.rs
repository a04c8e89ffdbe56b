//! Color tokens resolved for terminal output
//!
//! Tokens are written the way a stylesheet writes them (`#b31a69`, `#fff`)
//! and rendered as 24-bit terminal colors through `colored`.

use std::fmt;
use std::str::FromStr;

use colored::{ColoredString, Colorize};

use crate::config::ThemeConfig;
use crate::error::{Result, StreamchatError};

/// An RGB color parsed from `#rgb` or `#rrggbb`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HexColor {
    /// Red channel
    pub r: u8,
    /// Green channel
    pub g: u8,
    /// Blue channel
    pub b: u8,
}

impl FromStr for HexColor {
    type Err = StreamchatError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || StreamchatError::Config(format!("Invalid hex color: '{}'", s));
        let hex = s.trim().strip_prefix('#').ok_or_else(invalid)?;
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        let channel = |digits: &str| u8::from_str_radix(digits, 16).map_err(|_| invalid());
        match hex.len() {
            3 => {
                // #abc is shorthand for #aabbcc
                let expand = |i: usize| channel(&hex[i..i + 1].repeat(2));
                Ok(Self {
                    r: expand(0)?,
                    g: expand(1)?,
                    b: expand(2)?,
                })
            }
            6 => Ok(Self {
                r: channel(&hex[0..2])?,
                g: channel(&hex[2..4])?,
                b: channel(&hex[4..6])?,
            }),
            _ => Err(invalid()),
        }
    }
}

impl fmt::Display for HexColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// A foreground/background pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Palette {
    /// Text color
    pub fg: HexColor,
    /// Background color
    pub bg: HexColor,
}

impl Palette {
    /// Paint `text` with this pair
    pub fn paint(&self, text: &str) -> ColoredString {
        text.truecolor(self.fg.r, self.fg.g, self.fg.b)
            .on_truecolor(self.bg.r, self.bg.g, self.bg.b)
    }
}

/// Resolved theme
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    /// Header and responder label
    pub primary: Palette,
    /// Streamed response text
    pub incoming: Palette,
    /// Error bubbles
    pub error: Palette,
    /// Chat box background, used for placeholders
    pub chatbox_bg: HexColor,
}

impl Theme {
    /// Resolve every token of `config`
    ///
    /// # Errors
    ///
    /// Returns `StreamchatError::Config` naming the first invalid token
    pub fn from_config(config: &ThemeConfig) -> Result<Self> {
        let parse = |name: &str, value: &str| -> Result<HexColor> {
            value
                .parse::<HexColor>()
                .map_err(|e| StreamchatError::Config(format!("theme.{}: {}", name, e)).into())
        };
        Ok(Self {
            primary: Palette {
                fg: parse("primary_text", &config.primary_text)?,
                bg: parse("primary_bg", &config.primary_bg)?,
            },
            incoming: Palette {
                fg: parse("incoming_chat_text", &config.incoming_chat_text)?,
                bg: parse("incoming_chat_bg", &config.incoming_chat_bg)?,
            },
            error: Palette {
                fg: parse("error_chat_text", &config.error_chat_text)?,
                bg: parse("error_chat_bg", &config.error_chat_bg)?,
            },
            chatbox_bg: parse("chatbox_bg", &config.chatbox_bg)?,
        })
    }

    /// Paint a placeholder: dimmed incoming text on the chat box color
    pub fn paint_placeholder(&self, text: &str) -> ColoredString {
        let fg = self.incoming.fg;
        text.truecolor(fg.r, fg.g, fg.b)
            .on_truecolor(self.chatbox_bg.r, self.chatbox_bg.g, self.chatbox_bg.b)
            .dimmed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_long_form() {
        let c: HexColor = "#b31a69".parse().unwrap();
        assert_eq!(c, HexColor { r: 0xb3, g: 0x1a, b: 0x69 });
    }

    #[test]
    fn test_parse_short_form() {
        let c: HexColor = "#fff".parse().unwrap();
        assert_eq!(c, HexColor { r: 255, g: 255, b: 255 });
        let c: HexColor = "#721".parse().unwrap();
        assert_eq!(c, HexColor { r: 0x77, g: 0x22, b: 0x11 });
    }

    #[test]
    fn test_parse_rejects_bad_input() {
        for bad in ["fff", "#ff", "#gggggg", "#12345", "red", "#+12", ""] {
            assert!(bad.parse::<HexColor>().is_err(), "accepted {bad:?}");
        }
    }

    #[test]
    fn test_display_normalizes() {
        let c: HexColor = "#ABC".parse().unwrap();
        assert_eq!(c.to_string(), "#aabbcc");
    }

    #[test]
    fn test_default_theme_resolves() {
        let theme = Theme::from_config(&ThemeConfig::default()).unwrap();
        assert_eq!(theme.primary.bg.to_string(), "#b31a69");
        assert_eq!(theme.error.fg.to_string(), "#721c24");
    }

    #[test]
    fn test_theme_error_names_token() {
        let config = ThemeConfig {
            incoming_chat_text: "#nothex".to_string(),
            ..ThemeConfig::default()
        };
        let err = Theme::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("incoming_chat_text"));
    }
}
