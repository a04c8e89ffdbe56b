//! Plain-text rendering of display strings
//!
//! Configured strings are written for an HTML chat box (the stock greeting
//! contains `<br>`). The terminal shows them after line breaks are turned
//! into newlines, tags are dropped and the common entities are decoded.
//! Streamed response text is never passed through here.

use regex::Regex;
use std::sync::OnceLock;

fn line_break() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)<br\s*/?>\s*").expect("valid regex"))
}

fn block_close() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)</(?:p|div|li)>").expect("valid regex"))
}

fn any_tag() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"<[^>]+>").expect("valid regex"))
}

/// Convert a light-HTML display string to terminal text
pub fn to_plain_text(markup: &str) -> String {
    let text = line_break().replace_all(markup, "\n");
    let text = block_close().replace_all(&text, "\n");
    let text = any_tag().replace_all(&text, "");
    decode_entities(text.trim())
}

fn decode_entities(text: &str) -> String {
    // &amp; last so "&amp;lt;" stays "&lt;"
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
