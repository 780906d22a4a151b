#![forbid(unsafe_code)]

//! Character escaping for canonical output.

use std::borrow::Cow;

/// Where a string is written in the canonical form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Context {
    /// Character data: `&`, `<`, `>` and CR are escaped.
    Text,
    /// Attribute and namespace values: `&`, `<`, `"`, TAB, LF and CR.
    Attr,
    /// Processing instruction data: CR only.
    Pi,
}

fn replacement(ch: char, context: Context) -> Option<&'static str> {
    match (ch, context) {
        ('\r', _) => Some("&#xD;"),
        (_, Context::Pi) => None,
        ('&', _) => Some("&amp;"),
        ('<', _) => Some("&lt;"),
        ('>', Context::Text) => Some("&gt;"),
        ('"', Context::Attr) => Some("&quot;"),
        ('\t', Context::Attr) => Some("&#x9;"),
        ('\n', Context::Attr) => Some("&#xA;"),
        _ => None,
    }
}

/// Escape `s` for the given context, borrowing when nothing needs escaping.
pub fn escape(s: &str, context: Context) -> Cow<'_, str> {
    let Some(first) = s.find(|ch: char| replacement(ch, context).is_some()) else {
        return Cow::Borrowed(s);
    };
    let mut out = String::with_capacity(s.len() + 8);
    out.push_str(&s[..first]);
    for ch in s[first..].chars() {
        match replacement(ch, context) {
            Some(entity) => out.push_str(entity),
            None => out.push(ch),
        }
    }
    Cow::Owned(out)
}

/// Escape text node content.
pub fn escape_text(s: &str) -> Cow<'_, str> {
    escape(s, Context::Text)
}

/// Escape an attribute value.
pub fn escape_attr(s: &str) -> Cow<'_, str> {
    escape(s, Context::Attr)
}

/// Escape processing instruction data.
pub fn escape_pi(s: &str) -> Cow<'_, str> {
    escape(s, Context::Pi)
}
