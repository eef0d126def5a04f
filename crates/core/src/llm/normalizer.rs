//! Recovery of a JSON object from raw model output.
//!
//! Models wrap JSON in markdown fences, add prose around it, and routinely emit
//! literal line breaks and bare quotes inside string values (generated source
//! code is the usual culprit). [`normalize`] strips fences, tries a strict
//! parse, narrows to the outermost `{ ... }` span, and as a last resort runs a
//! tolerant reader over that span. The tolerant reader re-emits the document
//! unchanged except for content inside string literals, where it escapes raw
//! control characters and any quote that cannot be a closing quote.

use regex::Regex;
use serde_json::{Map, Value};
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error("No JSON object found in model output")]
    NoJsonObject,

    #[error("Invalid JSON from LLM: {source}\nRaw output:\n{raw}")]
    InvalidJson {
        #[source]
        source: serde_json::Error,
        raw: String,
    },
}

fn fence_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"```[A-Za-z0-9_+-]*").expect("fence pattern is valid"))
}

/// Removes every markdown fence marker (with optional language tag) and trims.
pub fn strip_code_fences(raw: &str) -> String {
    fence_pattern().replace_all(raw, "").trim().to_string()
}

/// Span from the first `{` to the last `}`, inclusive.
pub fn extract_object_span(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

pub fn normalize(raw: &str) -> Result<Map<String, Value>, NormalizeError> {
    let cleaned = strip_code_fences(raw);

    if let Ok(object) = serde_json::from_str::<Map<String, Value>>(&cleaned) {
        return Ok(object);
    }

    let span = extract_object_span(&cleaned).ok_or(NormalizeError::NoJsonObject)?;

    let source = match serde_json::from_str::<Map<String, Value>>(span) {
        Ok(object) => {
            debug!("Recovered JSON object from surrounding prose");
            return Ok(object);
        }
        Err(err) => err,
    };

    debug!("Strict parse failed ({}), running repair pass", source);

    if let Some(repaired) = repair_json(span) {
        match serde_json::from_str::<Map<String, Value>>(&repaired) {
            Ok(object) => {
                info!("Repaired malformed JSON in model output");
                return Ok(object);
            }
            Err(err) => debug!("Repaired text still invalid: {}", err),
        }
    }

    Err(NormalizeError::InvalidJson {
        source,
        raw: raw.to_string(),
    })
}

/// Re-emits `text` with string literal contents made JSON-safe.
///
/// Returns `None` when the structure outside string literals is itself broken;
/// structural characters are never rewritten.
pub fn repair_json(text: &str) -> Option<String> {
    let mut reader = TolerantReader::new(text);
    reader.read_value(Slot::Root)?;
    reader.skip_whitespace();
    if reader.peek().is_some() {
        return None;
    }
    Some(reader.out)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Root,
    Key,
    ObjectValue,
    ArrayItem,
}

struct TolerantReader {
    chars: Vec<char>,
    pos: usize,
    out: String,
}

impl TolerantReader {
    fn new(text: &str) -> Self {
        Self {
            chars: text.chars().collect(),
            pos: 0,
            out: String::with_capacity(text.len() + 64),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.out.push(c);
            self.pos += 1;
        }
    }

    fn skip_whitespace(&mut self) {
        while let Some(c) = self.peek() {
            if !is_json_whitespace(c) {
                break;
            }
            self.bump();
        }
    }

    fn read_value(&mut self, slot: Slot) -> Option<()> {
        self.skip_whitespace();
        match self.peek()? {
            '{' => self.read_object(),
            '[' => self.read_array(),
            '"' => self.read_string(slot),
            _ => self.read_literal(),
        }
    }

    fn read_object(&mut self) -> Option<()> {
        self.bump();
        self.skip_whitespace();
        if self.peek()? == '}' {
            self.bump();
            return Some(());
        }

        loop {
            self.skip_whitespace();
            if self.peek()? != '"' {
                return None;
            }
            self.read_string(Slot::Key)?;
            self.skip_whitespace();
            if self.peek()? != ':' {
                return None;
            }
            self.bump();
            self.read_value(Slot::ObjectValue)?;
            self.skip_whitespace();
            match self.peek()? {
                ',' => self.bump(),
                '}' => {
                    self.bump();
                    return Some(());
                }
                _ => return None,
            }
        }
    }

    fn read_array(&mut self) -> Option<()> {
        self.bump();
        self.skip_whitespace();
        if self.peek()? == ']' {
            self.bump();
            return Some(());
        }

        loop {
            self.read_value(Slot::ArrayItem)?;
            self.skip_whitespace();
            match self.peek()? {
                ',' => self.bump(),
                ']' => {
                    self.bump();
                    return Some(());
                }
                _ => return None,
            }
        }
    }

    // Numbers, true, false, null: copied verbatim, validated by the final parse.
    fn read_literal(&mut self) -> Option<()> {
        let start = self.pos;
        while let Some(c) = self.peek() {
            if is_json_whitespace(c) || matches!(c, ',' | '}' | ']' | ':') {
                break;
            }
            self.bump();
        }
        (self.pos > start).then_some(())
    }

    fn read_string(&mut self, slot: Slot) -> Option<()> {
        self.bump();

        while let Some(c) = self.peek() {
            match c {
                '\\' => {
                    if self.is_valid_escape(self.pos) {
                        let len = if self.chars.get(self.pos + 1) == Some(&'u') { 6 } else { 2 };
                        for _ in 0..len {
                            self.bump();
                        }
                    } else {
                        self.out.push_str("\\\\");
                        self.pos += 1;
                    }
                }
                '"' => {
                    if self.closes_string(slot) {
                        self.bump();
                        return Some(());
                    }
                    self.out.push_str("\\\"");
                    self.pos += 1;
                }
                c if (c as u32) < 0x20 => {
                    self.out.push_str(&escape_control(c));
                    self.pos += 1;
                }
                c => {
                    self.out.push(c);
                    self.pos += 1;
                }
            }
        }

        None
    }

    fn is_valid_escape(&self, at: usize) -> bool {
        match self.chars.get(at + 1).copied() {
            Some('"' | '\\' | '/' | 'b' | 'f' | 'n' | 'r' | 't') => true,
            Some('u') => (at + 2..at + 6)
                .all(|i| self.chars.get(i).is_some_and(|c| c.is_ascii_hexdigit())),
            _ => false,
        }
    }

    /// Whether the quote at `self.pos` can legitimately end a string in `slot`.
    fn closes_string(&self, slot: Slot) -> bool {
        let next = self.skip_ws_from(self.pos + 1);
        let following = self.chars.get(next).copied();

        match slot {
            Slot::Root => following.is_none(),
            Slot::Key => following == Some(':'),
            Slot::ObjectValue => match following {
                Some('}') => self.container_may_close_at(next),
                Some(',') => self.key_follows(next + 1),
                _ => false,
            },
            Slot::ArrayItem => match following {
                Some(']') => self.container_may_close_at(next),
                Some(',') => self.value_follows(next + 1),
                _ => false,
            },
        }
    }

    // A whole JSON value must start after the comma: an opening quote or
    // bracket, or a complete literal token ending at a delimiter.
    fn value_follows(&self, from: usize) -> bool {
        let start = self.skip_ws_from(from);
        match self.chars.get(start).copied() {
            Some('"' | '{' | '[') => return true,
            None => return false,
            Some(_) => {}
        }

        let mut end = start;
        while self
            .chars
            .get(end)
            .is_some_and(|&c| !is_json_whitespace(c) && !matches!(c, ',' | '}' | ']'))
        {
            end += 1;
        }
        let token: String = self.chars[start..end].iter().collect();
        if !is_literal_token(&token) {
            return false;
        }

        let after = self.skip_ws_from(end);
        matches!(self.chars.get(after).copied(), Some(',' | '}' | ']'))
    }

    // After a closing bracket only another delimiter or the end may follow.
    fn container_may_close_at(&self, bracket: usize) -> bool {
        let next = self.skip_ws_from(bracket + 1);
        match self.chars.get(next).copied() {
            None => true,
            Some(c) => matches!(c, ',' | '}' | ']'),
        }
    }

    // `"key"` followed by `:`, with no raw control characters inside the key.
    fn key_follows(&self, from: usize) -> bool {
        let mut i = self.skip_ws_from(from);
        if self.chars.get(i) != Some(&'"') {
            return false;
        }
        i += 1;

        while let Some(&c) = self.chars.get(i) {
            match c {
                '\\' => i += 2,
                '"' => {
                    let after = self.skip_ws_from(i + 1);
                    return self.chars.get(after) == Some(&':');
                }
                c if (c as u32) < 0x20 => return false,
                _ => i += 1,
            }
        }
        false
    }

    fn skip_ws_from(&self, mut i: usize) -> usize {
        while self.chars.get(i).is_some_and(|&c| is_json_whitespace(c)) {
            i += 1;
        }
        i
    }
}

fn is_json_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

fn is_literal_token(token: &str) -> bool {
    matches!(token, "true" | "false" | "null")
        || serde_json::from_str::<serde_json::Number>(token).is_ok()
}

fn escape_control(c: char) -> String {
    match c {
        '\n' => "\\n".to_string(),
        '\r' => "\\r".to_string(),
        '\t' => "\\t".to_string(),
        '\u{8}' => "\\b".to_string(),
        '\u{c}' => "\\f".to_string(),
        other => format!("\\u{:04x}", other as u32),
    }
}
