//! Response Normalizer
//!
//! Turns arbitrary generated text into a parsed JSON object.
//!
//! # Strategy
//! 1. `clean` strips code-fence markers and prose around the outermost braces
//! 2. `extract_document` isolates the `{ ... }` span
//! 3. Strict parse; on failure `repair` applies string-aware fixes one at a time,
//!    re-parsing after each:
//!    - raw newlines/tabs inside string values are escaped
//!    - trailing commas before `}` / `]` are dropped
//!    - bare object keys are quoted
//!    - single-quoted strings become double-quoted
//!
//! Nothing here panics or returns an error type; callers get `Option`/`Result<_, String>`
//! and fold failures into a `ParseOutcome`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Code fence marker with optional language tag (```json, ```JSON, ```)
static CODE_FENCE: Lazy<Regex> = Lazy::new(|| Regex::new(r"```[A-Za-z0-9_-]*").unwrap());

/// Strip code fences and any text outside the outermost braces
pub fn clean(raw: &str) -> String {
    let unfenced = CODE_FENCE.replace_all(raw, "");
    match extract_document(&unfenced) {
        Some(document) => document.to_string(),
        None => unfenced.trim().to_string(),
    }
}

/// Brace-delimited substring from the first `{` to the last `}`
pub fn extract_document(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Best-effort repair of a malformed document
///
/// Returns `None` if the document is still unparsable after every fix.
pub fn repair(document: &str) -> Option<Map<String, Value>> {
    let fixes: [fn(&str) -> String; 4] = [
        escape_control_chars_in_strings,
        strip_trailing_commas,
        quote_bare_keys,
        convert_single_quotes,
    ];

    let mut current = document.to_string();
    for fix in fixes {
        current = fix(&current);
        if let Some(object) = parse_object(&current) {
            return Some(object);
        }
    }

    None
}

/// Full pipeline: clean → extract → strict parse → repair
pub fn parse_document(raw: &str) -> Result<Map<String, Value>, String> {
    let cleaned = clean(raw);
    let document = extract_document(&cleaned)
        .ok_or_else(|| "No JSON object found in response".to_string())?;

    if let Some(object) = parse_object(document) {
        return Ok(object);
    }

    repair(document).ok_or_else(|| "Response JSON could not be repaired".to_string())
}

/// Bounded prefix of raw content kept for diagnostics
pub fn excerpt(raw: &str, limit: usize) -> String {
    match raw.char_indices().nth(limit) {
        Some((idx, _)) => raw[..idx].to_string(),
        None => raw.to_string(),
    }
}

fn parse_object(text: &str) -> Option<Map<String, Value>> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(object)) => Some(object),
        _ => None,
    }
}

/// Tracks whether a char walker is inside a double-quoted string
#[derive(Default)]
struct StringState {
    in_string: bool,
    escaped: bool,
}

impl StringState {
    /// Advance over `c`; returns true if `c` belongs to a string (including its quotes)
    fn step(&mut self, c: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if c == '\\' {
                self.escaped = true;
            } else if c == '"' {
                self.in_string = false;
            }
            true
        } else if c == '"' {
            self.in_string = true;
            true
        } else {
            false
        }
    }
}

fn escape_control_chars_in_strings(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = StringState::default();

    for c in text.chars() {
        let was_in_string = state.in_string;
        state.step(c);
        if was_in_string && state.in_string {
            match c {
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
        } else {
            out.push(c);
        }
    }

    out
}

fn strip_trailing_commas(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len());
    let mut state = StringState::default();

    for (i, &c) in chars.iter().enumerate() {
        if state.step(c) {
            out.push(c);
            continue;
        }
        if c == ',' {
            let next = chars[i + 1..].iter().find(|ch| !ch.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(c);
    }

    out
}

fn quote_bare_keys(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    let mut out = String::with_capacity(text.len() + 16);
    let mut state = StringState::default();
    let mut expecting_key = false;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if state.step(c) {
            expecting_key = false;
            out.push(c);
            i += 1;
            continue;
        }

        if expecting_key && (c.is_ascii_alphabetic() || c == '_') {
            let start = i;
            while i < chars.len() && (chars[i].is_ascii_alphanumeric() || chars[i] == '_' || chars[i] == '-') {
                i += 1;
            }
            let ident: String = chars[start..i].iter().collect();
            let next = chars[i..].iter().find(|ch| !ch.is_whitespace());
            if next == Some(&':') {
                out.push('"');
                out.push_str(&ident);
                out.push('"');
            } else {
                out.push_str(&ident);
            }
            expecting_key = false;
            continue;
        }

        match c {
            '{' | ',' => expecting_key = true,
            c if c.is_whitespace() => {}
            _ => expecting_key = false,
        }
        out.push(c);
        i += 1;
    }

    out
}

fn convert_single_quotes(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = StringState::default();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if state.step(c) {
            out.push(c);
            continue;
        }
        if c != '\'' {
            out.push(c);
            continue;
        }

        out.push('"');
        while let Some(inner) = chars.next() {
            match inner {
                '\'' => break,
                '\\' => match chars.next() {
                    Some('\'') => out.push('\''),
                    Some(escaped) => {
                        out.push('\\');
                        out.push(escaped);
                    }
                    None => {}
                },
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(inner),
            }
        }
        out.push('"');
    }

    out
}
