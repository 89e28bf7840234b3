//! JSON Extraction
//!
//! Pulls one JSON value out of an LLM response. Handles:
//! - Markdown code fence wrapping (```json ... ```)
//! - JSON embedded in explanatory text
//! - Trailing commas
//! - Output truncated mid-structure (unclosed strings, brackets, braces)

use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

use crate::types::article::truncate_chars;
use crate::types::{ErrorCategory, QuillError, Result};

const PREVIEW_CHARS: usize = 200;

/// Parse the response as JSON, repairing common damage if needed
pub fn extract_json(raw: &str) -> Result<Value> {
    let cleaned = strip_code_fences(raw.trim().trim_start_matches('\u{feff}'));

    if let Ok(value) = serde_json::from_str::<Value>(cleaned) {
        return Ok(value);
    }

    let candidate = outermost_json(cleaned).unwrap_or(cleaned);
    for repaired in [
        strip_trailing_commas(candidate),
        close_open_structures(&strip_trailing_commas(candidate)),
    ] {
        if let Ok(value) = serde_json::from_str::<Value>(&repaired) {
            debug!("Repaired malformed JSON response");
            return Ok(value);
        }
    }

    Err(QuillError::llm(
        ErrorCategory::ParseError,
        format!(
            "response is not valid JSON: {}",
            truncate_chars(cleaned, PREVIEW_CHARS)
        ),
    ))
}

/// Deserialize a typed record from an already-extracted value
///
/// Shape mismatches are parse errors, so the caller's retry policy applies.
pub fn from_value<T: DeserializeOwned>(value: Value, what: &str) -> Result<T> {
    serde_json::from_value(value).map_err(|e| {
        QuillError::llm(
            ErrorCategory::ParseError,
            format!("{} response has unexpected shape: {}", what, e),
        )
    })
}

fn strip_code_fences(s: &str) -> &str {
    let mut s = s;
    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(newline) => &s[newline + 1..],
            None => s.trim_start_matches('`'),
        };
    }
    s.trim_end().trim_end_matches("```").trim()
}

/// Slice from the first `{`/`[` to its matching closer, or to the end if unmatched
fn outermost_json(s: &str) -> Option<&str> {
    let start = s.find(['{', '['])?;
    let mut depth = 0i32;
    let mut scan = StringScan::default();

    for (i, ch) in s[start..].char_indices() {
        if scan.step(ch) {
            continue;
        }
        match ch {
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[start..start + i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    Some(&s[start..])
}

fn strip_trailing_commas(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    let mut out = String::with_capacity(s.len());
    let mut scan = StringScan::default();

    for (i, &ch) in chars.iter().enumerate() {
        if !scan.step(ch) && ch == ',' {
            let next = chars[i + 1..].iter().find(|c| !c.is_whitespace());
            if matches!(next, Some('}') | Some(']')) {
                continue;
            }
        }
        out.push(ch);
    }
    out
}

/// Close an unterminated string, then every open bracket in reverse order
fn close_open_structures(s: &str) -> String {
    let mut open: Vec<char> = Vec::new();
    let mut scan = StringScan::default();

    for ch in s.chars() {
        if scan.step(ch) {
            continue;
        }
        match ch {
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                open.pop();
            }
            _ => {}
        }
    }

    let mut out = s.trim_end().trim_end_matches(',').to_string();
    if scan.in_string {
        out.push('"');
    }
    while let Some(closer) = open.pop() {
        out.push(closer);
    }
    out
}

/// Tracks whether the scanner is inside a string literal
#[derive(Default)]
struct StringScan {
    in_string: bool,
    escaped: bool,
}

impl StringScan {
    /// Returns true when `ch` belongs to a string literal (quotes included)
    fn step(&mut self, ch: char) -> bool {
        if self.in_string {
            if self.escaped {
                self.escaped = false;
            } else if ch == '\\' {
                self.escaped = true;
            } else if ch == '"' {
                self.in_string = false;
            }
            return true;
        }
        if ch == '"' {
            self.in_string = true;
            return true;
        }
        false
    }
}
