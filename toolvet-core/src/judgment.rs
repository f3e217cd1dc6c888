//! Parsing of the agent's final answer into a structured verdict.
//!
//! The agent is instructed to answer with a bare JSON object, but
//! models routinely wrap it in a markdown fence or surround it with
//! prose. `parse_judgment` tolerates those shapes and nothing else;
//! anything it cannot read becomes a [`JudgmentParseError`] that the
//! runner turns into a failing verdict.

use std::fmt;

use serde_json::Value as JsonValue;

/// The agent's verdict on a single tool.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Judgment {
    pub passed: bool,
    pub detail: String,
}

/// The final answer could not be read as a verdict.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum JudgmentParseError {
    /// No JSON object could be found in the answer.
    NoJsonObject,
    /// A JSON object was found but `passed` is missing or not a boolean.
    MissingPassed,
    /// A JSON object was found but `detail` is missing or not a string.
    MissingDetail,
}

impl fmt::Display for JudgmentParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JudgmentParseError::NoJsonObject => {
                write!(f, "the answer contains no JSON object")
            }
            JudgmentParseError::MissingPassed => {
                write!(f, "the answer has no boolean 'passed' field")
            }
            JudgmentParseError::MissingDetail => {
                write!(f, "the answer has no string 'detail' field")
            }
        }
    }
}

impl std::error::Error for JudgmentParseError {}

/// Extracts a [`Judgment`] from the agent's final answer.
///
/// Accepted shapes, in order of preference: the whole answer as a JSON
/// object, a fenced ```json block, or the first `{...}` span embedded
/// in surrounding prose.
pub fn parse_judgment(answer: &str) -> Result<Judgment, JudgmentParseError> {
    let object = extract_object(answer).ok_or(JudgmentParseError::NoJsonObject)?;
    let passed = object
        .get("passed")
        .and_then(JsonValue::as_bool)
        .ok_or(JudgmentParseError::MissingPassed)?;
    let detail = object
        .get("detail")
        .and_then(JsonValue::as_str)
        .ok_or(JudgmentParseError::MissingDetail)?;
    Ok(Judgment {
        passed,
        detail: detail.to_string(),
    })
}

fn extract_object(answer: &str) -> Option<JsonValue> {
    let trimmed = answer.trim();
    if let Some(value) = parse_object(trimmed) {
        return Some(value);
    }
    if let Some(fenced) = strip_fence(trimmed) {
        if let Some(value) = parse_object(fenced.trim()) {
            return Some(value);
        }
    }
    embedded_object(trimmed)
}

fn parse_object(text: &str) -> Option<JsonValue> {
    serde_json::from_str::<JsonValue>(text)
        .ok()
        .filter(JsonValue::is_object)
}

/// Strips a leading/trailing markdown fence (```json ... ``` or ``` ... ```).
fn strip_fence(text: &str) -> Option<&str> {
    let rest = text.strip_prefix("```")?;
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let end = rest.rfind("```")?;
    Some(&rest[..end])
}

/// Finds the first balanced `{...}` span and tries to parse it. Brace
/// counting ignores braces inside JSON strings.
fn embedded_object(text: &str) -> Option<JsonValue> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, ch) in text[start..].char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match ch {
            '\\' if in_string => escaped = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth -= 1;
                if depth == 0 {
                    return parse_object(&text[start..start + offset + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}
