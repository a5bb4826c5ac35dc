//! Defensive JSON recovery for model responses.
//!
//! Models wrap JSON in prose, fence it in markdown, and leave trailing
//! commas. Recovery tries, in order: the raw text, the first fenced code
//! block, and the widest bracket span; each candidate is parsed as-is and
//! then with trailing commas stripped. Recovery never panics and never
//! returns partial structures.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

static FENCED_BLOCK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(?:json)?\s*(.*?)```").expect("fence pattern is valid"));

static TRAILING_COMMA: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",(\s*[}\]])").expect("comma pattern is valid"));

/// Recover a JSON value from raw model output, or `None` when nothing
/// parseable is present.
pub fn recover_json(raw: &str) -> Option<Value> {
    for candidate in candidates(raw) {
        if let Some(value) = parse_lenient(&candidate) {
            return Some(value);
        }
    }
    None
}

fn candidates(raw: &str) -> Vec<String> {
    let mut out = vec![raw.trim().to_owned()];
    if let Some(captures) = FENCED_BLOCK.captures(raw) {
        out.push(captures[1].trim().to_owned());
    }
    if let Some(span) = bracket_span(raw) {
        out.push(span.to_owned());
    }
    out
}

fn parse_lenient(candidate: &str) -> Option<Value> {
    if candidate.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(candidate) {
        return Some(value);
    }
    let repaired = TRAILING_COMMA.replace_all(candidate, "$1");
    serde_json::from_str(&repaired).ok()
}

/// The span from the first opening bracket to the last matching closer of
/// the same kind. Whichever bracket kind opens first wins.
fn bracket_span(raw: &str) -> Option<&str> {
    let object = raw.find('{');
    let array = raw.find('[');
    let (open, close) = match (object, array) {
        (Some(o), Some(a)) if a < o => ('[', ']'),
        (Some(_), _) => ('{', '}'),
        (None, Some(_)) => ('[', ']'),
        (None, None) => return None,
    };
    let start = raw.find(open)?;
    let end = raw.rfind(close)?;
    (end > start).then(|| &raw[start..=end])
}
