//! Best-effort JSON recovery for completion-service responses.
//!
//! The service is asked for a single JSON object but answers with free text:
//! fences, preambles, trailing commas, truncated arrays. Recovery is a
//! pipeline of small, order-sensitive textual transforms, each idempotent;
//! parsing stops at the first success and is retried exactly once after the
//! repair sequence.

use once_cell::sync::Lazy;
use regex::Regex;

/// JSON object following a conversational preamble ("Here's ...", "Response:").
static PREAMBLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)(?:here'?s|here is|response:|output:)[^{]*(\{.*)").expect("valid pattern")
});

static TRAILING_COMMA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r",\s*([}\]])").expect("valid pattern"));

static ADJACENT_OBJECTS_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\}\s*\{").expect("valid pattern"));

static ARRAY_CLOSE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\}\s*\]").expect("valid pattern"));

/// Recover a JSON value from a raw completion response.
///
/// Returns `None` when no JSON object can be found or repaired.
pub fn recover_json(raw: &str) -> Option<serde_json::Value> {
    let text = strip_code_fence(raw);
    let candidate = extract_json_candidate(text)?;

    if let Ok(value) = serde_json::from_str(candidate) {
        return Some(value);
    }

    let repaired = reclose_truncated(&join_adjacent_objects(&strip_trailing_commas(candidate)));
    serde_json::from_str(&repaired).ok()
}

/// Strip a leading/trailing fenced code block, if present.
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    let body = body.trim_start();
    body.strip_suffix("```").map(str::trim_end).unwrap_or(body)
}

/// Find the first `{...}` balanced substring; when braces never balance
/// (truncated output), fall back to the remainder after a conversational
/// preamble, or from the first brace to the end of the text.
pub fn extract_json_candidate(text: &str) -> Option<&str> {
    if let Some(balanced) = balanced_object(text) {
        return Some(balanced);
    }

    if let Some(caps) = PREAMBLE_RE.captures(text) {
        return caps.get(1).map(|m| m.as_str());
    }

    text.find('{').map(|start| &text[start..])
}

fn balanced_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let mut depth = 0usize;
    for (i, ch) in text[start..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(&text[start..start + i + ch.len_utf8()]);
                }
            }
            _ => {}
        }
    }
    None
}

/// `{"a": 1,}` -> `{"a": 1}` and `[1, 2,]` -> `[1, 2]`.
pub fn strip_trailing_commas(text: &str) -> String {
    TRAILING_COMMA_RE.replace_all(text, "$1").into_owned()
}

/// `}{` object boundaries inside an array -> `},{`.
pub fn join_adjacent_objects(text: &str) -> String {
    ADJACENT_OBJECTS_RE.replace_all(text, "},{").into_owned()
}

/// Truncate to the last complete `}]` and re-close the root object. Leaves
/// text without a `}]` untouched.
pub fn reclose_truncated(text: &str) -> String {
    match ARRAY_CLOSE_RE.find_iter(text).last() {
        Some(m) => {
            let mut repaired = text[..m.end()].to_string();
            repaired.push('}');
            repaired
        }
        None => text.to_string(),
    }
}
