//! Candidate task normalization.
//!
//! A pure, total function: invalid fields are coerced to safe defaults
//! instead of failing, favoring availability over strict validation.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::models::{CandidateTask, Confidence, ExtractedTask, Priority};

/// Strict `YYYY-MM-DD` gate; anything else is dropped.
static ISO_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}-\d{2}-\d{2}$").expect("date pattern is valid"));

/// Coerce a candidate into the canonical task shape.
pub fn normalize(candidate: CandidateTask) -> ExtractedTask {
    let title = candidate.title.trim();
    let title = if title.is_empty() {
        "Untitled task".to_string()
    } else {
        title.to_string()
    };

    let priority = candidate.priority_hint.unwrap_or(if candidate.optional {
        Priority::Low
    } else {
        Priority::Medium
    });

    let confidence = candidate.confidence_hint.unwrap_or(if candidate.inferred {
        Confidence::Medium
    } else {
        Confidence::High
    });

    let due_date = candidate
        .due_date_hint
        .map(|d| d.trim().to_string())
        .filter(|d| ISO_DATE_RE.is_match(d));

    let assignee = candidate
        .assignee_hint
        .map(|a| a.trim().to_string())
        .filter(|a| !a.is_empty());

    let source_text = candidate
        .source_text
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    ExtractedTask {
        title,
        description: candidate.description.trim().to_string(),
        assignee,
        priority,
        due_date,
        optional: candidate.optional,
        inferred: candidate.inferred,
        confidence,
        source_text,
    }
}
